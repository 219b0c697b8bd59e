use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::error;
use seedmap::util::version::built_info;
use std::process::exit;

pub mod commands;

use commands::{command::Command, index::Index, seeds::Seeds};
use enum_dispatch::enum_dispatch;

#[derive(Parser, Debug)]
#[command(version = built_info::VERSION.as_str())]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
enum Subcommand {
    Index(Index),
    Seeds(Seeds),
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args: Args = Args::parse();
    if let Err(err) = args.subcommand.execute() {
        error!("{:#}", err);
        exit(1);
    }
}
