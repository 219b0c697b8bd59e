use super::{command::Command, indexer::IndexerArgs};
use anyhow::Result;
use clap::Parser;
use log::info;
use seedmap::{index::KmerIndexStats, util::version::built_info};
use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
};

/// Builds the k-mer index of each reference contig and writes summary counts.
///
/// The output is a tab-separated table on standard output with one row per contig: the contig
/// name, its length, the number of distinct indexed k-mers, the number of indexed positions, and
/// the number of k-mers indexed at a single position.
///
/// When reads are given and the approximate strategy is used, unique k-mers over-represented in
/// the reads are removed from the index (see `--ban-high-freq-unique`).
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width=0)]
pub struct Index {
    #[clap(flatten)]
    indexer: IndexerArgs,

    /// The path to the input FASTA/FASTQ of reads used to ban over-represented k-mers.
    #[clap(long, short = 'f', display_order = 2)]
    reads: Option<PathBuf>,
}

impl Index {
    /// Executes the index command
    pub fn execute(&self) -> Result<()> {
        info!("Starting indexing...");
        let (targets, _, kmer_indexes) = self.indexer.build_indexes(self.reads.as_deref())?;

        let mut writer = BufWriter::new(io::stdout().lock());
        writeln!(
            writer,
            "contig\tlength\tdistinct_kmers\tpositions\tunique_kmers"
        )?;
        for (target, kmer_index) in targets.iter().zip(kmer_indexes.iter()) {
            let stats = KmerIndexStats::new(kmer_index);
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                target.id,
                target.len(),
                stats.distinct_kmers,
                stats.positions,
                stats.unique_kmers
            )?;
        }
        writer.flush()?;
        info!("Indexed {} target(s)", targets.len());
        Ok(())
    }
}

impl Command for Index {
    fn execute(&self) -> Result<()> {
        Index::execute(self)
    }
}
