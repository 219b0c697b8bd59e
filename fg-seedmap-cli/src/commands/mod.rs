pub mod command;
pub mod index;
pub mod indexer;
pub mod seeds;
