use super::command::ValueEnum;
use anyhow::Result;
use clap::{
    builder::{PossibleValuesParser, TypedValueParser as _},
    ArgAction, Args,
};
use log::info;
use seedmap::{
    index::{
        constants::{
            DEFAULT_CAREFUL_UPPER_BND_COV_MULT, DEFAULT_CHUNK_SIZE,
            DEFAULT_FALSE_POSITIVE_PROBABILITY, DEFAULT_K, DEFAULT_MAX_RARE_CNT_QUERY,
            DEFAULT_MAX_RARE_CNT_TARGET, DEFAULT_STEP_SIZE, DEFAULT_WINDOW_REGULAR_DENSITY,
            DEFAULT_WINDOW_SIZE,
        },
        Builder, KmerIndexer, KmerIndexes, Strategy,
    },
    hash::DEFAULT_HASH_BASE,
    util::{
        contig::{self, Contig},
        NUM_CPU,
    },
};
use std::path::{Path, PathBuf};

/// The inputs and parameters shared by every command that builds target k-mer indexes.
#[derive(Args, Debug, Clone)]
pub struct IndexerArgs {
    /// The path to the reference/target FASTA.
    #[clap(long, short = 'r', display_order = 1)]
    pub ref_fasta: PathBuf,

    /// The number of threads to use.
    #[clap(long, short = 't', default_value = NUM_CPU.as_str(), display_order = 3)]
    pub threads: usize,

    /// Assume an unrecognized input (based on file extension) is GZIP compressed.
    #[clap(long, short = 'z', default_value = "false", display_order = 4)]
    pub decompress: bool,

    /// The k-mer length.
    #[clap(long, short = 'k', default_value_t = DEFAULT_K, display_order = 5)]
    pub k: usize,

    /// The base of the rolling hash (must be odd).
    #[clap(long, default_value_t = DEFAULT_HASH_BASE, display_order = 6)]
    pub hash_base: u64,

    /// How target k-mers are indexed and query k-mers matched:
    /// - Exact: index every rare target k-mer, match k-mers rare in the query.
    /// - Approximate: index a density-controlled sample of rare target k-mers, ban unique target
    ///   k-mers over-represented in the reads, and skip repetitive query k-mers.
    #[clap(
        long,
        short = 's',
        value_parser = PossibleValuesParser::new(Strategy::possible_values())
            .map(|s| s.parse::<Strategy>().unwrap()),
        default_value_t = Strategy::Approximate,
        ignore_case = true,
        display_order = 7,
        verbatim_doc_comment
    )]
    pub strategy: Strategy,

    /// Target k-mers occurring more often than this within their contig are not indexed.
    #[clap(long, default_value_t = DEFAULT_MAX_RARE_CNT_TARGET, display_order = 8)]
    pub max_rare_cnt_target: usize,

    /// Query k-mers occurring more often than this within the query are not matched (exact only).
    #[clap(long, default_value_t = DEFAULT_MAX_RARE_CNT_QUERY, display_order = 9)]
    pub max_rare_cnt_query: usize,

    /// The span, in bases, of the window used to measure unique k-mer density.
    #[clap(long, short = 'w', default_value_t = DEFAULT_WINDOW_SIZE, display_order = 10)]
    pub window_size: usize,

    /// Positions that are a multiple of the step are always indexed.
    #[clap(long, default_value_t = DEFAULT_STEP_SIZE, display_order = 11)]
    pub step_size: usize,

    /// Every k-mer is indexed while the fraction of unique k-mers in the window is below this.
    #[clap(long, default_value_t = DEFAULT_WINDOW_REGULAR_DENSITY, display_order = 12)]
    pub window_regular_density: f64,

    /// The number of target positions hashed per chunk.
    #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE, display_order = 13)]
    pub chunk_size: usize,

    /// The false positive probability of the Bloom filter of repetitive query k-mers.
    #[clap(long, default_value_t = DEFAULT_FALSE_POSITIVE_PROBABILITY, display_order = 14)]
    pub false_positive_probability: f64,

    /// Unique target k-mers seen in the reads more than `mean + mult * stddev` times are banned.
    #[clap(long, default_value_t = DEFAULT_CAREFUL_UPPER_BND_COV_MULT, display_order = 15)]
    pub careful_upper_bnd_cov_mult: f64,

    /// Ban unique target k-mers over-represented in the reads (approximate only).
    #[clap(long, default_value_t = true, action = ArgAction::Set, display_order = 16)]
    pub ban_high_freq_unique: bool,
}

impl IndexerArgs {
    /// The options builder for these arguments.
    pub fn builder(&self) -> Builder {
        let mut builder = Builder::default();
        builder
            .k(self.k)
            .hash_base(self.hash_base)
            .strategy(self.strategy)
            .threads(self.threads)
            .max_rare_cnt_target(self.max_rare_cnt_target)
            .max_rare_cnt_query(self.max_rare_cnt_query)
            .window_size(self.window_size)
            .step_size(self.step_size)
            .window_regular_density(self.window_regular_density)
            .chunk_size(self.chunk_size)
            .false_positive_probability(self.false_positive_probability)
            .careful_upper_bnd_cov_mult(self.careful_upper_bnd_cov_mult)
            .ban_high_freq_unique(self.ban_high_freq_unique);
        builder
    }

    /// Reads the targets (and reads, if any) and builds one k-mer index per target.
    pub fn build_indexes(
        &self,
        reads: Option<&Path>,
    ) -> Result<(Vec<Contig>, KmerIndexer, KmerIndexes)> {
        let indexer = self.builder().build_indexer()?;
        info!("Reading reference FASTA from {}", self.ref_fasta.display());
        let targets = contig::from_fasta(&self.ref_fasta)?;
        let reads = match reads {
            Some(path) => {
                info!("Reading reads from {}", path.display());
                contig::from_fastx(&path, self.decompress)?
            }
            None => Vec::new(),
        };
        info!(
            "Indexing {} target(s) with the {} strategy",
            targets.len(),
            indexer.opts().strategy()
        );
        let kmer_indexes = indexer.extract(&targets, &reads);
        Ok((targets, indexer, kmer_indexes))
    }
}
