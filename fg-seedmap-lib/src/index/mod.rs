//! Target k-mer indexes: hash to the positions of the k-mer in one target contig.
pub mod approx;
pub mod ban;
pub mod chunk;
pub mod constants;
pub mod filter;
pub mod options;
pub mod window;

pub use constants::Strategy;
pub use filter::KmerType;
pub use options::{Builder, BuilderError, Options};

use bio::alignment::sparse::HashMapFx;
use log::info;

use crate::{hash::RollingHash, util::contig::Contig};
use approx::ApproxKmerIndexer;

/// Maps the forward hash of a k-mer to its positions, in the order they were indexed.
pub type KmerIndex = HashMapFx<u64, Vec<usize>>;

/// One [`KmerIndex`] per target contig, in the same order as the contigs.
pub type KmerIndexes = Vec<KmerIndex>;

/// Indexes every k-mer of `seq` that occurs at most `max_cnt` times (forward strand only).
/// Positions are in increasing order.
pub fn get_rare_kmers(seq: &[u8], hasher: &RollingHash, max_cnt: usize) -> KmerIndex {
    let mut kmer_index = KmerIndex::default();
    for kmer in hasher.kmers(seq) {
        kmer_index.entry(kmer.fhash).or_default().push(kmer.pos);
    }
    kmer_index.retain(|_, positions| positions.len() <= max_cnt);
    kmer_index
}

/// Summary counts of a single [`KmerIndex`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KmerIndexStats {
    /// The number of distinct hashes
    pub distinct_kmers: usize,
    /// The total number of positions
    pub positions: usize,
    /// The number of hashes with a single position
    pub unique_kmers: usize,
}

impl KmerIndexStats {
    pub fn new(kmer_index: &KmerIndex) -> Self {
        kmer_index
            .values()
            .fold(Self::default(), |mut stats, positions| {
                stats.distinct_kmers += 1;
                stats.positions += positions.len();
                if positions.len() == 1 {
                    stats.unique_kmers += 1;
                }
                stats
            })
    }
}

/// Builds the target k-mer indexes using the configured [`Strategy`].
#[derive(Clone, Debug)]
pub struct KmerIndexer {
    opts: Options,
    hasher: RollingHash,
}

impl KmerIndexer {
    pub fn new(opts: Options) -> Self {
        Self {
            hasher: opts.hasher(),
            opts,
        }
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    pub fn hasher(&self) -> &RollingHash {
        &self.hasher
    }

    /// Builds one index per target.  With the approximate strategy the reads, when given, are
    /// used to ban over-represented unique k-mers.
    pub fn extract(&self, targets: &[Contig], reads: &[Contig]) -> KmerIndexes {
        match self.opts.strategy() {
            Strategy::Exact => targets
                .iter()
                .map(|target| {
                    info!("Creating index for contig {}", target.id);
                    get_rare_kmers(&target.seq, &self.hasher, *self.opts.max_rare_cnt_target())
                })
                .collect(),
            Strategy::Approximate => {
                ApproxKmerIndexer::new(&self.opts, &self.hasher).extract(targets, reads)
            }
        }
    }
}

impl Builder {
    pub fn build_indexer(&self) -> Result<KmerIndexer, BuilderError> {
        Ok(KmerIndexer::new(self.build()?))
    }
}
