//! Classification of target k-mers by how often they occur in their contig.
use bio::alignment::sparse::HashMapFx;
use itertools::Itertools;
use log::{debug, info};

use super::{
    chunk::{bin_chunk, fork_join},
    options::Options,
};
use crate::{
    hash::{bloom::BloomFilter, KmerHash, RollingHash},
    util::contig::Contig,
};

/// How often a k-mer occurs within its contig.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KmerType {
    /// Occurs exactly once
    Unique,
    /// Occurs more than once, but no more than the rarity bound
    Rare,
    /// Occurs more than the rarity bound
    Banned,
}

impl KmerType {
    /// Classifies a k-mer that occurs `count` times given the rarity bound.
    pub fn from_count(count: u64, max_rare_cnt: usize) -> Self {
        if count == 1 {
            KmerType::Unique
        } else if count <= max_rare_cnt as u64 {
            KmerType::Rare
        } else {
            KmerType::Banned
        }
    }
}

/// Per contig k-mer counts, sharded by [`crate::hash::bin_of`] so that the worker handling
/// shard `i` during indexing only reads the counts of shard `i`.  Only k-mers that occur more than
/// once in their contig are stored.  Read-only once built.
#[derive(Debug, Default)]
pub struct KmerFilter {
    /// Counts indexed by contig then shard
    counts: Vec<Vec<HashMapFx<u64, u64>>>,
    num_shards: usize,
}

impl KmerFilter {
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    pub fn num_contigs(&self) -> usize {
        self.counts.len()
    }

    /// The number of hashes with a stored count in the given contig.
    pub fn num_counted(&self, ctg_idx: usize) -> usize {
        self.counts[ctg_idx].iter().map(|counts| counts.len()).sum()
    }

    /// The number of occurrences, on either strand, of the k-mer with the given hash in the
    /// given contig, or `None` if the k-mer was seen at most once.
    pub fn count(&self, ctg_idx: usize, hash: u64, shard: usize) -> Option<u64> {
        self.counts[ctg_idx][shard].get(&hash).copied()
    }

    /// Classifies a k-mer of the given contig.  The k-mer must occur in the contig, and have been
    /// counted in `shard`.
    pub fn kmer_type(
        &self,
        ctg_idx: usize,
        hash: u64,
        shard: usize,
        max_rare_cnt: usize,
    ) -> KmerType {
        let count = self.count(ctg_idx, hash, shard).unwrap_or(1);
        assert!(
            count > 0,
            "Bug: k-mer hash {hash} was flagged as repeated but not counted in shard {shard} of \
             contig {ctg_idx}"
        );
        KmerType::from_count(count, max_rare_cnt)
    }
}

/// The counting state of one shard of one contig.
struct ShardCounter {
    /// Hashes seen at least once
    seen: BloomFilter,
    /// Hashes seen more than once (or false positives of `seen`), with their exact counts after
    /// the second pass
    counts: HashMapFx<u64, u64>,
}

impl ShardCounter {
    fn new(expected_items: usize, false_positive_probability: f64) -> Self {
        Self {
            seen: BloomFilter::with_fpp(expected_items, false_positive_probability),
            counts: HashMapFx::default(),
        }
    }

    fn mark_repeated(&mut self, hashes: &[u64]) {
        for &hash in hashes {
            if self.seen.contains(hash) {
                self.counts.entry(hash).or_insert(0);
            } else {
                self.seen.insert(hash);
            }
        }
    }

    fn count_repeated(&mut self, hashes: &[u64]) {
        for hash in hashes {
            if let Some(count) = self.counts.get_mut(hash) {
                *count += 1;
            }
        }
    }
}

/// Both orientations of a k-mer are counted, so that a k-mer's count includes its reverse
/// complement.  Palindromes are counted once per position.
fn push_both_strands(bin: &mut Vec<u64>, kmer: &KmerHash) {
    bin.push(kmer.fhash);
    if kmer.rhash != kmer.fhash {
        bin.push(kmer.rhash);
    }
}

/// Builds a [`KmerFilter`], hashing each contig in chunks and counting each shard in its own
/// thread.
pub struct KmerFilterBuilder<'a> {
    threads: usize,
    chunk_size: usize,
    false_positive_probability: f64,
    hasher: &'a RollingHash,
}

impl<'a> KmerFilterBuilder<'a> {
    pub fn new(opts: &Options, hasher: &'a RollingHash) -> Self {
        Self {
            threads: *opts.threads(),
            chunk_size: *opts.chunk_size(),
            false_positive_probability: *opts.false_positive_probability(),
            hasher,
        }
    }

    /// Hashes the contig one chunk at a time, routing both hashes of each k-mer to the bin of
    /// its shard, then runs `f` on every shard in parallel.
    fn for_each_chunk<F>(
        &self,
        contig: &Contig,
        bins: &mut [Vec<u64>],
        shards: &mut [ShardCounter],
        f: F,
    ) where
        F: Fn(&mut ShardCounter, &[u64]) + Sync,
    {
        let mut kmers = self.hasher.kmers(&contig.seq);
        while bin_chunk(&mut kmers, self.chunk_size, bins, push_both_strands) > 0 {
            let mut work = bins.iter().zip(shards.iter_mut()).collect_vec();
            fork_join(&mut work, |_, (bin, shard)| f(&mut **shard, bin.as_slice()));
        }
    }

    /// Finds the hashes seen more than once with a Bloom filter, then counts only those.
    fn count_contig(&self, contig: &Contig) -> Vec<HashMapFx<u64, u64>> {
        let num_hashes = 2 * (contig.len().saturating_sub(self.hasher.k()) + 1);
        let expected_per_shard = num_hashes / self.threads + 1;
        let mut shards = (0..self.threads)
            .map(|_| ShardCounter::new(expected_per_shard, self.false_positive_probability))
            .collect_vec();
        let mut bins: Vec<Vec<u64>> = vec![Vec::new(); self.threads];

        self.for_each_chunk(contig, &mut bins, &mut shards, ShardCounter::mark_repeated);
        debug!(
            "Found {} candidate repeated k-mers in contig {}",
            shards.iter().map(|shard| shard.counts.len()).sum::<usize>(),
            contig.id
        );
        self.for_each_chunk(contig, &mut bins, &mut shards, ShardCounter::count_repeated);

        shards.into_iter().map(|shard| shard.counts).collect()
    }

    pub fn build(&self, contigs: &[Contig]) -> KmerFilter {
        let counts = contigs
            .iter()
            .map(|contig| {
                info!("Counting k-mers in contig {}", contig.id);
                self.count_contig(contig)
            })
            .collect();
        KmerFilter {
            counts,
            num_shards: self.threads,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use rstest::rstest;

    use super::{KmerFilter, KmerFilterBuilder, KmerType};
    use crate::{
        hash::{bin_of, RollingHash},
        index::{approx::tests::random_seq, options::Builder},
        util::contig::Contig,
    };

    fn build_filter(
        k: usize,
        threads: usize,
        chunk_size: usize,
        fpp: f64,
        contigs: &[Contig],
    ) -> (KmerFilter, RollingHash) {
        let opts = Builder::default()
            .k(k)
            .threads(threads)
            .chunk_size(chunk_size)
            .false_positive_probability(fpp)
            .build()
            .unwrap();
        let hasher = opts.hasher();
        (KmerFilterBuilder::new(&opts, &hasher).build(contigs), hasher)
    }

    #[rstest]
    #[case(1, 3, KmerType::Unique)]
    #[case(2, 1, KmerType::Banned)]
    #[case(2, 2, KmerType::Rare)]
    #[case(3, 2, KmerType::Banned)]
    #[case(3, 3, KmerType::Rare)]
    fn test_from_count(#[case] count: u64, #[case] max_rare: usize, #[case] expected: KmerType) {
        assert_eq!(KmerType::from_count(count, max_rare), expected);
    }

    #[rstest]
    #[case(1, 1_000)]
    #[case(2, 1_000)]
    #[case(4, 3)]
    #[case(3, 1)]
    fn test_counts_do_not_depend_on_threads_or_chunks(
        #[case] threads: usize,
        #[case] chunk_size: usize,
    ) {
        let contigs = vec![
            Contig::new("chr1", b"ACGTACGTTTGACCA"),
            Contig::new("chr2", b"TTTTTTTTGGCA"),
        ];
        let (filter, hasher) = build_filter(4, threads, chunk_size, 0.0001, &contigs);
        assert_eq!(filter.num_contigs(), 2);
        assert_eq!(filter.num_shards(), threads);

        let count = |ctg_idx: usize, kmer: &[u8]| {
            let (f, r) = (hasher.fhash(kmer, 0), hasher.rhash(kmer, 0));
            filter.count(ctg_idx, f, bin_of(f, r, threads))
        };
        // ACGT is its own reverse complement and occurs twice
        assert_eq!(count(0, b"ACGT"), Some(2));
        // CGTA occurs once, and its reverse complement TACG once
        assert_eq!(count(0, b"CGTA"), Some(2));
        // TTTT occurs five times on the forward strand of chr2, and AAAA is its reverse complement
        assert_eq!(count(1, b"TTTT"), Some(5));
        assert_eq!(count(1, b"AAAA"), Some(5));
        // scoped to the contig
        assert_eq!(count(1, b"ACGT"), None);
    }

    #[test]
    fn test_kmer_type() {
        let contigs = vec![Contig::new("chr1", b"ACGTACGTTTGACCA")];
        let threads = 3;
        let (filter, hasher) = build_filter(4, threads, 5, 0.0001, &contigs);
        let kmer_type = |kmer: &[u8], max_rare: usize| {
            let (f, r) = (hasher.fhash(kmer, 0), hasher.rhash(kmer, 0));
            filter.kmer_type(0, f, bin_of(f, r, threads), max_rare)
        };
        assert_eq!(kmer_type(b"TTGA", 1), KmerType::Unique);
        assert_eq!(kmer_type(b"ACGT", 1), KmerType::Banned);
        assert_eq!(kmer_type(b"ACGT", 2), KmerType::Rare);
    }

    #[test]
    fn test_only_repeated_kmers_are_stored() {
        let seq = random_seq(5_000, 13);
        let contigs = vec![Contig::new("chr1", &seq)];
        let (filter, _) = build_filter(15, 2, 1_000, 0.0001, &contigs);
        // every 15-mer of a random sequence this short is almost surely unique
        assert!(filter.num_counted(0) < 10, "{}", filter.num_counted(0));
    }

    #[rstest]
    #[case(0.5)]
    #[case(0.9)]
    fn test_false_positives_do_not_change_the_classification(#[case] fpp: f64) {
        let mut seq = random_seq(2_000, 17);
        let repeat = seq[300..500].to_vec();
        seq.extend_from_slice(&repeat);
        let contigs = vec![Contig::new("chr1", &seq)];
        let (exact, hasher) = build_filter(8, 3, 333, 0.0001, &contigs);
        let (loose, _) = build_filter(8, 3, 333, fpp, &contigs);
        // a loose filter stores more candidates, but each still gets its exact count
        assert!(loose.num_counted(0) >= exact.num_counted(0));
        for kmer in hasher.kmers(&seq) {
            let shard = bin_of(kmer.fhash, kmer.rhash, 3);
            for max_rare in [1, 2, 3] {
                assert_eq!(
                    loose.kmer_type(0, kmer.fhash, shard, max_rare),
                    exact.kmer_type(0, kmer.fhash, shard, max_rare)
                );
            }
        }
    }
}
