//! Banning of target k-mers that are unique in the target but unusually frequent in the reads.
use std::sync::atomic::{AtomicU64, Ordering};

use bio::alignment::sparse::HashMapFx;
use itertools::Itertools;
use log::info;

use super::KmerIndex;
use crate::{hash::RollingHash, util::contig::Contig};

/// Single-pass mean and (population) standard deviation, or `None` if there are no values.
pub fn mean_stdev<I: IntoIterator<Item = u64>>(values: I) -> Option<(f64, f64)> {
    let mut n = 0u64;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for value in values {
        n += 1;
        let value = value as f64;
        let delta = value - mean;
        mean += delta / n as f64;
        m2 += delta * (value - mean);
    }
    if n == 0 {
        None
    } else {
        Some((mean, (m2 / n as f64).sqrt()))
    }
}

/// Read multiplicities of the hashes that occupy a single position in some target index.  Each
/// hash has a dense id indexing an atomic counter, so reads can be counted concurrently.
pub struct UniqueKmerCounts {
    ids: HashMapFx<u64, usize>,
    hashes: Vec<u64>,
    counts: Vec<AtomicU64>,
}

impl UniqueKmerCounts {
    /// Collects the unique hashes of the indexes, with zero counts.
    pub fn from_indexes(kmer_indexes: &[KmerIndex]) -> Self {
        let mut ids: HashMapFx<u64, usize> = HashMapFx::default();
        let mut hashes = Vec::new();
        for index in kmer_indexes {
            for (hash, positions) in index {
                if positions.len() == 1 && !ids.contains_key(hash) {
                    ids.insert(*hash, hashes.len());
                    hashes.push(*hash);
                }
            }
        }
        let counts = (0..hashes.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            ids,
            hashes,
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// The read count of a unique hash, or `None` if the hash is not tracked.
    pub fn count(&self, hash: u64) -> Option<u64> {
        self.ids
            .get(&hash)
            .map(|&id| self.counts[id].load(Ordering::Relaxed))
    }

    /// Increments the counter of the hash, returning false if it is not tracked.
    fn increment(&self, hash: u64) -> bool {
        match self.ids.get(&hash) {
            Some(&id) => {
                self.counts[id].fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Counts every k-mer of the read whose forward, or failing that reverse complement, hash
    /// is tracked.
    fn count_read(&self, read: &Contig, hasher: &RollingHash) {
        for kmer in hasher.kmers(&read.seq) {
            if !self.increment(kmer.fhash) {
                self.increment(kmer.rhash);
            }
        }
    }

    /// Counts the reads, splitting them into one contiguous slice per thread.
    pub fn count_reads(&self, reads: &[Contig], hasher: &RollingHash, threads: usize) {
        if reads.is_empty() {
            return;
        }
        let slice_len = (reads.len() + threads - 1) / threads;
        std::thread::scope(|scope| {
            let handles = reads
                .chunks(slice_len.max(1))
                .map(|slice| {
                    scope.spawn(move || {
                        for read in slice {
                            self.count_read(read, hasher);
                        }
                    })
                })
                .collect_vec();
            for handle in handles {
                if let Err(e) = handle.join() {
                    std::panic::resume_unwind(e);
                }
            }
        });
    }

    pub fn mean_stdev(&self) -> Option<(f64, f64)> {
        mean_stdev(
            self.counts
                .iter()
                .map(|count| count.load(Ordering::Relaxed)),
        )
    }

    /// The tracked hashes whose count is greater than the threshold.
    pub fn above(&self, threshold: f64) -> Vec<u64> {
        self.hashes
            .iter()
            .zip(self.counts.iter())
            .filter(|(_, count)| count.load(Ordering::Relaxed) as f64 > threshold)
            .map(|(hash, _)| *hash)
            .collect()
    }
}

/// What the banning pass found.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BanSummary {
    pub num_unique: usize,
    pub mean: f64,
    pub stddev: f64,
    pub threshold: f64,
    pub num_banned: usize,
}

/// Removes from every index each hash that is unique in some target index and whose read
/// multiplicity is above `mean + careful_upper_bnd_cov_mult * stddev`.  Returns `None`, leaving
/// the indexes untouched, when no index has a unique hash.
pub fn ban_high_freq_unique_kmers(
    kmer_indexes: &mut [KmerIndex],
    reads: &[Contig],
    hasher: &RollingHash,
    threads: usize,
    careful_upper_bnd_cov_mult: f64,
) -> Option<BanSummary> {
    info!("Counting unique k-mers from the target...");
    let unique_kmers = UniqueKmerCounts::from_indexes(kmer_indexes);
    info!("There are {} unique k-mers in the target", unique_kmers.len());

    unique_kmers.count_reads(reads, hasher, threads);
    info!("Finished counting frequencies of unique k-mers in the reads");

    let (mean, stddev) = unique_kmers.mean_stdev()?;
    info!("Mean (std) multiplicity of a unique k-mer = {mean:.3} ({stddev:.3})");
    let threshold = mean + careful_upper_bnd_cov_mult * stddev;
    info!("Max solid k-mer frequency in reads {threshold:.3}");

    let banned = unique_kmers.above(threshold);
    for hash in &banned {
        for index in kmer_indexes.iter_mut() {
            index.remove(hash);
        }
    }
    info!("Filtered {} high multiplicity k-mers", banned.len());

    Some(BanSummary {
        num_unique: unique_kmers.len(),
        mean,
        stddev,
        threshold,
        num_banned: banned.len(),
    })
}
