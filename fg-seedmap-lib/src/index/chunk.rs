//! Chunked hashing of a contig into per-shard bins, and fork-join processing of the bins.
use itertools::Itertools;

use crate::hash::{bin_of, KmerHash};

/// Takes up to `chunk_size` k-mers from `kmers`, handing each to `push` along with the bin of its
/// shard.  Bins are cleared first but keep their capacity.  Returns the number of k-mers taken.
pub fn bin_chunk<I, T, F>(
    kmers: &mut I,
    chunk_size: usize,
    bins: &mut [Vec<T>],
    mut push: F,
) -> usize
where
    I: Iterator<Item = KmerHash>,
    F: FnMut(&mut Vec<T>, &KmerHash),
{
    let num_bins = bins.len();
    bins.iter_mut().for_each(Vec::clear);
    let mut num_kmers = 0;
    for kmer in kmers.by_ref().take(chunk_size) {
        push(&mut bins[bin_of(kmer.fhash, kmer.rhash, num_bins)], &kmer);
        num_kmers += 1;
    }
    num_kmers
}

/// Runs `f(shard, item)` on every item in its own scoped thread, returning once all are done.
pub fn fork_join<B, F>(items: &mut [B], f: F)
where
    B: Send,
    F: Fn(usize, &mut B) + Sync,
{
    let f = &f;
    std::thread::scope(|scope| {
        let handles = items
            .iter_mut()
            .enumerate()
            .map(|(shard, item)| scope.spawn(move || f(shard, item)))
            .collect_vec();
        for handle in handles {
            if let Err(e) = handle.join() {
                std::panic::resume_unwind(e);
            }
        }
    });
}

#[cfg(test)]
pub mod tests {
    use super::{bin_chunk, fork_join};
    use crate::hash::{bin_of, RollingHash, DEFAULT_HASH_BASE};

    #[test]
    fn test_bin_chunk() {
        let hasher = RollingHash::new(3, DEFAULT_HASH_BASE);
        let seq = b"ACGTTGCAAGGT";
        let mut kmers = hasher.kmers(seq);
        let mut bins: Vec<Vec<usize>> = vec![vec![99]; 3];

        assert_eq!(bin_chunk(&mut kmers, 4, &mut bins, |b, k| b.push(k.pos)), 4);
        let mut positions: Vec<usize> = bins.iter().flatten().copied().collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        for (shard, bin) in bins.iter().enumerate() {
            for &pos in bin {
                let (f, r) = (hasher.fhash(seq, pos), hasher.rhash(seq, pos));
                assert_eq!(bin_of(f, r, 3), shard);
            }
        }

        assert_eq!(bin_chunk(&mut kmers, 100, &mut bins, |b, k| b.push(k.pos)), 6);
        assert_eq!(bins.iter().map(Vec::len).sum::<usize>(), 6);
        assert_eq!(bin_chunk(&mut kmers, 100, &mut bins, |b, k| b.push(k.pos)), 0);
        assert!(bins.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_fork_join() {
        let mut items = vec![0usize; 5];
        fork_join(&mut items, |shard, item| *item = shard * 10);
        assert_eq!(items, vec![0, 10, 20, 30, 40]);
    }
}
