//! Windowed, chunked, multi-threaded construction of target k-mer indexes.
use std::iter::Peekable;

use log::{debug, info};

use super::{
    ban::ban_high_freq_unique_kmers,
    chunk::{bin_chunk, fork_join},
    filter::{KmerFilter, KmerFilterBuilder, KmerType},
    options::Options,
    window::{KmerWindow, PosHashUniq},
    KmerIndex, KmerIndexes,
};
use crate::{
    hash::{KmerHash, KmerHashes, RollingHash},
    util::contig::Contig,
};

/// A hashed target position awaiting classification.
#[derive(Copy, Clone, Debug)]
struct HashPos {
    fhash: u64,
    pos: usize,
    kmer_type: KmerType,
}

impl HashPos {
    fn push(bin: &mut Vec<HashPos>, kmer: &KmerHash) {
        bin.push(HashPos {
            fhash: kmer.fhash,
            pos: kmer.pos,
            kmer_type: KmerType::Banned,
        });
    }
}

pub struct ApproxKmerIndexer<'a> {
    opts: &'a Options,
    hasher: &'a RollingHash,
}

impl<'a> ApproxKmerIndexer<'a> {
    pub fn new(opts: &'a Options, hasher: &'a RollingHash) -> Self {
        Self { opts, hasher }
    }

    /// Hashes up to `chunk_size` positions into one bin per thread, then classifies each bin in
    /// its own thread.  Bins are cleared but keep their capacity between chunks.
    fn bin_hashes_in_chunk(
        &self,
        bins: &mut [Vec<HashPos>],
        kmer_filter: &KmerFilter,
        kmers: &mut Peekable<KmerHashes>,
        ctg_idx: usize,
    ) {
        bin_chunk(kmers, *self.opts.chunk_size(), bins, HashPos::push);
        let max_rare_cnt = *self.opts.max_rare_cnt_target();
        fork_join(bins, |shard, bin| {
            for hash_pos in bin.iter_mut() {
                hash_pos.kmer_type =
                    kmer_filter.kmer_type(ctg_idx, hash_pos.fhash, shard, max_rare_cnt);
            }
        });
    }

    /// Builds the index of a single target contig.
    ///
    /// Unique and rare k-mers are swept in position order through a [`KmerWindow`] centred on
    /// each k-mer.  A k-mer is added to the index if the unique fraction of its window is below
    /// the density threshold, or its position is a multiple of the step size.  K-mers whose
    /// window reaches positions not yet hashed are carried over to the next chunk, along with
    /// the k-mers within half a window before them.
    pub fn get_kmer_index(
        &self,
        contig: &Contig,
        kmer_filter: &KmerFilter,
        ctg_idx: usize,
    ) -> KmerIndex {
        let mut kmer_index = KmerIndex::default();
        if contig.len() < self.hasher.k() {
            return kmer_index;
        }
        assert_eq!(
            kmer_filter.num_shards(),
            *self.opts.threads(),
            "The k-mer filter must have one shard per thread"
        );

        let window_size = *self.opts.window_size();
        let step_size = *self.opts.step_size();
        let density = *self.opts.window_regular_density();
        let half_window = window_size / 2;

        let mut bins: Vec<Vec<HashPos>> = vec![Vec::new(); *self.opts.threads()];
        let mut pos_hash_uniq: Vec<PosHashUniq> = Vec::new();
        // index of the first k-mer of the buffer not yet swept
        let mut start = 0;
        let mut kmer_window = KmerWindow::new(window_size);
        let mut kmers = self.hasher.kmers(&contig.seq).peekable();
        loop {
            debug!(
                "Pos = {}",
                kmers.peek().map_or(contig.len(), |kmer| kmer.pos)
            );
            self.bin_hashes_in_chunk(&mut bins, kmer_filter, &mut kmers, ctg_idx);

            pos_hash_uniq.extend(
                bins.iter()
                    .flatten()
                    .filter(|hash_pos| hash_pos.kmer_type != KmerType::Banned)
                    .map(|hash_pos| PosHashUniq {
                        pos: hash_pos.pos,
                        hash: hash_pos.fhash,
                        is_unique: hash_pos.kmer_type == KmerType::Unique,
                    }),
            );
            pos_hash_uniq.sort_unstable();

            let cursor = kmers.peek().map(|kmer| kmer.pos);
            let mut carried = None;
            kmer_window.reset();
            kmer_window.seek(start);
            for idx in start..pos_hash_uniq.len() {
                let item = kmer_window.inc(&pos_hash_uniq);
                if cursor.map_or(false, |cursor| cursor - item.pos <= half_window) {
                    carried = Some(idx);
                    break;
                }
                if kmer_window.regular_frac() < density || item.pos % step_size == 0 {
                    kmer_index.entry(item.hash).or_default().push(item.pos);
                }
            }
            match carried {
                Some(idx) => {
                    let context = kmer_window.left();
                    pos_hash_uniq.drain(..context);
                    start = idx - context;
                }
                None => {
                    pos_hash_uniq.clear();
                    start = 0;
                }
            }

            if cursor.is_none() {
                break;
            }
        }
        kmer_index
    }

    pub fn get_kmer_indexes(&self, contigs: &[Contig], kmer_filter: &KmerFilter) -> KmerIndexes {
        contigs
            .iter()
            .enumerate()
            .map(|(ctg_idx, contig)| {
                info!("Creating index for contig {}", contig.id);
                self.get_kmer_index(contig, kmer_filter, ctg_idx)
            })
            .collect()
    }

    /// Builds the k-mer filter, the per contig indexes, and, when enabled and reads are given,
    /// bans unique k-mers that are over-represented in the reads.
    pub fn extract(&self, contigs: &[Contig], reads: &[Contig]) -> KmerIndexes {
        info!("Creating kmer filter");
        let kmer_filter = KmerFilterBuilder::new(self.opts, self.hasher).build(contigs);
        info!("Finished creating kmer filter. Using it to build kmer indexes");
        let mut kmer_indexes = self.get_kmer_indexes(contigs, &kmer_filter);

        if *self.opts.ban_high_freq_unique() && !reads.is_empty() {
            info!("Filtering high multiplicity unique k-mers");
            ban_high_freq_unique_kmers(
                &mut kmer_indexes,
                reads,
                self.hasher,
                *self.opts.threads(),
                *self.opts.careful_upper_bnd_cov_mult(),
            );
        }
        kmer_indexes
    }
}
