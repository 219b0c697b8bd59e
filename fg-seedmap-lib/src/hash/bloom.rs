//! A Bloom filter keyed by k-mer hashes, and its use to flag k-mers that repeat in a sequence.
use super::RollingHash;

const SEEDS: [u64; 2] = [0x9e37_79b9_7f4a_7c15, 0xbf58_476d_1ce4_e5b9];

fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// A probabilistic set of `u64` keys with no false negatives.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a filter sized so that, after `expected_items` inserts, lookups of absent keys
    /// return true with probability at most `false_positive_probability`.
    pub fn with_fpp(expected_items: usize, false_positive_probability: f64) -> Self {
        assert!(
            false_positive_probability > 0.0 && false_positive_probability < 1.0,
            "False positive probability must be in (0, 1): {false_positive_probability}"
        );
        let n = expected_items.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;
        let num_bits = (-n * false_positive_probability.ln() / (ln2 * ln2)).ceil().max(64.0);
        let num_hashes = ((num_bits / n) * ln2).round().max(1.0) as u32;
        let num_bits = num_bits as u64;
        Self {
            bits: vec![0; ((num_bits + 63) / 64) as usize],
            num_bits,
            num_hashes,
        }
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    #[inline]
    fn bit_indexes(num_bits: u64, num_hashes: u32, key: u64) -> impl Iterator<Item = u64> {
        let h1 = mix64(key ^ SEEDS[0]);
        let h2 = mix64(key ^ SEEDS[1]) | 1;
        (0..u64::from(num_hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }

    pub fn insert(&mut self, key: u64) {
        for idx in Self::bit_indexes(self.num_bits, self.num_hashes, key) {
            self.bits[(idx >> 6) as usize] |= 1u64 << (idx & 63);
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        Self::bit_indexes(self.num_bits, self.num_hashes, key)
            .all(|idx| self.bits[(idx >> 6) as usize] & (1u64 << (idx & 63)) != 0)
    }
}

/// Builds a Bloom filter of the forward k-mer hashes that occur more than once in `seq`.  A
/// k-mer seen a second time (according to a first filter of k-mers seen at least once) is added
/// to the returned filter.
pub fn repetitive_kmers(seq: &[u8], hasher: &RollingHash, fpp: f64) -> BloomFilter {
    let expected = seq.len().saturating_sub(hasher.k()) + 1;
    let mut once = BloomFilter::with_fpp(expected, fpp);
    let mut repetitive = BloomFilter::with_fpp(expected, fpp);
    for kmer in hasher.kmers(seq) {
        if once.contains(kmer.fhash) {
            repetitive.insert(kmer.fhash);
        } else {
            once.insert(kmer.fhash);
        }
    }
    repetitive
}
