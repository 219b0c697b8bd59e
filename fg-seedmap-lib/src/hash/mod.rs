//! Polynomial rolling hashes over k-mers of a DNA sequence.
//!
//! The forward hash of the window starting at `p` is `sum(code(s[p + i]) * base^(k - 1 - i))`
//! and the reverse hash is the forward hash of the reverse complement of the same window, so a
//! k-mer's reverse hash equals the forward hash of its reverse complement found elsewhere.  All
//! arithmetic wraps modulo 2^64.
pub mod bloom;

use crate::util::dna::{complement_code, nucleotide_code};

/// The default base of the polynomial hash.
pub const DEFAULT_HASH_BASE: u64 = 239;

/// The multiplicative inverse of an odd number modulo 2^64 (Newton's iteration).
fn wrapping_inverse(value: u64) -> u64 {
    let mut inverse = value;
    for _ in 0..6 {
        inverse = inverse.wrapping_mul(2u64.wrapping_sub(value.wrapping_mul(inverse)));
    }
    inverse
}

/// Assigns a k-mer to one of `num_bins` bins given both of its hashes.  The result does not
/// depend on the strand the k-mer was read from.
#[inline]
pub fn bin_of(fhash: u64, rhash: u64, num_bins: usize) -> usize {
    let num_bins = num_bins as u64;
    ((fhash.wrapping_mul(rhash) % (2 * num_bins)) / 2) as usize
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RollingHash {
    k: usize,
    base: u64,
    /// base^(k-1)
    base_pow: u64,
    /// base^(-1)
    base_inv: u64,
}

impl RollingHash {
    /// Creates a hasher for k-mers of length `k`. The base must be odd.
    pub fn new(k: usize, base: u64) -> Self {
        assert!(k > 0, "k must be greater than zero");
        assert!(base % 2 == 1, "The hash base must be odd: {base}");
        Self {
            k,
            base,
            base_pow: base.wrapping_pow((k - 1) as u32),
            base_inv: wrapping_inverse(base),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// The forward hash of the k-mer starting at `pos`.
    pub fn fhash(&self, seq: &[u8], pos: usize) -> u64 {
        seq[pos..pos + self.k].iter().fold(0u64, |hash, &base| {
            hash.wrapping_mul(self.base)
                .wrapping_add(nucleotide_code(base))
        })
    }

    /// The hash of the reverse complement of the k-mer starting at `pos`.
    pub fn rhash(&self, seq: &[u8], pos: usize) -> u64 {
        seq[pos..pos + self.k].iter().rev().fold(0u64, |hash, &base| {
            hash.wrapping_mul(self.base)
                .wrapping_add(complement_code(base))
        })
    }

    #[inline]
    fn roll_fhash(&self, fhash: u64, out: u8, next: u8) -> u64 {
        fhash
            .wrapping_sub(self.base_pow.wrapping_mul(nucleotide_code(out)))
            .wrapping_mul(self.base)
            .wrapping_add(nucleotide_code(next))
    }

    #[inline]
    fn roll_rhash(&self, rhash: u64, out: u8, next: u8) -> u64 {
        rhash
            .wrapping_sub(complement_code(out))
            .wrapping_mul(self.base_inv)
            .wrapping_add(self.base_pow.wrapping_mul(complement_code(next)))
    }

    /// A cursor at the k-mer starting at `pos`, or `None` if there is no such k-mer.
    pub fn cursor<'a>(&'a self, seq: &'a [u8], pos: usize) -> Option<KmerCursor<'a>> {
        KmerCursor::new(self, seq, pos)
    }

    /// Iterates the hashes of every k-mer in the sequence.
    pub fn kmers<'a>(&'a self, seq: &'a [u8]) -> KmerHashes<'a> {
        KmerHashes {
            cursor: self.cursor(seq, 0),
            started: false,
        }
    }
}

/// The forward and reverse-complement hash of the k-mer at a position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KmerHash {
    pub pos: usize,
    pub fhash: u64,
    pub rhash: u64,
}

/// A position in a sequence along with the hashes of the k-mer starting there.  Advancing moves
/// one base to the right in constant time.
#[derive(Clone, Debug)]
pub struct KmerCursor<'a> {
    hasher: &'a RollingHash,
    seq: &'a [u8],
    pos: usize,
    fhash: u64,
    rhash: u64,
}

impl<'a> KmerCursor<'a> {
    pub fn new(hasher: &'a RollingHash, seq: &'a [u8], pos: usize) -> Option<Self> {
        if pos + hasher.k > seq.len() {
            return None;
        }
        Some(Self {
            hasher,
            seq,
            pos,
            fhash: hasher.fhash(seq, pos),
            rhash: hasher.rhash(seq, pos),
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn fhash(&self) -> u64 {
        self.fhash
    }

    pub fn rhash(&self) -> u64 {
        self.rhash
    }

    pub fn kmer_hash(&self) -> KmerHash {
        KmerHash {
            pos: self.pos,
            fhash: self.fhash,
            rhash: self.rhash,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos + self.hasher.k < self.seq.len()
    }

    pub fn advance(&mut self) {
        assert!(self.has_next(), "Cannot advance past the last k-mer");
        let out = self.seq[self.pos];
        let next = self.seq[self.pos + self.hasher.k];
        self.fhash = self.hasher.roll_fhash(self.fhash, out, next);
        self.rhash = self.hasher.roll_rhash(self.rhash, out, next);
        self.pos += 1;
    }
}

/// Iterator over the [`KmerHash`] of every k-mer in a sequence, left to right.
pub struct KmerHashes<'a> {
    cursor: Option<KmerCursor<'a>>,
    started: bool,
}

impl Iterator for KmerHashes<'_> {
    type Item = KmerHash;

    fn next(&mut self) -> Option<KmerHash> {
        let cursor = self.cursor.as_mut()?;
        if !self.started {
            self.started = true;
        } else if cursor.has_next() {
            cursor.advance();
        } else {
            self.cursor = None;
            return None;
        }
        Some(cursor.kmer_hash())
    }
}
