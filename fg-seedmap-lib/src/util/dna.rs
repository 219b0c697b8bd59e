use lazy_static::lazy_static;
use std::borrow::Borrow;

/// Valid IUPAC DNA bases
pub const IUPAC_BASES: [u8; 15] = *b"AGCTYRWSKMDVHBN";

/// The complement of IUPAC DNA bases.
pub const IUPAC_BASES_COMPLEMENT: [u8; 15] = *b"TCGARYWSMKHBDVN";

/// The number of distinct nucleotide codes used when hashing.
pub const NUM_NUCLEOTIDE_CODES: u64 = 4;

lazy_static! {
    /// An array-based look up of the DNA complement for each IUPAC bases
    pub static ref COMPLEMENT: [u8; 256] = {
        let mut comp = [0; 256];
        for (v, a) in comp.iter_mut().enumerate() {
            *a = v as u8;
        }
        for (&a, &b) in IUPAC_BASES.iter().zip(IUPAC_BASES_COMPLEMENT.iter()) {
            comp[a as usize] = b;
            comp[a as usize + 32] = b + 32;  // lowercase variants
        }
        comp
    };

    /// An array-based look up of the 2-bit code for each base: A=0, C=1, G=2, T=3.  Any other
    /// symbol is coded as an A.
    pub static ref NUCLEOTIDE_CODE: [u8; 256] = {
        let mut codes = [0; 256];
        for (i, &base) in b"ACGT".iter().enumerate() {
            codes[base as usize] = i as u8;
            codes[base.to_ascii_lowercase() as usize] = i as u8;
        }
        codes
    };
}

/// Complements a given DNA IUPAC base.
fn complement(a: u8) -> u8 {
    COMPLEMENT[a as usize]
}

/// The 2-bit code of a base.
#[inline(always)]
pub fn nucleotide_code(a: u8) -> u64 {
    u64::from(NUCLEOTIDE_CODE[a as usize])
}

/// The 2-bit code of the complement of a base.
#[inline(always)]
pub fn complement_code(a: u8) -> u64 {
    NUM_NUCLEOTIDE_CODES - 1 - nucleotide_code(a)
}

/// Reverse complements a DNA IUPAC base.
pub fn reverse_complement<C, T>(text: T) -> Vec<u8>
where
    C: Borrow<u8>,
    T: IntoIterator<Item = C>,
    T::IntoIter: DoubleEndedIterator,
{
    text.into_iter()
        .rev()
        .map(|a| complement(*a.borrow()))
        .collect()
}
