use derive_builder::Builder;
use derive_getters::Getters;

use super::constants::{
    Strategy, DEFAULT_CAREFUL_UPPER_BND_COV_MULT, DEFAULT_CHUNK_SIZE,
    DEFAULT_FALSE_POSITIVE_PROBABILITY, DEFAULT_K, DEFAULT_MAX_RARE_CNT_QUERY,
    DEFAULT_MAX_RARE_CNT_TARGET, DEFAULT_STEP_SIZE, DEFAULT_THREADS, DEFAULT_WINDOW_REGULAR_DENSITY,
    DEFAULT_WINDOW_SIZE,
};
use crate::hash::{RollingHash, DEFAULT_HASH_BASE};

/// The parameters for k-mer indexing and seed matching.  Use [`Builder`] to create them.
#[derive(Copy, Clone, Debug, PartialEq, Builder, Getters)]
#[builder(name = "Builder", build_fn(validate = "Self::validate"))]
pub struct Options {
    /// The k-mer length
    #[builder(default = "DEFAULT_K")]
    k: usize,
    /// The base of the polynomial rolling hash (must be odd)
    #[builder(default = "DEFAULT_HASH_BASE")]
    hash_base: u64,
    #[builder(default)]
    strategy: Strategy,
    /// The number of worker threads
    #[builder(default = "DEFAULT_THREADS")]
    threads: usize,
    /// Target k-mers occurring more often than this in their contig are banned
    #[builder(default = "DEFAULT_MAX_RARE_CNT_TARGET")]
    max_rare_cnt_target: usize,
    /// Only query k-mers occurring at most this often in the query are matched (exact strategy)
    #[builder(default = "DEFAULT_MAX_RARE_CNT_QUERY")]
    max_rare_cnt_query: usize,
    /// The span, in bases, of the window used to measure unique k-mer density
    #[builder(default = "DEFAULT_WINDOW_SIZE")]
    window_size: usize,
    /// Positions that are a multiple of the step are always sampled
    #[builder(default = "DEFAULT_STEP_SIZE")]
    step_size: usize,
    /// Every k-mer is sampled while the unique fraction of the window is below this
    #[builder(default = "DEFAULT_WINDOW_REGULAR_DENSITY")]
    window_regular_density: f64,
    /// The number of target positions hashed and classified per chunk
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    chunk_size: usize,
    /// The false positive probability of the query's repetitive k-mer Bloom filter
    #[builder(default = "DEFAULT_FALSE_POSITIVE_PROBABILITY")]
    false_positive_probability: f64,
    /// Unique target k-mers seen in the reads more than `mean + mult * stddev` times are banned
    #[builder(default = "DEFAULT_CAREFUL_UPPER_BND_COV_MULT")]
    careful_upper_bnd_cov_mult: f64,
    /// Run the banning pass when reads are given (approximate strategy only)
    #[builder(default = "true")]
    ban_high_freq_unique: bool,
}

impl Options {
    /// The rolling hasher for these options.
    pub fn hasher(&self) -> RollingHash {
        RollingHash::new(self.k, self.hash_base)
    }
}

impl Default for Options {
    fn default() -> Self {
        Builder::default()
            .build()
            .expect("the default options are valid")
    }
}

impl Builder {
    fn validate(&self) -> Result<(), String> {
        fn at_least_one(name: &str, value: Option<usize>) -> Result<(), String> {
            match value {
                Some(0) => Err(format!("{name} must be at least one")),
                _ => Ok(()),
            }
        }
        at_least_one("k", self.k)?;
        at_least_one("threads", self.threads)?;
        at_least_one("max_rare_cnt_target", self.max_rare_cnt_target)?;
        at_least_one("max_rare_cnt_query", self.max_rare_cnt_query)?;
        at_least_one("window_size", self.window_size)?;
        at_least_one("step_size", self.step_size)?;
        at_least_one("chunk_size", self.chunk_size)?;
        if let Some(base) = self.hash_base {
            if base % 2 == 0 {
                return Err(format!("hash_base must be odd: {base}"));
            }
        }
        if let Some(fpp) = self.false_positive_probability {
            if !(fpp > 0.0 && fpp < 1.0) {
                return Err(format!(
                    "false_positive_probability must be in (0, 1): {fpp}"
                ));
            }
        }
        if let Some(density) = self.window_regular_density {
            if !(density >= 0.0) {
                return Err(format!(
                    "window_regular_density must be non-negative: {density}"
                ));
            }
        }
        if let Some(mult) = self.careful_upper_bnd_cov_mult {
            if !(mult >= 0.0) {
                return Err(format!(
                    "careful_upper_bnd_cov_mult must be non-negative: {mult}"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use rstest::rstest;

    use super::{Builder, Options};
    use crate::index::constants::{Strategy, DEFAULT_K};

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(*opts.k(), DEFAULT_K);
        assert_eq!(*opts.strategy(), Strategy::Approximate);
        assert!(*opts.ban_high_freq_unique());
        assert_eq!(opts.hasher().k(), DEFAULT_K);
    }

    #[test]
    fn test_builder() {
        let opts = Builder::default()
            .k(4)
            .strategy(Strategy::Exact)
            .threads(3)
            .build()
            .unwrap();
        assert_eq!(*opts.k(), 4);
        assert_eq!(*opts.threads(), 3);
        assert_eq!(*opts.strategy(), Strategy::Exact);
    }

    #[rstest]
    #[case(Builder::default().k(0).clone())]
    #[case(Builder::default().threads(0).clone())]
    #[case(Builder::default().step_size(0).clone())]
    #[case(Builder::default().chunk_size(0).clone())]
    #[case(Builder::default().hash_base(240).clone())]
    #[case(Builder::default().false_positive_probability(0.0).clone())]
    #[case(Builder::default().false_positive_probability(1.0).clone())]
    #[case(Builder::default().window_regular_density(-0.1).clone())]
    #[case(Builder::default().careful_upper_bnd_cov_mult(f64::NAN).clone())]
    fn test_invalid(#[case] builder: Builder) {
        assert!(builder.build().is_err());
    }
}
