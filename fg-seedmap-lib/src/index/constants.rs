use anyhow::{anyhow, Error};
use std::{fmt::Display, str::FromStr};

pub const DEFAULT_K: usize = 17;
pub const DEFAULT_THREADS: usize = 2;
pub const DEFAULT_MAX_RARE_CNT_TARGET: usize = 1;
pub const DEFAULT_MAX_RARE_CNT_QUERY: usize = 1;
pub const DEFAULT_WINDOW_SIZE: usize = 1000;
pub const DEFAULT_STEP_SIZE: usize = 20;
pub const DEFAULT_WINDOW_REGULAR_DENSITY: f64 = 0.6;
pub const DEFAULT_CHUNK_SIZE: usize = 10_000_000;
pub const DEFAULT_FALSE_POSITIVE_PROBABILITY: f64 = 0.0001;
pub const DEFAULT_CAREFUL_UPPER_BND_COV_MULT: f64 = 3.0;

/// How target k-mers are indexed and how seeds are found for a query.
///
/// The default strategy is approximate.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub enum Strategy {
    /// Index every rare target k-mer; match k-mers unique in the query.
    Exact,
    /// Index a density-controlled sample of rare target k-mers, ban k-mers over-represented in
    /// the reads, and skip query k-mers a Bloom filter flags as repetitive.
    #[default]
    Approximate,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Approximate => write!(f, "approximate"),
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Strategy::Exact),
            "approximate" | "approx" => Ok(Strategy::Approximate),
            _ => Err(anyhow!("Invalid strategy: {}", s)),
        }
    }
}
