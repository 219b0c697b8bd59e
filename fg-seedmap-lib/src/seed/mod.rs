//! Seed matches between a query and a target's k-mer index.
pub mod io;

use std::{fmt, ops::Deref};

use crate::{
    hash::{bloom::repetitive_kmers, RollingHash},
    index::{get_rare_kmers, KmerIndex, KmerIndexes, Options, Strategy},
    util::contig::Contig,
};

/// Matches whose target position is within this many bases of the previously printed match are
/// skipped when displaying [`Matches`].
pub const DEBUG_MIN_TARGET_GAP: u32 = 10;

/// A shared k-mer between a target and a query.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Match {
    pub target_pos: u32,
    pub query_pos: i32,
    /// The number of positions of the k-mer in the target index
    pub target_freq: u8,
}

impl Match {
    /// Creates a match, panicking if a position does not fit in an `i32` or the frequency does
    /// not fit in a `u8`.
    pub fn new(target_pos: usize, query_pos: usize, target_freq: usize) -> Self {
        assert!(
            target_freq <= u8::MAX as usize,
            "Target k-mer frequency {target_freq} exceeds {}; is the target rarity bound too large?",
            u8::MAX
        );
        assert!(
            target_pos <= i32::MAX as usize,
            "Target position {target_pos} exceeds {}",
            i32::MAX
        );
        assert!(
            query_pos <= i32::MAX as usize,
            "Query position {query_pos} exceeds {}",
            i32::MAX
        );
        Self {
            target_pos: target_pos as u32,
            query_pos: query_pos as i32,
            target_freq: target_freq as u8,
        }
    }

    pub fn is_unique(&self) -> bool {
        self.target_freq == 1
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.query_pos, self.target_pos, self.target_freq
        )
    }
}

/// Matches sorted by target position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Matches(Vec<Match>);

impl Matches {
    /// Sorts the matches by target position (then query position).
    pub fn from_unsorted(mut matches: Vec<Match>) -> Self {
        matches.sort_unstable_by_key(|m| (m.target_pos, m.query_pos));
        Self(matches)
    }

    pub fn into_inner(self) -> Vec<Match> {
        self.0
    }
}

impl Deref for Matches {
    type Target = [Match];

    fn deref(&self) -> &[Match] {
        &self.0
    }
}

impl IntoIterator for Matches {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// One line per match, `query_pos<TAB>target_pos<TAB>target_freq`, skipping matches within
/// [`DEBUG_MIN_TARGET_GAP`] bases of the last printed target position (initially zero).
impl fmt::Display for Matches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prev_pos = 0;
        for m in &self.0 {
            if m.target_pos.saturating_sub(prev_pos) > DEBUG_MIN_TARGET_GAP {
                writeln!(f, "{m}")?;
                prev_pos = m.target_pos;
            }
        }
        Ok(())
    }
}

/// The strand of the query that is matched.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub const BOTH: [Strand; 2] = [Strand::Forward, Strand::Reverse];
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Pushes one match per target position of the k-mer, if the target has it.
fn push_target_matches(
    target_index: &KmerIndex,
    hash: u64,
    query_pos: usize,
    matches: &mut Vec<Match>,
) {
    if let Some(target_positions) = target_index.get(&hash) {
        let target_freq = target_positions.len();
        for &target_pos in target_positions {
            matches.push(Match::new(target_pos, query_pos, target_freq));
        }
    }
}

/// Matches every k-mer occurring at most `max_rare_cnt_query` times in the query against the
/// target index.
pub fn exact_matches(
    target_index: &KmerIndex,
    query: &[u8],
    hasher: &RollingHash,
    max_rare_cnt_query: usize,
) -> Matches {
    let query_index = get_rare_kmers(query, hasher, max_rare_cnt_query);
    let mut matches = Vec::new();
    for (hash, query_positions) in &query_index {
        for &query_pos in query_positions {
            push_target_matches(target_index, *hash, query_pos, &mut matches);
        }
    }
    Matches::from_unsorted(matches)
}

/// Streams the query's k-mers against the target index, skipping those that a Bloom filter
/// flags as repeated within the query.  A false positive in the filter can only drop a seed.
pub fn approximate_matches(
    target_index: &KmerIndex,
    query: &[u8],
    hasher: &RollingHash,
    false_positive_probability: f64,
) -> Matches {
    if query.len() < hasher.k() {
        return Matches::default();
    }
    let repetitive = repetitive_kmers(query, hasher, false_positive_probability);
    let mut matches = Vec::new();
    for kmer in hasher.kmers(query) {
        if !repetitive.contains(kmer.fhash) {
            push_target_matches(target_index, kmer.fhash, kmer.pos, &mut matches);
        }
    }
    Matches::from_unsorted(matches)
}

/// Finds the matches of the given strand of the query against the target index.
pub fn get_matches(
    target_index: &KmerIndex,
    query: &Contig,
    strand: Strand,
    hasher: &RollingHash,
    opts: &Options,
) -> Matches {
    let revcomp;
    let seq = match strand {
        Strand::Forward => &query.seq,
        Strand::Reverse => {
            revcomp = query.reverse_complement();
            &revcomp.seq
        }
    };
    match opts.strategy() {
        Strategy::Exact => exact_matches(target_index, seq, hasher, *opts.max_rare_cnt_query()),
        Strategy::Approximate => approximate_matches(
            target_index,
            seq,
            hasher,
            *opts.false_positive_probability(),
        ),
    }
}

/// The matches of one strand of a query against one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryMatches {
    pub target_idx: usize,
    pub strand: Strand,
    pub matches: Matches,
}

/// Finds the matches of both strands of the query against every target, keeping those that are
/// not empty.  Ordered by target then strand.
pub fn find_all_matches(
    kmer_indexes: &KmerIndexes,
    query: &Contig,
    hasher: &RollingHash,
    opts: &Options,
) -> Vec<QueryMatches> {
    let mut results = Vec::new();
    for (target_idx, target_index) in kmer_indexes.iter().enumerate() {
        for strand in Strand::BOTH {
            let matches = get_matches(target_index, query, strand, hasher, opts);
            if !matches.is_empty() {
                results.push(QueryMatches {
                    target_idx,
                    strand,
                    matches,
                });
            }
        }
    }
    results
}

#[cfg(test)]
pub mod tests {
    use rstest::rstest;

    use super::{
        approximate_matches, exact_matches, find_all_matches, get_matches, Match, Matches,
        Strand,
    };
    use crate::{
        hash::{RollingHash, DEFAULT_HASH_BASE},
        index::{approx::tests::random_seq, get_rare_kmers, Builder, KmerIndex, Strategy},
        util::{contig::Contig, dna::reverse_complement},
    };

    fn is_sorted(matches: &Matches) -> bool {
        matches
            .windows(2)
            .all(|w| w[0].target_pos <= w[1].target_pos)
    }

    #[rstest]
    #[case(Strategy::Exact)]
    #[case(Strategy::Approximate)]
    fn test_end_to_end(#[case] strategy: Strategy) {
        let opts = Builder::default()
            .k(4)
            .strategy(strategy)
            .build()
            .unwrap();
        let hasher = opts.hasher();
        let target_index = get_rare_kmers(b"ACGTACGTTT", &hasher, 2);
        let query = Contig::new("q", b"ACGT");
        let matches = get_matches(&target_index, &query, Strand::Forward, &hasher, &opts);
        assert_eq!(
            matches.to_vec(),
            vec![
                Match {
                    target_pos: 0,
                    query_pos: 0,
                    target_freq: 2
                },
                Match {
                    target_pos: 4,
                    query_pos: 0,
                    target_freq: 2
                },
            ]
        );
    }

    #[rstest]
    #[case(Strategy::Exact)]
    #[case(Strategy::Approximate)]
    fn test_shared_kmer_in_unique_target(#[case] strategy: Strategy) {
        let target = random_seq(1_000, 3);
        let hasher = RollingHash::new(15, DEFAULT_HASH_BASE);
        let target_index = get_rare_kmers(&target, &hasher, 1);
        let mut query = random_seq(200, 4);
        query.splice(50..50, target[600..615].iter().copied());
        let opts = Builder::default().k(15).strategy(strategy).build().unwrap();
        let matches = get_matches(
            &target_index,
            &Contig::new("q", &query),
            Strand::Forward,
            &hasher,
            &opts,
        );
        assert!(matches.contains(&Match {
            target_pos: 600,
            query_pos: 50,
            target_freq: 1
        }));
        assert!(matches.iter().all(Match::is_unique));
    }

    #[test]
    fn test_reverse_strand() {
        let hasher = RollingHash::new(5, DEFAULT_HASH_BASE);
        let target = b"AACCGGTTACAGT";
        let target_index = get_rare_kmers(target, &hasher, 1);
        let query = Contig::new("q", &reverse_complement(&target[3..11]));
        let opts = Builder::default()
            .k(5)
            .strategy(Strategy::Exact)
            .build()
            .unwrap();
        let forward = get_matches(&target_index, &query, Strand::Forward, &hasher, &opts);
        let reverse = get_matches(&target_index, &query, Strand::Reverse, &hasher, &opts);
        assert!(forward.iter().all(|m| !reverse.contains(m)));
        let positions: Vec<(u32, i32)> = reverse
            .iter()
            .map(|m| (m.target_pos, m.query_pos))
            .collect();
        assert_eq!(positions, vec![(3, 0), (4, 1), (5, 2), (6, 3)]);
    }

    #[test]
    fn test_short_query_is_empty() {
        let hasher = RollingHash::new(4, DEFAULT_HASH_BASE);
        let target_index = get_rare_kmers(b"ACGTACGTTT", &hasher, 2);
        assert!(approximate_matches(&target_index, b"ACG", &hasher, 0.01).is_empty());
        assert!(exact_matches(&target_index, b"ACG", &hasher, 1).is_empty());
    }

    #[test]
    fn test_exact_skips_repeated_query_kmers() {
        let hasher = RollingHash::new(4, DEFAULT_HASH_BASE);
        let target_index = get_rare_kmers(b"ACGTACGTTT", &hasher, 2);
        // GTTT twice in the query
        let matches = exact_matches(&target_index, b"GTTTAGTTT", &hasher, 1);
        assert!(matches.is_empty());
        let matches = exact_matches(&target_index, b"GTTTAGTTT", &hasher, 2);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_approximate_skips_repeated_query_kmers() {
        let hasher = RollingHash::new(4, DEFAULT_HASH_BASE);
        let target_index = get_rare_kmers(b"ACGTACGTTT", &hasher, 2);
        let matches = approximate_matches(&target_index, b"GTTTAGTTTCGTT", &hasher, 0.0001);
        // GTTT is repeated in the query, CGTT is not
        assert!(matches.iter().all(|m| m.query_pos != 0 && m.query_pos != 5));
        assert!(matches.contains(&Match {
            target_pos: 5,
            query_pos: 9,
            target_freq: 1
        }));
    }

    #[rstest]
    #[case(Strategy::Exact, 1)]
    #[case(Strategy::Approximate, 2)]
    #[case(Strategy::Approximate, 3)]
    fn test_sorted_and_present_in_target(#[case] strategy: Strategy, #[case] seed: u64) {
        let hasher = RollingHash::new(6, DEFAULT_HASH_BASE);
        let target = random_seq(3_000, seed);
        let target_index = get_rare_kmers(&target, &hasher, 4);
        let query = Contig::new("q", &random_seq(500, seed + 100));
        let opts = Builder::default().k(6).strategy(strategy).build().unwrap();
        for strand in Strand::BOTH {
            let matches = get_matches(&target_index, &query, strand, &hasher, &opts);
            assert!(!matches.is_empty());
            assert!(is_sorted(&matches));
            let seq = match strand {
                Strand::Forward => query.seq.clone(),
                Strand::Reverse => reverse_complement(&query.seq),
            };
            for m in matches.iter() {
                let target_pos = m.target_pos as usize;
                let query_pos = m.query_pos as usize;
                let hash = hasher.fhash(&seq, query_pos);
                let positions = target_index.get(&hash).unwrap();
                assert!(positions.contains(&target_pos));
                assert_eq!(positions.len(), m.target_freq as usize);
                assert_eq!(target[target_pos..target_pos + 6], seq[query_pos..query_pos + 6]);
            }
        }
    }

    #[test]
    #[should_panic(expected = "exceeds 255")]
    fn test_target_freq_overflow() {
        let hasher = RollingHash::new(1, DEFAULT_HASH_BASE);
        let target_index = get_rare_kmers(&[b'A'; 300], &hasher, 1_000);
        exact_matches(&target_index, b"A", &hasher, 1);
    }

    #[rstest]
    #[case(i32::MAX as usize + 1, 0)]
    #[case(0, i32::MAX as usize + 1)]
    #[should_panic(expected = "exceeds")]
    fn test_position_overflow(#[case] target_pos: usize, #[case] query_pos: usize) {
        Match::new(target_pos, query_pos, 1);
    }

    #[test]
    fn test_max_positions() {
        let m = Match::new(i32::MAX as usize, i32::MAX as usize, u8::MAX as usize);
        assert_eq!(m.target_pos, i32::MAX as u32);
        assert_eq!(m.query_pos, i32::MAX);
        assert_eq!(m.target_freq, u8::MAX);
    }

    #[test]
    fn test_display() {
        let matches = Matches::from_unsorted(vec![
            Match::new(30, 2, 1),
            Match::new(5, 0, 1),
            Match::new(12, 1, 2),
            Match::new(20, 3, 1),
            Match::new(35, 4, 1),
        ]);
        assert!(is_sorted(&matches));
        assert_eq!(matches.to_string(), "1\t12\t2\n2\t30\t1\n");
        assert_eq!(Match::new(7, 3, 1).to_string(), "3\t7\t1");
    }

    #[test]
    fn test_find_all_matches() {
        let opts = Builder::default()
            .k(4)
            .strategy(Strategy::Exact)
            .build()
            .unwrap();
        let hasher = opts.hasher();
        let indexes: Vec<KmerIndex> = vec![
            get_rare_kmers(b"GGGGGGGG", &hasher, 1),
            get_rare_kmers(b"ACGTTGCA", &hasher, 1),
        ];
        let query = Contig::new("q", b"CGTTG");
        let results = find_all_matches(&indexes, &query, &hasher, &opts);
        assert!(results.iter().all(|r| r.target_idx == 1));
        assert_eq!(results[0].strand, Strand::Forward);
        assert_eq!(results[0].matches.len(), 2);
    }
}
