/// A classified unique or rare target k-mer.  Orders by position first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PosHashUniq {
    pub pos: usize,
    pub hash: u64,
    pub is_unique: bool,
}

/// Tracks the fraction of unique k-mers within half a window on either side of the current
/// k-mer, `[pos - window_size / 2, pos + window_size / 2]`, while stepping through a buffer of
/// k-mers sorted by position.
///
/// The same buffer, unmodified, must be passed to every call to [`KmerWindow::inc`] until the next
/// [`KmerWindow::reset`].
#[derive(Clone, Debug)]
pub struct KmerWindow {
    half_window: usize,
    /// Index of the first k-mer in the window
    left: usize,
    /// Index one past the last k-mer in the window
    right: usize,
    /// Index of the k-mer the next call to `inc` centres on
    next: usize,
    num_unique: usize,
}

impl KmerWindow {
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "Window size must be greater than zero");
        Self {
            half_window: window_size / 2,
            left: 0,
            right: 0,
            next: 0,
            num_unique: 0,
        }
    }

    /// Centres the window on the next k-mer of the buffer and returns it.
    pub fn inc(&mut self, kmers: &[PosHashUniq]) -> PosHashUniq {
        let idx = self.next;
        assert!(idx < kmers.len(), "No k-mer left at index {idx}");
        if idx > 0 {
            assert!(
                kmers[idx - 1].pos < kmers[idx].pos,
                "K-mers must be in position order: {} >= {}",
                kmers[idx - 1].pos,
                kmers[idx].pos
            );
        }
        let pos = kmers[idx].pos;
        while self.right < kmers.len() && kmers[self.right].pos <= pos + self.half_window {
            if kmers[self.right].is_unique {
                self.num_unique += 1;
            }
            self.right += 1;
        }
        while kmers[self.left].pos + self.half_window < pos {
            if kmers[self.left].is_unique {
                self.num_unique -= 1;
            }
            self.left += 1;
        }
        self.next += 1;
        kmers[idx]
    }

    /// Skips ahead so that the next call to `inc` centres on the k-mer at `idx`.
    pub fn seek(&mut self, idx: usize) {
        assert!(idx >= self.next, "Cannot seek backwards: {idx} < {}", self.next);
        self.next = idx;
    }

    /// The fraction of k-mers in the window that are unique, or zero when the window is empty.
    pub fn regular_frac(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.num_unique as f64 / self.len() as f64
        }
    }

    /// Index in the buffer of the first k-mer in the window.
    pub fn left(&self) -> usize {
        self.left
    }

    /// Empties the window, to be used with a new buffer starting from its first k-mer.
    pub fn reset(&mut self) {
        self.left = 0;
        self.right = 0;
        self.next = 0;
        self.num_unique = 0;
    }

    pub fn len(&self) -> usize {
        self.right - self.left
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub mod tests {
    use super::{KmerWindow, PosHashUniq};

    fn kmers(items: &[(usize, bool)]) -> Vec<PosHashUniq> {
        items
            .iter()
            .map(|&(pos, is_unique)| PosHashUniq {
                pos,
                hash: pos as u64,
                is_unique,
            })
            .collect()
    }

    fn assert_frac(window: &KmerWindow, expected: f64) {
        assert!(
            (window.regular_frac() - expected).abs() < 1e-12,
            "{} != {expected}",
            window.regular_frac()
        );
    }

    #[test]
    fn test_empty_window() {
        let window = KmerWindow::new(10);
        assert!(window.is_empty());
        assert_frac(&window, 0.0);
    }

    #[test]
    fn test_window_looks_ahead() {
        let mut items = vec![(0, true)];
        items.extend((1..400).map(|pos| (pos, false)));
        let buffer = kmers(&items);
        let mut window = KmerWindow::new(1000);
        assert_eq!(window.inc(&buffer).pos, 0);
        assert_eq!(window.len(), 400);
        assert_frac(&window, 1.0 / 400.0);
    }

    #[test]
    fn test_window_is_centred() {
        let buffer = kmers(&[(0, true), (5, false), (9, false), (10, false), (30, true)]);
        let mut window = KmerWindow::new(10);
        // [0, 5]
        window.inc(&buffer);
        assert_eq!(window.len(), 2);
        assert_frac(&window, 0.5);
        // [0, 10]
        window.inc(&buffer);
        assert_eq!(window.len(), 4);
        assert_frac(&window, 0.25);
        // [4, 14]
        window.inc(&buffer);
        assert_eq!(window.left(), 1);
        assert_eq!(window.len(), 3);
        assert_frac(&window, 0.0);
        // [5, 15]
        window.inc(&buffer);
        assert_eq!(window.len(), 3);
        // [25, 35]
        assert_eq!(window.inc(&buffer).pos, 30);
        assert_eq!(window.left(), 4);
        assert_eq!(window.len(), 1);
        assert_frac(&window, 1.0);
    }

    #[test]
    fn test_single_base_window() {
        let buffer = kmers(&[(0, true), (1, false)]);
        let mut window = KmerWindow::new(1);
        window.inc(&buffer);
        assert_eq!(window.len(), 1);
        assert_frac(&window, 1.0);
        window.inc(&buffer);
        assert_eq!(window.len(), 1);
        assert_frac(&window, 0.0);
    }

    #[test]
    fn test_reset_and_seek() {
        let buffer = kmers(&[(0, true), (5, false), (9, false), (10, false), (30, true)]);
        let mut window = KmerWindow::new(10);
        window.inc(&buffer);
        window.inc(&buffer);
        window.reset();
        assert!(window.is_empty());
        // earlier k-mers within half a window are still counted after seeking
        window.seek(3);
        assert_eq!(window.inc(&buffer).pos, 10);
        assert_eq!(window.left(), 1);
        assert_eq!(window.len(), 3);
        assert_frac(&window, 0.0);
    }

    #[test]
    #[should_panic(expected = "position order")]
    fn test_out_of_order() {
        let buffer = kmers(&[(3, true), (2, true)]);
        let mut window = KmerWindow::new(10);
        window.inc(&buffer);
        window.inc(&buffer);
    }
}
