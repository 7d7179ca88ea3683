use std::ops::AddAssign;

use serde::Serialize;

/// Edit operations needed to turn a reference into a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ErrorCounts {
    pub insertions: usize,
    pub deletions: usize,
    pub substitutions: usize,
    pub reference_len: usize,
}

impl ErrorCounts {
    pub fn errors(&self) -> usize {
        self.insertions + self.deletions + self.substitutions
    }

    /// Percentage of reference words in error. An empty reference scores 0%
    /// against an empty hypothesis and 100% against anything else.
    pub fn word_error_rate(&self) -> f64 {
        if self.reference_len == 0 {
            return if self.errors() == 0 { 0.0 } else { 100.0 };
        }
        100.0 * self.errors() as f64 / self.reference_len as f64
    }
}

impl AddAssign for ErrorCounts {
    fn add_assign(&mut self, other: Self) {
        self.insertions += other.insertions;
        self.deletions += other.deletions;
        self.substitutions += other.substitutions;
        self.reference_len += other.reference_len;
    }
}

/// Levenshtein alignment of `hypothesis` against `reference`.
///
/// The backtrace prefers match/substitution, then deletion, then insertion,
/// so equal-cost alignments always split the same way.
pub fn evaluate<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> ErrorCounts {
    let n = reference.len();
    let m = hypothesis.len();
    let width = m + 1;
    let mut dp = vec![0usize; (n + 1) * width];
    for i in 0..=n {
        dp[i * width] = i;
    }
    for j in 0..=m {
        dp[j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
            dp[i * width + j] = (dp[(i - 1) * width + j - 1] + cost)
                .min(dp[(i - 1) * width + j] + 1)
                .min(dp[i * width + j - 1] + 1);
        }
    }

    let mut counts = ErrorCounts {
        reference_len: n,
        ..ErrorCounts::default()
    };
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let here = dp[i * width + j];
        if i > 0 && j > 0 {
            let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
            if dp[(i - 1) * width + j - 1] + cost == here {
                counts.substitutions += cost;
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && dp[(i - 1) * width + j] + 1 == here {
            counts.deletions += 1;
            i -= 1;
        } else {
            counts.insertions += 1;
            j -= 1;
        }
    }
    counts
}
