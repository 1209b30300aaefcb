//! Alpha census buckets and the non-letter token

/// Letter the summary endpoint uses for items not starting with a letter
pub const NON_LETTER_ALPHA: &str = "#";

/// Query-safe form of [`NON_LETTER_ALPHA`]
pub const NON_LETTER_TOKEN: &str = "%23";

/// Item count reported for one first-letter bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaBucket {
    /// Letter, or [`NON_LETTER_TOKEN`]
    pub alpha: String,
    /// Always greater than zero
    pub count: u64,
}

/// Per-category item counts, one entry per non-empty bucket
///
/// Buckets keep the order in which the summary endpoint reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlphaCensus {
    buckets: Vec<AlphaBucket>,
}

impl AlphaCensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bucket, normalizing its token and dropping it when empty
    ///
    /// A letter reported twice keeps its first position and the later count.
    pub fn insert(&mut self, alpha: &str, count: u64) {
        if count == 0 {
            return;
        }

        let alpha = normalize_alpha(alpha);
        match self.buckets.iter_mut().find(|b| b.alpha == alpha) {
            Some(existing) => existing.count = count,
            None => self.buckets.push(AlphaBucket { alpha, count }),
        }
    }

    pub fn buckets(&self) -> &[AlphaBucket] {
        &self.buckets
    }

    /// Count reported for `alpha`, if that bucket is non-empty
    pub fn get(&self, alpha: &str) -> Option<u64> {
        self.buckets
            .iter()
            .find(|b| b.alpha == alpha)
            .map(|b| b.count)
    }

    /// Sum of all bucket counts
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

fn normalize_alpha(alpha: &str) -> String {
    if alpha == NON_LETTER_ALPHA {
        NON_LETTER_TOKEN.to_string()
    } else {
        alpha.to_string()
    }
}
