use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A normalized keyword phrase: lowercase, single-spaced, ≤255 chars.
///
/// `Phrase::new` is idempotent — normalizing an already-normalized phrase
/// yields the same phrase (testable property 1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Phrase(String);

impl Phrase {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, &'static str> {
        let normalized = normalize_phrase(raw.as_ref());
        if normalized.is_empty() {
            return Err("phrase must not be empty after normalization");
        }
        if normalized.chars().count() > 255 {
            return Err("phrase must be at most 255 characters");
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn token_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn normalize_phrase(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A bounded score in `[0, 1]`, used for blended scores, cluster scores,
/// quality metrics and similarity values alike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score(f32);

impl Score {
    pub fn new(value: f32) -> Result<Self, &'static str> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err("score must be a finite value in [0, 1]")
        }
    }

    /// Constructs a Score by clamping an out-of-range value instead of rejecting it.
    /// Used at the end of weighted-sum computations where float drift can push
    /// a couple ULPs past the boundary.
    pub fn clamped(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::zero()
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl Eq for Score {}
impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A cosine similarity value in `[-1, 1]`, generally `[0, 1]` in practice
/// for normalized embedding vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity(f32);

impl Similarity {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(-1.0, 1.0))
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl Eq for Similarity {}
impl PartialOrd for Similarity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Similarity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_normalization_is_idempotent() {
        let once = Phrase::new("  Social   Selling Tools  ").unwrap();
        let twice = Phrase::new(once.as_str()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.as_str(), "social selling tools");
    }

    #[test]
    fn phrase_rejects_overlong_input() {
        let long = "x".repeat(300);
        assert!(Phrase::new(long).is_err());
    }

    #[test]
    fn score_rejects_out_of_range() {
        assert!(Score::new(1.5).is_err());
        assert!(Score::new(-0.1).is_err());
        assert!(Score::new(0.5).is_ok());
    }

    #[test]
    fn score_clamps_float_drift() {
        assert_eq!(Score::clamped(1.0000001).value(), 1.0);
        assert_eq!(Score::clamped(-0.0000001).value(), 0.0);
    }
}
