//! Word probabilities with optional forgetting-curve metadata.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const NOT_A_PROBABILITY: i32 = -1;
pub const NOT_A_VALID_TIMESTAMP: i32 = -1;
/// Upper bound of the probability scale used by every dictionary.
pub const MAX_PROBABILITY: i32 = 255;

/// A probability plus, for history dictionaries, the decay state it was
/// derived from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbabilityInfo {
    pub probability: i32,
    pub timestamp: i32,
    pub level: i32,
    pub count: i32,
}

impl ProbabilityInfo {
    pub const fn new(probability: i32) -> Self {
        Self {
            probability,
            timestamp: NOT_A_VALID_TIMESTAMP,
            level: 0,
            count: 0,
        }
    }

    pub const fn with_history(probability: i32, timestamp: i32, level: i32, count: i32) -> Self {
        Self {
            probability,
            timestamp,
            level,
            count,
        }
    }

    pub fn has_historical_info(&self) -> bool {
        self.timestamp != NOT_A_VALID_TIMESTAMP
    }

    /// Higher-probability of the two; `None` is the identity. Ties keep `a`.
    pub fn max(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(if b.probability > a.probability { b } else { a }),
        }
    }
}

impl PartialEq for ProbabilityInfo {
    fn eq(&self, other: &Self) -> bool {
        if !self.has_historical_info() && !other.has_historical_info() {
            return self.probability == other.probability;
        }
        self.probability == other.probability
            && self.timestamp == other.timestamp
            && self.level == other.level
            && self.count == other.count
    }
}

impl Eq for ProbabilityInfo {}

impl Hash for ProbabilityInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // level and count only participate in equality when historical info
        // is present, in which case timestamps must also match.
        self.probability.hash(state);
        self.timestamp.hash(state);
    }
}

/// A word with its probability: a shortcut target or an n-gram target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightedString {
    pub word: String,
    pub probability_info: ProbabilityInfo,
}

impl WeightedString {
    pub fn new(word: impl Into<String>, probability_info: ProbabilityInfo) -> Self {
        Self {
            word: word.into(),
            probability_info,
        }
    }

    pub fn probability(&self) -> i32 {
        self.probability_info.probability
    }
}
