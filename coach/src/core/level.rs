//! Score banding into ordinal levels.

use serde::{Deserialize, Serialize};

/// Lowest score that still counts as [`Level::High`].
pub const HIGH_THRESHOLD: i64 = 40;
/// Lowest score that still counts as [`Level::Mid`].
pub const MID_THRESHOLD: i64 = 25;

/// Ordinal grade of a single evaluation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Mid,
    Low,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Mid => "mid",
            Level::Low => "low",
        }
    }
}

/// Classify a score into its band.
///
/// Total over `i64`: the lower bound of each band is inclusive and anything
/// below [`MID_THRESHOLD`] (negative scores included) is `Low`.
pub fn classify(score: i64) -> Level {
    if score >= HIGH_THRESHOLD {
        Level::High
    } else if score >= MID_THRESHOLD {
        Level::Mid
    } else {
        Level::Low
    }
}
