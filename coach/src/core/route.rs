//! Branch selection from the two classified levels.

use serde::{Deserialize, Serialize};

use crate::core::level::Level;

/// Feedback-generation strategy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    /// Single-shot suggestion, verified once, never retried.
    Simple,
    /// Gap analysis plus learning plan, verified and retried.
    Full,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Simple => "simple",
            Branch::Full => "full",
        }
    }
}

/// `Simple` only when both levels are `High`; every other pairing is `Full`.
pub fn route(resume_level: Level, self_intro_level: Level) -> Branch {
    match (resume_level, self_intro_level) {
        (Level::High, Level::High) => Branch::Simple,
        _ => Branch::Full,
    }
}
