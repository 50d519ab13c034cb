//! Collaborators the orchestrator delegates text work to.
//!
//! The orchestration core only sees these traits; the LLM-backed
//! implementations live in [`generator`] and [`verifier`], and tests inject
//! scripted doubles.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::verdict::Verdict;

pub mod generator;
pub mod verifier;

/// Output of the two-stage gap analysis + learning plan generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapAndPlan {
    pub gap_text: String,
    /// Plan text as generated, before any structural parsing.
    pub plan_text: String,
}

/// Produces feedback text from the two evaluation texts.
///
/// Failures are returned as values; the orchestrator turns them into a
/// failing verdict instead of aborting the run.
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate_simple_feedback(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
    ) -> Result<String>;

    async fn generate_gap_and_plan(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
    ) -> Result<GapAndPlan>;
}

/// Judges generated feedback against the original evaluations.
///
/// Always resolves to a verdict; transport or parse problems become a
/// failing verdict with the problem as its reason.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
        candidate: &str,
        supplement: &str,
    ) -> Verdict;
}
