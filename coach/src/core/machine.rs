//! Stages of a feedback run and the total transition function between them.
//!
//! Effects (generation, verification) happen when the orchestrator enters a
//! stage; choosing the next stage is pure and depends only on the current
//! stage, the run state, and the retry policy.

use serde::Serialize;

use crate::core::retry::RetryPolicy;
use crate::core::route::{Branch, route};
use crate::core::types::{FailReason, RunState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Route,
    SimpleGenerate,
    SimpleVerify,
    FullGenerate,
    FullVerify,
    RetryCheck,
    SimpleSuccess,
    FullSuccess,
    Fail,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::SimpleSuccess | Stage::FullSuccess | Stage::Fail)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Route => "route",
            Stage::SimpleGenerate => "simple_generate",
            Stage::SimpleVerify => "simple_verify",
            Stage::FullGenerate => "full_generate",
            Stage::FullVerify => "full_verify",
            Stage::RetryCheck => "retry_check",
            Stage::SimpleSuccess => "simple_success",
            Stage::FullSuccess => "full_success",
            Stage::Fail => "fail",
        }
    }
}

/// Next stage after `stage` has run its effects. Terminal stages are absorbing.
pub fn advance(stage: Stage, state: &RunState, policy: RetryPolicy) -> Stage {
    match stage {
        Stage::Init => Stage::Route,
        Stage::Route => match route(state.resume_level, state.self_intro_level) {
            Branch::Simple => Stage::SimpleGenerate,
            Branch::Full => Stage::FullGenerate,
        },
        Stage::SimpleGenerate => Stage::SimpleVerify,
        Stage::SimpleVerify if state.verdict_passed() => Stage::SimpleSuccess,
        Stage::SimpleVerify => Stage::Fail,
        Stage::FullGenerate => Stage::FullVerify,
        Stage::FullVerify if state.verdict_passed() => Stage::FullSuccess,
        Stage::FullVerify => Stage::RetryCheck,
        Stage::RetryCheck if policy.should_retry(state.retries_used()) => Stage::FullGenerate,
        Stage::RetryCheck => Stage::Fail,
        Stage::SimpleSuccess | Stage::FullSuccess | Stage::Fail => stage,
    }
}

/// Failure reason for a run that reached [`Stage::Fail`] from `previous`.
pub fn fail_reason(previous: Stage, state: &RunState) -> FailReason {
    match previous {
        Stage::SimpleVerify if state.generation_error.is_some() => FailReason::GenerationFailed,
        Stage::SimpleVerify => FailReason::SimpleRejected,
        Stage::RetryCheck => FailReason::RetriesExhausted,
        _ => FailReason::Internal,
    }
}
