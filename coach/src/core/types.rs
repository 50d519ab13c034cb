//! Shared deterministic types for the orchestration core.
//!
//! These types define the stable contracts between the state machine, the
//! collaborators, and callers. They carry no I/O.

use serde::{Deserialize, Serialize};

use crate::core::level::{Level, classify};
use crate::core::plan::PlanDocument;
use crate::core::verdict::Verdict;

/// Immutable input to one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationInput {
    #[serde(alias = "resume_eval")]
    pub resume_eval: String,
    #[serde(alias = "selfintro_eval", alias = "self_intro_eval")]
    pub self_intro_eval: String,
    #[serde(alias = "resume_score")]
    pub resume_score: i64,
    #[serde(alias = "selfintro_score", alias = "self_intro_score")]
    pub self_intro_score: i64,
}

impl EvaluationInput {
    pub fn new(
        resume_eval: impl Into<String>,
        self_intro_eval: impl Into<String>,
        resume_score: i64,
        self_intro_score: i64,
    ) -> Self {
        Self {
            resume_eval: resume_eval.into(),
            self_intro_eval: self_intro_eval.into(),
            resume_score,
            self_intro_score,
        }
    }
}

/// Mutable record threaded through a single run.
///
/// Levels are fixed at construction and never reclassified. Generation
/// fields hold the latest attempt only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub input: EvaluationInput,
    pub resume_level: Level,
    pub self_intro_level: Level,
    pub gap_text: String,
    /// Raw plan text exactly as generated.
    pub plan_text: String,
    /// Structured form of `plan_text` (or its fallback) for the latest Full attempt.
    pub plan: Option<PlanDocument>,
    pub simple_feedback_text: String,
    /// Generation attempts made so far on the Full branch.
    pub retry_count: u32,
    pub verdict: Option<Verdict>,
    /// Set when the latest generation call failed, so no draft was verified.
    pub generation_error: Option<String>,
}

impl RunState {
    /// Trim both evaluation texts and classify both scores once.
    pub fn new(input: EvaluationInput) -> Self {
        let input = EvaluationInput {
            resume_eval: input.resume_eval.trim().to_string(),
            self_intro_eval: input.self_intro_eval.trim().to_string(),
            ..input
        };
        Self {
            resume_level: classify(input.resume_score),
            self_intro_level: classify(input.self_intro_score),
            input,
            gap_text: String::new(),
            plan_text: String::new(),
            plan: None,
            simple_feedback_text: String::new(),
            retry_count: 0,
            verdict: None,
            generation_error: None,
        }
    }

    /// Regenerations made after the first Full attempt.
    pub fn retries_used(&self) -> u32 {
        self.retry_count.saturating_sub(1)
    }

    pub fn verdict_passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(|verdict| verdict.pass)
    }
}

/// Why a run ended in [`FeedbackResult::Fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// Every Full attempt was rejected by verification.
    RetriesExhausted,
    /// The single Simple attempt was rejected by verification.
    SimpleRejected,
    /// The single Simple attempt produced no draft to verify.
    GenerationFailed,
    /// The overall run deadline elapsed.
    TimedOut,
    /// The caller cancelled the run.
    Cancelled,
    /// The run hit an unexpected internal fault.
    Internal,
}

impl FailReason {
    /// Fixed user-facing explanation for this outcome.
    pub fn message(self) -> &'static str {
        match self {
            FailReason::RetriesExhausted => {
                "생성된 분석 결과가 반복된 검증을 통과하지 못했습니다. \
                 입력된 평가 결과가 모호하거나, 모델 간 판단이 엇갈렸을 가능성이 있습니다.\n\
                 더 나은 결과를 원하신다면 평가 결과를 구체화하거나, 직접 피드백 요청을 검토해보세요."
            }
            FailReason::SimpleRejected => {
                "간단 피드백이 검증을 통과하지 못했습니다. 평가 결과를 구체화한 뒤 다시 요청해주세요."
            }
            FailReason::GenerationFailed => {
                "피드백을 생성하지 못했습니다. 잠시 후 다시 시도해주세요."
            }
            FailReason::TimedOut => {
                "피드백 생성이 제한 시간 안에 완료되지 않았습니다. 잠시 후 다시 시도해주세요."
            }
            FailReason::Cancelled => "피드백 생성 요청이 취소되었습니다.",
            FailReason::Internal => "피드백 생성 중 내부 오류가 발생했습니다.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailReason::RetriesExhausted => "retries_exhausted",
            FailReason::SimpleRejected => "simple_rejected",
            FailReason::GenerationFailed => "generation_failed",
            FailReason::TimedOut => "timed_out",
            FailReason::Cancelled => "cancelled",
            FailReason::Internal => "internal",
        }
    }
}

/// Fixed copy for a verified simple suggestion.
pub const SIMPLE_MESSAGE: &str = "지원서는 전반적으로 괜찮지만 일부 개선이 가능합니다.";
/// Fixed copy for a verified gap analysis and learning plan.
pub const FULL_MESSAGE: &str = "생성된 개선 분석과 학습 계획이 검증을 통과했습니다.";

/// Terminal outcome of a run. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedbackResult {
    Simple {
        message: String,
        suggestion: String,
    },
    Full {
        message: String,
        #[serde(rename = "gapText")]
        gap_text: String,
        #[serde(rename = "planText")]
        plan: PlanDocument,
    },
    Fail {
        message: String,
        reason: FailReason,
        #[serde(rename = "gapText", default, skip_serializing_if = "Option::is_none")]
        gap_text: Option<String>,
        #[serde(rename = "planText", default, skip_serializing_if = "Option::is_none")]
        plan_text: Option<String>,
    },
}

impl FeedbackResult {
    pub fn simple(suggestion: impl Into<String>) -> Self {
        FeedbackResult::Simple {
            message: SIMPLE_MESSAGE.to_string(),
            suggestion: suggestion.into(),
        }
    }

    pub fn full(gap_text: impl Into<String>, plan: PlanDocument) -> Self {
        FeedbackResult::Full {
            message: FULL_MESSAGE.to_string(),
            gap_text: gap_text.into(),
            plan,
        }
    }

    /// Failure carrying whatever partial Full output exists; empty text is omitted.
    pub fn fail(reason: FailReason, gap_text: &str, plan_text: &str) -> Self {
        let non_empty = |text: &str| (!text.trim().is_empty()).then(|| text.to_string());
        FeedbackResult::Fail {
            message: reason.message().to_string(),
            reason,
            gap_text: non_empty(gap_text),
            plan_text: non_empty(plan_text),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeedbackResult::Simple { .. } => "simple",
            FeedbackResult::Full { .. } => "full",
            FeedbackResult::Fail { .. } => "fail",
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, FeedbackResult::Fail { .. })
    }
}
