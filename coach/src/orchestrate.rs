//! Orchestration of a single feedback run.
//!
//! A run walks the [`Stage`] machine: classify once, route, generate, verify,
//! and either finish or regenerate within the retry bound. Collaborator
//! failures become failing verdicts, so the only error a caller can observe is
//! an [`InvalidInputError`]. Cancellation, the overall deadline, and panics
//! inside the run all resolve to [`FeedbackResult::Fail`].

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::agents::generator::LlmFeedbackGenerator;
use crate::agents::verifier::LlmVerifier;
use crate::agents::{FeedbackGenerator, GapAndPlan, Verifier};
use crate::core::machine::{Stage, advance, fail_reason};
use crate::core::plan::{PlanDocument, try_parse_plan};
use crate::core::retry::RetryPolicy;
use crate::core::route::route;
use crate::core::types::{EvaluationInput, FailReason, FeedbackResult, RunState};
use crate::core::verdict::Verdict;
use crate::io::config::CoachConfig;
use crate::io::llm::ChatClient;

/// Precondition violation detected before any generation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidInputError {
    pub field: &'static str,
}

impl fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} must be non-empty", self.field)
    }
}

impl std::error::Error for InvalidInputError {}

/// Everything a finished run reports back.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub result: FeedbackResult,
    /// Stages entered, in order, starting at `Init`.
    pub trace: Vec<Stage>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Number of generation attempts made across both branches.
    pub fn generation_attempts(&self) -> usize {
        self.trace
            .iter()
            .filter(|stage| matches!(stage, Stage::SimpleGenerate | Stage::FullGenerate))
            .count()
    }
}

/// Orchestrator wired to the OpenAI-compatible chat backend.
pub type LlmOrchestrator =
    Orchestrator<LlmFeedbackGenerator<ChatClient>, LlmVerifier<ChatClient>>;

/// Drives runs against injected collaborators. Holds no per-run state, so one
/// instance may serve concurrent runs.
pub struct Orchestrator<G, V> {
    generator: G,
    verifier: V,
    policy: RetryPolicy,
    deadline: Duration,
}

impl<G: FeedbackGenerator, V: Verifier> Orchestrator<G, V> {
    pub fn new(generator: G, verifier: V, policy: RetryPolicy, deadline: Duration) -> Self {
        Self {
            generator,
            verifier,
            policy,
            deadline,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Run one request to its terminal result.
    ///
    /// Returns `Err` only for an [`InvalidInputError`] at `Init`.
    #[instrument(
        skip_all,
        fields(resume_score = input.resume_score, self_intro_score = input.self_intro_score)
    )]
    pub async fn run(
        &self,
        input: EvaluationInput,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        let mut state = init_state(input)?;
        let mut trace = vec![Stage::Init];

        let finished = {
            let work = AssertUnwindSafe(self.drive(&mut state, &mut trace)).catch_unwind();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FailReason::Cancelled),
                _ = tokio::time::sleep(self.deadline) => Err(FailReason::TimedOut),
                outcome = work => outcome.map_err(|_| FailReason::Internal),
            }
        };

        let result = match finished {
            Ok(result) => result,
            Err(reason) => {
                warn!(
                    reason = reason.as_str(),
                    retry_count = state.retry_count,
                    "run interrupted"
                );
                trace.push(Stage::Fail);
                FeedbackResult::fail(reason, &state.gap_text, &state.plan_text)
            }
        };

        let elapsed = start.elapsed();
        info!(
            result = result.kind(),
            elapsed_ms = elapsed.as_millis() as u64,
            retry_count = state.retry_count,
            "run finished"
        );
        Ok(RunOutcome {
            result,
            trace,
            elapsed,
        })
    }

    async fn drive(&self, state: &mut RunState, trace: &mut Vec<Stage>) -> FeedbackResult {
        let mut previous = Stage::Init;
        let mut stage = Stage::Init;
        while !stage.is_terminal() {
            debug!(stage = stage.as_str(), retry_count = state.retry_count, "entering stage");
            match stage {
                Stage::Init => info!(
                    resume_level = state.resume_level.as_str(),
                    self_intro_level = state.self_intro_level.as_str(),
                    "levels classified"
                ),
                Stage::Route => info!(
                    branch = route(state.resume_level, state.self_intro_level).as_str(),
                    "branch selected"
                ),
                Stage::SimpleGenerate => self.simple_generate(state).await,
                Stage::SimpleVerify => {
                    if state.verdict.is_none() {
                        let verdict = self
                            .verifier
                            .verify(
                                &state.input.resume_eval,
                                &state.input.self_intro_eval,
                                &state.simple_feedback_text,
                                "",
                            )
                            .await;
                        record_verdict(state, verdict);
                    }
                }
                Stage::FullGenerate => self.full_generate(state).await,
                Stage::FullVerify => {
                    if state.verdict.is_none() {
                        let verdict = self
                            .verifier
                            .verify(
                                &state.input.resume_eval,
                                &state.input.self_intro_eval,
                                &state.gap_text,
                                &state.plan_text,
                            )
                            .await;
                        record_verdict(state, verdict);
                    }
                }
                Stage::RetryCheck => info!(
                    retry_count = state.retry_count,
                    max_retries = self.policy.max_retries,
                    retry = self.policy.should_retry(state.retries_used()),
                    "retry check"
                ),
                Stage::SimpleSuccess | Stage::FullSuccess | Stage::Fail => {}
            }

            previous = stage;
            stage = advance(stage, state, self.policy);
            trace.push(stage);
        }

        match stage {
            Stage::SimpleSuccess => FeedbackResult::simple(state.simple_feedback_text.clone()),
            Stage::FullSuccess => {
                let plan = state
                    .plan
                    .clone()
                    .unwrap_or_else(|| PlanDocument::fallback(&state.plan_text));
                FeedbackResult::full(state.gap_text.clone(), plan)
            }
            _ => FeedbackResult::fail(
                fail_reason(previous, state),
                &state.gap_text,
                &state.plan_text,
            ),
        }
    }

    async fn simple_generate(&self, state: &mut RunState) {
        state.verdict = None;
        state.generation_error = None;
        let generated = self
            .generator
            .generate_simple_feedback(&state.input.resume_eval, &state.input.self_intro_eval)
            .await;
        match generated {
            Ok(text) => state.simple_feedback_text = text,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "simple feedback generation failed");
                state.simple_feedback_text.clear();
                record_generation_error(state, &err);
            }
        }
    }

    async fn full_generate(&self, state: &mut RunState) {
        state.verdict = None;
        state.generation_error = None;
        let generated = self
            .generator
            .generate_gap_and_plan(&state.input.resume_eval, &state.input.self_intro_eval)
            .await;
        match generated {
            Ok(GapAndPlan {
                gap_text,
                plan_text,
            }) => {
                let plan = try_parse_plan(&plan_text).unwrap_or_else(|err| {
                    warn!(error = %err, "plan text is not structured, using fallback");
                    PlanDocument::fallback(&plan_text)
                });
                state.gap_text = gap_text;
                state.plan_text = plan_text;
                state.plan = Some(plan);
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), attempt = state.retry_count + 1, "gap and plan generation failed");
                state.gap_text.clear();
                state.plan_text.clear();
                state.plan = None;
                record_generation_error(state, &err);
            }
        }
        state.retry_count += 1;
    }
}

impl LlmOrchestrator {
    /// Build an orchestrator from config, sharing one chat client between
    /// generation and verification.
    pub fn from_config(cfg: &CoachConfig) -> Result<Self> {
        cfg.validate()?;
        let llm = Arc::new(ChatClient::new(&cfg.llm)?);
        Ok(Orchestrator::new(
            LlmFeedbackGenerator::new(llm.clone(), cfg.llm.generation_timeout()),
            LlmVerifier::new(llm, cfg.llm.verification_timeout()),
            cfg.retry_policy(),
            cfg.run_deadline(),
        ))
    }
}

/// Validate input and build the run state (the `Init` stage).
pub fn init_state(input: EvaluationInput) -> Result<RunState, InvalidInputError> {
    if input.resume_eval.trim().is_empty() {
        return Err(InvalidInputError {
            field: "resume evaluation",
        });
    }
    if input.self_intro_eval.trim().is_empty() {
        return Err(InvalidInputError {
            field: "self-introduction evaluation",
        });
    }
    Ok(RunState::new(input))
}

fn record_generation_error(state: &mut RunState, err: &anyhow::Error) {
    let message = format!("{err:#}");
    state.verdict = Some(Verdict::fail(format!("generation failed: {message}")));
    state.generation_error = Some(message);
}

fn record_verdict(state: &mut RunState, verdict: Verdict) {
    if verdict.pass {
        info!(reason = %verdict.reason, "verification passed");
    } else {
        warn!(reason = %verdict.reason, retry_count = state.retry_count, "verification failed");
    }
    state.verdict = Some(verdict);
}
