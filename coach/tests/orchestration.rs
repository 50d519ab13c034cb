//! Run-level tests for the feedback orchestration loop.
//!
//! These drive `Orchestrator::run` end to end over scripted collaborators and
//! check the path taken, the number of generation attempts, and the terminal
//! result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use coach::agents::generator::LlmFeedbackGenerator;
use coach::agents::verifier::LlmVerifier;
use coach::agents::{FeedbackGenerator, GapAndPlan};
use coach::core::machine::Stage;
use coach::core::plan::{FALLBACK_WEEK, PlanDocument};
use coach::core::retry::RetryPolicy;
use coach::core::types::{EvaluationInput, FailReason, FeedbackResult};
use coach::core::verdict::Verdict;
use coach::io::config::{CoachConfig, load_config};
use coach::orchestrate::{InvalidInputError, LlmOrchestrator, Orchestrator};
use coach::test_support::{
    ScriptedGenerator, ScriptedLlm, ScriptedVerifier, TempConfig, VerifyCall, gap_and_plan, input,
    orchestrator, plan_json,
};

/// Both scores High with a passing verifier: one simple generation, one
/// verification, simple result.
#[tokio::test]
async fn both_high_resolves_to_simple() {
    let run = orchestrator(
        ScriptedGenerator::simple("정량적 성과를 한 줄 추가하세요."),
        ScriptedVerifier::always_pass(),
    );

    let outcome = run
        .run(input(50, 45), &CancellationToken::new())
        .await
        .expect("run");

    match &outcome.result {
        FeedbackResult::Simple { suggestion, .. } => assert!(!suggestion.is_empty()),
        other => panic!("expected simple, got {other:?}"),
    }
    assert_eq!(
        outcome.trace,
        vec![
            Stage::Init,
            Stage::Route,
            Stage::SimpleGenerate,
            Stage::SimpleVerify,
            Stage::SimpleSuccess,
        ]
    );
    let json = serde_json::to_value(&outcome.result).expect("ser");
    assert_eq!(json["type"], "simple");
}

/// Simple branch never retries: a rejected suggestion fails after one attempt.
#[tokio::test]
async fn simple_branch_fails_fast() {
    let run = orchestrator(
        ScriptedGenerator::simple("짧은 조언"),
        ScriptedVerifier::always_fail(),
    );

    let outcome = run
        .run(input(90, 40), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 1);
    assert_eq!(run.generator().simple_calls(), 1);
    assert_eq!(run.generator().full_calls(), 0);
    assert_eq!(run.verifier().calls().len(), 1);
    match &outcome.result {
        FeedbackResult::Fail {
            reason,
            gap_text,
            plan_text,
            ..
        } => {
            assert_eq!(*reason, FailReason::SimpleRejected);
            assert!(gap_text.is_none());
            assert!(plan_text.is_none());
        }
        other => panic!("expected fail, got {other:?}"),
    }
}

/// A Simple generation error is reported as such, not as a rejected draft.
#[tokio::test]
async fn simple_generation_error_fails_without_verification() {
    let run = orchestrator(
        ScriptedGenerator::new(vec![Err("upstream 503".to_string())], Vec::new()),
        ScriptedVerifier::always_pass(),
    );

    let outcome = run
        .run(input(45, 45), &CancellationToken::new())
        .await
        .expect("run");

    assert!(run.verifier().calls().is_empty());
    assert_eq!(run.generator().full_calls(), 0);
    match outcome.result {
        FeedbackResult::Fail {
            reason, message, ..
        } => {
            assert_eq!(reason, FailReason::GenerationFailed);
            assert_eq!(message, FailReason::GenerationFailed.message());
        }
        other => panic!("expected fail, got {other:?}"),
    }
}

/// Simple verification sees the suggestion with an empty second candidate.
#[tokio::test]
async fn simple_verification_receives_suggestion_only() {
    let run = orchestrator(
        ScriptedGenerator::simple("조언"),
        ScriptedVerifier::always_pass(),
    );

    run.run(input(45, 45), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(
        run.verifier().calls(),
        vec![VerifyCall {
            candidate: "조언".to_string(),
            supplement: String::new(),
        }]
    );
    assert_eq!(run.generator().full_calls(), 0);
}

/// Full verification sees the gap text and the raw plan text.
#[tokio::test]
async fn full_verification_receives_gap_and_plan() {
    let run = orchestrator(
        ScriptedGenerator::full(vec![Ok(gap_and_plan("gap", &plan_json()))]),
        ScriptedVerifier::always_pass(),
    );

    run.run(input(39, 40), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(
        run.verifier().calls(),
        vec![VerifyCall {
            candidate: "gap".to_string(),
            supplement: plan_json(),
        }]
    );
    assert_eq!(run.generator().simple_calls(), 0);
}

/// Passing on the first verification means exactly one Full attempt.
#[tokio::test]
async fn full_branch_early_success() {
    let run = orchestrator(
        ScriptedGenerator::full(vec![Ok(gap_and_plan("- 협업 경험 부족", &plan_json()))]),
        ScriptedVerifier::always_pass(),
    );

    let outcome = run
        .run(input(30, 30), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 1);
    match &outcome.result {
        FeedbackResult::Full { gap_text, plan, .. } => {
            assert_eq!(gap_text, "- 협업 경험 부족");
            assert_eq!(plan.weeks.len(), 2);
            assert_eq!(plan.weeks[1].focus, "협업");
        }
        other => panic!("expected full, got {other:?}"),
    }
    assert_eq!(outcome.trace.last(), Some(&Stage::FullSuccess));
}

/// A verifier that always rejects forces 1 + 2 attempts, then Fail with the
/// last attempt's text.
#[tokio::test]
async fn full_branch_exhausts_retries() {
    let generator = ScriptedGenerator::full(vec![
        Ok(gap_and_plan("gap-1", "plan-1")),
        Ok(gap_and_plan("gap-2", "plan-2")),
        Ok(gap_and_plan("gap-3", "plan-3")),
    ]);
    let run = orchestrator(generator, ScriptedVerifier::always_fail());

    let outcome = run
        .run(input(10, 10), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 3);
    assert_eq!(run.generator().full_calls(), 3);
    assert_eq!(run.verifier().calls().len(), 3);
    assert_eq!(
        outcome.trace,
        vec![
            Stage::Init,
            Stage::Route,
            Stage::FullGenerate,
            Stage::FullVerify,
            Stage::RetryCheck,
            Stage::FullGenerate,
            Stage::FullVerify,
            Stage::RetryCheck,
            Stage::FullGenerate,
            Stage::FullVerify,
            Stage::RetryCheck,
            Stage::Fail,
        ]
    );
    match outcome.result {
        FeedbackResult::Fail {
            reason,
            gap_text,
            plan_text,
            message,
        } => {
            assert_eq!(reason, FailReason::RetriesExhausted);
            assert_eq!(gap_text.as_deref(), Some("gap-3"));
            assert_eq!(plan_text.as_deref(), Some("plan-3"));
            assert_eq!(message, FailReason::RetriesExhausted.message());
        }
        other => panic!("expected fail, got {other:?}"),
    }
}

/// Retry uses fresh output: the second attempt passes and replaces the first.
#[tokio::test]
async fn full_branch_succeeds_on_retry() {
    let generator = ScriptedGenerator::full(vec![
        Ok(gap_and_plan("gap-1", "not a plan")),
        Ok(gap_and_plan("gap-2", &plan_json())),
    ]);
    let verifier = ScriptedVerifier::new(vec![Verdict::fail("약함"), Verdict::pass("좋음")]);
    let run = orchestrator(generator, verifier);

    let outcome = run
        .run(input(24, 39), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 2);
    match outcome.result {
        FeedbackResult::Full { gap_text, plan, .. } => {
            assert_eq!(gap_text, "gap-2");
            assert_eq!(plan.weeks[0].week, "1주차");
        }
        other => panic!("expected full, got {other:?}"),
    }
}

/// Low resume routes Full even when the self-introduction is High.
#[tokio::test]
async fn low_high_routes_full() {
    let generator = ScriptedGenerator::full(vec![Ok(gap_and_plan("gap", &plan_json()))]);
    let run = orchestrator(generator, ScriptedVerifier::always_pass());

    let outcome = run
        .run(input(20, 60), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.trace[2], Stage::FullGenerate);
    assert_eq!(outcome.result.kind(), "full");
}

/// Unstructured plan text reaches the caller as a single fallback week.
#[tokio::test]
async fn unstructured_plan_uses_fallback_week() {
    let raw = "1주차에는 SQL을 복습하고 2주차에는 배포를 연습하세요.";
    let generator = ScriptedGenerator::full(vec![Ok(gap_and_plan("gap", raw))]);
    let run = orchestrator(generator, ScriptedVerifier::always_pass());

    let outcome = run
        .run(input(0, 0), &CancellationToken::new())
        .await
        .expect("run");

    match outcome.result {
        FeedbackResult::Full { plan, .. } => {
            assert_eq!(plan, PlanDocument::fallback(raw));
            assert_eq!(plan.weeks[0].week, FALLBACK_WEEK);
        }
        other => panic!("expected full, got {other:?}"),
    }
}

/// Generation errors count as attempts and skip verification.
#[tokio::test]
async fn generation_errors_are_absorbed_into_retries() {
    let generator = ScriptedGenerator::full(vec![
        Err("upstream 503".to_string()),
        Ok(gap_and_plan("gap", &plan_json())),
    ]);
    let run = orchestrator(generator, ScriptedVerifier::always_pass());

    let outcome = run
        .run(input(10, 60), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 2);
    assert_eq!(run.verifier().calls().len(), 1);
    assert_eq!(outcome.result.kind(), "full");
}

/// Every attempt erroring ends in Fail without partial text.
#[tokio::test]
async fn persistent_generation_errors_fail_without_partials() {
    let generator = ScriptedGenerator::full(vec![Err("timeout".to_string())]);
    let run = orchestrator(generator, ScriptedVerifier::always_pass());

    let outcome = run
        .run(input(10, 10), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 3);
    match outcome.result {
        FeedbackResult::Fail {
            reason,
            gap_text,
            plan_text,
            ..
        } => {
            assert_eq!(reason, FailReason::RetriesExhausted);
            assert!(gap_text.is_none());
            assert!(plan_text.is_none());
        }
        other => panic!("expected fail, got {other:?}"),
    }
}

/// Empty evaluation text is rejected before any collaborator is called.
#[tokio::test]
async fn blank_input_is_a_precondition_error() {
    let run = orchestrator(
        ScriptedGenerator::simple("unused"),
        ScriptedVerifier::always_pass(),
    );

    let err = run
        .run(
            EvaluationInput::new("  ", "자기소개서 평가", 50, 50),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let invalid = err
        .downcast_ref::<InvalidInputError>()
        .expect("invalid input error");
    assert_eq!(invalid.field, "resume evaluation");
    assert_eq!(run.generator().simple_calls(), 0);
    assert!(run.verifier().calls().is_empty());
}

/// A cancelled token resolves the run to Fail instead of hanging.
#[tokio::test]
async fn cancellation_resolves_to_fail() {
    let run = orchestrator(
        ScriptedGenerator::full(vec![Ok(gap_and_plan("gap", "plan"))])
            .with_delay(Duration::from_secs(3600)),
        ScriptedVerifier::always_pass(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = run.run(input(10, 10), &cancel).await.expect("run");

    match outcome.result {
        FeedbackResult::Fail { reason, .. } => assert_eq!(reason, FailReason::Cancelled),
        other => panic!("expected fail, got {other:?}"),
    }
    assert_eq!(outcome.trace.last(), Some(&Stage::Fail));
}

/// The overall deadline bounds a run whose collaborators never return in time.
#[tokio::test(start_paused = true)]
async fn deadline_resolves_to_fail() {
    let run = Orchestrator::new(
        ScriptedGenerator::full(vec![Ok(gap_and_plan("gap", "plan"))])
            .with_delay(Duration::from_secs(120)),
        ScriptedVerifier::always_fail(),
        RetryPolicy::default(),
        Duration::from_secs(300),
    );

    let outcome = run
        .run(input(10, 10), &CancellationToken::new())
        .await
        .expect("run");

    match &outcome.result {
        FeedbackResult::Fail {
            reason, gap_text, ..
        } => {
            assert_eq!(*reason, FailReason::TimedOut);
            // Two attempts completed before the deadline hit the third.
            assert_eq!(gap_text.as_deref(), Some("gap"));
        }
        other => panic!("expected fail, got {other:?}"),
    }
    assert_eq!(outcome.generation_attempts(), 3);
}

struct PanickingGenerator;

#[async_trait]
impl FeedbackGenerator for PanickingGenerator {
    async fn generate_simple_feedback(&self, _: &str, _: &str) -> Result<String> {
        panic!("simple generator blew up");
    }

    async fn generate_gap_and_plan(&self, _: &str, _: &str) -> Result<GapAndPlan> {
        panic!("full generator blew up");
    }
}

/// A panicking collaborator resolves to an internal failure.
#[tokio::test]
async fn collaborator_panic_resolves_to_internal_fail() {
    let run = Orchestrator::new(
        PanickingGenerator,
        ScriptedVerifier::always_pass(),
        RetryPolicy::default(),
        Duration::from_secs(60),
    );

    let outcome = run
        .run(input(10, 10), &CancellationToken::new())
        .await
        .expect("run");

    match outcome.result {
        FeedbackResult::Fail { reason, .. } => assert_eq!(reason, FailReason::Internal),
        other => panic!("expected fail, got {other:?}"),
    }
    assert!(run.verifier().calls().is_empty());
}

/// The configured bound and deadline flow into the LLM-backed orchestrator.
#[test]
fn config_drives_retry_bound_and_deadline() {
    let written = TempConfig::new(&CoachConfig {
        max_retries: 1,
        ..CoachConfig::default()
    })
    .expect("config");
    let cfg = load_config(&written.path).expect("load");

    let run = LlmOrchestrator::from_config(&cfg).expect("orchestrator");

    assert_eq!(run.policy(), RetryPolicy::new(1));
    assert_eq!(run.deadline(), Duration::from_secs(2 * (2 * 60 + 30)));
}

/// Slow model calls that each stay within their own timeout never trip the
/// overall deadline: every attempt gets to run and be verified.
#[tokio::test(start_paused = true)]
async fn slow_calls_within_budget_exhaust_retries_before_deadline() {
    let cfg = CoachConfig::default();
    let generation_llm = Arc::new(
        ScriptedLlm::new(vec![Ok("모델 응답".to_string())]).with_latency(Duration::from_secs(55)),
    );
    let verification_llm = Arc::new(
        ScriptedLlm::new(vec![Ok(r#"{"verdict":"NO","reason":"근거 부족"}"#.to_string())])
            .with_latency(Duration::from_secs(25)),
    );
    let run = Orchestrator::new(
        LlmFeedbackGenerator::new(generation_llm.clone(), cfg.llm.generation_timeout()),
        LlmVerifier::new(verification_llm.clone(), cfg.llm.verification_timeout()),
        cfg.retry_policy(),
        cfg.run_deadline(),
    );

    let outcome = run
        .run(input(10, 10), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(outcome.generation_attempts(), 3);
    assert_eq!(generation_llm.prompts().len(), 6);
    assert_eq!(verification_llm.prompts().len(), 3);
    match outcome.result {
        FeedbackResult::Fail { reason, .. } => assert_eq!(reason, FailReason::RetriesExhausted),
        other => panic!("expected fail, got {other:?}"),
    }
}
