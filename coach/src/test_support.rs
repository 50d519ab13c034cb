//! Test-only collaborators and input builders.
//!
//! Scripted doubles replay queued responses in order; once a queue is down to
//! its last entry, that entry repeats for every later call. Each double
//! records the calls it received.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tempfile::TempDir;

use crate::agents::{FeedbackGenerator, GapAndPlan, Verifier};
use crate::core::retry::RetryPolicy;
use crate::core::types::EvaluationInput;
use crate::core::verdict::Verdict;
use crate::io::config::{CoachConfig, write_config};
use crate::io::llm::TextGenerator;
use crate::orchestrate::Orchestrator;

/// Deadline generous enough that scripted runs never hit it.
pub const TEST_DEADLINE: Duration = Duration::from_secs(60);

/// Input with non-empty evaluation texts and the given scores.
pub fn input(resume_score: i64, self_intro_score: i64) -> EvaluationInput {
    EvaluationInput::new(
        "이력서: 백엔드 프로젝트 경험은 충분하나 성과 수치가 부족함",
        "자기소개서: 지원 동기는 명확하나 협업 사례가 부족함",
        resume_score,
        self_intro_score,
    )
}

/// Structured plan text the way a well-behaved model returns it.
pub fn plan_json() -> String {
    r#"[{"week":"1주차","focus":"성과 정리","tasks":["프로젝트 지표 정리"]},{"week":"2주차","focus":"협업","tasks":["코드 리뷰 참여"]}]"#
        .to_string()
}

pub fn gap_and_plan(gap_text: &str, plan_text: &str) -> GapAndPlan {
    GapAndPlan {
        gap_text: gap_text.to_string(),
        plan_text: plan_text.to_string(),
    }
}

/// Orchestrator over scripted doubles with the default retry bound.
pub fn orchestrator(
    generator: ScriptedGenerator,
    verifier: ScriptedVerifier,
) -> Orchestrator<ScriptedGenerator, ScriptedVerifier> {
    Orchestrator::new(generator, verifier, RetryPolicy::default(), TEST_DEADLINE)
}

fn next_scripted<T: Clone>(queue: &Mutex<Vec<T>>) -> Option<T> {
    let mut queue = queue.lock().expect("script lock");
    if queue.len() > 1 {
        Some(queue.remove(0))
    } else {
        queue.first().cloned()
    }
}

/// Scripted [`TextGenerator`]; `Err` entries surface as call failures.
pub struct ScriptedLlm {
    replies: Mutex<Vec<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Take `latency` to answer every call. A call whose latency exceeds its
    /// timeout fails once the timeout elapses, like a real backend would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        if let Some(latency) = self.latency {
            if latency > timeout {
                tokio::time::sleep(timeout).await;
                return Err(anyhow!("model call timed out after {}s", timeout.as_secs()));
            }
            tokio::time::sleep(latency).await;
        }
        match next_scripted(&self.replies) {
            Some(Ok(text)) => Ok(text),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Err(anyhow!("no scripted reply")),
        }
    }
}

/// Scripted [`FeedbackGenerator`].
pub struct ScriptedGenerator {
    simple: Mutex<Vec<Result<String, String>>>,
    full: Mutex<Vec<Result<GapAndPlan, String>>>,
    delay: Option<Duration>,
    simple_calls: Mutex<u32>,
    full_calls: Mutex<u32>,
}

impl ScriptedGenerator {
    pub fn new(
        simple: Vec<Result<String, String>>,
        full: Vec<Result<GapAndPlan, String>>,
    ) -> Self {
        Self {
            simple: Mutex::new(simple),
            full: Mutex::new(full),
            delay: None,
            simple_calls: Mutex::new(0),
            full_calls: Mutex::new(0),
        }
    }

    pub fn simple(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())], Vec::new())
    }

    pub fn full(replies: Vec<Result<GapAndPlan, String>>) -> Self {
        Self::new(Vec::new(), replies)
    }

    /// Sleep for `delay` before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn simple_calls(&self) -> u32 {
        *self.simple_calls.lock().expect("calls lock")
    }

    pub fn full_calls(&self) -> u32 {
        *self.full_calls.lock().expect("calls lock")
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl FeedbackGenerator for ScriptedGenerator {
    async fn generate_simple_feedback(
        &self,
        _resume_eval: &str,
        _self_intro_eval: &str,
    ) -> Result<String> {
        *self.simple_calls.lock().expect("calls lock") += 1;
        self.pause().await;
        match next_scripted(&self.simple) {
            Some(Ok(text)) => Ok(text),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Err(anyhow!("no scripted simple feedback")),
        }
    }

    async fn generate_gap_and_plan(
        &self,
        _resume_eval: &str,
        _self_intro_eval: &str,
    ) -> Result<GapAndPlan> {
        *self.full_calls.lock().expect("calls lock") += 1;
        self.pause().await;
        match next_scripted(&self.full) {
            Some(Ok(out)) => Ok(out),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Err(anyhow!("no scripted gap and plan")),
        }
    }
}

/// One call observed by [`ScriptedVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCall {
    pub candidate: String,
    pub supplement: String,
}

/// Scripted [`Verifier`].
pub struct ScriptedVerifier {
    verdicts: Mutex<Vec<Verdict>>,
    calls: Mutex<Vec<VerifyCall>>,
}

impl ScriptedVerifier {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_pass() -> Self {
        Self::new(vec![Verdict::pass("타당함")])
    }

    pub fn always_fail() -> Self {
        Self::new(vec![Verdict::fail("평가 결과와 맞지 않음")])
    }

    pub fn calls(&self) -> Vec<VerifyCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(
        &self,
        _resume_eval: &str,
        _self_intro_eval: &str,
        candidate: &str,
        supplement: &str,
    ) -> Verdict {
        self.calls.lock().expect("calls lock").push(VerifyCall {
            candidate: candidate.to_string(),
            supplement: supplement.to_string(),
        });
        next_scripted(&self.verdicts).unwrap_or_else(Verdict::unparseable)
    }
}

/// Config file written into a temporary directory.
pub struct TempConfig {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TempConfig {
    pub fn new(cfg: &CoachConfig) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coach.toml");
        write_config(&path, cfg)?;
        Ok(Self { _dir: dir, path })
    }
}
