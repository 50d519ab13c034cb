//! LLM-backed verification of generated feedback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::agents::Verifier;
use crate::core::verdict::{Verdict, parse_verdict};
use crate::io::llm::TextGenerator;
use crate::io::prompt::PromptEngine;

/// Verifier that asks a model for a JSON verdict embedded in free text.
pub struct LlmVerifier<T> {
    llm: Arc<T>,
    prompts: PromptEngine,
    timeout: Duration,
}

impl<T: TextGenerator> LlmVerifier<T> {
    pub fn new(llm: Arc<T>, timeout: Duration) -> Self {
        Self {
            llm,
            prompts: PromptEngine::new(),
            timeout,
        }
    }
}

#[async_trait]
impl<T: TextGenerator> Verifier for LlmVerifier<T> {
    #[instrument(skip_all)]
    async fn verify(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
        candidate: &str,
        supplement: &str,
    ) -> Verdict {
        let start = Instant::now();
        let prompt = match self
            .prompts
            .verification(resume_eval, self_intro_eval, candidate, supplement)
        {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(error = %err, "verification prompt failed to render");
                return Verdict::fail(format!("verification prompt error: {err}"));
            }
        };

        let verdict = match self.llm.complete(&prompt, self.timeout).await {
            Ok(raw) => parse_verdict(&raw),
            Err(err) => {
                warn!(error = %err, "verification call failed");
                Verdict::fail(format!("verification call failed: {err}"))
            }
        };
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            pass = verdict.pass,
            "verification finished"
        );
        verdict
    }
}
