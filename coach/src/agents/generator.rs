//! LLM-backed feedback generation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::agents::{FeedbackGenerator, GapAndPlan};
use crate::io::llm::TextGenerator;
use crate::io::prompt::PromptEngine;

/// Generator that renders prompts and sends them to a [`TextGenerator`].
pub struct LlmFeedbackGenerator<T> {
    llm: Arc<T>,
    prompts: PromptEngine,
    timeout: Duration,
}

impl<T: TextGenerator> LlmFeedbackGenerator<T> {
    /// `timeout` bounds each individual model call.
    pub fn new(llm: Arc<T>, timeout: Duration) -> Self {
        Self {
            llm,
            prompts: PromptEngine::new(),
            timeout,
        }
    }
}

#[async_trait]
impl<T: TextGenerator> FeedbackGenerator for LlmFeedbackGenerator<T> {
    #[instrument(skip_all)]
    async fn generate_simple_feedback(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
    ) -> Result<String> {
        let start = Instant::now();
        let prompt = self.prompts.simple_feedback(resume_eval, self_intro_eval)?;
        let feedback = self
            .llm
            .complete(&prompt, self.timeout)
            .await
            .context("generate simple feedback")?;
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "simple feedback generated");
        Ok(feedback)
    }

    /// Gap analysis first, then a learning plan built from that analysis.
    #[instrument(skip_all)]
    async fn generate_gap_and_plan(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
    ) -> Result<GapAndPlan> {
        let start = Instant::now();
        let gap_prompt = self.prompts.gap_analysis(resume_eval, self_intro_eval)?;
        let gap_text = self
            .llm
            .complete(&gap_prompt, self.timeout)
            .await
            .context("generate gap analysis")?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "gap analysis generated");

        let plan_prompt = self.prompts.learning_plan(&gap_text)?;
        let plan_text = self
            .llm
            .complete(&plan_prompt, self.timeout)
            .await
            .context("generate learning plan")?;
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "gap analysis and plan generated");

        Ok(GapAndPlan {
            gap_text,
            plan_text,
        })
    }
}
