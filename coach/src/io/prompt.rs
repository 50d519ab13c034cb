//! Prompt rendering for the generation and verification collaborators.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

const SIMPLE_FEEDBACK_TEMPLATE: &str = include_str!("prompts/simple_feedback.md");
const GAP_ANALYSIS_TEMPLATE: &str = include_str!("prompts/gap_analysis.md");
const LEARNING_PLAN_TEMPLATE: &str = include_str!("prompts/learning_plan.md");
const VERIFICATION_TEMPLATE: &str = include_str!("prompts/verification.md");

/// Week span the learning coach is asked to cover.
const PLAN_MIN_WEEKS: u32 = 2;
const PLAN_MAX_WEEKS: u32 = 4;

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("simple_feedback", SIMPLE_FEEDBACK_TEMPLATE)
            .expect("simple_feedback template should be valid");
        env.add_template("gap_analysis", GAP_ANALYSIS_TEMPLATE)
            .expect("gap_analysis template should be valid");
        env.add_template("learning_plan", LEARNING_PLAN_TEMPLATE)
            .expect("learning_plan template should be valid");
        env.add_template("verification", VERIFICATION_TEMPLATE)
            .expect("verification template should be valid");
        Self { env }
    }

    pub fn simple_feedback(&self, resume_eval: &str, self_intro_eval: &str) -> Result<String> {
        self.render(
            "simple_feedback",
            context! {
                resume_eval => resume_eval.trim(),
                self_intro_eval => self_intro_eval.trim(),
            },
        )
    }

    pub fn gap_analysis(&self, resume_eval: &str, self_intro_eval: &str) -> Result<String> {
        self.render(
            "gap_analysis",
            context! {
                resume_eval => resume_eval.trim(),
                self_intro_eval => self_intro_eval.trim(),
            },
        )
    }

    pub fn learning_plan(&self, gap_text: &str) -> Result<String> {
        self.render(
            "learning_plan",
            context! {
                gap_text => gap_text.trim(),
                min_weeks => PLAN_MIN_WEEKS,
                max_weeks => PLAN_MAX_WEEKS,
            },
        )
    }

    /// Verification prompt; an empty `supplement` omits the plan section.
    pub fn verification(
        &self,
        resume_eval: &str,
        self_intro_eval: &str,
        candidate: &str,
        supplement: &str,
    ) -> Result<String> {
        self.render(
            "verification",
            context! {
                resume_eval => resume_eval.trim(),
                self_intro_eval => self_intro_eval.trim(),
                candidate => candidate.trim(),
                supplement => (!supplement.trim().is_empty()).then(|| supplement.trim()),
            },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        template
            .render(ctx)
            .with_context(|| format!("render {name} prompt"))
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}
