//! I/O helpers for the orchestration core.

pub mod alert;
pub mod config;
pub mod llm;
pub mod prompt;
