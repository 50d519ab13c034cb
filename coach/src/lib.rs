//! Verified feedback generation for candidate assessments.
//!
//! This crate turns a resume evaluation and a self-introduction evaluation
//! (each with a score) into one feedback artifact by routing between a cheap
//! single-shot suggestion and a gap analysis with a learning plan, verifying
//! every draft, and retrying the heavy path a bounded number of times. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (classification, routing, retry
//!   bound, stage transitions, plan and verdict parsing). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, model calls, prompt
//!   rendering, operator alerts).
//! - **[`agents`]**: Generation and verification collaborators built on `io`.
//!
//! [`orchestrate`] drives one run through the stage machine with a single
//! deadline and external cancellation.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrate;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
