//! Deterministic, pure logic for the feedback orchestration core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod level;
pub mod machine;
pub mod plan;
pub mod retry;
pub mod route;
pub mod types;
pub mod verdict;
