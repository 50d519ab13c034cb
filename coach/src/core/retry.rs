//! Retry bound for the Full branch.

/// Number of regenerations allowed after the first Full attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Bounds how many times the Full branch may regenerate.
///
/// `should_retry` takes the number of regenerations already made (attempts
/// minus the first), so with the default bound a run makes at most
/// `1 + DEFAULT_MAX_RETRIES` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn should_retry(&self, retries_used: u32) -> bool {
        retries_used < self.max_retries
    }

    /// Upper bound on generation attempts for one Full run.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
