use std::time::Duration;

/// Source of delays for backoff and attempt timeouts.
#[async_trait::async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait::async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Delay inserted after a failed attempt, before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// `attempt * step`: 1x, 2x, 3x ...
    Linear { step: Duration },
    /// `base * 2^(attempt - 1)`: 1x, 2x, 4x ...
    Exponential { base: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Linear {
            step: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    /// Delay after the failed attempt numbered `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            BackoffPolicy::Linear { step } => step.saturating_mul(attempt),
            BackoffPolicy::Exponential { base } => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
        }
    }
}
