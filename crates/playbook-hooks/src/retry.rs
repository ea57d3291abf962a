//! Retry with exponential backoff, as an `on_error` hook or a plain
//! async combinator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::context::HookContext;
use crate::manager::Hook;

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    /// Multiplier applied to the delay after every failed attempt.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration, backoff: f64) -> Self {
        Self { max_retries, delay, backoff }
    }
}

/// An `on_error` hook that re-invokes the failed work up to
/// `max_retries` times.
///
/// The retry target is the context's re-invocation handle: the bare body
/// for an action lifecycle, the underlying action for an option lifecycle.
/// A retry therefore does NOT re-fire the `before` phase of the entity this
/// hook is registered on. On a successful attempt the outcome transitions
/// to recovered, so the enclosing lifecycle runs its `after` phase exactly
/// once. When every attempt fails, the most recent error is chained onto
/// the original failure through the `on_error` propagation rule.
pub struct RetryHandler {
    policy: RetryPolicy,
}

impl RetryHandler {
    pub fn new(max_retries: u32, delay: Duration, backoff: f64) -> Arc<Self> {
        Self::from_policy(RetryPolicy::new(max_retries, delay, backoff))
    }

    pub fn from_policy(policy: RetryPolicy) -> Arc<Self> {
        Arc::new(Self { policy })
    }
}

#[async_trait]
impl Hook for RetryHandler {
    fn name(&self) -> &str {
        "retry"
    }

    async fn run(&self, ctx: &mut HookContext) -> playbook_core::Result<()> {
        if !ctx.outcome.is_failed() {
            // An earlier on_error hook already recovered this invocation.
            return Ok(());
        }
        let Some(target) = ctx.target.clone() else {
            warn!(name = %ctx.name, "retry hook installed but context has no target");
            return Ok(());
        };

        let mut delay = self.policy.delay;
        let mut last_error = None;
        for attempt in 1..=self.policy.max_retries {
            info!(
                target = target.name(),
                attempt,
                max = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
            tokio::time::sleep(delay).await;
            match target.invoke(&ctx.args).await {
                Ok(value) => {
                    info!(target = target.name(), attempt, "retry succeeded");
                    ctx.recover(value);
                    return Ok(());
                }
                Err(retry_error) => {
                    warn!(
                        target = target.name(),
                        attempt,
                        error = %retry_error,
                        "retry attempt failed"
                    );
                    last_error = Some(retry_error);
                    delay = delay.mul_f64(self.policy.backoff);
                }
            }
        }

        error!(
            target = target.name(),
            retries = self.policy.max_retries,
            "all retries exhausted"
        );
        match last_error {
            Some(err) => Err(err),
            // Zero configured retries: leave the original failure untouched.
            None => Ok(()),
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted. The first attempt
/// is immediate; only retries wait.
///
/// This is the combinator form for wrapping a plain callable (e.g. a leaf
/// body) without involving the hook lifecycle.
pub async fn call_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    name: &str,
    mut op: F,
) -> playbook_core::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = playbook_core::Result<T>>,
{
    let mut delay = policy.delay;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    name,
                    attempt,
                    max = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff);
            }
            Err(err) => {
                error!(name, retries = policy.max_retries, error = %err, "all retries exhausted");
                return Err(err);
            }
        }
    }
}
