//! Circuit breaker: three cooperating hooks sharing one failure counter.
//!
//! The `before` hook blocks execution while the circuit is open by failing
//! the context (the lifecycle skips the body and routes the failure through
//! `on_error`). The `on_error` hook counts real body failures; the `after`
//! hook resets the counter on any success.
//!
//! Composes with [`RetryHandler`](crate::retry::RetryHandler): register the
//! retry hook first, and a recovered invocation never reaches the counting
//! branch because the outcome is no longer failed.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::context::HookContext;
use crate::manager::{Hook, HookManager};
use crate::phase::Phase;

#[derive(Debug, Default)]
struct BreakerState {
    failures: u32,
    open_until: Option<Instant>,
}

pub struct CircuitBreaker {
    max_failures: u32,
    reset_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(max_failures: u32, reset_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            max_failures,
            reset_timeout,
            state: Mutex::new(BreakerState::default()),
        })
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().expect("breaker state poisoned");
        state.open_until.is_some_and(|until| Instant::now() < until)
    }

    pub fn failures(&self) -> u32 {
        self.state.lock().expect("breaker state poisoned").failures
    }

    /// Close the circuit and zero the counter.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("breaker state poisoned");
        state.failures = 0;
        state.open_until = None;
        info!("circuit reset");
    }

    pub fn before_hook(self: &Arc<Self>) -> Arc<dyn Hook> {
        Arc::new(BreakerBefore(self.clone()))
    }

    pub fn error_hook(self: &Arc<Self>) -> Arc<dyn Hook> {
        Arc::new(BreakerOnError(self.clone()))
    }

    pub fn after_hook(self: &Arc<Self>) -> Arc<dyn Hook> {
        Arc::new(BreakerAfter(self.clone()))
    }

    /// Register all three hooks on a manager.
    pub fn install(self: &Arc<Self>, hooks: &mut HookManager) {
        hooks.register(Phase::Before, self.before_hook());
        hooks.register(Phase::OnError, self.error_hook());
        hooks.register(Phase::After, self.after_hook());
    }
}

struct BreakerBefore(Arc<CircuitBreaker>);

#[async_trait]
impl Hook for BreakerBefore {
    fn name(&self) -> &str {
        "breaker_before"
    }

    async fn run(&self, ctx: &mut HookContext) -> playbook_core::Result<()> {
        let breaker = &self.0;
        let mut state = breaker.state.lock().expect("breaker state poisoned");
        if let Some(until) = state.open_until {
            let now = Instant::now();
            if now < until {
                let remaining = until - now;
                warn!(
                    name = %ctx.name,
                    remaining_ms = remaining.as_millis() as u64,
                    "circuit open, blocking execution"
                );
                ctx.fail(playbook_core::PlaybookError::CircuitOpen {
                    name: ctx.name.clone(),
                    remaining_ms: remaining.as_millis() as u64,
                });
            } else {
                info!(name = %ctx.name, "reset timeout elapsed, circuit closed");
                state.failures = 0;
                state.open_until = None;
            }
        }
        Ok(())
    }
}

struct BreakerOnError(Arc<CircuitBreaker>);

#[async_trait]
impl Hook for BreakerOnError {
    fn name(&self) -> &str {
        "breaker_on_error"
    }

    async fn run(&self, ctx: &mut HookContext) -> playbook_core::Result<()> {
        let breaker = &self.0;
        match ctx.error() {
            // Recovered upstream (e.g. by a retry hook registered earlier):
            // no failure occurred as far as the breaker is concerned.
            None => return Ok(()),
            // A blocked invocation must not count against the circuit that
            // blocked it.
            Some(playbook_core::PlaybookError::CircuitOpen { .. }) => return Ok(()),
            Some(_) => {}
        }

        let mut state = breaker.state.lock().expect("breaker state poisoned");
        state.failures += 1;
        warn!(
            name = %ctx.name,
            failures = state.failures,
            max = breaker.max_failures,
            "circuit breaker counted a failure"
        );
        if state.failures >= breaker.max_failures {
            state.open_until = Some(Instant::now() + breaker.reset_timeout);
            error!(
                name = %ctx.name,
                reset_ms = breaker.reset_timeout.as_millis() as u64,
                "circuit opened"
            );
        }
        Ok(())
    }
}

struct BreakerAfter(Arc<CircuitBreaker>);

#[async_trait]
impl Hook for BreakerAfter {
    fn name(&self) -> &str {
        "breaker_after"
    }

    async fn run(&self, _ctx: &mut HookContext) -> playbook_core::Result<()> {
        self.0.state.lock().expect("breaker state poisoned").failures = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use playbook_core::PlaybookError;
    use serde_json::Value;

    use super::*;

    async fn count_one_failure(breaker: &Arc<CircuitBreaker>) {
        let mut ctx = HookContext::new("risky", Value::Null);
        ctx.fail(PlaybookError::action("boom"));
        breaker.error_hook().run(&mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn opens_after_max_failures() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        count_one_failure(&breaker).await;
        assert!(!breaker.is_open());
        count_one_failure(&breaker).await;
        assert!(breaker.is_open());
    }

    #[tokio::test]
    async fn open_circuit_blocks_through_the_before_hook() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        count_one_failure(&breaker).await;

        let mut ctx = HookContext::new("risky", Value::Null);
        breaker.before_hook().run(&mut ctx).await.unwrap();

        let err = ctx.error().expect("before hook should fail the context");
        assert_eq!(err.code(), "CIRCUIT_OPEN");
        assert!(err.to_string().contains("risky"));
    }

    #[tokio::test]
    async fn blocked_invocations_do_not_extend_the_count() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        count_one_failure(&breaker).await;

        let mut ctx = HookContext::new("risky", Value::Null);
        ctx.fail(PlaybookError::CircuitOpen { name: "risky".into(), remaining_ms: 10 });
        breaker.error_hook().run(&mut ctx).await.unwrap();

        assert_eq!(breaker.failures(), 1);
    }

    #[tokio::test]
    async fn closes_again_after_the_reset_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        count_one_failure(&breaker).await;
        assert!(breaker.is_open());

        tokio::time::sleep(Duration::from_millis(40)).await;

        let mut ctx = HookContext::new("risky", Value::Null);
        breaker.before_hook().run(&mut ctx).await.unwrap();
        assert!(ctx.error().is_none());
        assert_eq!(breaker.failures(), 0);
        assert!(!breaker.is_open());
    }

    #[tokio::test]
    async fn after_hook_resets_the_counter() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        count_one_failure(&breaker).await;
        count_one_failure(&breaker).await;
        assert_eq!(breaker.failures(), 2);

        let mut ctx = HookContext::new("risky", Value::Null);
        ctx.succeed(Value::Null);
        breaker.after_hook().run(&mut ctx).await.unwrap();
        assert_eq!(breaker.failures(), 0);
    }

    #[tokio::test]
    async fn recovered_outcome_is_not_counted() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        let mut ctx = HookContext::new("risky", Value::Null);
        ctx.fail(PlaybookError::action("boom"));
        ctx.recover(Value::from("saved"));
        breaker.error_hook().run(&mut ctx).await.unwrap();

        assert_eq!(breaker.failures(), 0);
        assert!(!breaker.is_open());
    }
}
