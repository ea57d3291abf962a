//! The invocable contract and the lifecycle driver.
//!
//! Leaves and composites satisfy the same [`Action`] trait, so compositions
//! nest uniformly. [`invoke`] wraps any action in the four-phase lifecycle
//! (before, body, after or on_error, teardown), exactly once per call.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use playbook_core::TimingSlot;
use playbook_hooks::{HookContext, HookManager, InvokeTarget, Outcome, Phase};
use serde_json::Value;
use tracing::{debug, info};

pub type ArcAction = Arc<dyn Action>;

/// A boxed action body: owns its input, yields a JSON value.
pub type BodyFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, playbook_core::Result<Value>> + Send + Sync>;

/// An invocable unit of work with a hook lifecycle.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    fn hooks(&self) -> &HookManager;

    /// Duration of the most recent completed invocation.
    fn timing(&self) -> &TimingSlot;

    /// The variant-specific work, without any lifecycle wrapping. Call
    /// [`invoke`] instead unless you are the lifecycle driver or a retry
    /// hook.
    async fn body(&self, args: &Value) -> playbook_core::Result<Value>;

    /// Compensating body invoked by an enclosing chain when a later step
    /// fails. Only leaves carry one.
    fn rollback_body(&self) -> Option<BodyFn> {
        None
    }

    /// Append the would-run plan to `out` without invoking any callable or
    /// firing any hook.
    fn dry_run(&self, depth: usize, out: &mut Vec<String>);
}

pub(crate) fn dry_run_indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Drive one lifecycle around `body`.
///
/// Shared between action invocation and option invocation (the option passes
/// its own hooks and its action as the body). The sequence and its
/// guarantees:
///
/// 1. start timer, build the context;
/// 2. trigger `before` (a hook may veto by failing the context; the body
///    is skipped and the failure flows through `on_error`);
/// 3. run the body, settling the outcome;
/// 4. stamp the duration, then on failure trigger `on_error` and re-stamp
///    (retries take time); a recovered outcome proceeds as success;
/// 5. trigger `after` only when the outcome is ok;
/// 6. always trigger `on_teardown` last;
/// 7. return the settled result or propagate the failure.
pub async fn run_lifecycle<F>(
    name: &str,
    hooks: &HookManager,
    timing: &TimingSlot,
    target: Option<Arc<dyn InvokeTarget>>,
    args: Value,
    body: F,
) -> playbook_core::Result<Value>
where
    F: FnOnce(Value) -> BoxFuture<'static, playbook_core::Result<Value>>,
{
    let started = Instant::now();
    let mut ctx = HookContext::new(name, args);
    ctx.target = target;
    debug!(name = %ctx.name, id = %ctx.invocation_id, "invocation started");

    hooks.trigger(Phase::Before, &mut ctx).await;

    if !ctx.outcome.is_failed() {
        match body(ctx.args.clone()).await {
            Ok(value) => ctx.succeed(value),
            Err(err) => ctx.fail(err),
        }
    }

    ctx.duration = Some(started.elapsed());

    if ctx.outcome.is_failed() {
        hooks.trigger(Phase::OnError, &mut ctx).await;
        // Retry hooks re-run the work; refresh so after/teardown see the
        // full invocation time.
        ctx.duration = Some(started.elapsed());
        if ctx.outcome.is_settled_ok() {
            info!(name = %ctx.name, "recovery hook handled error");
        }
    }

    if ctx.outcome.is_settled_ok() {
        hooks.trigger(Phase::After, &mut ctx).await;
    }
    hooks.trigger(Phase::OnTeardown, &mut ctx).await;

    let duration = started.elapsed();
    timing.record(duration);

    match ctx.take_outcome() {
        Outcome::Success(value) | Outcome::Recovered(value) => {
            debug!(
                name = %ctx.name,
                elapsed_ms = duration.as_millis() as u64,
                "invocation completed"
            );
            Ok(value)
        }
        Outcome::Failed(err) => {
            debug!(name = %ctx.name, error = %err, "invocation failed");
            Err(err)
        }
        // The body always settles the outcome; reachable only with an empty
        // body closure, which does not exist.
        Outcome::Pending => Ok(Value::Null),
    }
}

/// Invoke an action through its full lifecycle.
pub async fn invoke(action: &ArcAction, args: Value) -> playbook_core::Result<Value> {
    let target: Arc<dyn InvokeTarget> = Arc::new(BodyTarget(action.clone()));
    let body_action = action.clone();
    run_lifecycle(
        action.name(),
        action.hooks(),
        action.timing(),
        Some(target),
        args,
        move |args| Box::pin(async move { body_action.body(&args).await }),
    )
    .await
}

/// Retry target used inside an action's own lifecycle: re-runs the bare
/// body, so the action's `before` phase does not re-fire on retries.
struct BodyTarget(ArcAction);

#[async_trait]
impl InvokeTarget for BodyTarget {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn invoke(&self, args: &Value) -> playbook_core::Result<Value> {
        self.0.body(args).await
    }
}

/// Retry target wrapping an action's full lifecycle. Used by option
/// dispatch, where a retry re-runs the underlying action (hooks included)
/// but not the option's own `before` phase.
pub struct ActionTarget(ArcAction);

impl ActionTarget {
    pub fn new(action: ArcAction) -> Arc<Self> {
        Arc::new(Self(action))
    }
}

#[async_trait]
impl InvokeTarget for ActionTarget {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn invoke(&self, args: &Value) -> playbook_core::Result<Value> {
        invoke(&self.0, args.clone()).await
    }
}
