//! Hook registry and dispatcher.
//!
//! One `HookManager` per action, option, or menu. Hooks run in registration
//! order within a phase; a failing `before`/`after`/`on_teardown` hook is
//! logged and skipped, while a failing `on_error` hook chains its error onto
//! the invocation's failure and stops the phase.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::HookContext;
use crate::phase::Phase;

/// A lifecycle callback. Implement directly for stateful hooks (retry,
/// circuit breaker); plain closures go through [`HookFn`].
#[async_trait]
pub trait Hook: Send + Sync {
    /// Name used in log lines. Keep it short and stable.
    fn name(&self) -> &str {
        "<hook>"
    }

    async fn run(&self, ctx: &mut HookContext) -> playbook_core::Result<()>;
}

/// Adapter turning a synchronous closure into a [`Hook`].
pub struct HookFn<F> {
    name: String,
    f: F,
}

impl<F> HookFn<F>
where
    F: Fn(&mut HookContext) -> playbook_core::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Arc<Self> {
        Arc::new(Self { name: name.into(), f })
    }
}

#[async_trait]
impl<F> Hook for HookFn<F>
where
    F: Fn(&mut HookContext) -> playbook_core::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut HookContext) -> playbook_core::Result<()> {
        (self.f)(ctx)
    }
}

/// Four ordered hook lists, one per [`Phase`].
///
/// The lists are treated as immutable during a `trigger` call; registration
/// happens while the owning entity is being built.
#[derive(Default)]
pub struct HookManager {
    before: Vec<Arc<dyn Hook>>,
    after: Vec<Arc<dyn Hook>>,
    on_error: Vec<Arc<dyn Hook>>,
    on_teardown: Vec<Arc<dyn Hook>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, phase: Phase, hook: Arc<dyn Hook>) {
        debug!(phase = %phase, hook = hook.name(), "hook registered");
        self.list_mut(phase).push(hook);
    }

    /// Register a synchronous closure without spelling out the adapter.
    pub fn register_fn<F>(&mut self, phase: Phase, name: impl Into<String>, f: F)
    where
        F: Fn(&mut HookContext) -> playbook_core::Result<()> + Send + Sync + 'static,
    {
        self.register(phase, HookFn::new(name, f));
    }

    /// Empty one phase, or all four when `phase` is `None`.
    pub fn clear(&mut self, phase: Option<Phase>) {
        match phase {
            Some(phase) => self.list_mut(phase).clear(),
            None => {
                for phase in Phase::ALL {
                    self.list_mut(phase).clear();
                }
            }
        }
    }

    pub fn hooks(&self, phase: Phase) -> &[Arc<dyn Hook>] {
        self.list(phase)
    }

    /// Registered hook names for one phase, for `debug_hooks`-style listings.
    pub fn hook_names(&self, phase: Phase) -> Vec<String> {
        self.list(phase).iter().map(|h| h.name().to_string()).collect()
    }

    /// Invoke every hook registered for `phase`, in registration order.
    ///
    /// `Before`, `After`, `OnTeardown`: a hook error is logged at warn level
    /// and the next hook still runs. `OnError`: a hook error is chained onto
    /// the failure already on the context (the remaining on_error hooks are
    /// skipped), so the caller observes the chain when it propagates the
    /// context's outcome.
    pub async fn trigger(&self, phase: Phase, ctx: &mut HookContext) {
        for hook in self.list(phase) {
            let started = Instant::now();
            match hook.run(ctx).await {
                Ok(()) => {
                    debug!(
                        hook = hook.name(),
                        phase = %phase,
                        name = %ctx.name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "hook completed"
                    );
                }
                Err(hook_error) => {
                    warn!(
                        hook = hook.name(),
                        phase = %phase,
                        name = %ctx.name,
                        error = %hook_error,
                        "hook failed"
                    );
                    if phase == Phase::OnError {
                        let chained = match ctx.take_outcome() {
                            crate::context::Outcome::Failed(original) => {
                                playbook_core::PlaybookError::ErrorHookFailed {
                                    original: Box::new(original),
                                    hook: hook.name().to_string(),
                                    cause: Box::new(hook_error),
                                }
                            }
                            // No failure on the context: the hook's own
                            // error becomes the failure.
                            _ => hook_error,
                        };
                        ctx.fail(chained);
                        return;
                    }
                }
            }
        }
    }

    fn list(&self, phase: Phase) -> &Vec<Arc<dyn Hook>> {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
            Phase::OnError => &self.on_error,
            Phase::OnTeardown => &self.on_teardown,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Arc<dyn Hook>> {
        match phase {
            Phase::Before => &mut self.before,
            Phase::After => &mut self.after,
            Phase::OnError => &mut self.on_error,
            Phase::OnTeardown => &mut self.on_teardown,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use playbook_core::PlaybookError;
    use serde_json::Value;

    use super::*;

    fn trace_hook(label: &str, trace: Arc<Mutex<Vec<String>>>) -> Arc<dyn Hook> {
        let label = label.to_string();
        HookFn::new(label.clone(), move |_ctx: &mut HookContext| {
            trace.lock().unwrap().push(label.clone());
            Ok(())
        })
    }

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookManager::new();
        hooks.register(Phase::Before, trace_hook("first", trace.clone()));
        hooks.register(Phase::Before, trace_hook("second", trace.clone()));
        hooks.register(Phase::Before, trace_hook("third", trace.clone()));

        let mut ctx = HookContext::new("task", Value::Null);
        hooks.trigger(Phase::Before, &mut ctx).await;

        assert_eq!(*trace.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failing_before_hook_does_not_stop_the_phase() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookManager::new();
        hooks.register_fn(Phase::Before, "broken", |_ctx| {
            Err(PlaybookError::action("hook blew up"))
        });
        hooks.register(Phase::Before, trace_hook("survivor", trace.clone()));

        let mut ctx = HookContext::new("task", Value::Null);
        hooks.trigger(Phase::Before, &mut ctx).await;

        assert_eq!(*trace.lock().unwrap(), vec!["survivor"]);
        assert!(matches!(ctx.outcome, crate::context::Outcome::Pending));
    }

    #[tokio::test]
    async fn failing_on_error_hook_chains_and_stops_the_phase() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookManager::new();
        hooks.register_fn(Phase::OnError, "exploder", |_ctx| {
            Err(PlaybookError::action("hook blew up"))
        });
        hooks.register(Phase::OnError, trace_hook("skipped", trace.clone()));

        let mut ctx = HookContext::new("task", Value::Null);
        ctx.fail(PlaybookError::action("original failure"));
        hooks.trigger(Phase::OnError, &mut ctx).await;

        assert!(trace.lock().unwrap().is_empty());
        let err = ctx.error().expect("context should stay failed");
        assert_eq!(err.code(), "ERROR_HOOK_FAILED");
        assert!(err.to_string().contains("original failure"));
        assert!(err.to_string().contains("hook blew up"));
    }

    #[tokio::test]
    async fn on_error_hook_can_recover() {
        let mut hooks = HookManager::new();
        hooks.register_fn(Phase::OnError, "rescue", |ctx| {
            ctx.recover(Value::from("rescued"));
            Ok(())
        });

        let mut ctx = HookContext::new("task", Value::Null);
        ctx.fail(PlaybookError::action("original failure"));
        hooks.trigger(Phase::OnError, &mut ctx).await;

        assert!(ctx.outcome.is_settled_ok());
        assert_eq!(ctx.result(), Some(&Value::from("rescued")));
    }

    #[tokio::test]
    async fn clear_empties_one_phase_or_all() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookManager::new();
        hooks.register(Phase::Before, trace_hook("b", trace.clone()));
        hooks.register(Phase::After, trace_hook("a", trace.clone()));

        hooks.clear(Some(Phase::Before));
        assert!(hooks.hooks(Phase::Before).is_empty());
        assert_eq!(hooks.hooks(Phase::After).len(), 1);

        hooks.clear(None);
        assert!(hooks.hooks(Phase::After).is_empty());
    }
}
