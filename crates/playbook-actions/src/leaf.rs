//! A single callable wrapped as an action.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use playbook_core::TimingSlot;
use playbook_hooks::{Hook, HookManager, Phase};
use serde_json::Value;

use crate::action::{dry_run_indent, Action, BodyFn};

/// Wraps one callable (sync or async) plus an optional rollback callable.
///
/// The rollback is never run by the leaf itself; an enclosing
/// [`ChainedAction`](crate::ChainedAction) calls it when a later step fails.
pub struct LeafAction {
    name: String,
    hooks: HookManager,
    timing: TimingSlot,
    body: BodyFn,
    rollback: Option<BodyFn>,
}

impl LeafAction {
    /// Wrap a synchronous callable.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> playbook_core::Result<Value> + Send + Sync + 'static,
    {
        Self::from_body(name, sync_body(f))
    }

    /// Wrap an asynchronous callable.
    pub fn new_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = playbook_core::Result<Value>> + Send + 'static,
    {
        Self::from_body(name, async_body(f))
    }

    /// Wrap an already-boxed body.
    pub fn from_body(name: impl Into<String>, body: BodyFn) -> Self {
        Self {
            name: name.into(),
            hooks: HookManager::new(),
            timing: TimingSlot::new(),
            body,
            rollback: None,
        }
    }

    /// Attach a synchronous rollback callable.
    pub fn with_rollback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> playbook_core::Result<Value> + Send + Sync + 'static,
    {
        self.rollback = Some(sync_body(f));
        self
    }

    /// Attach an asynchronous rollback callable.
    pub fn with_rollback_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = playbook_core::Result<Value>> + Send + 'static,
    {
        self.rollback = Some(async_body(f));
        self
    }

    pub fn with_hook(mut self, phase: Phase, hook: Arc<dyn Hook>) -> Self {
        self.hooks.register(phase, hook);
        self
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }
}

fn sync_body<F>(f: F) -> BodyFn
where
    F: Fn(&Value) -> playbook_core::Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |args: Value| {
        let result = f(&args);
        Box::pin(async move { result })
    })
}

fn async_body<F, Fut>(f: F) -> BodyFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = playbook_core::Result<Value>> + Send + 'static,
{
    Arc::new(move |args: Value| Box::pin(f(args)))
}

#[async_trait]
impl Action for LeafAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    fn timing(&self) -> &TimingSlot {
        &self.timing
    }

    async fn body(&self, args: &Value) -> playbook_core::Result<Value> {
        (self.body)(args.clone()).await
    }

    fn rollback_body(&self) -> Option<BodyFn> {
        self.rollback.clone()
    }

    fn dry_run(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!("{}would run '{}'", dry_run_indent(depth), self.name));
    }
}
