//! Sequential composition with rollback.

use async_trait::async_trait;
use playbook_core::TimingSlot;
use playbook_hooks::HookManager;
use serde_json::Value;
use tracing::{info, warn};

use crate::action::{dry_run_indent, invoke, Action, ArcAction};

/// Runs children in order; child N+1 never starts before child N has
/// finished its entire lifecycle. When a child fails, the completed prefix
/// is rolled back in reverse and the child's error propagates.
pub struct ChainedAction {
    name: String,
    hooks: HookManager,
    timing: TimingSlot,
    actions: Vec<ArcAction>,
}

impl ChainedAction {
    pub fn new(name: impl Into<String>, actions: Vec<ArcAction>) -> Self {
        Self {
            name: name.into(),
            hooks: HookManager::new(),
            timing: TimingSlot::new(),
            actions,
        }
    }

    pub fn push(&mut self, action: ArcAction) {
        self.actions.push(action);
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Call the rollback of every completed child, last first. A failing
    /// rollback is logged and the remaining children still roll back.
    async fn rollback(&self, completed: &[&ArcAction], args: &Value) {
        for child in completed.iter().rev() {
            let Some(rollback) = child.rollback_body() else {
                continue;
            };
            info!(chain = %self.name, child = child.name(), "rolling back");
            if let Err(err) = rollback(args.clone()).await {
                warn!(
                    chain = %self.name,
                    child = child.name(),
                    error = %err,
                    "rollback failed"
                );
            }
        }
    }
}

#[async_trait]
impl Action for ChainedAction {
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
        let mut completed: Vec<&ArcAction> = Vec::new();
        for child in &self.actions {
            match invoke(child, args.clone()).await {
                Ok(_) => completed.push(child),
                Err(err) => {
                    warn!(
                        chain = %self.name,
                        child = child.name(),
                        error = %err,
                        "chain step failed, rolling back completed steps"
                    );
                    self.rollback(&completed, args).await;
                    return Err(err);
                }
            }
        }
        // No meaningful aggregate for a chain.
        Ok(Value::Null)
    }

    fn dry_run(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!(
            "{}chain '{}' with {} step(s):",
            dry_run_indent(depth),
            self.name,
            self.actions.len()
        ));
        for child in &self.actions {
            child.dry_run(depth + 1, out);
        }
    }
}
