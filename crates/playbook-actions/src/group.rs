//! Parallel composition with per-child error isolation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use playbook_core::{PlaybookError, TimingSlot};
use playbook_hooks::HookManager;
use serde_json::Value;
use tracing::warn;

use crate::action::{dry_run_indent, invoke, Action, ArcAction};

/// Launches every child concurrently and waits for all of them to settle.
/// A child's failure never cancels its siblings.
///
/// On success the body returns the `{child_name: result}` object, so the
/// group's `after` hooks observe the results on the context. At least one
/// failing child turns the invocation into an aggregate failure carrying
/// every `(name, error)` pair.
pub struct ActionGroup {
    name: String,
    hooks: HookManager,
    timing: TimingSlot,
    actions: Vec<ArcAction>,
    results: Mutex<Vec<(String, Value)>>,
    errors: Mutex<Vec<(String, Arc<PlaybookError>)>>,
}

impl ActionGroup {
    pub fn new(name: impl Into<String>, actions: Vec<ArcAction>) -> Self {
        Self {
            name: name.into(),
            hooks: HookManager::new(),
            timing: TimingSlot::new(),
            actions,
            results: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
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

    /// Successful `(name, result)` pairs from the most recent run.
    pub fn results(&self) -> Vec<(String, Value)> {
        self.results.lock().expect("group results poisoned").clone()
    }

    /// Failed `(name, error)` pairs from the most recent run.
    pub fn errors(&self) -> Vec<(String, Arc<PlaybookError>)> {
        self.errors.lock().expect("group errors poisoned").clone()
    }
}

#[async_trait]
impl Action for ActionGroup {
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
        let mut handles = Vec::with_capacity(self.actions.len());
        for child in &self.actions {
            let child = child.clone();
            let args = args.clone();
            let name = child.name().to_string();
            handles.push((name, tokio::spawn(async move { invoke(&child, args).await })));
        }

        let mut results = Vec::new();
        let mut errors: Vec<(String, Arc<PlaybookError>)> = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(value)) => results.push((name, value)),
                Ok(Err(err)) => errors.push((name, Arc::new(err))),
                Err(join_error) => {
                    warn!(group = %self.name, child = %name, error = %join_error, "child task died");
                    errors.push((
                        name,
                        Arc::new(PlaybookError::action(format!("child task died: {join_error}"))),
                    ));
                }
            }
        }

        *self.results.lock().expect("group results poisoned") = results.clone();
        *self.errors.lock().expect("group errors poisoned") = errors.clone();

        if errors.is_empty() {
            let map: serde_json::Map<String, Value> = results.into_iter().collect();
            Ok(Value::Object(map))
        } else {
            Err(PlaybookError::Aggregate {
                name: self.name.clone(),
                total: self.actions.len(),
                failures: errors,
            })
        }
    }

    fn dry_run(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!(
            "{}group '{}' running {} action(s) in parallel:",
            dry_run_indent(depth),
            self.name,
            self.actions.len()
        ));
        for child in &self.actions {
            child.dry_run(depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::leaf::LeafAction;

    fn named_leaf(name: &str) -> ArcAction {
        let tag = name.to_string();
        Arc::new(LeafAction::new(name, move |_args| Ok(json!(tag))))
    }

    #[tokio::test]
    async fn all_children_succeed() {
        let group = Arc::new(ActionGroup::new(
            "fanout",
            vec![named_leaf("x"), named_leaf("y"), named_leaf("z")],
        ));
        let action: ArcAction = group.clone();

        let result = invoke(&action, Value::Null).await.unwrap();
        assert_eq!(result, json!({"x": "x", "y": "y", "z": "z"}));
        assert_eq!(group.results().len(), 3);
        assert!(group.errors().is_empty());
    }

    #[tokio::test]
    async fn one_failure_becomes_an_aggregate() {
        let boom: ArcAction =
            Arc::new(LeafAction::new("y", |_args| Err(PlaybookError::action("y failed"))));
        let group = Arc::new(ActionGroup::new("fanout", vec![named_leaf("x"), boom, named_leaf("z")]));
        let action: ArcAction = group.clone();

        let err = invoke(&action, Value::Null).await.unwrap_err();
        match &err {
            PlaybookError::Aggregate { name, total, failures } => {
                assert_eq!(name, "fanout");
                assert_eq!(*total, 3);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "y");
                assert!(failures[0].1.to_string().contains("y failed"));
            }
            other => panic!("expected aggregate, got {other}"),
        }

        // results + errors partition the children.
        assert_eq!(group.results().len() + group.errors().len(), 3);
        let mut survivors: Vec<_> = group.results().into_iter().map(|(n, _)| n).collect();
        survivors.sort();
        assert_eq!(survivors, vec!["x", "z"]);
    }

    #[tokio::test]
    async fn a_second_run_replaces_the_collected_pairs() {
        let group = Arc::new(ActionGroup::new("fanout", vec![named_leaf("x")]));
        let action: ArcAction = group.clone();

        invoke(&action, Value::Null).await.unwrap();
        invoke(&action, Value::Null).await.unwrap();
        assert_eq!(group.results().len(), 1);
    }
}
