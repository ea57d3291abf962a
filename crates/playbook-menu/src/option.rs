//! A selectable menu entry wrapping an action with UI metadata.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use playbook_actions::{invoke, run_lifecycle, Action, ActionTarget, ArcAction, LeafAction};
use playbook_core::config::DEFAULT_CONFIRM_MESSAGE;
use playbook_core::TimingSlot;
use playbook_hooks::{Hook, HookManager, InvokeTarget, Phase};
use serde_json::Value;

/// Spinner parameters, opaque to the dispatch core; the renderer decides
/// what `style` means.
#[derive(Debug, Clone)]
pub struct SpinnerSpec {
    pub message: String,
    pub style: String,
}

impl Default for SpinnerSpec {
    fn default() -> Self {
        Self {
            message: "Processing...".to_string(),
            style: "cyan".to_string(),
        }
    }
}

/// A menu entry: key, description, the action it dispatches, confirmation
/// and spinner metadata, and its own hook lifecycle.
///
/// Keys are stored uppercase; menus compare them case-insensitively.
pub struct MenuOption {
    key: String,
    description: String,
    action: ArcAction,
    confirm: bool,
    confirm_message: String,
    spinner: Option<SpinnerSpec>,
    hooks: HookManager,
    timing: TimingSlot,
    last_result: Mutex<Option<Value>>,
}

impl std::fmt::Debug for MenuOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuOption")
            .field("key", &self.key)
            .field("description", &self.description)
            .field("action", &self.action.name())
            .field("confirm", &self.confirm)
            .field("confirm_message", &self.confirm_message)
            .field("spinner", &self.spinner)
            .finish_non_exhaustive()
    }
}

impl MenuOption {
    pub fn new(key: impl Into<String>, description: impl Into<String>, action: ArcAction) -> Self {
        Self {
            key: key.into().to_uppercase(),
            description: description.into(),
            action,
            confirm: false,
            confirm_message: DEFAULT_CONFIRM_MESSAGE.to_string(),
            spinner: None,
            hooks: HookManager::new(),
            timing: TimingSlot::new(),
            last_result: Mutex::new(None),
        }
    }

    /// Wrap a raw callable into a synthetic leaf named after the
    /// description, collapsing the action-or-callable split at
    /// construction.
    pub fn from_fn<F>(key: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> playbook_core::Result<Value> + Send + Sync + 'static,
    {
        let description = description.into();
        let action: ArcAction = Arc::new(LeafAction::new(description.clone(), f));
        Self::new(key, description, action)
    }

    /// Require a confirmation prompt before dispatch.
    pub fn with_confirm(mut self) -> Self {
        self.confirm = true;
        self
    }

    pub fn with_confirm_message(mut self, message: impl Into<String>) -> Self {
        self.confirm = true;
        self.confirm_message = message.into();
        self
    }

    pub fn with_spinner(mut self, spinner: SpinnerSpec) -> Self {
        self.spinner = Some(spinner);
        self
    }

    pub fn with_hook(mut self, phase: Phase, hook: Arc<dyn Hook>) -> Self {
        self.hooks.register(phase, hook);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn action(&self) -> &ArcAction {
        &self.action
    }

    pub fn requires_confirm(&self) -> bool {
        self.confirm
    }

    pub fn confirm_message(&self) -> &str {
        &self.confirm_message
    }

    pub fn spinner(&self) -> Option<&SpinnerSpec> {
        self.spinner.as_ref()
    }

    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    /// Result cached by the most recent successful invocation.
    pub fn last_result(&self) -> Option<Value> {
        self.last_result.lock().expect("option result poisoned").clone()
    }

    pub fn last_duration(&self) -> Option<Duration> {
        self.timing.last()
    }

    /// Run the option's own lifecycle around its action.
    ///
    /// The retry target handed to `on_error` hooks is the underlying
    /// action: a retry re-runs the action (hooks included) but never this
    /// option's `before` phase.
    pub async fn invoke(&self, args: Value) -> playbook_core::Result<Value> {
        let action = self.action.clone();
        let target: Arc<dyn InvokeTarget> = ActionTarget::new(self.action.clone());
        let result = run_lifecycle(
            &self.description,
            &self.hooks,
            &self.timing,
            Some(target),
            args,
            move |args| Box::pin(async move { invoke(&action, args).await }),
        )
        .await;

        if let Ok(value) = &result {
            *self.last_result.lock().expect("option result poisoned") = Some(value.clone());
        }
        result
    }

    /// Describe what dispatch would do, recursing into composite actions,
    /// without invoking any callable or firing any hook.
    pub fn dry_run(&self, out: &mut Vec<String>) {
        out.push(format!("option '{}' would run: {}", self.key, self.description));
        self.action.dry_run(1, out);
    }
}
