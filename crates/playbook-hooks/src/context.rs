//! The mutable record threaded through one invocation's lifecycle.
//!
//! Payloads are untyped JSON so the engine stays decoupled from domain
//! structs. Recovery is an explicit state transition: an `on_error` hook
//! that calls [`HookContext::recover`] turns a failure into a success, and
//! the lifecycle driver honours that by running the `after` phase.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use playbook_core::PlaybookError;
use serde_json::Value;
use uuid::Uuid;

/// Where an invocation currently stands.
#[derive(Debug)]
pub enum Outcome {
    /// The body has not settled yet.
    Pending,
    Success(Value),
    Failed(PlaybookError),
    /// An `on_error` hook turned the failure into this value.
    Recovered(Value),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_settled_ok(&self) -> bool {
        matches!(self, Outcome::Success(_) | Outcome::Recovered(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Outcome::Success(value) | Outcome::Recovered(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PlaybookError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// A handle a retry hook can use to run the failed work again.
///
/// For an action lifecycle this is the action's bare body; for an option
/// lifecycle it is the option's underlying action. Either way the entity
/// whose `on_error` list holds the retry hook does NOT re-fire its own
/// `before` phase on a retry.
#[async_trait]
pub trait InvokeTarget: Send + Sync {
    fn name(&self) -> &str;
    async fn invoke(&self, args: &Value) -> playbook_core::Result<Value>;
}

/// The runtime context passed into every hook invocation.
pub struct HookContext {
    /// Display name of the invoked entity (action name or option description).
    pub name: String,
    /// Invocation input, opaque to the engine.
    pub args: Value,
    pub outcome: Outcome,
    /// Wall-clock duration, stamped before `on_error`, `after`, and
    /// `on_teardown` fire.
    pub duration: Option<Duration>,
    /// Correlation id for log lines spanning one invocation.
    pub invocation_id: Uuid,
    /// Re-invocation handle for retry hooks.
    pub target: Option<Arc<dyn InvokeTarget>>,
    /// Implementation-defined extras. Consumers must ignore unknown keys.
    pub extra: serde_json::Map<String, Value>,
}

impl HookContext {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
            outcome: Outcome::Pending,
            duration: None,
            invocation_id: Uuid::new_v4(),
            target: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn succeed(&mut self, value: Value) {
        self.outcome = Outcome::Success(value);
    }

    pub fn fail(&mut self, err: PlaybookError) {
        self.outcome = Outcome::Failed(err);
    }

    /// Transition `Failed` into `Recovered`. No-op in any other state;
    /// recovery only means something when there is a failure to recover.
    pub fn recover(&mut self, value: Value) {
        if self.outcome.is_failed() {
            self.outcome = Outcome::Recovered(value);
        }
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.result()
    }

    pub fn error(&self) -> Option<&PlaybookError> {
        self.outcome.error()
    }

    /// Move the settled outcome out, leaving `Pending` behind.
    pub fn take_outcome(&mut self) -> Outcome {
        std::mem::replace(&mut self.outcome, Outcome::Pending)
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("name", &self.name)
            .field("outcome", &self.outcome)
            .field("duration", &self.duration)
            .field("invocation_id", &self.invocation_id)
            .field("target", &self.target.as_ref().map(|t| t.name().to_string()))
            .finish_non_exhaustive()
    }
}
