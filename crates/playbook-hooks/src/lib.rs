//! playbook-hooks — the four-phase lifecycle hook system.
//!
//! Every action, option, and menu owns a [`HookManager`] with ordered hook
//! lists for the `before`, `after`, `on_error`, and `on_teardown` phases.
//! Hooks receive the invocation's [`HookContext`] and may mutate it; an
//! `on_error` hook that transitions the outcome to recovered turns a failed
//! invocation into a successful one.
//!
//! The resilience hooks live here too: [`RetryHandler`] (on_error) and
//! [`CircuitBreaker`] (before + on_error + after).

pub mod breaker;
pub mod context;
pub mod manager;
pub mod phase;
pub mod retry;

pub use breaker::CircuitBreaker;
pub use context::{HookContext, InvokeTarget, Outcome};
pub use manager::{Hook, HookFn, HookManager};
pub use phase::Phase;
pub use retry::{call_with_retries, RetryHandler, RetryPolicy};
