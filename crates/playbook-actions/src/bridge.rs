//! Sync/async bridge: drive an action to completion from a synchronous
//! caller without ever nesting an event loop.

use serde_json::Value;
use tokio::runtime::{Builder, Handle};

use crate::action::{invoke, ArcAction};

/// Invoke an action from synchronous code.
///
/// Inside a tokio runtime the call is parked on the existing runtime via
/// `block_in_place` (multi-thread runtime required; `block_in_place`
/// panics on a current-thread runtime). Outside any runtime, a fresh
/// current-thread runtime drives the invocation.
pub fn invoke_blocking(action: &ArcAction, args: Value) -> playbook_core::Result<Value> {
    match Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(invoke(action, args))),
        Err(_) => {
            let runtime = Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(invoke(action, args))
        }
    }
}
