//! Adapter seams for terminal rendering and input.
//!
//! The dispatch core emits tables, lines, and spinners through
//! [`MenuRenderer`] and reads keys and confirmations through [`MenuInput`];
//! it never interprets styling itself. The console implementations live in
//! [`console`](crate::console), test doubles in [`testing`](crate::testing).

use async_trait::async_trait;

use crate::option::SpinnerSpec;

/// One row of the option table.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub key: String,
    pub label: String,
}

/// Everything the menu draws.
pub trait MenuRenderer: Send + Sync {
    fn table(&self, title: &str, rows: &[TableRow], columns: usize);

    fn line(&self, text: &str);

    /// Start a spinner for a long-running dispatch. The returned handle is
    /// finished when the call settles.
    fn start_spinner(&self, spec: &SpinnerSpec) -> Box<dyn SpinnerHandle>;
}

pub trait SpinnerHandle: Send {
    fn finish(self: Box<Self>);
}

/// Everything the menu reads.
///
/// Both operations signal EOF / user interrupt with
/// [`PlaybookError::Interrupted`](playbook_core::PlaybookError::Interrupted):
/// the interactive loop exits cleanly, headless dispatch turns it into a
/// menu error.
#[async_trait]
pub trait MenuInput: Send + Sync {
    /// Prompt for one key. Implementations restrict completion to
    /// `valid_keys` and validate the entered key against them.
    async fn prompt_key(&self, prompt: &str, valid_keys: &[String])
        -> playbook_core::Result<String>;

    async fn confirm(&self, message: &str) -> playbook_core::Result<bool>;
}
