//! Test doubles for the renderer and input adapters.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use playbook_core::PlaybookError;

use crate::option::SpinnerSpec;
use crate::render::{MenuInput, MenuRenderer, SpinnerHandle, TableRow};

/// Feeds queued keys and confirmation answers; an empty key queue reads as
/// an interrupted prompt, an empty confirmation queue answers yes.
pub struct ScriptedInput {
    keys: Mutex<VecDeque<String>>,
    confirms: Mutex<VecDeque<bool>>,
}

impl ScriptedInput {
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(keys.into_iter().map(Into::into).collect()),
            confirms: Mutex::new(VecDeque::new()),
        })
    }

    pub fn with_confirms(
        keys: impl IntoIterator<Item = impl Into<String>>,
        confirms: impl IntoIterator<Item = bool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(keys.into_iter().map(Into::into).collect()),
            confirms: Mutex::new(confirms.into_iter().collect()),
        })
    }
}

#[async_trait]
impl MenuInput for ScriptedInput {
    async fn prompt_key(
        &self,
        _prompt: &str,
        _valid_keys: &[String],
    ) -> playbook_core::Result<String> {
        self.keys
            .lock()
            .expect("scripted keys poisoned")
            .pop_front()
            .ok_or(PlaybookError::Interrupted)
    }

    async fn confirm(&self, _message: &str) -> playbook_core::Result<bool> {
        Ok(self
            .confirms
            .lock()
            .expect("scripted confirms poisoned")
            .pop_front()
            .unwrap_or(true))
    }
}

/// Captures every render call as a flat event string.
#[derive(Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("recorded events poisoned").clone()
    }

    fn record(&self, event: String) {
        self.events.lock().expect("recorded events poisoned").push(event);
    }
}

impl MenuRenderer for RecordingRenderer {
    fn table(&self, title: &str, rows: &[TableRow], _columns: usize) {
        self.record(format!("table:{title}:{}", rows.len()));
    }

    fn line(&self, text: &str) {
        self.record(format!("line:{text}"));
    }

    fn start_spinner(&self, spec: &SpinnerSpec) -> Box<dyn SpinnerHandle> {
        self.record(format!("spinner:{}", spec.message));
        Box::new(NoopSpinner)
    }
}

struct NoopSpinner;

impl SpinnerHandle for NoopSpinner {
    fn finish(self: Box<Self>) {}
}
