//! Console implementations of the renderer and input adapters, built on
//! `console`, `dialoguer`, and `indicatif`.

use std::time::Duration;

use async_trait::async_trait;
use console::{style, Term};
use dialoguer::{Completion, Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use playbook_core::PlaybookError;

use crate::option::SpinnerSpec;
use crate::render::{MenuInput, MenuRenderer, SpinnerHandle, TableRow};

pub struct ConsoleRenderer {
    term: Term,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self { term: Term::stdout() }
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuRenderer for ConsoleRenderer {
    fn table(&self, title: &str, rows: &[TableRow], columns: usize) {
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&style(title).bold().to_string());
        for chunk in rows.chunks(columns.max(1)) {
            let line: String = chunk
                .iter()
                .map(|row| format!("  [{}] {:<24}", style(&row.key).cyan(), row.label))
                .collect();
            let _ = self.term.write_line(&line);
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn start_spinner(&self, spec: &SpinnerSpec) -> Box<dyn SpinnerHandle> {
        let spinner = ProgressBar::new_spinner();
        // The spec's style string is an indicatif color name.
        let template = format!("{{spinner:.{}}} {{msg}}", spec.style);
        spinner.set_style(
            ProgressStyle::with_template(&template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(spec.message.clone());
        spinner.enable_steady_tick(Duration::from_millis(80));
        Box::new(ConsoleSpinner(spinner))
    }
}

struct ConsoleSpinner(ProgressBar);

impl SpinnerHandle for ConsoleSpinner {
    fn finish(self: Box<Self>) {
        self.0.finish_and_clear();
    }
}

/// Prompts through dialoguer, off the async runtime via `spawn_blocking`.
pub struct ConsoleInput;

impl ConsoleInput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MenuInput for ConsoleInput {
    async fn prompt_key(
        &self,
        prompt: &str,
        valid_keys: &[String],
    ) -> playbook_core::Result<String> {
        let prompt = prompt.trim_end().to_string();
        let keys = valid_keys.to_vec();
        let entered = tokio::task::spawn_blocking(move || {
            let completion = KeyCompletion { keys: keys.clone() };
            Input::<String>::new()
                .with_prompt(prompt)
                .completion_with(&completion)
                .validate_with(move |input: &String| -> Result<(), String> {
                    if keys.iter().any(|k| k.eq_ignore_ascii_case(input)) {
                        Ok(())
                    } else {
                        Err(format!(
                            "Invalid option. Valid options are: {}",
                            keys.join(", ")
                        ))
                    }
                })
                .interact_text()
        })
        .await
        .map_err(|e| PlaybookError::action(format!("prompt task died: {e}")))?;

        entered.map_err(map_dialoguer_error)
    }

    async fn confirm(&self, message: &str) -> playbook_core::Result<bool> {
        let message = message.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new().with_prompt(message).default(false).interact()
        })
        .await
        .map_err(|e| PlaybookError::action(format!("confirm task died: {e}")))?;

        answer.map_err(map_dialoguer_error)
    }
}

/// Completes a unique prefix match against the valid keys.
struct KeyCompletion {
    keys: Vec<String>,
}

impl Completion for KeyCompletion {
    fn get(&self, input: &str) -> Option<String> {
        let needle = input.to_uppercase();
        let mut matches = self.keys.iter().filter(|k| k.to_uppercase().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }
}

fn map_dialoguer_error(err: dialoguer::Error) -> PlaybookError {
    match err {
        dialoguer::Error::IO(io) => match io.kind() {
            std::io::ErrorKind::Interrupted | std::io::ErrorKind::UnexpectedEof => {
                PlaybookError::Interrupted
            }
            _ => PlaybookError::Io(io),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_requires_a_unique_prefix() {
        let completion = KeyCompletion {
            keys: vec!["CR".into(), "CB".into(), "Q".into(), "0".into()],
        };
        assert_eq!(completion.get("q"), Some("Q".to_string()));
        // "C" is ambiguous between CR and CB.
        assert_eq!(completion.get("c"), None);
        assert_eq!(completion.get("cr"), Some("CR".to_string()));
    }

    #[test]
    fn interrupt_and_eof_map_to_the_interrupted_sentinel() {
        for kind in [std::io::ErrorKind::Interrupted, std::io::ErrorKind::UnexpectedEof] {
            let err = map_dialoguer_error(dialoguer::Error::IO(std::io::Error::from(kind)));
            assert!(matches!(err, PlaybookError::Interrupted));
        }
        let err = map_dialoguer_error(dialoguer::Error::IO(std::io::Error::from(
            std::io::ErrorKind::BrokenPipe,
        )));
        assert!(matches!(err, PlaybookError::Io(_)));
    }
}
