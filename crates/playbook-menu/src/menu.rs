//! Keyed option table plus the interactive and headless dispatchers.
//!
//! Hook execution order for one dispatch:
//! 1. menu-level `before`
//! 2. the option's own lifecycle (its `before`, the action, its
//!    `after`/`on_error`, its `on_teardown`)
//! 3. menu-level `after` on success, menu-level `on_error` on failure.

use std::sync::{Arc, Mutex};

use playbook_actions::{ActionTarget, ArcAction, LeafAction};
use playbook_core::config::{DEFAULT_BACK_KEY, MenuConfig};
use playbook_core::PlaybookError;
use playbook_hooks::{HookContext, HookManager, InvokeTarget, Outcome, Phase};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::console::{ConsoleInput, ConsoleRenderer};
use crate::option::MenuOption;
use crate::render::{MenuInput, MenuRenderer, TableRow};
use crate::status_bar::StatusBar;
use crate::submenu::SubmenuAction;

/// What a key resolves to.
enum Selection {
    Back,
    Toggle(String),
    Option(Arc<MenuOption>),
    Unknown,
}

/// How one dispatch ended.
enum Dispatch {
    /// Success, or a recovery hook handled the error.
    Completed(Value),
    /// Confirmation declined.
    Cancelled,
    /// Unrecovered failure.
    Failed(PlaybookError),
    /// The confirmation prompt was interrupted.
    Interrupted,
}

pub struct Menu {
    title: String,
    prompt: String,
    columns: usize,
    welcome_message: Option<String>,
    exit_message: Option<String>,
    options: Vec<Arc<MenuOption>>,
    back_option: Arc<MenuOption>,
    hooks: HookManager,
    run_hooks_on_back: bool,
    continue_on_error_prompt: bool,
    never_confirm: bool,
    status_bar: StatusBar,
    /// (key, toggle name) pairs; keys share the option key namespace.
    toggles: Vec<(String, String)>,
    renderer: Arc<dyn MenuRenderer>,
    input: Arc<dyn MenuInput>,
    last_selected: Mutex<Option<String>>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_config(title, &MenuConfig::default())
    }

    pub fn with_config(title: impl Into<String>, config: &MenuConfig) -> Self {
        Self {
            title: title.into(),
            prompt: config.prompt.clone(),
            columns: config.columns.max(1),
            welcome_message: None,
            exit_message: None,
            options: Vec::new(),
            back_option: Arc::new(default_back_option()),
            hooks: HookManager::new(),
            run_hooks_on_back: config.run_hooks_on_back,
            continue_on_error_prompt: config.continue_on_error_prompt,
            never_confirm: config.never_confirm,
            status_bar: StatusBar::new(),
            toggles: Vec::new(),
            renderer: Arc::new(ConsoleRenderer::new()),
            input: Arc::new(ConsoleInput::new()),
            last_selected: Mutex::new(None),
        }
    }

    /// Swap the rendering and input adapters (tests, alternative frontends).
    pub fn with_adapters(
        mut self,
        renderer: Arc<dyn MenuRenderer>,
        input: Arc<dyn MenuInput>,
    ) -> Self {
        self.renderer = renderer;
        self.input = input;
        self
    }

    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = Some(message.into());
        self
    }

    pub fn with_exit_message(mut self, message: impl Into<String>) -> Self {
        self.exit_message = Some(message.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    pub fn status_bar(&self) -> &StatusBar {
        &self.status_bar
    }

    /// Key of the most recently dispatched option.
    pub fn last_selected(&self) -> Option<String> {
        self.last_selected.lock().expect("menu state poisoned").clone()
    }

    /// Add an option, rejecting duplicate keys (case-insensitive, including
    /// the back key and toggle keys).
    pub fn add_option(&mut self, option: MenuOption) -> playbook_core::Result<Arc<MenuOption>> {
        self.validate_key(option.key())?;
        let option = Arc::new(option);
        self.options.push(option.clone());
        debug!(menu = %self.title, key = option.key(), "option added");
        Ok(option)
    }

    /// Bulk registration; stops at the first duplicate.
    pub fn add_options(
        &mut self,
        options: impl IntoIterator<Item = MenuOption>,
    ) -> playbook_core::Result<()> {
        for option in options {
            self.add_option(option)?;
        }
        Ok(())
    }

    /// Register another menu as a selectable entry.
    pub fn add_submenu(
        &mut self,
        key: impl Into<String>,
        description: impl Into<String>,
        submenu: Arc<Menu>,
    ) -> playbook_core::Result<Arc<MenuOption>> {
        let action: ArcAction = Arc::new(SubmenuAction::new(submenu));
        self.add_option(MenuOption::new(key, description, action))
    }

    /// Replace the back sentinel. The new key must not collide with any
    /// option or toggle key.
    pub fn update_back_option(&mut self, option: MenuOption) -> playbook_core::Result<()> {
        self.validate_key(option.key())?;
        self.back_option = Arc::new(option);
        Ok(())
    }

    /// Register a toggle flipped by its own key from the interactive
    /// prompt.
    pub fn add_toggle(
        &mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        state: bool,
    ) -> playbook_core::Result<()> {
        let key = key.into().to_uppercase();
        self.validate_key(&key)?;
        let name = name.into();
        self.status_bar.add_toggle(name.clone(), label, state);
        self.toggles.push((key, name));
        Ok(())
    }

    pub fn add_counter(
        &self,
        name: impl Into<String>,
        label: impl Into<String>,
        current: i64,
        total: i64,
    ) {
        self.status_bar.add_counter(name, label, current, total);
    }

    pub fn update_counter(&self, name: &str, current: Option<i64>, total: Option<i64>) {
        self.status_bar.update_counter(name, current, total);
    }

    pub fn update_toggle(&self, name: &str, state: bool) {
        self.status_bar.update_toggle(name, state);
    }

    /// Look up an option by key, case-insensitively. The back key resolves
    /// to the back option.
    pub fn option(&self, key: &str) -> Option<Arc<MenuOption>> {
        match self.resolve(key) {
            Selection::Back => Some(self.back_option.clone()),
            Selection::Option(option) => Some(option),
            _ => None,
        }
    }

    /// Log the registered hook names per phase for the menu and every
    /// option.
    pub fn debug_hooks(&self) {
        for phase in Phase::ALL {
            debug!(
                menu = %self.title,
                phase = %phase,
                hooks = ?self.hooks.hook_names(phase),
                "menu-level hooks"
            );
        }
        for option in &self.options {
            for phase in Phase::ALL {
                debug!(
                    option = option.key(),
                    phase = %phase,
                    hooks = ?option.hooks().hook_names(phase),
                    "option-level hooks"
                );
            }
        }
    }

    /// Describe what dispatching `key` would run, without running it.
    pub fn dry_run(&self, key: &str) -> playbook_core::Result<Vec<String>> {
        let option = self.option(key).ok_or_else(|| {
            PlaybookError::menu(format!("dry run: no option with key '{key}'"), None)
        })?;
        let mut out = Vec::new();
        option.dry_run(&mut out);
        Ok(out)
    }

    /// Interactive loop: render, prompt, dispatch, repeat. Exits on the
    /// back key or an interrupted prompt; an unrecovered error exits only
    /// when the continue prompt is declined (or disabled).
    pub async fn run(&self) -> playbook_core::Result<()> {
        info!(menu = %self.title, "running menu");
        self.debug_hooks();
        if let Some(message) = &self.welcome_message {
            self.renderer.line(message);
        }

        loop {
            self.renderer.table(&self.title, &self.table_rows(), self.columns);
            if let Some(bar) = self.status_bar.render() {
                self.renderer.line(&bar);
            }

            let key = match self.input.prompt_key(&self.prompt, &self.valid_keys()).await {
                Ok(key) => key,
                Err(PlaybookError::Interrupted) => {
                    info!(menu = %self.title, "prompt interrupted, exiting menu");
                    break;
                }
                Err(err) => return Err(err),
            };

            match self.resolve(&key) {
                Selection::Toggle(name) => {
                    if let Some(state) = self.status_bar.flip_toggle(&name) {
                        self.renderer.line(&format!(
                            "Toggled [{name}] to {}",
                            if state { "ON" } else { "OFF" }
                        ));
                    }
                }
                Selection::Back => {
                    if self.run_hooks_on_back {
                        self.dispatch(&self.back_option.clone()).await;
                    }
                    info!(menu = %self.title, "back selected, exiting menu");
                    break;
                }
                Selection::Option(option) => match self.dispatch(&option).await {
                    Dispatch::Completed(_) | Dispatch::Cancelled => {}
                    Dispatch::Interrupted => break,
                    Dispatch::Failed(err) => {
                        error!(
                            menu = %self.title,
                            option = option.key(),
                            error = %err,
                            "dispatch failed"
                        );
                        self.renderer.line(&format!(
                            "An error occurred while executing {}: {err}",
                            option.description()
                        ));
                        if self.never_confirm {
                            continue;
                        }
                        if !self.continue_on_error_prompt {
                            break;
                        }
                        match self
                            .input
                            .confirm("An error occurred. Do you wish to continue?")
                            .await
                        {
                            Ok(true) => {}
                            _ => break,
                        }
                    }
                },
                Selection::Unknown => {
                    self.renderer.line(&format!("Unrecognized key '{key}'"));
                }
            }
        }

        info!(menu = %self.title, "exiting menu");
        if let Some(message) = &self.exit_message {
            self.renderer.line(message);
        }
        Ok(())
    }

    /// Dispatch one option by key without the render loop.
    ///
    /// A missing key, a declined confirmation, an interrupted prompt, and
    /// an unrecovered error all surface as menu errors; the underlying
    /// cause is attached where there is one. Returns the option's result on
    /// success (recovered counts as success).
    pub async fn run_headless(&self, key: &str) -> playbook_core::Result<Value> {
        self.debug_hooks();
        info!(menu = %self.title, key, "headless dispatch");

        let option = match self.resolve(key) {
            Selection::Back => self.back_option.clone(),
            Selection::Option(option) => option,
            _ => {
                return Err(PlaybookError::menu(
                    format!("headless dispatch: no option with key '{key}'"),
                    None,
                ))
            }
        };

        match self.dispatch(&option).await {
            Dispatch::Completed(value) => {
                info!(menu = %self.title, option = option.key(), "headless dispatch complete");
                Ok(value)
            }
            Dispatch::Cancelled => Err(PlaybookError::menu(
                format!("'{}' cancelled by confirmation", option.description()),
                None,
            )),
            Dispatch::Interrupted => Err(PlaybookError::menu(
                format!("'{}' interrupted", option.description()),
                Some(PlaybookError::Interrupted),
            )),
            Dispatch::Failed(err) => Err(PlaybookError::menu(
                format!("'{}' failed", option.description()),
                Some(err),
            )),
        }
    }

    /// Confirmation, menu-level hooks, and the option's lifecycle.
    async fn dispatch(&self, option: &Arc<MenuOption>) -> Dispatch {
        *self.last_selected.lock().expect("menu state poisoned") =
            Some(option.key().to_string());

        if option.requires_confirm() && !self.never_confirm {
            match self.input.confirm(option.confirm_message()).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(option = option.key(), "dispatch cancelled by confirmation");
                    return Dispatch::Cancelled;
                }
                Err(PlaybookError::Interrupted) => return Dispatch::Interrupted,
                Err(err) => return Dispatch::Failed(err),
            }
        }

        let mut ctx = HookContext::new(option.description(), Value::Null);
        ctx.extra.insert("key".to_string(), Value::from(option.key()));
        let target: Arc<dyn InvokeTarget> = ActionTarget::new(option.action().clone());
        ctx.target = Some(target);

        self.hooks.trigger(Phase::Before, &mut ctx).await;

        // A menu-level before hook may veto (circuit breaker open); the
        // option is never invoked and the failure takes the error path.
        if !ctx.outcome.is_failed() {
            let spinner = option.spinner().map(|spec| self.renderer.start_spinner(spec));
            let result = option.invoke(ctx.args.clone()).await;
            if let Some(spinner) = spinner {
                spinner.finish();
            }
            match result {
                Ok(value) => ctx.succeed(value),
                Err(err) => ctx.fail(err),
            }
        }
        ctx.duration = option.last_duration();

        if ctx.outcome.is_failed() {
            self.hooks.trigger(Phase::OnError, &mut ctx).await;
            if ctx.outcome.is_settled_ok() {
                info!(option = option.key(), "recovery hook handled error");
            }
        }
        if ctx.outcome.is_settled_ok() {
            self.hooks.trigger(Phase::After, &mut ctx).await;
        }

        match ctx.take_outcome() {
            Outcome::Success(value) | Outcome::Recovered(value) => Dispatch::Completed(value),
            Outcome::Failed(err) => Dispatch::Failed(err),
            Outcome::Pending => Dispatch::Completed(Value::Null),
        }
    }

    fn resolve(&self, key: &str) -> Selection {
        if key.eq_ignore_ascii_case(self.back_option.key()) {
            return Selection::Back;
        }
        if let Some((_, name)) = self.toggles.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            return Selection::Toggle(name.clone());
        }
        match self.options.iter().find(|o| o.key().eq_ignore_ascii_case(key)) {
            Some(option) => Selection::Option(option.clone()),
            None => Selection::Unknown,
        }
    }

    fn validate_key(&self, key: &str) -> playbook_core::Result<()> {
        let taken = self.options.iter().any(|o| o.key().eq_ignore_ascii_case(key))
            || self.back_option.key().eq_ignore_ascii_case(key)
            || self.toggles.iter().any(|(k, _)| k.eq_ignore_ascii_case(key));
        if taken {
            return Err(PlaybookError::OptionAlreadyExists { key: key.to_string() });
        }
        Ok(())
    }

    fn table_rows(&self) -> Vec<TableRow> {
        let mut rows: Vec<TableRow> = self
            .options
            .iter()
            .map(|o| TableRow { key: o.key().to_string(), label: o.description().to_string() })
            .collect();
        rows.push(TableRow {
            key: self.back_option.key().to_string(),
            label: self.back_option.description().to_string(),
        });
        rows
    }

    fn valid_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.options.iter().map(|o| o.key().to_string()).collect();
        keys.extend(self.toggles.iter().map(|(k, _)| k.clone()));
        keys.push(self.back_option.key().to_string());
        keys
    }
}

fn default_back_option() -> MenuOption {
    MenuOption::new(
        DEFAULT_BACK_KEY,
        "Back",
        Arc::new(LeafAction::new("back", |_args| Ok(Value::Null))) as ArcAction,
    )
}
