//! A menu nested behind an option.

use std::sync::Arc;

use async_trait::async_trait;
use playbook_actions::Action;
use playbook_core::TimingSlot;
use playbook_hooks::HookManager;
use serde_json::Value;

use crate::menu::Menu;

/// An action that runs another menu's interactive loop.
///
/// An explicit variant instead of a captured `run` closure, so the target
/// menu's ownership stays visible in the type.
pub struct SubmenuAction {
    name: String,
    hooks: HookManager,
    timing: TimingSlot,
    menu: Arc<Menu>,
}

impl SubmenuAction {
    pub fn new(menu: Arc<Menu>) -> Self {
        Self {
            name: format!("submenu '{}'", menu.title()),
            hooks: HookManager::new(),
            timing: TimingSlot::new(),
            menu,
        }
    }

    pub fn menu(&self) -> &Arc<Menu> {
        &self.menu
    }
}

#[async_trait]
impl Action for SubmenuAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    fn timing(&self) -> &TimingSlot {
        &self.timing
    }

    async fn body(&self, _args: &Value) -> playbook_core::Result<Value> {
        self.menu.run().await?;
        Ok(Value::Null)
    }

    fn dry_run(&self, depth: usize, out: &mut Vec<String>) {
        out.push(format!(
            "{}would enter submenu '{}'",
            "  ".repeat(depth),
            self.menu.title()
        ));
    }
}
