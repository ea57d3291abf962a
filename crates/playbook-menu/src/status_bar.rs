//! Auxiliary display state rendered under the option table: static labels,
//! toggles, and counters.

use std::sync::Mutex;

use console::style;

#[derive(Debug, Clone)]
enum BarItem {
    Static { text: String },
    Toggle { label: String, on: bool },
    Counter { label: String, current: i64, total: i64 },
}

/// Named bar items in insertion order. Updates to unknown names are silent
/// no-ops, mirroring how display state is best-effort.
#[derive(Debug, Default)]
pub struct StatusBar {
    items: Mutex<Vec<(String, BarItem)>>,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(&self, name: impl Into<String>, text: impl Into<String>) {
        self.insert(name.into(), BarItem::Static { text: text.into() });
    }

    pub fn add_toggle(&self, name: impl Into<String>, label: impl Into<String>, on: bool) {
        self.insert(name.into(), BarItem::Toggle { label: label.into(), on });
    }

    pub fn add_counter(
        &self,
        name: impl Into<String>,
        label: impl Into<String>,
        current: i64,
        total: i64,
    ) {
        self.insert(name.into(), BarItem::Counter { label: label.into(), current, total });
    }

    pub fn update_toggle(&self, name: &str, on: bool) {
        let mut items = self.lock();
        if let Some((_, BarItem::Toggle { on: state, .. })) =
            items.iter_mut().find(|(n, _)| n == name)
        {
            *state = on;
        }
    }

    pub fn update_counter(&self, name: &str, current: Option<i64>, total: Option<i64>) {
        let mut items = self.lock();
        if let Some((_, BarItem::Counter { current: c, total: t, .. })) =
            items.iter_mut().find(|(n, _)| n == name)
        {
            if let Some(current) = current {
                *c = current;
            }
            if let Some(total) = total {
                *t = total;
            }
        }
    }

    /// Invert a toggle, returning the new state when the name exists.
    pub fn flip_toggle(&self, name: &str) -> Option<bool> {
        let mut items = self.lock();
        if let Some((_, BarItem::Toggle { on, .. })) = items.iter_mut().find(|(n, _)| n == name) {
            *on = !*on;
            Some(*on)
        } else {
            None
        }
    }

    pub fn toggle_state(&self, name: &str) -> Option<bool> {
        let items = self.lock();
        items.iter().find(|(n, _)| n == name).and_then(|(_, item)| match item {
            BarItem::Toggle { on, .. } => Some(*on),
            _ => None,
        })
    }

    /// Render all items into one styled line; `None` when the bar is empty.
    pub fn render(&self) -> Option<String> {
        let items = self.lock();
        if items.is_empty() {
            return None;
        }
        let rendered: Vec<String> = items
            .iter()
            .map(|(_, item)| match item {
                BarItem::Static { text } => style(text).dim().to_string(),
                BarItem::Toggle { label, on: true } => {
                    style(format!("{label}: ON")).green().to_string()
                }
                BarItem::Toggle { label, on: false } => {
                    style(format!("{label}: OFF")).red().to_string()
                }
                BarItem::Counter { label, current, total } => {
                    style(format!("{label}: {current}/{total}")).green().to_string()
                }
            })
            .collect();
        Some(rendered.join(" | "))
    }

    fn insert(&self, name: String, item: BarItem) {
        let mut items = self.lock();
        if let Some(slot) = items.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = item;
        } else {
            items.push((name, item));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, BarItem)>> {
        self.items.lock().expect("status bar poisoned")
    }
}
