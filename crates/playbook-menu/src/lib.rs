//! playbook-menu — keyed option tables driving the action lifecycle.
//!
//! A [`Menu`] owns [`MenuOption`]s (case-insensitive unique keys), a
//! menu-level hook manager, and two dispatch entry points: the interactive
//! [`Menu::run`] loop and [`Menu::run_headless`]. Rendering and input go
//! through adapter traits; the console implementation uses `console`,
//! `dialoguer`, and `indicatif`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use playbook_menu::{Menu, MenuOption};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> playbook_core::Result<()> {
//!     let mut menu = Menu::new("Main Menu");
//!     menu.add_option(MenuOption::from_fn("1", "Say hello", |_args| {
//!         Ok(json!("hello"))
//!     }))?;
//!
//!     // Interactive: prompt, dispatch, repeat until back.
//!     menu.run().await?;
//!
//!     // Headless: one dispatch by key.
//!     let result = menu.run_headless("1").await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

pub mod console;
pub mod menu;
pub mod option;
pub mod render;
pub mod status_bar;
pub mod submenu;
pub mod testing;

pub use console::{ConsoleInput, ConsoleRenderer};
pub use menu::Menu;
pub use option::{MenuOption, SpinnerSpec};
pub use render::{MenuInput, MenuRenderer, SpinnerHandle, TableRow};
pub use status_bar::StatusBar;
pub use submenu::SubmenuAction;
