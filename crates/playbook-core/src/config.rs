use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Menu defaults, shared with the console adapter and the CLI
pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_COLUMNS: usize = 3;
pub const DEFAULT_BACK_KEY: &str = "0";
pub const DEFAULT_CONFIRM_MESSAGE: &str = "Are you sure?";

/// Top-level config (playbook.toml + PLAYBOOK_* env overrides, with `__`
/// separating nesting levels, e.g. PLAYBOOK_MENU__NEVER_CONFIRM=true).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlaybookConfig {
    #[serde(default)]
    pub menu: MenuConfig,
}

/// Menu dispatch behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Option table layout width.
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Skip every confirmation prompt (confirm flags and the
    /// continue-on-error question).
    #[serde(default)]
    pub never_confirm: bool,
    /// After an unrecovered error in the interactive loop, ask whether to
    /// continue. When false the loop exits on the first unrecovered error.
    #[serde(default = "bool_true")]
    pub continue_on_error_prompt: bool,
    /// Run menu-level hooks around the back option before exiting the loop.
    #[serde(default)]
    pub run_hooks_on_back: bool,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            columns: default_columns(),
            never_confirm: false,
            continue_on_error_prompt: true,
            run_hooks_on_back: false,
        }
    }
}

impl PlaybookConfig {
    /// Load config: explicit path > PLAYBOOK_CONFIG env > ./playbook.toml.
    ///
    /// Missing files are fine: every field has a default, so an absent
    /// config yields the default configuration.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("PLAYBOOK_CONFIG").ok())
            .unwrap_or_else(|| "playbook.toml".to_string());

        let config: PlaybookConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PLAYBOOK_").split("__"))
            .extract()
            .map_err(|e| crate::error::PlaybookError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_columns() -> usize {
    DEFAULT_COLUMNS
}

fn bool_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_config_present() {
        figment::Jail::expect_with(|_jail| {
            let config = PlaybookConfig::load(Some("missing.toml")).unwrap();
            assert_eq!(config.menu.prompt, DEFAULT_PROMPT);
            assert_eq!(config.menu.columns, DEFAULT_COLUMNS);
            assert!(!config.menu.never_confirm);
            assert!(config.menu.continue_on_error_prompt);
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "playbook.toml",
                r#"
                [menu]
                prompt = ">> "
                columns = 2
                "#,
            )?;
            jail.set_env("PLAYBOOK_MENU__NEVER_CONFIRM", "true");

            let config = PlaybookConfig::load(Some("playbook.toml")).unwrap();
            assert_eq!(config.menu.prompt, ">> ");
            assert_eq!(config.menu.columns, 2);
            assert!(config.menu.never_confirm);
            Ok(())
        });
    }
}
