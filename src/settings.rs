use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::Config;
use serde::Deserialize;

use crate::error::SelectorError;
use crate::parser::blocks::BlockSelectors;

const CONFIG_FILE: &str = "codebook";
const ENV_PREFIX: &str = "CODEBOOK";

/// Run settings: `codebook.toml` (optional) overridden by `CODEBOOK_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pages_dir: PathBuf,
    pub db_path: PathBuf,
    /// Page URL with a `{page}` placeholder.
    pub url_template: String,
    pub delay_ms: u64,
    pub user_agent: String,
    pub block_selector: String,
    pub table_selector: String,
    /// Abort on the first unreadable block instead of skipping it.
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pages_dir: PathBuf::from("data/pages"),
            db_path: PathBuf::from("data/codebook.sqlite"),
            url_template: String::new(),
            delay_ms: 2000,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            block_selector: "div.variable-container".to_string(),
            table_selector: "table.data-table".to_string(),
            strict: false,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read settings")?
            .try_deserialize::<Settings>()
            .context("Invalid settings")
    }

    pub fn selectors(&self) -> Result<BlockSelectors, SelectorError> {
        BlockSelectors::new(&self.block_selector, &self.table_selector)
    }

    pub fn page_url(&self, index: u32) -> Result<String> {
        if !self.url_template.contains("{page}") {
            bail!(
                "{}_URL_TEMPLATE must be set to a URL containing {{page}}",
                ENV_PREFIX
            );
        }
        Ok(self.url_template.replace("{page}", &index.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let s = Settings::default();
        assert!(s.selectors().is_ok());
        assert_eq!(s.delay_ms, 2000);
        assert!(!s.strict);
    }

    #[test]
    fn page_url_needs_template() {
        let mut s = Settings::default();
        assert!(s.page_url(1).is_err());
        s.url_template = "https://codebook.example.org/page/{page}".into();
        assert_eq!(s.page_url(42).unwrap(), "https://codebook.example.org/page/42");
    }

    #[test]
    fn invalid_selector_rejected() {
        let s = Settings {
            block_selector: "div[".into(),
            ..Default::default()
        };
        assert!(s.selectors().is_err());
    }
}
