use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://tablica-rejestracyjna.pl";
/// Size of the public listing when the crawler was written.
pub const DEFAULT_LAST_PAGE: u32 = 85_519;

const CONFIG_FILE: &str = "plate_reports";
const ENV_PREFIX: &str = "PLATES";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub db_path: PathBuf,
    pub log_file: PathBuf,
    pub last_page: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub debug_dump: PathBuf,
}

impl Settings {
    /// Defaults, then `plate_reports.toml` if present, then `PLATES_*` env vars.
    pub fn load() -> Result<Settings> {
        let builder = defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        finish(builder)
    }

    /// Defaults overlaid with an inline TOML document.
    #[cfg(test)]
    pub fn from_toml(toml: &str) -> Result<Settings> {
        finish(defaults()?.add_source(File::from_str(toml, config::FileFormat::Toml)))
    }

    /// URL of a listing page. The first page has no query string.
    pub fn page_url(&self, page: u32) -> String {
        let base = self.base_url.trim_end_matches('/');
        if page <= 1 {
            format!("{}/komentarze", base)
        } else {
            format!("{}/komentarze?p={}", base, page)
        }
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
    Ok(Config::builder()
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("db_path", "data/plates.sqlite")?
        .set_default("log_file", "parser.log")?
        .set_default("last_page", i64::from(DEFAULT_LAST_PAGE))?
        .set_default("min_delay_ms", 1000_i64)?
        .set_default("max_delay_ms", 3000_i64)?
        .set_default("request_timeout_secs", 15_i64)?
        .set_default("max_retries", 2_i64)?
        .set_default("debug_dump", "debug_page.html")?)
}

fn finish(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Settings> {
    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.last_page, DEFAULT_LAST_PAGE);
        assert_eq!(s.min_delay_ms, 1000);
        assert_eq!(s.max_delay_ms, 3000);
        assert_eq!(s.request_timeout_secs, 15);
        assert_eq!(s.log_file, PathBuf::from("parser.log"));
    }

    #[test]
    fn file_overrides_defaults() {
        let s = Settings::from_toml("db_path = \"/tmp/x.sqlite\"\nmin_delay_ms = 0\nmax_delay_ms = 0\n")
            .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(s.min_delay_ms, 0);
        assert_eq!(s.max_retries, 2);
    }

    #[test]
    fn bad_types_rejected() {
        assert!(Settings::from_toml("last_page = \"lots\"").is_err());
    }

    #[test]
    fn page_urls() {
        let s = Settings::from_toml("base_url = \"https://example.org/\"").unwrap();
        assert_eq!(s.page_url(1), "https://example.org/komentarze");
        assert_eq!(s.page_url(2), "https://example.org/komentarze?p=2");
    }
}
