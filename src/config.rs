//! Endpoint credentials for the probe.
//!
//! Values are resolved in order: explicit CLI flags, then environment variables
//! (a `.env` file is loaded into the environment beforehand), then defaults.
//! The URL and API key have no default.

use crate::error::{AppError, Result};
use reqwest::Url;
use std::env;
use std::fmt;
use tracing::debug;

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_KEY: &str = "SUPABASE_KEY";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_TABLE: &str = "SUPABASE_TABLE";
pub const ENV_SCHEMA: &str = "SUPABASE_SCHEMA";

/// Table queried when nothing else is configured.
pub const DEFAULT_TABLE: &str = "test";
pub const DEFAULT_SCHEMA: &str = "public";

/// Values supplied on the command line. `None` means "fall back to the environment".
#[derive(Default, Clone)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
}

impl fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Immutable endpoint credentials and query target for a single probe run.
#[derive(Clone, PartialEq)]
pub struct ProbeConfig {
    base_url: String,
    api_key: String,
    table: String,
    schema: String,
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("table", &self.table)
            .field("schema", &self.schema)
            .finish()
    }
}

impl ProbeConfig {
    /// Creates a config for `url` and `api_key`, targeting the default table and schema.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the URL does not parse as `http(s)` or the key is blank.
    pub fn new(url: &str, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Config("API key must not be empty".to_string()));
        }

        Ok(Self {
            base_url: normalize_url(url)?,
            api_key,
            table: DEFAULT_TABLE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
        })
    }

    pub fn with_table(mut self, table: &str) -> Result<Self> {
        self.table = validate_identifier("table", table)?;
        Ok(self)
    }

    pub fn with_schema(mut self, schema: &str) -> Result<Self> {
        self.schema = validate_identifier("schema", schema)?;
        Ok(self)
    }

    /// Merges CLI overrides over the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the variable to set when the URL or key is
    /// missing, or when any supplied value is invalid.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let url = overrides.url.or_else(|| env_value(ENV_URL)).ok_or_else(|| {
            AppError::Config(format!("Supabase URL not set (use --url or {})", ENV_URL))
        })?;

        let api_key = overrides
            .api_key
            .or_else(|| env_value(ENV_KEY))
            .or_else(|| env_value(ENV_ANON_KEY))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Supabase API key not set (use --key, {} or {})",
                    ENV_KEY, ENV_ANON_KEY
                ))
            })?;

        let table = overrides
            .table
            .or_else(|| env_value(ENV_TABLE))
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let schema = overrides
            .schema
            .or_else(|| env_value(ENV_SCHEMA))
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

        let config = Self::new(&url, api_key)?
            .with_table(&table)?
            .with_schema(&schema)?;
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// REST endpoint for the configured table, e.g. `https://xyz.supabase.co/rest/v1/test`.
    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

/// Reads an environment variable, treating unset and blank the same.
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| AppError::Config(format!("invalid Supabase URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "unsupported URL scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }
    // The REST path is appended textually, so the base must end in its path.
    if url.cannot_be_a_base() || url.query().is_some() || url.fragment().is_some() {
        return Err(AppError::Config(format!(
            "invalid Supabase URL '{}': query strings and fragments are not allowed",
            raw
        )));
    }

    Ok(trimmed.to_string())
}

fn validate_identifier(kind: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Config(format!("{} name must not be empty", kind)));
    }
    if value == "."
        || value == ".."
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '&' | '%'))
    {
        return Err(AppError::Config(format!(
            "invalid {} name '{}'",
            kind, value
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;

    fn clear_env() {
        for name in [ENV_URL, ENV_KEY, ENV_ANON_KEY, ENV_TABLE, ENV_SCHEMA] {
            env::remove_var(name);
        }
    }

    #[rstest]
    #[case("https://abc.supabase.co", "https://abc.supabase.co")]
    #[case("https://abc.supabase.co/", "https://abc.supabase.co")]
    #[case("  http://127.0.0.1:54321// ", "http://127.0.0.1:54321")]
    fn test_url_normalization(#[case] input: &str, #[case] expected: &str) {
        let config = ProbeConfig::new(input, "key").unwrap();
        assert_eq!(config.base_url(), expected);
        assert_eq!(config.table_url(), format!("{}/rest/v1/test", expected));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://abc.supabase.co")]
    #[case("")]
    #[case("https://abc.supabase.co?x=1")]
    #[case("https://abc.supabase.co/?x=1")]
    #[case("https://abc.supabase.co#section")]
    #[case("https://abc.supabase.co/?")]
    fn test_invalid_url_rejected(#[case] input: &str) {
        let result = ProbeConfig::new(input, "key");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[rstest]
    #[case("")]
    #[case("my table")]
    #[case("test?select=id")]
    #[case("../secrets")]
    #[case(".")]
    #[case("..")]
    #[case("te%2Fst")]
    fn test_invalid_table_rejected(#[case] table: &str) {
        let result = ProbeConfig::new("https://abc.supabase.co", "key")
            .unwrap()
            .with_table(table);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[rstest]
    #[case(".")]
    #[case("..")]
    fn test_dot_schema_rejected(#[case] schema: &str) {
        let result = ProbeConfig::new("https://abc.supabase.co", "key")
            .unwrap()
            .with_schema(schema);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_dotted_table_name_allowed() {
        let config = ProbeConfig::new("https://abc.supabase.co", "key")
            .unwrap()
            .with_table("audit.log_v2")
            .unwrap();
        assert_eq!(config.table_url(), "https://abc.supabase.co/rest/v1/audit.log_v2");
    }

    #[test]
    fn test_overrides_debug_redacts_key() {
        let overrides = ConfigOverrides {
            api_key: Some("sb_publishable_secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", overrides);
        assert!(!rendered.contains("sb_publishable_secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(format!("{:?}", ConfigOverrides::default()).contains("api_key: None"));
    }

    #[test]
    fn test_blank_key_rejected() {
        let result = ProbeConfig::new("https://abc.supabase.co", "   ");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProbeConfig::new("https://abc.supabase.co", "sb_publishable_secret").unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sb_publishable_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn test_resolve_from_env_with_defaults() {
        clear_env();
        env::set_var(ENV_URL, "https://abc.supabase.co/");
        env::set_var(ENV_KEY, "env-key");

        let config = ProbeConfig::resolve(ConfigOverrides::default()).unwrap();
        assert_eq!(config.base_url(), "https://abc.supabase.co");
        assert_eq!(config.api_key(), "env-key");
        assert_eq!(config.table(), DEFAULT_TABLE);
        assert_eq!(config.schema(), DEFAULT_SCHEMA);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_resolve_overrides_win_over_env() {
        clear_env();
        env::set_var(ENV_URL, "https://env.supabase.co");
        env::set_var(ENV_KEY, "env-key");
        env::set_var(ENV_TABLE, "env_table");

        let config = ProbeConfig::resolve(ConfigOverrides {
            url: Some("https://flag.supabase.co".to_string()),
            api_key: Some("flag-key".to_string()),
            table: Some("profiles".to_string()),
            schema: Some("private".to_string()),
        })
        .unwrap();
        assert_eq!(config.base_url(), "https://flag.supabase.co");
        assert_eq!(config.api_key(), "flag-key");
        assert_eq!(config.table(), "profiles");
        assert_eq!(config.schema(), "private");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_resolve_falls_back_to_anon_key() {
        clear_env();
        env::set_var(ENV_URL, "https://abc.supabase.co");
        env::set_var(ENV_KEY, "  ");
        env::set_var(ENV_ANON_KEY, "anon-key");

        let config = ProbeConfig::resolve(ConfigOverrides::default()).unwrap();
        assert_eq!(config.api_key(), "anon-key");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_resolve_missing_url_names_variable() {
        clear_env();
        env::set_var(ENV_KEY, "env-key");

        match ProbeConfig::resolve(ConfigOverrides::default()) {
            Err(AppError::Config(msg)) => assert!(msg.contains(ENV_URL)),
            other => panic!("Expected Config error, got {:?}", other),
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn test_resolve_missing_key_names_variables() {
        clear_env();
        env::set_var(ENV_URL, "https://abc.supabase.co");

        match ProbeConfig::resolve(ConfigOverrides::default()) {
            Err(AppError::Config(msg)) => {
                assert!(msg.contains(ENV_KEY));
                assert!(msg.contains(ENV_ANON_KEY));
            },
            other => panic!("Expected Config error, got {:?}", other),
        }
        clear_env();
    }
}
