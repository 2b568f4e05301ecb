//! # Configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `VISIONSPRINT_*` environment variables, then command-line flags.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! database = "visionsprint.db"
//! backend = "redb"
//! auth_secret = "change-me-to-a-long-random-string"
//! session_ttl_secs = 604800
//! admin_emails = ["organizer@example.com"]
//! cors_origins = "https://sprint.example.com"
//! rate_limit = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use visionsprint_core::VisionSprintError;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default rate limit in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// BACKEND
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database file.
    #[default]
    Redb,
    /// In-memory store, loaded from and saved to a snapshot file by the CLI.
    Memory,
}

impl Backend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Redb => "redb",
            Backend::Memory => "memory",
        }
    }
}

impl FromStr for Backend {
    type Err = VisionSprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Backend::Redb),
            "memory" | "file" => Ok(Backend::Memory),
            other => Err(VisionSprintError::InvalidInput(format!(
                "unknown backend '{}'. Use: redb, memory",
                other
            ))),
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Runtime configuration for the server and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    pub backend: Backend,
    /// Shared secret for identity assertions and session tokens.
    pub auth_secret: Option<String>,
    pub session_ttl_secs: u64,
    /// Emails promoted to admin when they sign in.
    pub admin_emails: Vec<String>,
    /// Comma-separated origins, `*` for any. Unset means localhost only.
    pub cors_origins: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("visionsprint.db"),
            backend: Backend::default(),
            auth_secret: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            admin_emails: Vec::new(),
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl Config {
    /// Load defaults, the optional file at `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, VisionSprintError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, VisionSprintError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            VisionSprintError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(VisionSprintError::InvalidInput(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            VisionSprintError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, VisionSprintError> {
        toml::from_str(text)
            .map_err(|e| VisionSprintError::InvalidInput(format!("Invalid config: {}", e)))
    }

    /// Apply `VISIONSPRINT_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), VisionSprintError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("VISIONSPRINT_HOST") {
            self.host = host.trim().to_string();
        }
        if let Some(port) = get("VISIONSPRINT_PORT") {
            self.port = parse_number("VISIONSPRINT_PORT", &port)?;
        }
        if let Some(database) = get("VISIONSPRINT_DATABASE") {
            self.database = PathBuf::from(database.trim());
        }
        if let Some(backend) = get("VISIONSPRINT_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(secret) = get("VISIONSPRINT_AUTH_SECRET") {
            self.auth_secret = Some(secret);
        }
        if let Some(ttl) = get("VISIONSPRINT_SESSION_TTL") {
            self.session_ttl_secs = parse_number("VISIONSPRINT_SESSION_TTL", &ttl)?;
        }
        if let Some(emails) = get("VISIONSPRINT_ADMIN_EMAILS") {
            self.admin_emails = emails
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(origins) = get("VISIONSPRINT_CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
        if let Some(rate) = get("VISIONSPRINT_RATE_LIMIT") {
            self.rate_limit = parse_number("VISIONSPRINT_RATE_LIMIT", &rate)?;
        }
        Ok(())
    }

    /// `host:port` for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The auth secret, or an error explaining how to set one.
    pub fn require_auth_secret(&self) -> Result<&str, VisionSprintError> {
        self.auth_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                VisionSprintError::InvalidInput(
                    "no auth secret configured; set VISIONSPRINT_AUTH_SECRET or auth_secret in the config file"
                        .to_string(),
                )
            })
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, VisionSprintError> {
    value
        .trim()
        .parse()
        .map_err(|_| VisionSprintError::InvalidInput(format!("{} must be a number, got '{}'", key, value)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.backend, Backend::Redb);
        assert_eq!(config.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
        assert!(config.require_auth_secret().is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            port = 9000
            backend = "memory"
            admin_emails = ["a@example.com"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.admin_emails, vec!["a@example.com".to_string()]);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("prot = 1").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::from_toml_str("port = 9000").expect("parse");
        config
            .apply_overrides(env(&[
                ("VISIONSPRINT_PORT", "7000"),
                ("VISIONSPRINT_ADMIN_EMAILS", "a@x.io, b@x.io,"),
                ("VISIONSPRINT_AUTH_SECRET", "s3cret"),
                ("VISIONSPRINT_RATE_LIMIT", "0"),
                ("VISIONSPRINT_HOST", "   "),
            ]))
            .expect("overrides");
        assert_eq!(config.port, 7000);
        assert_eq!(config.admin_emails.len(), 2);
        assert_eq!(config.require_auth_secret().expect("secret"), "s3cret");
        assert_eq!(config.rate_limit, 0);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn bad_env_number_is_an_error() {
        let mut config = Config::default();
        assert!(
            config
                .apply_overrides(env(&[("VISIONSPRINT_PORT", "eighty")]))
                .is_err()
        );
    }

    #[test]
    fn backend_names() {
        assert_eq!("REDB".parse::<Backend>().expect("parse"), Backend::Redb);
        assert_eq!("file".parse::<Backend>().expect("parse"), Backend::Memory);
        assert!("sqlite".parse::<Backend>().is_err());
    }
}
