//! Configuration loading and user token selection.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use fightstats_types::AppConfig;

const APP_NAME: &str = "fightstats";

/// Environment variable holding `name:token` pairs separated by commas
pub const TOKENS_ENV: &str = "DPS_REPORT_TOKENS";

/// Token name reserved for a token supplied at runtime
pub const CUSTOM_TOKEN: &str = "Custom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] confy::ConfyError),

    #[error("malformed token entry {0:?}, expected name:token")]
    MalformedToken(String),

    #[error("token name \"Custom\" is reserved for a runtime token")]
    ReservedName,

    #[error("unknown token name {0:?}")]
    UnknownToken(String),

    #[error("no token given; pass a token or pick one of: {0}")]
    NoToken(String),
}

/// Load from `path`, or from the platform config dir when `None`.
/// A missing file yields defaults (and is created by confy).
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => confy::load_path(path)?,
        None => confy::load(APP_NAME, None)?,
    };
    Ok(config)
}

/// Named user tokens. Never logged.
#[derive(Clone, Default, PartialEq)]
pub struct TokenRegistry {
    tokens: BTreeMap<String, String>,
}

// Debug prints names only
impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.tokens.keys()).finish()
    }
}

impl TokenRegistry {
    /// Parse `name:token,name2:token2`. Blank entries are skipped.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut tokens = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, token) = entry
                .split_once(':')
                .map(|(n, t)| (n.trim(), t.trim()))
                .filter(|(n, t)| !n.is_empty() && !t.is_empty() && !t.contains(':'))
                .ok_or_else(|| ConfigError::MalformedToken(redact(entry)))?;
            if name == CUSTOM_TOKEN {
                return Err(ConfigError::ReservedName);
            }
            tokens.insert(name.to_string(), token.to_string());
        }
        Ok(Self { tokens })
    }

    /// Config tokens overlaid with `env` (environment wins on name clashes)
    pub fn from_sources(config: &AppConfig, env: Option<&str>) -> Result<Self, ConfigError> {
        if config.tokens.contains_key(CUSTOM_TOKEN) {
            return Err(ConfigError::ReservedName);
        }
        let mut registry = Self {
            tokens: config.tokens.clone(),
        };
        if let Some(env) = env {
            registry.tokens.extend(Self::parse(env)?.tokens);
        }
        Ok(registry)
    }

    /// [`from_sources`](Self::from_sources) with the process environment
    pub fn from_env(config: &AppConfig) -> Result<Self, ConfigError> {
        let env = std::env::var(TOKENS_ENV).ok();
        Self::from_sources(config, env.as_deref())
    }

    /// Selectable names, with [`CUSTOM_TOKEN`] first
    pub fn names(&self) -> Vec<&str> {
        std::iter::once(CUSTOM_TOKEN)
            .chain(self.tokens.keys().map(String::as_str))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Pick the token to use. An explicit runtime token wins; otherwise the
    /// named one, or the only configured one.
    pub fn resolve<'a>(&'a self, name: Option<&str>, custom: Option<&'a str>) -> Result<&'a str, ConfigError> {
        if let Some(token) = custom.filter(|t| !t.trim().is_empty()) {
            return Ok(token.trim());
        }
        let no_token = || ConfigError::NoToken(self.names().join(", "));
        match name {
            Some(CUSTOM_TOKEN) => Err(no_token()),
            Some(name) => self
                .get(name)
                .ok_or_else(|| ConfigError::UnknownToken(name.to_string())),
            None if self.tokens.len() == 1 => self.tokens.values().next().map(String::as_str).ok_or_else(no_token),
            None => Err(no_token()),
        }
    }
}

/// `name:abcd...` -> `name:***` so a malformed entry never leaks the token
fn redact(entry: &str) -> String {
    match entry.split_once(':') {
        Some((name, _)) => format!("{name}:***"),
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let registry = TokenRegistry::parse("guild: abc123 , solo:xyz,").unwrap();
        assert_eq!(registry.get("guild"), Some("abc123"));
        assert_eq!(registry.get("solo"), Some("xyz"));
        assert_eq!(registry.names(), vec!["Custom", "guild", "solo"]);
    }

    #[test]
    fn test_malformed_entries() {
        assert!(matches!(TokenRegistry::parse("nocolon"), Err(ConfigError::MalformedToken(e)) if e == "***"));
        assert!(matches!(
            TokenRegistry::parse("a:b:c"),
            Err(ConfigError::MalformedToken(e)) if e == "a:***"
        ));
        assert!(matches!(TokenRegistry::parse("name:"), Err(ConfigError::MalformedToken(_))));
        assert!(matches!(TokenRegistry::parse("Custom:abc"), Err(ConfigError::ReservedName)));
    }

    #[test]
    fn test_env_overrides_config() {
        let mut config = AppConfig::default();
        config.tokens.insert("guild".into(), "from-config".into());
        config.tokens.insert("alt".into(), "alt-token".into());

        let registry = TokenRegistry::from_sources(&config, Some("guild:from-env")).unwrap();
        assert_eq!(registry.get("guild"), Some("from-env"));
        assert_eq!(registry.get("alt"), Some("alt-token"));
    }

    #[test]
    fn test_resolve() {
        let registry = TokenRegistry::parse("guild:abc,solo:xyz").unwrap();
        assert_eq!(registry.resolve(Some("solo"), None).unwrap(), "xyz");
        assert_eq!(registry.resolve(Some("guild"), Some(" typed ")).unwrap(), "typed");
        assert!(matches!(registry.resolve(Some("nope"), None), Err(ConfigError::UnknownToken(_))));
        assert!(matches!(registry.resolve(None, None), Err(ConfigError::NoToken(_))));
        assert!(matches!(registry.resolve(Some(CUSTOM_TOKEN), Some("  ")), Err(ConfigError::NoToken(_))));

        let single = TokenRegistry::parse("only:tok").unwrap();
        assert_eq!(single.resolve(None, None).unwrap(), "tok");
    }

    #[test]
    fn test_debug_hides_tokens() {
        let registry = TokenRegistry::parse("guild:secret").unwrap();
        let printed = format!("{registry:?}");
        assert!(printed.contains("guild"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_load_config_from_path() {
        let path = std::env::temp_dir().join(format!("fightstats-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[workers]\nworker_count = 8\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.workers.worker_count, 8);
        assert_eq!(config.remote.max_catalog_pages, 5);
    }
}
