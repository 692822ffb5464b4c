use std::path::PathBuf;
use std::sync::Arc;

use brigade_core::target::Target;
use brigade_notifications::manager::{ManagerConfig, DEFAULT_MAX_NOTIFICATIONS, DEFAULT_SOUND_VOLUME};
use brigade_stream::config::{parse_or, RegistryConfig};
use brigade_stream::token::{FileToken, StaticToken, TokenProvider};

/// Where the bearer token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Re-read on every connect attempt.
    File(PathBuf),
    Static(String),
    /// No token configured; every connect fails with a missing-token status.
    None,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BRIGADE_API_URL environment variable is required")]
    MissingApiUrl,

    #[error("BRIGADE_TARGETS names no known target: {0:?}")]
    NoTargets(String),
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub api_url: String,
    pub token: TokenSource,
    /// Targets to bind, in order, without duplicates.
    pub targets: Vec<Target>,
    pub registry: RegistryConfig,
    pub notifications: ManagerConfig,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                     | Default           |
    /// |-----------------------------|-------------------|
    /// | `BRIGADE_API_URL`           | required          |
    /// | `BRIGADE_TOKEN_FILE`        | unset             |
    /// | `BRIGADE_TOKEN`             | unset             |
    /// | `BRIGADE_TARGETS`           | `kitchen,service` |
    /// | `BRIGADE_MAX_NOTIFICATIONS` | `50`              |
    /// | `BRIGADE_SOUND_ENABLED`     | `true`            |
    /// | `BRIGADE_SOUND_VOLUME`      | `0.5`             |
    ///
    /// Reconnect and heartbeat tuning is read by
    /// [`RegistryConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("BRIGADE_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiUrl)?;

        let token = match (non_empty(&lookup, "BRIGADE_TOKEN_FILE"), non_empty(&lookup, "BRIGADE_TOKEN")) {
            (Some(path), _) => TokenSource::File(PathBuf::from(path)),
            (None, Some(token)) => TokenSource::Static(token),
            (None, None) => TokenSource::None,
        };

        let targets = match lookup("BRIGADE_TARGETS") {
            Some(raw) => parse_targets(&raw)?,
            None => Target::ALL.to_vec(),
        };

        let notifications = ManagerConfig {
            max_notifications: parse_or(&lookup, "BRIGADE_MAX_NOTIFICATIONS", DEFAULT_MAX_NOTIFICATIONS),
            sound_enabled: parse_or(&lookup, "BRIGADE_SOUND_ENABLED", true),
            sound_volume: parse_or(&lookup, "BRIGADE_SOUND_VOLUME", DEFAULT_SOUND_VOLUME),
        };

        Ok(Self {
            registry: RegistryConfig::from_lookup(api_url.clone(), &lookup),
            api_url,
            token,
            targets,
            notifications,
        })
    }

    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        match &self.token {
            TokenSource::File(path) => Arc::new(FileToken::new(path.clone())),
            TokenSource::Static(token) => Arc::new(StaticToken::new(token.clone())),
            TokenSource::None => {
                tracing::warn!("Neither BRIGADE_TOKEN_FILE nor BRIGADE_TOKEN is set");
                Arc::new(StaticToken::new(""))
            }
        }
    }
}

fn non_empty<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated target list. Unknown names are logged and
/// skipped; duplicates are dropped.
fn parse_targets(raw: &str) -> Result<Vec<Target>, ConfigError> {
    let mut targets = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.parse::<Target>() {
            Ok(target) if !targets.contains(&target) => targets.push(target),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring entry in BRIGADE_TARGETS"),
        }
    }
    if targets.is_empty() {
        return Err(ConfigError::NoTargets(raw.to_string()));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn api_url_is_required() {
        let result = MonitorConfig::from_lookup(lookup(&[("BRIGADE_TOKEN", "t")]));
        assert!(matches!(result, Err(ConfigError::MissingApiUrl)));
    }

    #[test]
    fn defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[("BRIGADE_API_URL", "http://api")]))
            .expect("valid config");
        assert_eq!(config.targets, vec![Target::Kitchen, Target::Service]);
        assert_eq!(config.token, TokenSource::None);
        assert_eq!(config.notifications, ManagerConfig::default());
        assert_eq!(config.registry.base_url, "http://api");
        assert_eq!(config.registry.heartbeat_timeout, Duration::from_secs(45));
    }

    #[test]
    fn token_file_takes_precedence() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("BRIGADE_API_URL", "http://api"),
            ("BRIGADE_TOKEN", "inline"),
            ("BRIGADE_TOKEN_FILE", "/run/brigade/token"),
        ]))
        .expect("valid config");
        assert_eq!(config.token, TokenSource::File(PathBuf::from("/run/brigade/token")));
    }

    #[test]
    fn targets_are_parsed_and_deduplicated() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("BRIGADE_API_URL", "http://api"),
            ("BRIGADE_TARGETS", " Service, bar ,service,kitchen"),
        ]))
        .expect("valid config");
        assert_eq!(config.targets, vec![Target::Service, Target::Kitchen]);
    }

    #[test]
    fn no_valid_target_is_an_error() {
        let result = MonitorConfig::from_lookup(lookup(&[
            ("BRIGADE_API_URL", "http://api"),
            ("BRIGADE_TARGETS", "bar,terrace"),
        ]));
        assert!(matches!(result, Err(ConfigError::NoTargets(_))));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("BRIGADE_API_URL", "http://api"),
            ("BRIGADE_MAX_NOTIFICATIONS", "lots"),
            ("BRIGADE_SOUND_ENABLED", "false"),
            ("BRIGADE_SOUND_VOLUME", "0.2"),
        ]))
        .expect("valid config");
        assert_eq!(config.notifications.max_notifications, 50);
        assert!(!config.notifications.sound_enabled);
        assert_eq!(config.notifications.sound_volume, 0.2);
    }
}
