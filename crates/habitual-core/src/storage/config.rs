//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Reminder polling interval
//! - Predictor (random forest) parameters
//! - Notification delivery settings
//!
//! Configuration is stored at `~/.config/habitual/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::predictor::ForestParams;

/// Reminder loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Predictor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    /// Unlimited when unset.
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Fixed seed keeps repeated training on the same history reproducible.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Ignore `seed` and draw from OS entropy.
    #[serde(default)]
    pub random_seed: bool,
}

/// Which notifier implementation to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    /// Desktop notifications when the platform supports them, else log.
    #[default]
    Auto,
    Desktop,
    Log,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: NotifierBackend,
    #[serde(default = "default_title")]
    pub title: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habitual/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_n_trees() -> usize {
    100
}
fn default_min_samples_leaf() -> usize {
    1
}
fn default_seed() -> u64 {
    42
}
fn default_true() -> bool {
    true
}
fn default_title() -> String {
    "Habit Reminder".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_depth: None,
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
            random_seed: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: NotifierBackend::Auto,
            title: default_title(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl PredictorConfig {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            seed: (!self.random_seed).then_some(self.seed),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) if value == "null" => serde_json::Value::Null,
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optional: take JSON literals ("null", numbers), else a string
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::load_from(&Self::path()?)?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.save_to(&Self::path()?)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Reject values the scheduler and predictor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("scheduler.poll_interval_secs", self.scheduler.poll_interval_secs as usize),
            ("predictor.n_trees", self.predictor.n_trees),
            ("predictor.min_samples_leaf", self.predictor.min_samples_leaf),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        if self.notifications.title.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "notifications.title".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    /// Set a config value in memory only.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.scheduler.poll_interval_secs, 60);
        assert_eq!(parsed.predictor.seed, 42);
        assert!(!parsed.predictor.random_seed);
        assert_eq!(parsed.predictor.max_depth, None);
        assert_eq!(parsed.notifications.backend, NotifierBackend::Auto);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[predictor]\nn_trees = 10\n").unwrap();
        assert_eq!(parsed.predictor.n_trees, 10);
        assert_eq!(parsed.predictor.min_samples_leaf, 1);
        assert_eq!(parsed.predictor.seed, 42);
        assert_eq!(parsed.predictor.forest_params().seed, Some(42));
        assert_eq!(parsed.notifications.title, "Habit Reminder");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("scheduler.poll_interval_secs").as_deref(), Some("60"));
        assert_eq!(cfg.get("notifications.backend").as_deref(), Some("auto"));
        assert!(cfg.get("scheduler.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "notifications.enabled", "false").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "notifications.enabled").unwrap(),
            &serde_json::Value::Bool(false)
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "scheduler.nonexistent", "1");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "notifications.enabled", "maybe");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn apply_sets_and_clears_optional_values() {
        let mut cfg = Config::default();
        cfg.apply("predictor.max_depth", "4").unwrap();
        assert_eq!(cfg.predictor.max_depth, Some(4));
        cfg.apply("predictor.max_depth", "null").unwrap();
        assert_eq!(cfg.predictor.max_depth, None);

        cfg.apply("predictor.seed", "7").unwrap();
        assert_eq!(cfg.predictor.forest_params().seed, Some(7));
        // The seed itself is required; entropy is opted into with the flag
        assert!(matches!(
            cfg.apply("predictor.seed", "null"),
            Err(ConfigError::InvalidValue { .. })
        ));
        cfg.apply("predictor.random_seed", "true").unwrap();
        assert_eq!(cfg.predictor.forest_params().seed, None);
    }

    #[test]
    fn cleared_max_depth_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.apply("predictor.max_depth", "3").unwrap();
        cfg.apply("predictor.max_depth", "null").unwrap();
        cfg.apply("predictor.random_seed", "true").unwrap();
        cfg.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.predictor.max_depth, None);
        assert!(reloaded.predictor.random_seed);
        assert_eq!(reloaded.predictor.forest_params().seed, None);
    }

    #[test]
    fn apply_rejects_unknown_backend_and_zero_interval() {
        let mut cfg = Config::default();
        assert!(cfg.apply("notifications.backend", "pigeon").is_err());
        assert!(cfg.apply("scheduler.poll_interval_secs", "0").is_err());
        assert_eq!(cfg.scheduler.poll_interval_secs, 60);

        cfg.apply("notifications.backend", "log").unwrap();
        assert_eq!(cfg.notifications.backend, NotifierBackend::Log);
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.predictor.n_trees, 100);

        let mut changed = cfg.clone();
        changed.apply("predictor.n_trees", "25").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().predictor.n_trees, 25);
    }

    #[test]
    fn load_from_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scheduler\npoll_interval_secs = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn forest_params_follow_config() {
        let mut cfg = Config::default();
        cfg.predictor.n_trees = 12;
        let params = cfg.predictor.forest_params();
        assert_eq!(params.n_trees, 12);
        assert_eq!(params.seed, Some(42));

        cfg.predictor.random_seed = true;
        assert_eq!(cfg.predictor.forest_params().seed, None);
    }
}
