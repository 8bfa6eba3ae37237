use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::city::{self, CityConfig};

/// Fallback for the chat throttle when nothing (or nothing usable) is configured.
pub const DEFAULT_MAX_PROMPTS_PER_MINUTE: u32 = 5;

pub const ENV_API_KEY: &str = "COHERE_API_KEY";
pub const ENV_MAX_PROMPTS: &str = "MAX_PROMPTS_PER_MINUTE";

/// Settings for the Open-Meteo client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSettings {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the chat assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Zero means "use the default".
    #[serde(default = "default_max_prompts")]
    pub max_prompts_per_minute: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            max_prompts_per_minute: default_max_prompts(),
        }
    }
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_chat_base_url() -> String {
    "https://api.cohere.ai".to_string()
}

fn default_chat_model() -> String {
    "command-r-plus".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_prompts() -> u32 {
    DEFAULT_MAX_PROMPTS_PER_MINUTE
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_city = "quito"
///
/// [chat]
/// api_key = "..."
/// max_prompts_per_minute = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Key of the city selected when none is given, e.g. "guayaquil".
    pub default_city: Option<String>,

    #[serde(default)]
    pub weather: WeatherSettings,

    #[serde(default)]
    pub chat: ChatSettings,
}

impl Config {
    /// Resolve the default city, falling back to the first catalogue entry.
    pub fn default_city(&self) -> Result<&'static CityConfig> {
        match self.default_city.as_deref() {
            Some(key) => city::city(key),
            None => Ok(city::default_city()),
        }
    }

    pub fn set_default_city(&mut self, key: &str) -> Result<()> {
        let found = city::city(key)?;
        self.default_city = Some(found.key.to_string());
        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        let trimmed = api_key.trim();
        self.chat.api_key = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn api_key(&self) -> Option<&str> {
        self.chat.api_key.as_deref()
    }

    /// Effective throttle limit; a zero setting falls back to the default.
    pub fn max_prompts_per_minute(&self) -> u32 {
        match self.chat.max_prompts_per_minute {
            0 => DEFAULT_MAX_PROMPTS_PER_MINUTE,
            n => n,
        }
    }

    /// Apply `COHERE_API_KEY` / `MAX_PROMPTS_PER_MINUTE` on top of the file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.set_api_key(key);
        }

        if let Some(raw) = lookup(ENV_MAX_PROMPTS) {
            self.chat.max_prompts_per_minute = match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => DEFAULT_MAX_PROMPTS_PER_MINUTE,
            };
        }
    }

    /// Load config from disk and apply environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut cfg = Self::load()?;
        cfg.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the durable rate-limit log.
    pub fn rate_limit_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("rate_limit.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "clima", "clima-cli")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_public_endpoints() {
        let cfg = Config::default();

        assert_eq!(cfg.weather.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(cfg.chat.base_url, "https://api.cohere.ai");
        assert_eq!(cfg.chat.model, "command-r-plus");
        assert_eq!(cfg.max_prompts_per_minute(), 5);
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn default_city_is_guayaquil_when_unset() {
        let cfg = Config::default();
        assert_eq!(cfg.default_city().unwrap().name, "Guayaquil");
    }

    #[test]
    fn set_default_city_rejects_unknown_key() {
        let mut cfg = Config::default();

        let err = cfg.set_default_city("lima").unwrap_err();
        assert!(err.to_string().contains("Unknown city"));
        assert!(cfg.default_city.is_none());

        cfg.set_default_city("Quito").unwrap();
        assert_eq!(cfg.default_city.as_deref(), Some("quito"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        cfg.apply_env_overrides(env(&[
            ("COHERE_API_KEY", "FROM_ENV"),
            ("MAX_PROMPTS_PER_MINUTE", "10"),
        ]));

        assert_eq!(cfg.api_key(), Some("FROM_ENV"));
        assert_eq!(cfg.max_prompts_per_minute(), 10);
    }

    #[test]
    fn unusable_max_prompts_override_falls_back_to_default() {
        for raw in ["0", "abc", "-3", ""] {
            let mut cfg = Config::default();
            cfg.chat.max_prompts_per_minute = 8;

            cfg.apply_env_overrides(env(&[("MAX_PROMPTS_PER_MINUTE", raw)]));

            assert_eq!(cfg.max_prompts_per_minute(), 5, "override {raw:?}");
        }
    }

    #[test]
    fn blank_api_key_is_treated_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn save_and_load_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_default_city("cuenca").unwrap();
        cfg.set_api_key("KEY".into());
        cfg.chat.max_prompts_per_minute = 10;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_city().unwrap().name, "Cuenca");
        assert_eq!(loaded.api_key(), Some("KEY"));
        assert_eq!(loaded.max_prompts_per_minute(), 10);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.default_city.is_none());
    }

    #[test]
    fn partial_file_fills_in_section_defaults() {
        let cfg: Config = toml::from_str("[chat]\napi_key = \"K\"\n").unwrap();

        assert_eq!(cfg.api_key(), Some("K"));
        assert_eq!(cfg.chat.model, "command-r-plus");
        assert_eq!(cfg.weather.timeout_secs, 30);
    }
}
