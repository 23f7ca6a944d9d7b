//! User configuration: a flat `key = "value"` TOML file edited through
//! `ironlog config`, resolved into typed [`Settings`] with environment
//! overrides on top.

use std::{
    collections::BTreeMap,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_REST_SECONDS;

pub const APP_DIR: &str = "ironlog";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_SERVE_ADDR: &str = "127.0.0.1:8787";

/// Keys the application reads. Anything else is kept but ignored.
pub const KNOWN_KEYS: &[&str] = &[
    "db_path",
    "data_dir",
    "rest_seconds",
    "ai.model",
    "ai.max_tokens",
    "ai.temperature",
    "ai.base_url",
    "serve.addr",
    "log_level",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub map: BTreeMap<String, String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join("config.toml"))
            .context("Could not determine config directory")
    }

    /// Missing file reads as an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let raw = toml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, raw).with_context(|| format!("Failed to write config: {}", path.display()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| anyhow!("config `{key}` = `{raw}` is invalid: {e}"))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
    /// Only ever read from `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub rest_seconds: u32,
    pub ai: AiSettings,
    pub serve_addr: SocketAddr,
    pub log_level: Option<String>,
}

impl Settings {
    pub fn from_env(cfg: &Config) -> Result<Self> {
        let default_data = dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .context("Could not determine data directory")?;
        Self::resolve(cfg, default_data, |k| std::env::var(k).ok())
    }

    /// Precedence: environment, then config file, then built-in default.
    pub fn resolve<F>(cfg: &Config, default_data_dir: PathBuf, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |k: &str| env(k).filter(|v| !v.trim().is_empty());

        let data_dir = env("IRONLOG_DATA_DIR")
            .or_else(|| cfg.get("data_dir").map(str::to_string))
            .map(PathBuf::from)
            .unwrap_or(default_data_dir);

        let db_path = env("IRONLOG_DB")
            .or_else(|| cfg.get("db_path").map(str::to_string))
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("ironlog.db"));

        let rest_seconds = cfg.parsed::<u32>("rest_seconds")?.unwrap_or(DEFAULT_REST_SECONDS);
        if rest_seconds == 0 {
            return Err(anyhow!("config `rest_seconds` must be greater than zero"));
        }

        let defaults = AiSettings::default();
        let ai = AiSettings {
            model: cfg.get("ai.model").map(str::to_string).unwrap_or(defaults.model),
            max_tokens: cfg.parsed("ai.max_tokens")?.unwrap_or(defaults.max_tokens),
            temperature: cfg.parsed("ai.temperature")?.unwrap_or(defaults.temperature),
            base_url: cfg
                .get("ai.base_url")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key: env("ANTHROPIC_API_KEY"),
        };

        let serve_addr = match cfg.parsed::<SocketAddr>("serve.addr")? {
            Some(addr) => addr,
            None => DEFAULT_SERVE_ADDR
                .parse()
                .context("built-in serve address is invalid")?,
        };

        Ok(Self {
            data_dir,
            db_path,
            rest_seconds,
            ai,
            serve_addr,
            log_level: cfg.get("log_level").map(str::to_string),
        })
    }

    /// Where the key/value blobs (session, chat history) live.
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> Config {
        Config {
            map: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    fn resolve(cfg: &Config, env: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> =
            env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::resolve(cfg, PathBuf::from("/data/ironlog"), |k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_without_config() {
        let s = resolve(&Config::default(), &[]).unwrap();
        assert_eq!(s.db_path, PathBuf::from("/data/ironlog/ironlog.db"));
        assert_eq!(s.rest_seconds, 90);
        assert_eq!(s.ai, AiSettings::default());
        assert_eq!(s.serve_addr.port(), 8787);
    }

    #[test]
    fn env_beats_config_file() {
        let c = cfg(&[("db_path", "/cfg/db.sqlite"), ("data_dir", "/cfg")]);
        let s = resolve(
            &c,
            &[("IRONLOG_DB", "/env/db.sqlite"), ("ANTHROPIC_API_KEY", "sk-test")],
        )
        .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/env/db.sqlite"));
        assert_eq!(s.data_dir, PathBuf::from("/cfg"));
        assert_eq!(s.ai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn typed_values_are_validated() {
        assert!(resolve(&cfg(&[("rest_seconds", "soon")]), &[]).is_err());
        assert!(resolve(&cfg(&[("rest_seconds", "0")]), &[]).is_err());
        assert!(resolve(&cfg(&[("serve.addr", "nowhere")]), &[]).is_err());

        let s = resolve(
            &cfg(&[("ai.temperature", "0.2"), ("ai.base_url", "http://localhost:9/")]),
            &[],
        )
        .unwrap();
        assert_eq!(s.ai.temperature, 0.2);
        assert_eq!(s.ai.base_url, "http://localhost:9");
    }

    #[test]
    fn round_trips_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        let c = cfg(&[("ai.model", "other-model"), ("rest_seconds", "120")]);
        c.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), c);
    }
}
