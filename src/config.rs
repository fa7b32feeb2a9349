//! Configuration for the ltuas client.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LTUAS_BACKEND_URL, LTUAS_POLL_INTERVAL_MS,
//!    LTUAS_SETTLE_DELAY_MS, LTUAS_RESULTS_DIR)
//! 2. Config file (.ltuas/config.yaml, then ~/.ltuas/config.yaml)
//! 3. Defaults (http://localhost:8000, 1000 ms polling, 1500 ms settle delay)
//!
//! Config file discovery:
//! - Searches current directory and parents for .ltuas/config.yaml
//! - Falls back to ~/.ltuas/config.yaml
//! - Paths in config file are relative to the config file's project root

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::PollConfig;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1500;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: Option<PollingConfig>,
    #[serde(default)]
    pub results: Option<ResultsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the inference backend
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    /// Where exported result files go (relative to the project root)
    pub output_dir: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Backend base URL
    pub backend_url: String,
    /// Delay between status polls
    pub poll_interval_ms: u64,
    /// Grace period between success and the results view
    pub settle_delay_ms: u64,
    /// Directory for exported results
    pub results_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            results_dir: PathBuf::from("."),
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Poller timing derived from this configuration
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".ltuas").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let home_config = dirs::home_dir()?.join(".ltuas").join("config.yaml");
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn env_millis(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    env(key)
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of milliseconds, got '{}'", key, v))
        })
        .transpose()
}

/// Merge config file and environment over the defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig::default();

    if let Some((config_path, config)) = file {
        // Project root is the parent of .ltuas/
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        if let Some(url) = config.backend.url {
            resolved.backend_url = url;
        }
        if let Some(polling) = config.polling {
            resolved.poll_interval_ms = polling.interval_ms.unwrap_or(resolved.poll_interval_ms);
            resolved.settle_delay_ms = polling.settle_delay_ms.unwrap_or(resolved.settle_delay_ms);
        }
        if let Some(dir) = config.results.and_then(|r| r.output_dir) {
            resolved.results_dir = resolve_path(&base_dir, &dir);
        }
        resolved.config_file = Some(config_path);
    }

    if let Some(url) = env("LTUAS_BACKEND_URL") {
        resolved.backend_url = url;
    }
    if let Some(ms) = env_millis(&env, "LTUAS_POLL_INTERVAL_MS")? {
        resolved.poll_interval_ms = ms;
    }
    if let Some(ms) = env_millis(&env, "LTUAS_SETTLE_DELAY_MS")? {
        resolved.settle_delay_ms = ms;
    }
    if let Some(dir) = env("LTUAS_RESULTS_DIR") {
        resolved.results_dir = PathBuf::from(dir);
    }

    if resolved.poll_interval_ms == 0 {
        anyhow::bail!("Poll interval must be greater than zero");
    }

    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    resolve(file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let ltuas_dir = temp.path().join(".ltuas");
        std::fs::create_dir_all(&ltuas_dir).unwrap();
        let config_path = ltuas_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve(None, no_env).unwrap();

        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.settle_delay_ms, 1500);
        assert!(config.config_file.is_none());

        let poll = config.poll_config();
        assert_eq!(poll.interval, Duration::from_millis(1000));
        assert_eq!(poll.settle_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
backend:
  url: http://gpu-box:9000
polling:
  interval_ms: 500
results:
  output_dir: results
"#,
        );

        let file = load_config_file(&config_path).unwrap();
        assert_eq!(file.version, "1.0");

        let config = resolve(Some((config_path.clone(), file)), no_env).unwrap();
        assert_eq!(config.backend_url, "http://gpu-box:9000");
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.settle_delay_ms, 1500);
        assert_eq!(config.results_dir, temp.path().join("results"));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            "version: \"1.0\"\nbackend:\n  url: http://from-file:1\n",
        );
        let file = load_config_file(&config_path).unwrap();

        let env: HashMap<&str, &str> = [
            ("LTUAS_BACKEND_URL", "http://from-env:2"),
            ("LTUAS_SETTLE_DELAY_MS", "10"),
        ]
        .into_iter()
        .collect();

        let config = resolve(Some((config_path, file)), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.backend_url, "http://from-env:2");
        assert_eq!(config.settle_delay_ms, 10);
    }

    #[test]
    fn test_invalid_env_number_is_an_error() {
        let err = resolve(None, |k| {
            (k == "LTUAS_POLL_INTERVAL_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("LTUAS_POLL_INTERVAL_MS"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(resolve(None, |k| {
            (k == "LTUAS_POLL_INTERVAL_MS").then(|| "0".to_string())
        })
        .is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "out"),
            PathBuf::from("/home/user/project/out")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
