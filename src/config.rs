use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::controller::Pacing;
use crate::core::validation::LinkPolicy;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5001";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub link: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// 업로드 후 중간 화면에 머무는 최소 시간 (밀리초).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PacingConfig {
    pub uploaded_ms: u64,
    pub analyzing_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            uploaded_ms: 2000,
            analyzing_ms: 2000,
        }
    }
}

impl PacingConfig {
    pub fn pacing(&self) -> Pacing {
        Pacing {
            uploaded: Duration::from_millis(self.uploaded_ms),
            analyzing: Duration::from_millis(self.analyzing_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    pub youtube_only: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { youtube_only: true }
    }
}

impl LinkConfig {
    pub fn policy(&self) -> LinkPolicy {
        LinkPolicy {
            youtube_only: self.youtube_only,
        }
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("genrescope")
        .join("config.toml")
}

pub fn load_config() -> Config {
    load_from(&config_path())
}

pub fn save_config(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

/// 파일이 없거나 읽을 수 없으면 기본값을 사용한다.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring invalid config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(e) => {
            warn!("cannot read config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("{}를 만들 수 없습니다", parent.display()))?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("{}에 쓸 수 없습니다", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from(&dir.path().join("nope.toml"));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.server.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.pacing.pacing(), Pacing::default());
        assert!(cfg.link.policy().youtube_only);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.server.base_url = "http://classifier.local:5000".to_string();
        cfg.pacing.uploaded_ms = 0;
        cfg.link.youtube_only = false;

        save_to(&cfg, &path).unwrap();
        assert_eq!(load_from(&path), cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pacing]\nanalyzing_ms = 500\n").unwrap();

        let cfg = load_from(&path);
        assert_eq!(cfg.pacing.uploaded_ms, 2000);
        assert_eq!(cfg.pacing.analyzing_ms, 500);
        assert_eq!(cfg.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = 3").unwrap();
        assert_eq!(load_from(&path), Config::default());
    }
}
