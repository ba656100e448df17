use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_studyplan_home;

/// Env var checked before `ai.api_key`.
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSection {
    pub model: String,
    pub base_url: String,
    /// Prefer the API_KEY env var; this is a fallback.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Defaults to ~/.studyplan/data
    pub data_dir: Option<String>,
    /// IANA timezone used for "today"; system local time when unset.
    pub timezone: Option<String>,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

impl AiSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// `API_KEY` from the environment, else the config value.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.clone())
    }
}

fn resolve_api_key(env: Option<String>, configured: Option<String>) -> Option<String> {
    env.into_iter()
        .chain(configured)
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
}

/// Written above the serialized defaults by `config init`.
const CONFIG_HEADER: &str = "\
# studyplan configuration
# API_KEY in the environment takes precedence over ai.api_key.

";

pub enum InitOutcome {
    Created(PathBuf),
    Exists(PathBuf),
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_studyplan_home()?.join("config.toml"))
}

/// Config from `~/.studyplan/config.toml`; defaults when the file is absent.
pub fn load_config() -> Result<Config> {
    read_config(&config_path()?)
}

/// Write a commented default config unless one already exists.
pub fn init_config() -> Result<InitOutcome> {
    init_config_at(config_path()?)
}

fn read_config(p: &Path) -> Result<Config> {
    match fs::read_to_string(p) {
        Ok(s) => parse_config(&s).with_context(|| format!("in {}", p.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("read {}", p.display())),
    }
}

fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

fn init_config_at(p: PathBuf) -> Result<InitOutcome> {
    if p.exists() {
        return Ok(InitOutcome::Exists(p));
    }
    let body = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(&p, format!("{CONFIG_HEADER}{body}"))
        .with_context(|| format!("write {}", p.display()))?;
    Ok(InitOutcome::Created(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let cfg = parse_config("[storage]\ntimezone = \"America/Chicago\"\n").unwrap();
        assert_eq!(cfg.storage.timezone.as_deref(), Some("America/Chicago"));
        assert_eq!(cfg.ai.model, "gemini-3-flash-preview");
        assert_eq!(cfg.ai.request_timeout(), Duration::from_secs(60));
        assert!(cfg.ai.api_key.is_none());
    }

    #[test]
    fn default_config_round_trips() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg = parse_config(&s).unwrap();
        assert_eq!(cfg.ai.base_url, "https://generativelanguage.googleapis.com");
    }

    #[test]
    fn init_writes_once_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        assert!(read_config(&p).unwrap().ai.api_key.is_none());

        assert!(matches!(init_config_at(p.clone()).unwrap(), InitOutcome::Created(_)));
        assert!(fs::read_to_string(&p).unwrap().starts_with("# studyplan configuration"));
        assert_eq!(read_config(&p).unwrap().ai.request_timeout_secs, 60);

        fs::write(&p, "[ai]\nmodel = \"custom\"\n").unwrap();
        assert!(matches!(init_config_at(p.clone()).unwrap(), InitOutcome::Exists(_)));
        assert_eq!(read_config(&p).unwrap().ai.model, "custom");
    }

    #[test]
    fn malformed_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[ai\n").unwrap();
        let err = format!("{:#}", read_config(&p).unwrap_err());
        assert!(err.contains(&p.display().to_string()));
    }

    #[test]
    fn env_key_wins_and_blank_is_ignored() {
        assert_eq!(
            resolve_api_key(Some("env-key".into()), Some("cfg-key".into())).as_deref(),
            Some("env-key")
        );
        assert_eq!(
            resolve_api_key(Some("  ".into()), Some("cfg-key".into())).as_deref(),
            Some("cfg-key")
        );
        assert_eq!(resolve_api_key(None, Some("".into())), None);
    }
}
