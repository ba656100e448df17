use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::config::Config;

/// `$STUDYPLAN_HOME`, else `~/.studyplan`.
pub fn studyplan_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STUDYPLAN_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".studyplan"))
}

pub fn ensure_studyplan_home() -> Result<PathBuf> {
    let dir = studyplan_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Directory holding the task and stats blobs.
pub fn data_dir(cfg: &Config) -> Result<PathBuf> {
    match cfg.storage.data_dir.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(ensure_studyplan_home()?.join("data")),
    }
}
