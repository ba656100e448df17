//! Persistence bridge: two JSON blobs in a key-value store.
//!
//! Every save rewrites the full snapshot. Reads are best effort: a missing or
//! malformed blob falls back to the seed defaults instead of surfacing
//! partially valid records.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::stats::UserStats;
use crate::task::{Priority, Task, TaskType};
use crate::time::{format_due_date, is_valid_due_date};

pub const TASKS_KEY: &str = "ssp_tasks";
pub const STATS_KEY: &str = "ssp_stats";

/// Minimal get/set blob storage.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let p = self.path_for(key);
        if !p.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        Ok(Some(s))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let p = self.path_for(key);
        // write-then-rename so a crash never leaves a half-written blob
        let tmp = p.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &p).with_context(|| format!("rename to {}", p.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The two example tasks shown on first launch, both due `today`.
pub fn seed_tasks(today: NaiveDate) -> Vec<Task> {
    let due = format_due_date(today);
    vec![
        Task::new("1", "Intro to Psychology Reading")
            .with_subject("Psychology 101")
            .with_due_date(due.clone())
            .with_duration(45)
            .with_type(TaskType::StudySession)
            .with_priority(Priority::Medium),
        Task::new("2", "Calculus Problem Set 3")
            .with_subject("Calculus II")
            .with_due_date(due)
            .with_duration(90)
            .with_type(TaskType::Assignment)
            .with_priority(Priority::High),
    ]
}

pub fn load_tasks(store: &dyn KvStore, today: NaiveDate) -> Vec<Task> {
    let raw = match store.get(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("no persisted tasks; using seed tasks");
            return seed_tasks(today);
        }
        Err(e) => {
            tracing::warn!(error = %e, "reading persisted tasks failed; using seed tasks");
            return seed_tasks(today);
        }
    };

    match parse_tasks(&raw) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!(error = %e, "persisted tasks are malformed; using seed tasks");
            seed_tasks(today)
        }
    }
}

fn parse_tasks(raw: &str) -> Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw).context("parse tasks blob")?;

    let mut seen = HashSet::new();
    for t in &tasks {
        if !seen.insert(t.id.as_str()) {
            anyhow::bail!("duplicate task id '{}'", t.id);
        }
        if !is_valid_due_date(&t.due_date) {
            anyhow::bail!("task '{}' has malformed due date '{}'", t.id, t.due_date);
        }
    }
    Ok(tasks)
}

pub fn save_tasks(store: &dyn KvStore, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string(tasks).context("serialize tasks")?;
    store.set(TASKS_KEY, &json)
}

pub fn load_stats(store: &dyn KvStore) -> UserStats {
    match store.get(STATS_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "persisted stats are malformed; using defaults");
            UserStats::default()
        }),
        Ok(None) => UserStats::default(),
        Err(e) => {
            tracing::warn!(error = %e, "reading persisted stats failed; using defaults");
            UserStats::default()
        }
    }
}

pub fn save_stats(store: &dyn KvStore, stats: &UserStats) -> Result<()> {
    let json = serde_json::to_string(stats).context("serialize stats")?;
    store.set(STATS_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[test]
    fn absent_blob_yields_seed() {
        let store = MemoryKvStore::new();
        let tasks = load_tasks(&store, today());
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.due_date == "2024-05-06"));
        assert_eq!(load_stats(&store), UserStats::default());
    }

    #[test]
    fn round_trip_preserves_order() {
        let store = MemoryKvStore::new();
        let tasks = vec![
            Task::new("b", "second").with_due_date("2024-05-09"),
            Task::new("a", "first").with_due_date("2024-05-01"),
        ];
        save_tasks(&store, &tasks).unwrap();
        assert_eq!(load_tasks(&store, today()), tasks);
    }

    #[test]
    fn malformed_blob_falls_back_to_seed() {
        let store = MemoryKvStore::new();
        store.set(TASKS_KEY, "{not json").unwrap();
        store.set(STATS_KEY, "[1,2,3]").unwrap();
        assert_eq!(load_tasks(&store, today()), seed_tasks(today()));
        assert_eq!(load_stats(&store), UserStats::default());
    }

    #[test]
    fn duplicate_ids_fall_back_to_seed() {
        let store = MemoryKvStore::new();
        let tasks = vec![
            Task::new("x", "one").with_due_date("2024-05-01"),
            Task::new("x", "two").with_due_date("2024-05-02"),
        ];
        save_tasks(&store, &tasks).unwrap();
        assert_eq!(load_tasks(&store, today()), seed_tasks(today()));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path().join("data"));
        assert!(store.get(TASKS_KEY).unwrap().is_none());

        let mut stats = UserStats::default();
        stats.record_focus(25);
        save_stats(&store, &stats).unwrap();
        assert_eq!(load_stats(&store), stats);
        assert!(dir.path().join("data").join("ssp_stats.json").exists());
    }
}
