//! Planner: the owned session state (tasks + stats) and its store.
//!
//! All mutation goes through here. Task mutations write a full snapshot of
//! both blobs; focus credit touches only the stats blob, so a long focus
//! session does not clobber task edits made by another process meanwhile.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::lifecycle::{self, CompletionOutcome};
use crate::stats::UserStats;
use crate::store::{self, KvStore};
use crate::task::{Task, new_task_id};
use crate::time::is_valid_due_date;
use crate::views;

pub struct Planner<S: KvStore> {
    store: S,
    tasks: Vec<Task>,
    stats: UserStats,
}

impl<S: KvStore> Planner<S> {
    /// Hydrate from `store`; absent or malformed blobs give the seed state.
    pub fn load(store: S, today: NaiveDate) -> Self {
        let tasks = store::load_tasks(&store, today);
        let stats = store::load_stats(&store);
        tracing::debug!(tasks = tasks.len(), xp = stats.xp, "planner loaded");
        Self {
            store,
            tasks,
            stats,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn overdue_tasks(&self, today: NaiveDate) -> Vec<Task> {
        views::overdue(&self.tasks, today)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn complete_task(&mut self, task_id: &str, today: NaiveDate) -> Result<CompletionOutcome> {
        let outcome = lifecycle::complete_task(&mut self.tasks, &mut self.stats, task_id, today)?;
        if outcome != CompletionOutcome::AlreadyCompleted {
            self.save()?;
        }
        Ok(outcome)
    }

    /// Credit a finished focus interval. Returns badges newly earned.
    ///
    /// Stats are re-read from the store first and only the stats blob is
    /// written back.
    pub fn record_focus(&mut self, minutes: u32) -> Result<Vec<String>> {
        self.stats = store::load_stats(&self.store);
        let earned = self.stats.record_focus(minutes);
        store::save_stats(&self.store, &self.stats)?;
        Ok(earned)
    }

    /// Append new tasks. An incoming id that collides with a stored one is
    /// replaced with a fresh id so ids stay unique. Rejects the whole batch,
    /// before any change, if a due date is not `YYYY-MM-DD`.
    pub fn add_tasks(&mut self, new_tasks: Vec<Task>) -> Result<usize> {
        if new_tasks.is_empty() {
            return Ok(0);
        }
        check_due_dates(&new_tasks)?;
        let mut ids: HashSet<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let n = new_tasks.len();
        for mut t in new_tasks {
            if !ids.insert(t.id.clone()) {
                t.id = new_task_id();
                ids.insert(t.id.clone());
            }
            self.tasks.push(t);
        }
        self.save()?;
        tracing::info!(added = n, total = self.tasks.len(), "tasks added");
        Ok(n)
    }

    /// Replace stored tasks by id with their rescheduled versions, keeping
    /// their position. Ids not in the store are ignored. A malformed due date
    /// or a repeated id rejects the batch before any change.
    pub fn apply_reschedule(&mut self, rescheduled: Vec<Task>) -> Result<usize> {
        check_due_dates(&rescheduled)?;
        let mut seen = HashSet::new();
        for r in &rescheduled {
            if !seen.insert(r.id.as_str()) {
                bail!("task '{}' appears twice in the reschedule", r.id);
            }
        }

        let mut applied = 0;
        for r in rescheduled {
            if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == r.id) {
                *slot = r;
                applied += 1;
            } else {
                tracing::warn!(task_id = %r.id, "rescheduled task not in store; ignored");
            }
        }
        if applied > 0 {
            self.save()?;
        }
        Ok(applied)
    }

    fn save(&self) -> Result<()> {
        store::save_tasks(&self.store, &self.tasks)?;
        store::save_stats(&self.store, &self.stats)?;
        Ok(())
    }
}

// The store rejects a whole blob with one bad date on load, so never write one.
fn check_due_dates(tasks: &[Task]) -> Result<()> {
    match tasks.iter().find(|t| !is_valid_due_date(&t.due_date)) {
        Some(t) => bail!("task '{}' has malformed due date '{}'", t.id, t.due_date),
        None => Ok(()),
    }
}
