//! studyplan-core: task model, derived views, lifecycle and focus timer for
//! the study planner.

pub mod lifecycle;
pub mod planner;
pub mod stats;
pub mod store;
pub mod task;
pub mod time;
pub mod timer;
pub mod views;

pub use lifecycle::{CompletionOutcome, LifecycleError, complete_task, schedule_reviews};
pub use planner::Planner;
pub use stats::{BADGES, Badge, COMPLETION_XP, UserStats};
pub use store::{FileKvStore, KvStore, MemoryKvStore, load_stats, load_tasks, save_stats, save_tasks};
pub use task::{Priority, Task, TaskStatus, TaskType, new_task_id};
pub use time::{due_date_after, format_due_date, parse_due_date};
pub use timer::{FocusTimer, TimerEvent, TimerMode};
pub use views::{SubjectProgress, completed_today, overdue, schedule, subject_progress, todays_agenda};
