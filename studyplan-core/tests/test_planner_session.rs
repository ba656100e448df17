use chrono::NaiveDate;
use studyplan_core::{
    CompletionOutcome, FileKvStore, Planner, Task, TaskStatus, TaskType, completed_today,
    overdue, subject_progress, todays_agenda,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
}

/// A week of use against the file store: complete, reload, derive views.
#[test]
fn test_session_survives_reload() {
    let dir = tempfile::tempdir().unwrap();

    let mut planner = Planner::load(FileKvStore::new(dir.path()), day(7));
    planner
        .add_tasks(vec![
            Task::new("hw1", "Problem set 4")
                .with_subject("Calculus II")
                .with_due_date("2024-10-05")
                .with_type(TaskType::Assignment),
            Task::new("ss1", "Limits recap")
                .with_subject("Calculus II")
                .with_due_date("2024-10-07")
                .with_type(TaskType::StudySession),
        ])
        .unwrap();

    let out = planner.complete_task("ss1", day(7)).unwrap();
    assert!(matches!(out, CompletionOutcome::Completed { ref reviews, .. } if reviews.len() == 2));

    let planner = Planner::load(FileKvStore::new(dir.path()), day(8));
    let tasks = planner.tasks();
    assert_eq!(tasks.len(), 6);
    assert_eq!(planner.stats().xp, 500);

    // seed tasks (due the 7th) and hw1 are overdue on the 8th
    let late: Vec<_> = overdue(tasks, day(8)).iter().map(|t| t.id.clone()).collect();
    assert_eq!(late, vec!["1", "2", "hw1"]);

    let agenda = todays_agenda(tasks, day(8));
    assert_eq!(agenda.len(), 1);
    assert_eq!(agenda[0].title, "Review: Limits recap");
    assert_eq!(completed_today(tasks, day(7)), 1);

    let calc = subject_progress(tasks)
        .into_iter()
        .find(|p| p.subject == "Calculus II")
        .unwrap();
    // seed task 2 + hw1 + ss1 + two reviews
    assert_eq!((calc.completed_tasks, calc.total_tasks), (1, 5));
    assert_eq!(calc.percent(), 20);

    assert!(tasks.iter().filter(|t| t.status == TaskStatus::Completed).count() == 1);
}

/// A focus session held open across another process's completion keeps both.
#[test]
fn test_focus_credit_keeps_concurrent_completion() {
    let dir = tempfile::tempdir().unwrap();

    let mut focusing = Planner::load(FileKvStore::new(dir.path()), day(7));
    let mut other = Planner::load(FileKvStore::new(dir.path()), day(7));
    other.complete_task("2", day(7)).unwrap();

    focusing.record_focus(25).unwrap();

    let reloaded = Planner::load(FileKvStore::new(dir.path()), day(7));
    let hw = reloaded.tasks().iter().find(|t| t.id == "2").unwrap();
    assert_eq!(hw.status, TaskStatus::Completed);
    // 450 seed + 50 completion + 25 minutes * 2
    assert_eq!(reloaded.stats().xp, 550);
    assert_eq!(reloaded.stats().total_focus_minutes, 145);
}
