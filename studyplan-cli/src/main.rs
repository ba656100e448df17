use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use studyplan_ai::{
    AiError, Connectivity, GeminiClient, ImagePayload, RescheduleSource, generate_tasks, reschedule,
};
use studyplan_core::{
    CompletionOutcome, FileKvStore, FocusTimer, Planner, Task, TimerEvent, TimerMode, completed_today,
    overdue, schedule, subject_progress, todays_agenda,
};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod config;
mod focus;
mod state;

use config::{Config, load_config};
use focus::FocusRunner;

#[derive(Parser, Debug)]
#[command(
    name = "studyplan",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("STUDYPLAN_BUILD_SHA"), ")"),
    about = "Study planner: tasks, reviews, focus sessions and AI syllabus import"
)]
struct Cli {
    /// Treat the network as unavailable (AI commands refuse to run)
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Today's agenda, overdue tasks and stats
    Today,

    /// Every task ordered by due date
    Schedule,

    /// Completion per subject
    Progress,

    /// XP, level, streak, focus minutes and badges
    Stats,

    /// Mark a task completed (study sessions schedule two reviews)
    Complete {
        /// Task id (see `studyplan schedule`)
        id: String,
    },

    /// Turn a syllabus image and/or text into tasks
    Import {
        /// Syllabus photo or screenshot
        #[arg(long)]
        image: Option<PathBuf>,

        /// Syllabus text or notes
        #[arg(long)]
        text: Option<String>,

        /// Read syllabus text from a file
        #[arg(long, conflicts_with = "text")]
        text_file: Option<PathBuf>,
    },

    /// Ask the model for new dates for overdue tasks
    Reschedule,

    /// Run a 25 minute focus session (p = pause/resume, r = reset, q = quit)
    Focus {
        /// Continue into the 5 minute break after the focus interval
        #[arg(long, default_value_t = false)]
        with_break: bool,
    },

    /// Config helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.studyplan/config.toml with defaults
    Init,
    /// Print the effective config (API key redacted)
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config()?;
    let today = studyplan_core::time::today(cfg.storage.timezone.as_deref())?;

    match cli.command {
        Command::Today => show_today(&open_planner(&cfg, today)?, today),
        Command::Schedule => show_schedule(&open_planner(&cfg, today)?),
        Command::Progress => show_progress(&open_planner(&cfg, today)?),
        Command::Stats => show_stats(&open_planner(&cfg, today)?),
        Command::Complete { id } => complete(&mut open_planner(&cfg, today)?, &id, today),
        Command::Import {
            image,
            text,
            text_file,
        } => {
            let text = match text_file {
                Some(p) => Some(
                    std::fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?,
                ),
                None => text,
            };
            let connectivity = connectivity(&cfg, cli.offline).await;
            import(&cfg, &mut open_planner(&cfg, today)?, connectivity, image, text, today).await
        }
        Command::Reschedule => {
            let connectivity = connectivity(&cfg, cli.offline).await;
            reschedule_overdue(&cfg, &mut open_planner(&cfg, today)?, connectivity, today).await
        }
        Command::Focus { with_break } => run_focus(&mut open_planner(&cfg, today)?, with_break).await,
        Command::Config { command } => match command {
            ConfigCommand::Init => {
                match config::init_config()? {
                    config::InitOutcome::Created(p) => println!("Wrote {}", p.display()),
                    config::InitOutcome::Exists(p) => println!("Config already exists: {}", p.display()),
                }
                Ok(())
            }
            ConfigCommand::Show => show_config(&cfg),
        },
    }
}

fn open_planner(cfg: &Config, today: NaiveDate) -> Result<Planner<FileKvStore>> {
    let dir = state::data_dir(cfg)?;
    tracing::debug!(dir = %dir.display(), "opening planner");
    Ok(Planner::load(FileKvStore::new(dir), today))
}

fn print_task(t: &Task) {
    let check = if t.is_completed() { "x" } else { " " };
    let review = if t.is_spaced_repetition() { " (review)" } else { "" };
    println!(
        "[{check}] {} | {} | {} | {} | {}m | {}{review}  id={}",
        t.due_date,
        t.subject,
        t.title,
        t.task_type.as_str(),
        t.duration_minutes,
        t.priority.as_str(),
        t.id
    );
}

fn show_today(planner: &Planner<FileKvStore>, today: NaiveDate) -> Result<()> {
    let tasks = planner.tasks();
    let stats = planner.stats();

    println!("# My day ({today})\n");
    println!(
        "Streak: {} days | Done today: {} | Level {} ({} / {} xp)\n",
        stats.streak,
        completed_today(tasks, today),
        stats.level,
        stats.xp,
        stats.next_level_xp()
    );

    let late = overdue(tasks, today);
    if !late.is_empty() {
        println!("## Overdue ({})\n", late.len());
        for t in &late {
            print_task(t);
        }
        println!("\nRun `studyplan reschedule` to move them.\n");
    }

    println!("## Due today\n");
    let agenda = todays_agenda(tasks, today);
    if agenda.is_empty() {
        println!("Nothing left for today.");
    }
    for t in agenda {
        print_task(t);
    }
    Ok(())
}

fn show_schedule(planner: &Planner<FileKvStore>) -> Result<()> {
    let all = schedule(planner.tasks());
    if all.is_empty() {
        println!("No tasks found. Import a syllabus: studyplan import --text \"...\"");
        return Ok(());
    }
    for t in all {
        print_task(t);
    }
    Ok(())
}

fn show_progress(planner: &Planner<FileKvStore>) -> Result<()> {
    let progress = subject_progress(planner.tasks());
    if progress.is_empty() {
        println!("No subjects added yet.");
        return Ok(());
    }
    for p in progress {
        let pct = p.percent();
        let filled = (pct / 5) as usize;
        println!(
            "{:<24} [{}{}] {}/{} ({}%) {}",
            p.subject,
            "#".repeat(filled),
            ".".repeat(20 - filled),
            p.completed_tasks,
            p.total_tasks,
            pct,
            p.color
        );
    }
    Ok(())
}

fn show_stats(planner: &Planner<FileKvStore>) -> Result<()> {
    let s = planner.stats();
    println!("Level:        {} (next at {} xp)", s.level, s.next_level_xp());
    println!("XP:           {}", s.xp);
    println!("Streak:       {} days", s.streak);
    println!("Focus time:   {} minutes", s.total_focus_minutes);
    println!("Badges:       {}", s.badges.join(", "));
    Ok(())
}

fn complete(planner: &mut Planner<FileKvStore>, id: &str, today: NaiveDate) -> Result<()> {
    match planner.complete_task(id, today)? {
        CompletionOutcome::AlreadyCompleted => println!("Task {id} is already completed."),
        CompletionOutcome::Completed { reviews, badges } => {
            println!("Completed {id}. +{} xp (total {})", studyplan_core::COMPLETION_XP, planner.stats().xp);
            if !reviews.is_empty() {
                println!("Scheduled {} review sessions:", reviews.len());
                for t in planner.tasks().iter().filter(|t| reviews.contains(&t.id)) {
                    print_task(t);
                }
            }
            for b in badges {
                println!("Badge earned: {b}");
            }
        }
    }
    Ok(())
}

async fn import(
    cfg: &Config,
    planner: &mut Planner<FileKvStore>,
    connectivity: Connectivity,
    image: Option<PathBuf>,
    text: Option<String>,
    today: NaiveDate,
) -> Result<()> {
    let image = match image {
        Some(p) => {
            let data = std::fs::read(&p).with_context(|| format!("read {}", p.display()))?;
            Some(ImagePayload::new(ImagePayload::mime_for_path(&p), data))
        }
        None => None,
    };

    let client = GeminiClient::new(&cfg.ai.base_url, &cfg.ai.model, cfg.ai.request_timeout())?;
    let api_key = cfg.ai.resolve_api_key();

    let tasks = match generate_tasks(
        &client,
        connectivity,
        api_key.as_deref(),
        image.as_ref(),
        text.as_deref(),
        today,
    )
    .await
    {
        Ok(tasks) => tasks,
        Err(e @ (AiError::Precondition(_) | AiError::MissingCredential(_))) => bail!("{e}"),
        Err(e) => bail!("Failed to process syllabus. Please try again. ({e})"),
    };

    if tasks.is_empty() {
        println!("The model found no tasks in that syllabus.");
        return Ok(());
    }

    for t in &tasks {
        print_task(t);
    }
    let n = planner.add_tasks(tasks)?;
    println!("\nAdded {n} tasks.");
    Ok(())
}

async fn reschedule_overdue(
    cfg: &Config,
    planner: &mut Planner<FileKvStore>,
    connectivity: Connectivity,
    today: NaiveDate,
) -> Result<()> {
    if !connectivity.is_online() {
        bail!("Smart rescheduling requires an internet connection.");
    }
    let missed = planner.overdue_tasks(today);
    if missed.is_empty() {
        println!("Nothing overdue.");
        return Ok(());
    }

    let client = GeminiClient::new(&cfg.ai.base_url, &cfg.ai.model, cfg.ai.request_timeout())?;
    let api_key = cfg.ai.resolve_api_key();
    let result = reschedule(
        &client,
        connectivity,
        api_key.as_deref(),
        &missed,
        planner.tasks(),
        today,
    )
    .await;

    match result.source {
        RescheduleSource::Unchanged => {
            println!("No API key configured; overdue tasks left as they are.");
            return Ok(());
        }
        RescheduleSource::Fallback => println!("Could not reach the model; moved overdue tasks to tomorrow."),
        RescheduleSource::Model => {}
    }

    for (before, after) in missed.iter().zip(&result.tasks) {
        println!("{} : {} -> {}", after.title, before.due_date, after.due_date);
    }
    planner.apply_reschedule(result.tasks)?;
    Ok(())
}

async fn run_focus(planner: &mut Planner<FileKvStore>, with_break: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut timer = FocusTimer::new();
    timer.toggle();
    let mut runner = FocusRunner::start(timer, tx);

    println!("Focus started. p = pause/resume, r = reset, q = quit");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else { break };
                render_clock(&update.timer);
                match update.event {
                    Some(TimerEvent::FocusCompleted { minutes }) => {
                        focus::play_cue();
                        let badges = planner.record_focus(minutes)?;
                        println!("\nFocus complete: +{minutes} minutes ({} total).", planner.stats().total_focus_minutes);
                        for b in badges {
                            println!("Badge earned: {b}");
                        }
                        if !with_break {
                            break;
                        }
                        println!("Break started.");
                        runner.toggle();
                    }
                    Some(TimerEvent::BreakCompleted) => {
                        println!("\nBreak over.");
                        break;
                    }
                    None => {}
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("read stdin")? {
                    Some(l) => match l.trim() {
                        "p" => runner.toggle(),
                        "r" => runner.reset(),
                        "q" => break,
                        _ => {}
                    },
                    None => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nFocus session abandoned; no minutes credited.");
                break;
            }
        }
    }

    runner.cancel();
    Ok(())
}

fn render_clock(timer: &FocusTimer) {
    let label = match timer.mode() {
        TimerMode::Focus => "Deep work",
        TimerMode::Break => "Break",
    };
    let state = if timer.is_active() { "" } else { " (paused)" };
    print!("\r{label} {} {:>3}%{state}          ", timer.format_clock(), timer.progress_percent());
    let _ = std::io::stdout().flush();
}

fn show_config(cfg: &Config) -> Result<()> {
    println!("config:     {}", config::config_path()?.display());
    println!("data dir:   {}", state::data_dir(cfg)?.display());
    println!("model:      {}", cfg.ai.model);
    println!("base url:   {}", cfg.ai.base_url);
    println!("timezone:   {}", cfg.storage.timezone.as_deref().unwrap_or("(system local)"));
    let key = if cfg.ai.resolve_api_key().is_some() { "set" } else { "missing" };
    println!("api key:    {key} (env {} or ai.api_key)", config::API_KEY_ENV);
    Ok(())
}

/// Online unless `--offline`; otherwise a short TCP probe of the API host.
async fn connectivity(cfg: &Config, offline: bool) -> Connectivity {
    if offline {
        return Connectivity::Offline;
    }
    let Some(addr) = probe_addr(&cfg.ai.base_url) else {
        return Connectivity::Online;
    };
    let probe = tokio::time::timeout(Duration::from_secs(3), tokio::net::TcpStream::connect(addr.as_str())).await;
    let online = matches!(probe, Ok(Ok(_)));
    if !online {
        tracing::warn!(%addr, "connectivity probe failed; treating as offline");
    }
    Connectivity::from_online(online)
}

/// `host:port` for a base URL, defaulting the port by scheme.
fn probe_addr(base_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(base_url).ok()?;
    let host = url.host_str().filter(|h| !h.is_empty())?;
    let port = url.port_or_known_default()?;
    Some(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_addr_defaults_port() {
        assert_eq!(
            probe_addr("https://generativelanguage.googleapis.com").as_deref(),
            Some("generativelanguage.googleapis.com:443")
        );
        assert_eq!(probe_addr("http://localhost:8080/v1").as_deref(), Some("localhost:8080"));
        assert_eq!(probe_addr("http://proxy/").as_deref(), Some("proxy:80"));
        assert_eq!(probe_addr("not a url"), None);
        assert_eq!(probe_addr("file:///tmp/x"), None);
    }

    #[test]
    fn cli_parses_import_flags() {
        let cli = Cli::try_parse_from(["studyplan", "--offline", "import", "--text", "CS 101"]).unwrap();
        assert!(cli.offline);
        assert!(matches!(cli.command, Command::Import { text: Some(ref t), .. } if t == "CS 101"));

        assert!(Cli::try_parse_from(["studyplan", "import", "--text", "a", "--text-file", "b"]).is_err());
    }
}
