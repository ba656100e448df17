//! Async driver for the focus timer.
//!
//! A spawned task ticks the [`FocusTimer`] once per second and reports every
//! change over a channel. The task is aborted by [`FocusRunner::cancel`] or
//! when the runner is dropped, so no tick fires after its owner is gone.

use std::io::Write;
use std::time::Duration;
use studyplan_core::{FocusTimer, TimerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Toggle,
    Reset,
}

/// Timer state after a tick or command, with the event it produced.
#[derive(Debug, Clone, Copy)]
pub struct TimerUpdate {
    pub timer: FocusTimer,
    pub event: Option<TimerEvent>,
}

pub struct FocusRunner {
    cmd_tx: mpsc::UnboundedSender<TimerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl FocusRunner {
    pub fn start(timer: FocusTimer, updates: mpsc::UnboundedSender<TimerUpdate>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_timer(timer, cmd_rx, updates));
        Self {
            cmd_tx,
            handle: Some(handle),
        }
    }

    pub fn toggle(&self) {
        let _ = self.cmd_tx.send(TimerCommand::Toggle);
    }

    pub fn reset(&self) {
        let _ = self.cmd_tx.send(TimerCommand::Reset);
    }

    pub fn cancel(&mut self) {
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }
}

impl Drop for FocusRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_timer(
    mut timer: FocusTimer,
    mut cmd_rx: mpsc::UnboundedReceiver<TimerCommand>,
    updates: mpsc::UnboundedSender<TimerUpdate>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    interval.tick().await;

    loop {
        let update = tokio::select! {
            _ = interval.tick() => {
                if !timer.is_active() {
                    continue;
                }
                let event = timer.tick();
                TimerUpdate { timer, event }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(TimerCommand::Toggle) => timer.toggle(),
                    Some(TimerCommand::Reset) => timer.reset(),
                    None => break,
                }
                TimerUpdate { timer, event: None }
            }
        };

        if updates.send(update).is_err() {
            break;
        }
    }
    tracing::debug!("focus timer task finished");
}

/// Completion cue. Best effort; failures are ignored.
pub fn play_cue() {
    let mut out = std::io::stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}
