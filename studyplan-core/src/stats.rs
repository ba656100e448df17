//! Gamification counters: xp, streak, level, focus minutes and badges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::{format_due_date, parse_due_date};

/// XP awarded per completed task, regardless of type or effort.
pub const COMPLETION_XP: u32 = 50;

/// XP awarded per minute of completed focus.
pub const FOCUS_XP_PER_MINUTE: u32 = 2;

/// XP per level; the next threshold shown to the user is `(level + 1) * 100`.
pub const XP_PER_LEVEL: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub streak: u32,
    pub xp: u32,
    pub total_focus_minutes: u32,
    pub level: u32,
    pub badges: Vec<String>,

    /// Day of the most recent completion, drives the streak.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completion_date: Option<String>,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            streak: 3,
            xp: 450,
            total_focus_minutes: 120,
            level: 4,
            badges: vec!["Early Bird".to_string()],
            last_completion_date: None,
        }
    }
}

pub struct Badge {
    pub id: &'static str,
    pub description: &'static str,
    pub condition: fn(&UserStats) -> bool,
}

pub const BADGES: &[Badge] = &[
    Badge {
        id: "Early Bird",
        description: "Started planning early",
        condition: never,
    },
    Badge {
        id: "Deep Work",
        description: "500 minutes of completed focus",
        condition: deep_work,
    },
    Badge {
        id: "On Fire",
        description: "A 7 day completion streak",
        condition: on_fire,
    },
    Badge {
        id: "Scholar",
        description: "Reached level 10",
        condition: scholar,
    },
];

// Seed-only badge.
fn never(_: &UserStats) -> bool {
    false
}

fn deep_work(s: &UserStats) -> bool {
    s.total_focus_minutes >= 500
}

fn on_fire(s: &UserStats) -> bool {
    s.streak >= 7
}

fn scholar(s: &UserStats) -> bool {
    s.level >= 10
}

impl UserStats {
    /// Credit a completed task. Returns the badges newly earned.
    pub fn record_completion(&mut self, today: NaiveDate) -> Vec<String> {
        self.xp = self.xp.saturating_add(COMPLETION_XP);
        self.bump_streak(today);
        self.refresh()
    }

    /// Credit a completed focus interval. Returns the badges newly earned.
    pub fn record_focus(&mut self, minutes: u32) -> Vec<String> {
        self.total_focus_minutes = self.total_focus_minutes.saturating_add(minutes);
        self.xp = self
            .xp
            .saturating_add(minutes.saturating_mul(FOCUS_XP_PER_MINUTE));
        self.refresh()
    }

    /// XP needed for the next level.
    pub fn next_level_xp(&self) -> u32 {
        (self.level + 1) * XP_PER_LEVEL
    }

    fn bump_streak(&mut self, today: NaiveDate) {
        let last = self
            .last_completion_date
            .as_deref()
            .and_then(|d| parse_due_date(d).ok());

        self.streak = match last {
            Some(d) if d == today => self.streak.max(1),
            Some(d) if d.succ_opt() == Some(today) => self.streak + 1,
            _ => 1,
        };
        self.last_completion_date = Some(format_due_date(today));
    }

    fn refresh(&mut self) -> Vec<String> {
        // Promotion only; a seeded level above xp / 100 is kept.
        self.level = self.level.max(self.xp / XP_PER_LEVEL);

        let mut earned = Vec::new();
        for badge in BADGES {
            if !self.badges.iter().any(|b| b == badge.id) && (badge.condition)(self) {
                self.badges.push(badge.id.to_string());
                earned.push(badge.id.to_string());
            }
        }
        earned
    }
}
