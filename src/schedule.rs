//! Dose-window evaluation for scheduled medications.
//!
//! Pure decision logic for the nurse rounds screen: given a medication's
//! scheduled times of day and its administration history, decide whether a
//! dose may be given at a particular instant, and otherwise report the next
//! upcoming slot. The clock is always an explicit parameter; nothing here
//! reads wall time or touches the store.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::AdministrationStatus;
use crate::models::AdministrationEvent;

/// A nurse may administer within this many minutes of a scheduled time.
pub const ADMINISTER_WINDOW_MINUTES: u32 = 60;

/// A dose given within this many minutes of a scheduled time marks that
/// slot done for the day. Wider than the administer window on purpose:
/// a late or early dose still counts against its slot.
pub const SATISFIED_WINDOW_MINUTES: u32 = 120;

const MINUTES_PER_DAY: u32 = 1440;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid schedule time (expected HH:MM, 24-hour): {0}")]
    InvalidScheduleFormat(String),
}

/// A time of day a dose is due, stored as minutes since midnight.
/// Parses from and serialises to the `"HH:MM"` 24-hour form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleTime(u32);

impl ScheduleTime {
    pub fn minutes(&self) -> u32 {
        self.0
    }
}

impl FromStr for ScheduleTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s, "%H:%M")
            .map_err(|_| ScheduleError::InvalidScheduleFormat(s.into()))?;
        Ok(Self(time.hour() * 60 + time.minute()))
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for ScheduleTime {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ScheduleTime> for String {
    fn from(t: ScheduleTime) -> String {
        t.to_string()
    }
}

/// Parse a list of raw `"HH:MM"` strings into schedule times, preserving
/// input order. Order matters: it is the tie-break for simultaneous matches.
pub fn parse_times(raw: &[String]) -> Result<Vec<ScheduleTime>, ScheduleError> {
    raw.iter().map(|s| s.parse()).collect()
}

/// Outcome of a dose-window evaluation.
///
/// `allowed = false` is a normal result (dose not due yet), never an error;
/// callers must not treat it as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseEvaluation {
    pub allowed: bool,
    /// The scheduled time this administration would satisfy (set iff allowed
    /// and the medication has a fixed schedule).
    pub matched_time: Option<ScheduleTime>,
    /// The soonest upcoming slot (set iff not allowed).
    pub next_time: Option<ScheduleTime>,
    pub reason: String,
}

/// Decide whether a dose may be administered at `now`.
///
/// A scheduled time already satisfied by an `administered` event from the
/// same calendar day (within [`SATISFIED_WINDOW_MINUTES`], measured on the
/// 1440-minute ring) is skipped and cannot be matched again. An unsatisfied
/// time within [`ADMINISTER_WINDOW_MINUTES`] of `now` allows the dose; the
/// first such time in input order wins. Otherwise the result carries the
/// slot with the smallest forward gap from `now`, wrapping past midnight.
pub fn evaluate(
    scheduled_times: &[ScheduleTime],
    history: &[AdministrationEvent],
    now: NaiveDateTime,
) -> DoseEvaluation {
    if scheduled_times.is_empty() {
        return DoseEvaluation {
            allowed: true,
            matched_time: None,
            next_time: None,
            reason: "No fixed schedule".into(),
        };
    }

    let today = now.date();
    let now_minutes = minutes_of(now.time());

    let administered_today: Vec<u32> = history
        .iter()
        .filter(|e| e.status == AdministrationStatus::Administered && e.given_at.date() == today)
        .map(|e| minutes_of(e.given_at.time()))
        .collect();

    for &slot in scheduled_times {
        let satisfied = administered_today
            .iter()
            .any(|&given| ring_distance(given, slot.minutes()) <= SATISFIED_WINDOW_MINUTES);
        if satisfied {
            continue;
        }
        if now_minutes.abs_diff(slot.minutes()) <= ADMINISTER_WINDOW_MINUTES {
            return DoseEvaluation {
                allowed: true,
                matched_time: Some(slot),
                next_time: None,
                reason: format!("Within allowed window for {slot}"),
            };
        }
    }

    // Not due: report the soonest upcoming slot. Strict `<` keeps the first
    // slot in input order when two gaps are equal.
    let mut next = scheduled_times[0];
    let mut best_gap = forward_gap(now_minutes, next.minutes());
    for &slot in &scheduled_times[1..] {
        let gap = forward_gap(now_minutes, slot.minutes());
        if gap < best_gap {
            next = slot;
            best_gap = gap;
        }
    }

    DoseEvaluation {
        allowed: false,
        matched_time: None,
        next_time: Some(next),
        reason: format!(
            "Next dose due at {next} (in {}h {}m)",
            best_gap / 60,
            best_gap % 60
        ),
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Shortest distance between two times of day on the 1440-minute ring.
fn ring_distance(a: u32, b: u32) -> u32 {
    let d = a.abs_diff(b);
    d.min(MINUTES_PER_DAY - d)
}

/// Minutes until the next occurrence of `scheduled`, wrapping past midnight.
/// A slot exactly at `now` yields 0.
fn forward_gap(now: u32, scheduled: u32) -> u32 {
    (scheduled + MINUTES_PER_DAY - now) % MINUTES_PER_DAY
}
