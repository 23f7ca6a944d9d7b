//! Countdown view over the session's absolute rest deadline.
//!
//! Nothing here is persisted. Remaining time is recomputed from the wall clock
//! on every tick, so a countdown survives a restart without drift.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Sub-second tick keeps the displayed seconds from lagging the deadline.
pub const TICK: Duration = Duration::from_millis(100);

/// Whole seconds left until `deadline`, rounded up, never negative.
pub fn remaining_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (deadline - now).num_milliseconds();
    if ms <= 0 { 0 } else { (ms as u64).div_ceil(1000) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining: u64,
    /// True exactly once per deadline: on the first tick that observes zero.
    pub completed: bool,
}

/// Latch that turns a stream of observations into at most one completion per
/// deadline. Observing a different deadline re-arms it.
#[derive(Debug, Default)]
pub struct RestTimer {
    armed_for: Option<DateTime<Utc>>,
    notified: bool,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Tick> {
        let Some(deadline) = deadline else {
            self.armed_for = None;
            self.notified = false;
            return None;
        };

        if self.armed_for != Some(deadline) {
            self.armed_for = Some(deadline);
            self.notified = false;
        }

        let remaining = remaining_seconds(deadline, now);
        let completed = remaining == 0 && !self.notified;
        if completed {
            self.notified = true;
        }

        Some(Tick {
            remaining,
            completed,
        })
    }
}

/// Drive a countdown to `deadline`, calling `on_tick` every `period` until the
/// completing tick has been delivered.
pub async fn run<F>(deadline: DateTime<Utc>, clock: &dyn Clock, period: Duration, mut on_tick: F)
where
    F: FnMut(Tick),
{
    let mut timer = RestTimer::new();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(tick) = timer.tick(Some(deadline), clock.now()) else {
            break;
        };
        on_tick(tick);
        if tick.completed {
            break;
        }
    }
}

/// `m:ss` the way the countdown is displayed.
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
