//! Tick-driven countdown over an expedition record.
//!
//! The controller owns the record and the display mode, computes timing on
//! each tick and renders frames into a [`Surface`].

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::record::{ExpeditionRecord, ValidationError};

/// Remaining time below which a frame carries the warning flag.
pub const WARNING_THRESHOLD_SECS: i64 = 24 * 60 * 60;

const OPTIMISTIC_COMPLETE: &str = "Voyage complete! Optimism brought you home early!";
const REALISTIC_COMPLETE: &str = "Voyage complete! Welcome home!";

/// Which end date the countdown targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Realistic,
    Optimistic,
}

impl Mode {
    /// Decode the persisted `"true"`/`"false"` flag. Anything else is realistic.
    pub fn from_flag(flag: &str) -> Self {
        if flag == "true" { Mode::Optimistic } else { Mode::Realistic }
    }

    pub fn as_flag(self) -> &'static str {
        match self {
            Mode::Optimistic => "true",
            Mode::Realistic => "false",
        }
    }
}

/// Errors that make a tick impossible to compute.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CountdownError {
    #[error("target {target} is not after start {start}")]
    TargetNotAfterStart { start: DateTime<Utc>, target: DateTime<Utc> },

    #[error("{0} is not a valid date")]
    InvalidDate(&'static str),
}

/// A duration split for display. Negative durations render as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeParts {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeParts {
    pub fn from_delta(delta: TimeDelta) -> Self {
        let total = delta.num_seconds().max(0);
        Self { days: total / 86_400, hours: (total % 86_400) / 3_600, minutes: (total % 3_600) / 60, seconds: total % 60 }
    }
}

/// Raw timing for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub target: DateTime<Utc>,
    pub elapsed: TimeDelta,
    pub remaining: TimeDelta,
    pub total: TimeDelta,
}

impl Timing {
    /// Compute timing for `record` in `mode` at `now`.
    pub fn compute(record: &ExpeditionRecord, mode: Mode, now: DateTime<Utc>) -> Result<Self, CountdownError> {
        let target = record.target(mode);
        if record.start.timestamp() <= 0 {
            return Err(CountdownError::InvalidDate("start"));
        }
        if target.timestamp() <= 0 {
            return Err(CountdownError::InvalidDate("target"));
        }
        if target <= record.start {
            return Err(CountdownError::TargetNotAfterStart { start: record.start, target });
        }
        Ok(Self { target, elapsed: now - record.start, remaining: target - now, total: target - record.start })
    }

    /// Elapsed share of the total, clamped to `[0, 100]`.
    pub fn progress_percent(&self) -> f64 {
        let total = self.total.num_milliseconds() as f64;
        let elapsed = self.elapsed.num_milliseconds() as f64;
        (elapsed / total * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining <= TimeDelta::zero()
    }

    pub fn is_warning(&self) -> bool {
        self.remaining < TimeDelta::seconds(WARNING_THRESHOLD_SECS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountdownFrame {
    pub mode: Mode,
    pub target: DateTime<Utc>,
    pub elapsed: TimeParts,
    pub remaining: TimeParts,
    pub progress_percent: f64,
    pub warning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteFrame {
    pub mode: Mode,
    pub message: String,
}

/// What a surface is asked to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Frame {
    Countdown(CountdownFrame),
    Complete(CompleteFrame),
}

/// A display target for countdown frames.
pub trait Surface {
    fn render(&mut self, frame: &Frame);
}

/// Surface that keeps only the most recent frame.
#[derive(Debug, Default, Clone)]
pub struct LastFrame(pub Option<Frame>);

impl Surface for LastFrame {
    fn render(&mut self, frame: &Frame) {
        self.0 = Some(frame.clone());
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A countdown frame was rendered.
    Rendered,
    /// The completion frame was rendered on this tick.
    Completed,
    /// Too soon after the previous processed tick.
    Skipped,
    /// Completion already shown; nothing rendered.
    Finished,
    /// No record loaded.
    Idle,
}

/// Result of a mode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Applied(Mode),
    /// Optimistic mode needs a date first; `suggested` is a default to offer.
    NeedsOptimisticDate { suggested: DateTime<Utc> },
}

#[derive(Debug, Clone)]
pub struct CountdownController {
    record: Option<ExpeditionRecord>,
    mode: Mode,
    completed: bool,
    awaiting_optimistic: bool,
    last_tick: Option<DateTime<Utc>>,
    min_interval: TimeDelta,
}

impl CountdownController {
    pub fn new(min_interval: std::time::Duration) -> Self {
        Self {
            record: None,
            mode: Mode::Realistic,
            completed: false,
            awaiting_optimistic: false,
            last_tick: None,
            min_interval: TimeDelta::from_std(min_interval).unwrap_or_default(),
        }
    }

    pub fn record(&self) -> Option<&ExpeditionRecord> {
        self.record.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn awaiting_optimistic_date(&self) -> bool {
        self.awaiting_optimistic
    }

    /// Load a record and mode, as on startup. Optimistic mode without a
    /// date falls back to realistic.
    pub fn load(&mut self, record: ExpeditionRecord, mode: Mode) {
        self.replace_record(record);
        self.mode = if mode == Mode::Optimistic && record.optimistic_end.is_none() { Mode::Realistic } else { mode };
    }

    /// Swap in a new record. Completion is re-evaluated on the next tick.
    pub fn replace_record(&mut self, record: ExpeditionRecord) {
        self.record = Some(record);
        self.completed = false;
        self.last_tick = None;
    }

    pub fn clear(&mut self) {
        self.record = None;
        self.mode = Mode::Realistic;
        self.completed = false;
        self.awaiting_optimistic = false;
        self.last_tick = None;
    }

    /// Process a tick at `now`, rendering into `surface` when something changed.
    pub fn tick_at(&mut self, now: DateTime<Utc>, surface: &mut dyn Surface) -> Result<TickOutcome, CountdownError> {
        let Some(record) = self.record else {
            return Ok(TickOutcome::Idle);
        };
        if self.completed {
            return Ok(TickOutcome::Finished);
        }
        if let Some(last) = self.last_tick {
            if now >= last && now - last < self.min_interval {
                return Ok(TickOutcome::Skipped);
            }
        }
        self.last_tick = Some(now);

        let timing = Timing::compute(&record, self.mode, now)?;
        if timing.is_complete() {
            self.completed = true;
            let message = match (self.mode, record.optimistic_end) {
                (Mode::Optimistic, Some(_)) => OPTIMISTIC_COMPLETE,
                _ => REALISTIC_COMPLETE,
            };
            tracing::info!(mode = ?self.mode, "expedition complete");
            surface.render(&Frame::Complete(CompleteFrame { mode: self.mode, message: message.to_string() }));
            return Ok(TickOutcome::Completed);
        }

        surface.render(&Frame::Countdown(CountdownFrame {
            mode: self.mode,
            target: timing.target,
            elapsed: TimeParts::from_delta(timing.elapsed),
            remaining: TimeParts::from_delta(timing.remaining),
            progress_percent: timing.progress_percent(),
            warning: timing.is_warning(),
        }));
        Ok(TickOutcome::Rendered)
    }

    /// Ask to switch mode. Switching to optimistic without a date opens the prompt.
    pub fn request_mode(&mut self, mode: Mode) -> ModeChange {
        if mode == Mode::Optimistic {
            match self.record {
                None => return ModeChange::Applied(self.mode),
                Some(record) if record.optimistic_end.is_none() => {
                    self.awaiting_optimistic = true;
                    return ModeChange::NeedsOptimisticDate { suggested: record.suggested_optimistic_end() };
                }
                Some(_) => {}
            }
        }
        self.awaiting_optimistic = false;
        self.mode = mode;
        self.last_tick = None;
        ModeChange::Applied(mode)
    }

    /// Accept a date from the optimistic prompt and switch to optimistic mode.
    pub fn supply_optimistic_end(
        &mut self, optimistic: DateTime<Utc>, now: DateTime<Utc>,
    ) -> Result<ExpeditionRecord, ValidationError> {
        let record = self.record.ok_or(ValidationError::MissingField("expedition"))?;
        let updated = record.with_optimistic_end(optimistic, now)?;
        self.record = Some(updated);
        self.mode = Mode::Optimistic;
        self.awaiting_optimistic = false;
        self.completed = false;
        self.last_tick = None;
        Ok(updated)
    }

    /// Dismiss the optimistic prompt. The mode stays realistic.
    pub fn cancel_prompt(&mut self) {
        self.awaiting_optimistic = false;
        self.mode = Mode::Realistic;
    }
}
