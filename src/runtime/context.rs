//! Per-run mutable state.
//!
//! A [`RuntimeContext`] is created fresh for every run, mutated only by the
//! interpreter and handed back to the caller in the run report.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::block_types::Side;
use crate::model::BlockId;

use super::link::MotorCommand;
use super::numeric::{Pid, Smoother};

// ────────────────────────────────────────────────────────────────────────────
// State register
// ────────────────────────────────────────────────────────────────────────────

/// One entry of the state audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTransition {
    pub from: String,
    pub to: String,
    pub reason: String,
    /// Run time at which the transition happened.
    pub at: Duration,
}

/// Named-state register with the reason of the last change and the state
/// before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRegister {
    current: String,
    reason: String,
    previous: Option<String>,
    history: Vec<StateTransition>,
}

impl StateRegister {
    pub fn new(initial: impl Into<String>) -> Self {
        StateRegister {
            current: initial.into(),
            reason: String::new(),
            previous: None,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Overwrite the current state, pushing the old one into `previous`.
    pub fn set(&mut self, name: &str, reason: &str, at: Duration) {
        let old = std::mem::replace(&mut self.current, name.to_string());
        self.reason = reason.to_string();
        self.history.push(StateTransition {
            from: old.clone(),
            to: name.to_string(),
            reason: reason.to_string(),
            at,
        });
        self.previous = Some(old);
    }

    /// Swap current and previous. Returns false when there is no previous state.
    pub fn return_to_previous(&mut self, at: Duration) -> bool {
        let Some(prev) = self.previous.take() else {
            return false;
        };
        let old = std::mem::replace(&mut self.current, prev);
        self.reason = "return".to_string();
        self.history.push(StateTransition {
            from: old.clone(),
            to: self.current.clone(),
            reason: self.reason.clone(),
            at,
        });
        self.previous = Some(old);
        true
    }

    pub fn is(&self, name: &str) -> bool {
        self.current == name
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trace
// ────────────────────────────────────────────────────────────────────────────

/// A recorded motor command with its offset from the start of recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceEntry {
    pub at: Duration,
    pub command: MotorCommand,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Recording {
    started: Option<Duration>,
    span: Duration,
}

/// Two-slot register written by the math blocks. Pythagoras reads both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NumericRegister {
    pub last: f64,
    pub previous: f64,
}

impl NumericRegister {
    pub fn push(&mut self, value: f64) {
        self.previous = self.last;
        self.last = value;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Runtime context
// ────────────────────────────────────────────────────────────────────────────

/// Execution-wide state of one run.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    pub state: StateRegister,
    timer_origin: Duration,
    latches: IndexMap<String, bool>,
    cooldowns: HashMap<BlockId, Duration>,
    trace: Vec<TraceEntry>,
    recording: Recording,
    pids: HashMap<BlockId, (Pid, Option<Duration>)>,
    smoothers: HashMap<BlockId, Smoother>,
    /// cm/s per duty-cycle percent, once a calibration succeeded.
    calibration: Option<f64>,
    pub register: NumericRegister,
    pub laps: u32,
    /// Multiplier applied to motion duty cycles (set-speed block).
    pub speed_scale: f64,
    motors: (f64, f64),
    /// Sensor reads that produced no sample.
    pub transient_failures: u32,
    pub active_block: Option<BlockId>,
}

impl RuntimeContext {
    pub fn new(initial_state: &str, now: Duration) -> Self {
        RuntimeContext {
            state: StateRegister::new(initial_state),
            timer_origin: now,
            latches: IndexMap::new(),
            cooldowns: HashMap::new(),
            trace: Vec::new(),
            recording: Recording::default(),
            pids: HashMap::new(),
            smoothers: HashMap::new(),
            calibration: None,
            register: NumericRegister::default(),
            laps: 0,
            speed_scale: 1.0,
            motors: (0.0, 0.0),
            transient_failures: 0,
            active_block: None,
        }
    }

    // ── timer ───────────────────────────────────────────────────────────

    pub fn reset_timer(&mut self, now: Duration) {
        self.timer_origin = now;
    }

    /// Seconds since the last timer reset (or run start).
    pub fn timer_secs(&self, now: Duration) -> f64 {
        now.saturating_sub(self.timer_origin).as_secs_f64()
    }

    // ── latches ─────────────────────────────────────────────────────────

    pub fn set_latch(&mut self, name: &str, value: bool) {
        self.latches.insert(name.to_string(), value);
    }

    /// Unknown latches read as cleared.
    pub fn latch(&self, name: &str) -> bool {
        self.latches.get(name).copied().unwrap_or(false)
    }

    pub fn latches(&self) -> &IndexMap<String, bool> {
        &self.latches
    }

    // ── cooldowns ───────────────────────────────────────────────────────

    /// Whether block `id` may run its body at `now`, given it must pause for
    /// `pause` between runs. Records `now` as the last run when it may.
    pub fn try_cooldown(&mut self, id: BlockId, pause: Duration, now: Duration) -> bool {
        match self.cooldowns.get(&id) {
            Some(last) if now.saturating_sub(*last) < pause => false,
            _ => {
                self.cooldowns.insert(id, now);
                true
            }
        }
    }

    // ── trace ───────────────────────────────────────────────────────────

    /// Clear the trace and begin recording.
    pub fn start_recording(&mut self, now: Duration) {
        self.trace.clear();
        self.recording = Recording {
            started: Some(now),
            span: Duration::ZERO,
        };
    }

    pub fn stop_recording(&mut self, now: Duration) {
        if let Some(started) = self.recording.started.take() {
            self.recording.span = now.saturating_sub(started);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.started.is_some()
    }

    /// Append `command` if recording is active.
    pub fn record(&mut self, command: MotorCommand, now: Duration) {
        if let Some(started) = self.recording.started {
            self.trace.push(TraceEntry {
                at: now.saturating_sub(started),
                command,
            });
        }
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Length of the last finished recording.
    pub fn recorded_span(&self) -> Duration {
        self.recording.span
    }

    // ── per-block side tables ───────────────────────────────────────────

    /// One PID step for block `id`. `dt` is the time since this block's last
    /// step; `first_dt` stands in on the first step and when no time passed.
    pub fn pid_update(
        &mut self,
        id: BlockId,
        (kp, ki, kd): (f64, f64, f64),
        error: f64,
        now: Duration,
        first_dt: Duration,
    ) -> f64 {
        let (pid, last) = self
            .pids
            .entry(id)
            .or_insert_with(|| (Pid::new(kp, ki, kd), None));
        let dt = match last {
            Some(t) if now > *t => now - *t,
            _ => first_dt,
        };
        *last = Some(now);
        pid.update(error, dt.as_secs_f64())
    }

    pub fn smoother(&mut self, id: BlockId, window: usize) -> &mut Smoother {
        self.smoothers
            .entry(id)
            .or_insert_with(|| Smoother::new(window))
    }

    // ── calibration and motors ──────────────────────────────────────────

    pub fn set_calibration(&mut self, factor: f64) {
        self.calibration = Some(factor);
    }

    pub fn calibration(&self) -> Option<f64> {
        self.calibration
    }

    /// Track the last commanded duty of the drive pair.
    pub fn note_command(&mut self, command: &MotorCommand) {
        match *command {
            MotorCommand::Motor { side: Side::L, duty } => self.motors.0 = duty,
            MotorCommand::Motor { side: Side::R, duty } => self.motors.1 = duty,
            MotorCommand::StopAll => self.motors = (0.0, 0.0),
            MotorCommand::Named { .. } => {}
        }
    }

    /// Last commanded `(left, right)` duty.
    pub fn motors(&self) -> (f64, f64) {
        self.motors
    }

    /// Estimated ground speed in cm/s from the calibration factor and the mean
    /// absolute drive duty. `None` before a successful calibration.
    pub fn speed_cms(&self) -> Option<f64> {
        let (l, r) = self.motors;
        self.calibration.map(|f| f * (l.abs() + r.abs()) / 2.0)
    }
}
