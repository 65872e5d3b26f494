//! The execution engine.
//!
//! [`Interpreter`] walks a [`Program`] depth-first, left to right, and turns
//! every block into motor commands, sensor polls and context updates. It runs
//! on the caller's thread; [`Engine::start`] moves one onto a dedicated thread
//! and hands back a [`RunHandle`] for stopping it and observing progress.
//!
//! # Suspension
//!
//! Only waiting, ramping and polling blocks suspend. Each suspension sleeps at
//! most one tick and then passes a checkpoint that
//!
//! - honours a pending stop request,
//! - retries commands the sink rejected transiently,
//! - checks the enclosing timeout scopes, outermost first.
//!
//! Control leaves the walk through [`Interrupt`] values propagated with `?`,
//! so a stop or an expired timeout unwinds every nested block at once.
//!
//! # Termination
//!
//! Whatever the outcome, the last thing the engine does to the sink is
//! `stop_all`, and exactly one terminal [`RunEvent`] is published.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::block_types::{BlockKind, Comparator, MotorId, SensorPort, Side, TurnDirection};
use crate::config::EngineConfig;
use crate::error::{EngineError, LinkError, RunFailure};
use crate::model::{BlockId, BlockNode, Program};

use super::clock::Clock;
use super::context::RuntimeContext;
use super::link::{CommandSink, MotorCommand, SensorSource};
use super::numeric::{clamp_duty, path_length, pythagoras, speed_from_distance_time};

// ────────────────────────────────────────────────────────────────────────────
// Observer interface
// ────────────────────────────────────────────────────────────────────────────

/// Progress published while a run executes.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started,
    /// The block now executing, published on entry and once per tick while it
    /// suspends; `None` once the run is over.
    Active(Option<BlockId>),
    Completed,
    Stopped,
    Failed(RunFailure),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed(RunFailure),
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::Stopped => f.write_str("stopped"),
            RunOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Final result of a run, with the context it left behind.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub context: RuntimeContext,
    pub started: Duration,
    pub finished: Duration,
}

impl RunReport {
    pub fn elapsed(&self) -> Duration {
        self.finished.saturating_sub(self.started)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Interpreter
// ────────────────────────────────────────────────────────────────────────────

/// Reason the walk is unwinding.
#[derive(Debug)]
enum Interrupt {
    Stop,
    /// The timeout scope at this depth fired.
    Abort(usize),
    Fatal(LinkError),
}

type Flow = Result<(), Interrupt>;

/// Condition and deadline of an active timeout-do-until block.
#[derive(Debug, Clone, Copy)]
struct AbortScope {
    port: SensorPort,
    comparator: Comparator,
    threshold: f64,
    deadline: Duration,
}

#[derive(Debug, Clone, Copy)]
struct PendingSend {
    command: MotorCommand,
    retries: u32,
}

/// Runs one program against a command sink and a sensor source.
pub struct Interpreter {
    program: Arc<Program>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    sink: Box<dyn CommandSink>,
    sensors: Box<dyn SensorSource>,
    stop: Arc<AtomicBool>,
    events: Option<Sender<RunEvent>>,
    ctx: RuntimeContext,
    scopes: Vec<AbortScope>,
    pending: VecDeque<PendingSend>,
}

impl Interpreter {
    pub fn new(
        program: Program,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        sink: Box<dyn CommandSink>,
        sensors: Box<dyn SensorSource>,
    ) -> Self {
        let ctx = RuntimeContext::new(&config.initial_state, clock.now());
        Interpreter {
            program: Arc::new(program),
            config,
            clock,
            sink,
            sensors,
            stop: Arc::new(AtomicBool::new(false)),
            events: None,
            ctx,
            scopes: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Publish run events on `tx`.
    pub fn with_events(mut self, tx: Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Flag that stops the run at its next suspension point once set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Execute the program to completion, stop or failure.
    pub fn run(mut self) -> RunReport {
        let started = self.clock.now();
        self.ctx.reset_timer(started);
        info!(blocks = self.program.len(), "run started");
        self.emit(RunEvent::Started);

        self.enter(self.program.start_id());
        let program = Arc::clone(&self.program);
        let result = self.run_sequence(program.top());

        let now = self.clock.now();
        self.ctx.stop_recording(now);
        let outcome = match result {
            Ok(()) => RunOutcome::Completed,
            Err(Interrupt::Stop) => RunOutcome::Stopped,
            Err(Interrupt::Abort(depth)) => {
                warn!(depth, "timeout scope escaped the walk");
                RunOutcome::Completed
            }
            Err(Interrupt::Fatal(err)) => {
                error!(%err, "collaborator failure, aborting run");
                RunOutcome::Failed(RunFailure::from(err))
            }
        };
        self.halt();

        self.ctx.active_block = None;
        self.emit(RunEvent::Active(None));
        self.emit(match &outcome {
            RunOutcome::Completed => RunEvent::Completed,
            RunOutcome::Stopped => RunEvent::Stopped,
            RunOutcome::Failed(reason) => RunEvent::Failed(reason.clone()),
        });

        let finished = self.clock.now();
        info!(%outcome, elapsed_ms = finished.saturating_sub(started).as_millis() as u64, "run finished");
        RunReport {
            outcome,
            context: self.ctx,
            started,
            finished,
        }
    }

    // ── walk ────────────────────────────────────────────────────────────

    fn run_sequence(&mut self, ids: &[BlockId]) -> Flow {
        for id in ids {
            self.exec(*id)?;
        }
        Ok(())
    }

    fn exec(&mut self, id: BlockId) -> Flow {
        let program = Arc::clone(&self.program);
        let Some(node) = program.get(id) else {
            return Ok(());
        };
        self.enter(id);
        debug!(kind = %node.kind, %id, "block");
        let scale = self.ctx.speed_scale;

        match node.kind {
            BlockKind::StartHat => Ok(()),

            // ── motion ──
            BlockKind::RobotMove => self.drive(node.number(0) * scale, node.number(1) * scale),
            BlockKind::RobotMoveSoft => {
                let target = node.number(0) * scale;
                self.ramp(target, target, secs(node.number(1)))
            }
            BlockKind::RobotTurn => {
                let dir = TurnDirection::from_choice(node.text(0)).unwrap_or(TurnDirection::Left);
                let (l, r) = dir.differential(self.config.turn_duty * scale);
                self.drive(l, r)?;
                self.wait(secs(node.number(1)))?;
                self.send(MotorCommand::StopAll)
            }
            BlockKind::RobotSetSpeed => {
                self.ctx.speed_scale = node.number(0) / 100.0;
                Ok(())
            }
            BlockKind::RobotStop => self.send(MotorCommand::StopAll),
            BlockKind::MotorSingle => {
                let motor = MotorId::from_choice(node.text(0)).unwrap_or(MotorId::A);
                let duty = clamp_duty(node.number(1) * scale);
                self.send(MotorCommand::Named { motor, duty })
            }
            BlockKind::GoHome => {
                let duty = -self.config.home_duty * scale;
                self.ramp(duty, duty, self.config.home_ramp())?;
                self.send(MotorCommand::StopAll)
            }

            // ── trace and start line ──
            BlockKind::RecordStart => {
                self.ctx.start_recording(self.clock.now());
                debug!("recording started");
                Ok(())
            }
            BlockKind::ReplayTrack => self.replay(1),
            BlockKind::ReplayLoop => self.replay(count(node.number(0))),
            BlockKind::WaitStart => self.wait_for_line(),
            BlockKind::StopAtStart => {
                self.wait_for_line()?;
                self.send(MotorCommand::StopAll)
            }
            BlockKind::CountLaps => self.count_laps(count(node.number(0))),
            BlockKind::Autopilot => self.autopilot(node),

            // ── sequencing ──
            BlockKind::WaitSeconds => self.wait(secs(node.number(0))),
            BlockKind::LoopForever => loop {
                self.pass(id, &node.body)?;
            },
            BlockKind::LoopRepeat => self.loop_repeat(node, count(node.number(0)), None),
            BlockKind::LoopRepeatPause => {
                self.loop_repeat(node, count(node.number(0)), Some(secs(node.number(1))))
            }
            BlockKind::LoopEverySec => self.loop_every(node, secs(node.number(0))),
            BlockKind::TimerReset => {
                self.ctx.reset_timer(self.clock.now());
                Ok(())
            }

            // ── sensing ──
            BlockKind::WaitUntilSensor => {
                let port = port_at(node, 0);
                let cmp = comparator_at(node, 1);
                let threshold = node.number(2);
                self.poll_until(port, |v, _| cmp.holds(v, threshold))
            }

            // ── math ──
            BlockKind::TimerGet => {
                let t = self.ctx.timer_secs(self.clock.now());
                self.store(t);
                Ok(())
            }
            BlockKind::MathPid => self.pid_step(node),
            BlockKind::MathSmooth => self.smooth_step(node),
            BlockKind::MathPythagoras => {
                let reg = self.ctx.register;
                self.store(pythagoras(reg.previous, reg.last));
                Ok(())
            }
            BlockKind::MathPathVt => {
                let speed = self.calibrated_speed();
                let t = self.ctx.timer_secs(self.clock.now());
                self.store(path_length(speed, t));
                Ok(())
            }
            BlockKind::MathSpeedCms => {
                let speed = self.calibrated_speed();
                self.store(speed);
                Ok(())
            }
            BlockKind::CalibrateSpeed => self.calibrate(node),

            // ── state machine ──
            BlockKind::StateSet => {
                self.set_state(node.text(0), "");
                Ok(())
            }
            BlockKind::StateSetReason => {
                self.set_state(node.text(0), node.text(1));
                Ok(())
            }
            BlockKind::StatePrev => {
                let now = self.clock.now();
                if self.ctx.state.return_to_previous(now) {
                    debug!(state = self.ctx.state.current(), "returned to previous state");
                } else {
                    warn!(state = self.ctx.state.current(), "no previous state to return to");
                }
                Ok(())
            }
            BlockKind::StateIf => {
                if self.ctx.state.is(node.text(0)) {
                    self.run_sequence(&node.body)
                } else {
                    self.run_sequence(&node.else_body)
                }
            }

            // ── smart conditions ──
            BlockKind::WaitUntilTrueFor => {
                let port = port_at(node, 0);
                let cmp = comparator_at(node, 1);
                let threshold = node.number(2);
                let hold = secs(node.number(3));
                let mut since: Option<Duration> = None;
                self.poll_until(port, |v, now| {
                    if cmp.holds(v, threshold) {
                        let start = *since.get_or_insert(now);
                        now.saturating_sub(start) >= hold
                    } else {
                        since = None;
                        false
                    }
                })
            }
            BlockKind::TimeoutDoUntil => self.timeout_do_until(node),
            BlockKind::CooldownDo => {
                let pause = secs(node.number(0));
                if self.ctx.try_cooldown(id, pause, self.clock.now()) {
                    self.run_sequence(&node.body)
                } else {
                    debug!(%id, "cooling down, body skipped");
                    Ok(())
                }
            }
            BlockKind::LatchSet => {
                self.ctx.set_latch(node.text(0), true);
                Ok(())
            }
            BlockKind::LatchReset => {
                self.ctx.set_latch(node.text(0), false);
                Ok(())
            }
        }
    }

    /// One pass over a looping body. A pass shorter than a tick sleeps out the
    /// rest of it, so a body that never suspends runs once per tick.
    fn pass(&mut self, id: BlockId, body: &[BlockId]) -> Flow {
        self.enter(id);
        let before = self.clock.now();
        self.run_sequence(body)?;
        let spent = self.clock.now().saturating_sub(before);
        let rest = self.config.tick().saturating_sub(spent);
        if rest.is_zero() {
            self.checkpoint()
        } else {
            self.sleep_step(rest)
        }
    }

    fn loop_repeat(&mut self, node: &BlockNode, times: u32, pause: Option<Duration>) -> Flow {
        for i in 0..times {
            if i > 0 {
                if let Some(pause) = pause {
                    self.enter(node.id);
                    self.wait(pause)?;
                }
            }
            self.enter(node.id);
            debug!(iteration = i + 1, of = times, "loop");
            self.run_sequence(&node.body)?;
            self.checkpoint()?;
        }
        Ok(())
    }

    fn loop_every(&mut self, node: &BlockNode, period: Duration) -> Flow {
        let period = period.max(self.config.tick());
        let mut next = self.clock.now();
        loop {
            self.enter(node.id);
            self.run_sequence(&node.body)?;
            next += period;
            let now = self.clock.now();
            if now > next {
                let mut skipped = 0u32;
                while next < now {
                    next += period;
                    skipped += 1;
                }
                debug!(skipped, "loop-every body overran its period");
            }
            self.wait_until(next)?;
        }
    }

    fn timeout_do_until(&mut self, node: &BlockNode) -> Flow {
        let depth = self.scopes.len();
        let max = secs(node.number(3));
        self.scopes.push(AbortScope {
            port: port_at(node, 0),
            comparator: comparator_at(node, 1),
            threshold: node.number(2),
            deadline: self.clock.now() + max,
        });
        let result = self.scoped_body(node);
        self.scopes.truncate(depth);
        match result {
            Err(Interrupt::Abort(d)) if d == depth => {
                debug!(id = %node.id, "timeout-do-until finished");
                Ok(())
            }
            other => other,
        }
    }

    fn scoped_body(&mut self, node: &BlockNode) -> Flow {
        self.checkpoint()?;
        loop {
            self.pass(node.id, &node.body)?;
        }
    }

    // ── trace and start line ────────────────────────────────────────────

    fn replay(&mut self, times: u32) -> Flow {
        self.ctx.stop_recording(self.clock.now());
        let trace = self.ctx.trace().to_vec();
        let span = self.ctx.recorded_span();
        if trace.is_empty() {
            debug!("nothing recorded, replay skipped");
            return Ok(());
        }
        for round in 0..times {
            debug!(round = round + 1, of = times, commands = trace.len(), "replay");
            let origin = self.clock.now();
            for entry in &trace {
                self.wait_until(origin + entry.at)?;
                self.send(entry.command)?;
            }
            self.wait_until(origin + span)?;
        }
        self.send(MotorCommand::StopAll)
    }

    fn wait_for_line(&mut self) -> Flow {
        let threshold = self.config.line_threshold;
        self.poll_until(self.config.line_port(), |v, _| f64::from(v) < threshold)
    }

    fn count_laps(&mut self, target: u32) -> Flow {
        let threshold = self.config.line_threshold;
        let mut was_seen: Option<bool> = None;
        let mut counted = 0u32;
        let result = self.poll_until(self.config.line_port(), |v, _| {
            let seen = f64::from(v) < threshold;
            if was_seen == Some(false) && seen {
                counted += 1;
            }
            was_seen = Some(seen);
            counted >= target
        });
        self.ctx.laps += counted;
        info!(laps = self.ctx.laps, "lap count updated");
        result
    }

    fn autopilot(&mut self, node: &BlockNode) -> Flow {
        let port = port_at(node, 0);
        let dir = TurnDirection::from_choice(node.text(1)).unwrap_or(TurnDirection::Right);
        let threshold = node.number(2);
        let speed = node.number(3) * self.ctx.speed_scale;
        let mut avoiding: Option<bool> = None;
        self.checkpoint()?;
        loop {
            if let Some(v) = self.read(port)? {
                let avoid = f64::from(v) < threshold;
                if avoiding != Some(avoid) {
                    avoiding = Some(avoid);
                    debug!(avoid, reading = v, "autopilot");
                    let (l, r) = if avoid {
                        dir.differential(speed)
                    } else {
                        (speed, speed)
                    };
                    self.drive(l, r)?;
                }
            }
            self.sleep_step(self.config.tick())?;
        }
    }

    // ── math ────────────────────────────────────────────────────────────

    fn store(&mut self, value: f64) {
        debug!(value, "register");
        self.ctx.register.push(value);
    }

    fn calibrated_speed(&self) -> f64 {
        self.ctx.speed_cms().unwrap_or_else(|| {
            warn!("speed requested before calibration");
            0.0
        })
    }

    fn pid_step(&mut self, node: &BlockNode) -> Flow {
        let Some(sample) = self.read(self.config.primary_port())? else {
            return Ok(());
        };
        let error = self.config.pid_setpoint - f64::from(sample);
        let gains = (node.number(0), node.number(1), node.number(2));
        let out = self
            .ctx
            .pid_update(node.id, gains, error, self.clock.now(), self.config.tick());
        self.store(out);
        let base = self.config.pid_base_duty;
        self.drive(base + out, base - out)
    }

    fn smooth_step(&mut self, node: &BlockNode) -> Flow {
        let sample = self.read(self.config.primary_port())?;
        let smoother = self.ctx.smoother(node.id, count(node.number(0)) as usize);
        let mean = match sample {
            Some(v) => smoother.push(f64::from(v)),
            None => match smoother.mean() {
                Some(mean) => mean,
                None => return Ok(()),
            },
        };
        self.store(mean);
        Ok(())
    }

    fn calibrate(&mut self, node: &BlockNode) -> Flow {
        let distance = node.number(0);
        let port = port_at(node, 1);
        let threshold = node.number(2);
        let speed = node.number(3);
        let start = self.clock.now();
        let deadline = start + self.config.calibration_timeout();

        self.drive(speed, speed)?;
        self.checkpoint()?;
        let mut fired = false;
        loop {
            if let Some(v) = self.read(port)? {
                if f64::from(v) < threshold {
                    fired = true;
                    break;
                }
            }
            let now = self.clock.now();
            if now >= deadline {
                break;
            }
            self.sleep_step(deadline - now)?;
        }
        let elapsed = self.clock.now().saturating_sub(start);
        self.send(MotorCommand::StopAll)?;

        if !fired {
            warn!(timeout_ms = self.config.calibration_timeout_ms, "calibration timed out");
            return Ok(());
        }
        match speed_from_distance_time(distance, elapsed.as_secs_f64()) {
            Some(cms) if speed > 0.0 => {
                let factor = cms / speed;
                info!(factor, cms, "speed calibrated");
                self.ctx.set_calibration(factor);
            }
            _ => warn!("calibration produced no usable measurement"),
        }
        Ok(())
    }

    // ── state ───────────────────────────────────────────────────────────

    fn set_state(&mut self, name: &str, reason: &str) {
        debug!(from = self.ctx.state.current(), to = name, reason, "state");
        self.ctx.state.set(name, reason, self.clock.now());
    }

    // ── suspension ──────────────────────────────────────────────────────

    fn wait(&mut self, duration: Duration) -> Flow {
        let deadline = self.clock.now() + duration;
        self.wait_until(deadline)
    }

    fn wait_until(&mut self, deadline: Duration) -> Flow {
        self.checkpoint()?;
        loop {
            let now = self.clock.now();
            if now >= deadline {
                return Ok(());
            }
            self.sleep_step(deadline - now)?;
        }
    }

    /// Poll `port` once per tick until `done(reading, now)` holds. Reads that
    /// produce no sample are skipped.
    fn poll_until<F>(&mut self, port: SensorPort, mut done: F) -> Flow
    where
        F: FnMut(u8, Duration) -> bool,
    {
        self.checkpoint()?;
        loop {
            if let Some(v) = self.read(port)? {
                if done(v, self.clock.now()) {
                    return Ok(());
                }
            }
            self.sleep_step(self.config.tick())?;
        }
    }

    /// Sleep for at most one tick (and no longer than `limit` or the nearest
    /// scope deadline), then pass a checkpoint.
    fn sleep_step(&mut self, limit: Duration) -> Flow {
        let now = self.clock.now();
        let mut step = self.config.tick().min(limit);
        for scope in &self.scopes {
            step = step.min(scope.deadline.saturating_sub(now));
        }
        if !step.is_zero() {
            self.clock.sleep(step);
            if let Some(id) = self.ctx.active_block {
                self.emit(RunEvent::Active(Some(id)));
            }
        }
        self.flush_pending()?;
        self.checkpoint()
    }

    fn checkpoint(&mut self) -> Flow {
        if self.stop.load(Ordering::Acquire) {
            debug!("stop requested");
            return Err(Interrupt::Stop);
        }
        for depth in 0..self.scopes.len() {
            let scope = self.scopes[depth];
            if self.clock.now() >= scope.deadline {
                debug!(depth, "timeout elapsed");
                return Err(Interrupt::Abort(depth));
            }
            if let Some(v) = self.read(scope.port)? {
                if scope.comparator.holds(v, scope.threshold) {
                    debug!(depth, reading = v, "timeout condition met");
                    return Err(Interrupt::Abort(depth));
                }
            }
        }
        Ok(())
    }

    // ── collaborators ───────────────────────────────────────────────────

    fn read(&mut self, port: SensorPort) -> Result<Option<u8>, Interrupt> {
        let before = self.clock.now();
        let result = self.sensors.read(port);
        self.check_latency(before, "sensor read")?;
        match result {
            Ok(v) => Ok(Some(v)),
            Err(LinkError::Transient(msg)) => {
                self.ctx.transient_failures += 1;
                warn!(%port, %msg, "no sample this tick");
                Ok(None)
            }
            Err(err) => Err(Interrupt::Fatal(err)),
        }
    }

    fn drive(&mut self, left: f64, right: f64) -> Flow {
        self.send(MotorCommand::Motor {
            side: Side::L,
            duty: clamp_duty(left),
        })?;
        self.send(MotorCommand::Motor {
            side: Side::R,
            duty: clamp_duty(right),
        })
    }

    /// Ramp both sides linearly from their current duty to the targets.
    fn ramp(&mut self, left: f64, right: f64, over: Duration) -> Flow {
        let (l0, r0) = self.ctx.motors();
        if over.is_zero() {
            return self.drive(left, right);
        }
        let start = self.clock.now();
        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            let f = (elapsed.as_secs_f64() / over.as_secs_f64()).min(1.0);
            self.drive(l0 + (left - l0) * f, r0 + (right - r0) * f)?;
            if f >= 1.0 {
                return Ok(());
            }
            self.sleep_step(over.saturating_sub(elapsed))?;
        }
    }

    /// Emit a command. Once the sink rejected one, later commands queue
    /// behind it so delivery stays in emission order.
    fn send(&mut self, command: MotorCommand) -> Flow {
        let now = self.clock.now();
        self.ctx.record(command, now);
        self.ctx.note_command(&command);
        if !self.pending.is_empty() {
            self.pending.push_back(PendingSend { command, retries: 0 });
            return Ok(());
        }
        if !self.deliver(command)? {
            self.pending.push_back(PendingSend { command, retries: 0 });
        }
        Ok(())
    }

    /// Returns false when the sink rejected the command transiently.
    fn deliver(&mut self, command: MotorCommand) -> Result<bool, Interrupt> {
        let before = self.clock.now();
        let result = command.send_to(self.sink.as_mut());
        self.check_latency(before, "motor command")?;
        match result {
            Ok(()) => Ok(true),
            Err(LinkError::Transient(msg)) => {
                warn!(?command, %msg, "command not delivered, will retry");
                Ok(false)
            }
            Err(err) => Err(Interrupt::Fatal(err)),
        }
    }

    fn flush_pending(&mut self) -> Flow {
        while let Some(front) = self.pending.front().copied() {
            if self.deliver(front.command)? {
                self.pending.pop_front();
                continue;
            }
            let retries = front.retries + 1;
            if retries > self.config.max_send_retries {
                return Err(Interrupt::Fatal(LinkError::Fatal(format!(
                    "{:?} not delivered after {} retries",
                    front.command, self.config.max_send_retries
                ))));
            }
            if let Some(f) = self.pending.front_mut() {
                f.retries = retries;
            }
            break;
        }
        Ok(())
    }

    fn check_latency(&self, before: Duration, what: &str) -> Flow {
        let took = self.clock.now().saturating_sub(before);
        if took > self.config.io_timeout() {
            warn!(what, took_ms = took.as_millis() as u64, "collaborator exceeded the I/O timeout");
            return Err(Interrupt::Fatal(LinkError::Timeout(took)));
        }
        Ok(())
    }

    /// Final stop-all. Undelivered commands are dropped.
    fn halt(&mut self) {
        if !self.pending.is_empty() {
            warn!(dropped = self.pending.len(), "discarding undelivered commands");
            self.pending.clear();
        }
        self.ctx.note_command(&MotorCommand::StopAll);
        if let Err(err) = self.sink.stop_all() {
            error!(%err, "stop-all failed");
        }
    }

    // ── observer ────────────────────────────────────────────────────────

    /// Make `id` the active block. Observers also get the active block again
    /// after every tick slept.
    fn enter(&mut self, id: BlockId) {
        if self.ctx.active_block != Some(id) {
            self.ctx.active_block = Some(id);
            self.emit(RunEvent::Active(Some(id)));
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            // The observer may have gone away; the run continues regardless.
            let _ = tx.send(event);
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn count(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

fn port_at(node: &BlockNode, slot: usize) -> SensorPort {
    SensorPort::from_choice(node.text(slot)).unwrap_or(SensorPort::MIN)
}

fn comparator_at(node: &BlockNode, slot: usize) -> Comparator {
    Comparator::from_choice(node.text(slot)).unwrap_or(Comparator::Lt)
}

// ────────────────────────────────────────────────────────────────────────────
// Engine: threaded runs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

/// Starts runs on a dedicated thread, one at a time.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Engine {
            config,
            clock,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        if self.running.load(Ordering::Acquire) {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    /// Start running `program`. Fails if a run is still in progress.
    pub fn start(
        &self,
        program: Program,
        sink: Box<dyn CommandSink>,
        sensors: Box<dyn SensorSource>,
    ) -> Result<RunHandle, EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }
        let (tx, rx) = mpsc::channel();
        let interpreter = Interpreter::new(
            program,
            self.config.clone(),
            Arc::clone(&self.clock),
            sink,
            sensors,
        )
        .with_events(tx);
        let stop = interpreter.stop_flag();
        let running = RunningGuard(Arc::clone(&self.running));
        let spawned = std::thread::Builder::new()
            .name("roboblocks-run".to_string())
            .spawn(move || {
                let _running = running;
                interpreter.run()
            });
        match spawned {
            Ok(thread) => Ok(RunHandle {
                stop,
                events: rx,
                thread,
            }),
            Err(err) => {
                self.running.store(false, Ordering::Release);
                Err(EngineError::Spawn(err))
            }
        }
    }
}

/// Clears the engine's running flag when the run thread ends, even by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a run executing on its own thread.
pub struct RunHandle {
    stop: Arc<AtomicBool>,
    events: Receiver<RunEvent>,
    thread: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Request a stop. Honoured within one tick.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the run to end.
    pub fn join(self) -> std::thread::Result<RunReport> {
        self.thread.join()
    }
}
