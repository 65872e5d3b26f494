//! A simulated robot implementing both collaborator capabilities.
//!
//! Sensor readings come from scripted functions of the clock's time, every
//! motor command lands in a timestamped log, and link failures can be
//! injected. Clones share the same robot, so one clone can be handed to the
//! engine as the sink and another as the sensor source while the caller keeps
//! a third for inspection.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::block_types::{MotorId, SensorPort, Side};
use crate::error::LinkError;
use crate::runtime::clock::Clock;
use crate::runtime::link::{CommandSink, MotorCommand, SensorSource};

/// Reading of a port without a script.
pub const DEFAULT_READING: u8 = 128;

type SensorScript = Box<dyn Fn(Duration) -> Result<u8, LinkError> + Send>;

/// A motor command as received by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggedCommand {
    pub at: Duration,
    pub command: MotorCommand,
}

#[derive(Default)]
struct SimState {
    sensors: [Option<SensorScript>; SensorPort::COUNT],
    log: Vec<LoggedCommand>,
    drive: (f64, f64),
    named: [f64; 4],
    disconnect_at: Option<Duration>,
    failing_sends: u32,
    latency: Duration,
}

#[derive(Clone)]
pub struct SimRobot {
    state: Arc<Mutex<SimState>>,
    clock: Arc<dyn Clock>,
}

impl SimRobot {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SimRobot {
            state: Arc::new(Mutex::new(SimState::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script `port` as a function of time.
    pub fn set_sensor<F>(&self, port: SensorPort, script: F)
    where
        F: Fn(Duration) -> Result<u8, LinkError> + Send + 'static,
    {
        self.lock().sensors[port.index()] = Some(Box::new(script));
    }

    pub fn set_constant(&self, port: SensorPort, value: u8) {
        self.set_sensor(port, move |_| Ok(value));
    }

    /// Every call fails fatally from `at` on.
    pub fn disconnect_at(&self, at: Duration) {
        self.lock().disconnect_at = Some(at);
    }

    /// The next `n` motor commands fail transiently.
    pub fn fail_next_sends(&self, n: u32) {
        self.lock().failing_sends = n;
    }

    /// Every call takes `latency` of clock time.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn commands(&self) -> Vec<LoggedCommand> {
        self.lock().log.clone()
    }

    /// Current `(left, right)` drive duty.
    pub fn drive(&self) -> (f64, f64) {
        self.lock().drive
    }

    pub fn named(&self, motor: MotorId) -> f64 {
        self.lock().named[motor as usize]
    }

    /// Apply latency and the disconnect switch. Returns the call time.
    fn begin_call(&self) -> Result<Duration, LinkError> {
        let (latency, disconnect_at) = {
            let s = self.lock();
            (s.latency, s.disconnect_at)
        };
        if !latency.is_zero() {
            self.clock.sleep(latency);
        }
        let now = self.clock.now();
        match disconnect_at {
            Some(at) if now >= at => Err(LinkError::Fatal("robot disconnected".to_string())),
            _ => Ok(now),
        }
    }

    fn apply(&self, command: MotorCommand) -> Result<(), LinkError> {
        let at = self.begin_call()?;
        let mut s = self.lock();
        if s.failing_sends > 0 {
            s.failing_sends -= 1;
            return Err(LinkError::Transient("send buffer full".to_string()));
        }
        match command {
            MotorCommand::Motor { side: Side::L, duty } => s.drive.0 = duty,
            MotorCommand::Motor { side: Side::R, duty } => s.drive.1 = duty,
            MotorCommand::Named { motor, duty } => s.named[motor as usize] = duty,
            MotorCommand::StopAll => {
                s.drive = (0.0, 0.0);
                s.named = [0.0; 4];
            }
        }
        s.log.push(LoggedCommand { at, command });
        Ok(())
    }
}

impl CommandSink for SimRobot {
    fn set_motor(&mut self, side: Side, duty: f64) -> Result<(), LinkError> {
        self.apply(MotorCommand::Motor { side, duty })
    }

    fn set_motor_named(&mut self, motor: MotorId, duty: f64) -> Result<(), LinkError> {
        self.apply(MotorCommand::Named { motor, duty })
    }

    fn stop_all(&mut self) -> Result<(), LinkError> {
        self.apply(MotorCommand::StopAll)
    }
}

impl SensorSource for SimRobot {
    fn read(&mut self, port: SensorPort) -> Result<u8, LinkError> {
        let now = self.begin_call()?;
        let s = self.lock();
        let reading = match &s.sensors[port.index()] {
            Some(script) => script(now),
            None => Ok(DEFAULT_READING),
        };
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::clock::ManualClock;

    fn port(n: u8) -> SensorPort {
        SensorPort::new(n).unwrap()
    }

    #[test]
    fn test_scripted_sensor_follows_clock() {
        let clock = Arc::new(ManualClock::new());
        let mut sim = SimRobot::new(clock.clone());
        sim.set_sensor(port(2), |t| Ok(if t < Duration::from_secs(1) { 200 } else { 10 }));
        assert_eq!(sim.read(port(2)), Ok(200));
        assert_eq!(sim.read(port(1)), Ok(DEFAULT_READING));
        clock.advance(Duration::from_secs(1));
        assert_eq!(sim.read(port(2)), Ok(10));
    }

    #[test]
    fn test_commands_are_logged_and_applied() {
        let clock = Arc::new(ManualClock::new());
        let mut sim = SimRobot::new(clock.clone());
        sim.set_motor(Side::L, 40.0).unwrap();
        clock.advance(Duration::from_millis(50));
        sim.set_motor_named(MotorId::C, -20.0).unwrap();
        assert_eq!(sim.drive(), (40.0, 0.0));
        assert_eq!(sim.named(MotorId::C), -20.0);
        sim.stop_all().unwrap();
        assert_eq!(sim.drive(), (0.0, 0.0));
        let log = sim.commands();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].at, Duration::from_millis(50));
        assert_eq!(log[2].command, MotorCommand::StopAll);
    }

    #[test]
    fn test_injected_failures() {
        let clock = Arc::new(ManualClock::new());
        let mut sim = SimRobot::new(clock.clone());
        sim.fail_next_sends(1);
        assert!(matches!(sim.stop_all(), Err(LinkError::Transient(_))));
        assert!(sim.stop_all().is_ok());

        sim.set_latency(Duration::from_millis(10));
        sim.read(port(1)).unwrap();
        assert_eq!(clock.now(), Duration::from_millis(10));

        sim.disconnect_at(Duration::from_millis(30));
        assert!(sim.read(port(1)).is_ok());
        let err = sim.read(port(1)).unwrap_err();
        assert!(err.is_fatal());
    }
}
