//! Collaborator capabilities the engine drives: a motor command sink and a
//! sensor source.
//!
//! Implementations must never block indefinitely. A call that cannot be
//! completed within a bounded time should return [`LinkError::Timeout`]; the
//! engine additionally treats any call slower than its configured I/O timeout
//! as fatal.

use serde::{Deserialize, Serialize};

use crate::block_types::{MotorId, SensorPort, Side};
use crate::error::LinkError;

/// Receives motor commands. Calls must be delivered in emission order.
pub trait CommandSink: Send {
    /// Set one side of the differential drive, duty cycle in `[-100, 100]`.
    fn set_motor(&mut self, side: Side, duty: f64) -> Result<(), LinkError>;

    /// Set a single named motor output.
    fn set_motor_named(&mut self, motor: MotorId, duty: f64) -> Result<(), LinkError>;

    /// Zero duty cycle on every output.
    fn stop_all(&mut self) -> Result<(), LinkError>;
}

/// Answers sensor reads on demand. No caching is assumed.
pub trait SensorSource: Send {
    /// Current reading of `port`, in `[0, 255]`.
    fn read(&mut self, port: SensorPort) -> Result<u8, LinkError>;
}

/// One emitted motor command, as recorded in traces and command logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotorCommand {
    Motor { side: Side, duty: f64 },
    Named { motor: MotorId, duty: f64 },
    StopAll,
}

impl MotorCommand {
    /// Deliver this command to `sink`.
    pub fn send_to(&self, sink: &mut dyn CommandSink) -> Result<(), LinkError> {
        match *self {
            MotorCommand::Motor { side, duty } => sink.set_motor(side, duty),
            MotorCommand::Named { motor, duty } => sink.set_motor_named(motor, duty),
            MotorCommand::StopAll => sink.stop_all(),
        }
    }

    /// Whether this command leaves the addressed outputs at zero duty.
    pub fn is_zero(&self) -> bool {
        match *self {
            MotorCommand::Motor { duty, .. } | MotorCommand::Named { duty, .. } => duty == 0.0,
            MotorCommand::StopAll => true,
        }
    }
}
