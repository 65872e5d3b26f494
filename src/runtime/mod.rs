//! Program execution: the interpreter, its collaborators and per-run state.

pub mod clock;
pub mod context;
pub mod engine;
pub mod link;
pub mod numeric;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{RuntimeContext, StateRegister, StateTransition, TraceEntry};
pub use engine::{Engine, EngineState, Interpreter, RunEvent, RunHandle, RunOutcome, RunReport};
pub use link::{CommandSink, MotorCommand, SensorSource};
