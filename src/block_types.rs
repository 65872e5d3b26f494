//! Block kinds and the small value types their parameters refer to.
//!
//! [`BlockKind`] is the closed set of instructions a program can contain. The
//! structural shape of each kind (whether it owns a body, an else body, and
//! whether it can be sequenced at all) is fixed here; the parameter slots and
//! display metadata live in the [`catalog`](crate::catalog).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simple RGB color independent of any UI toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn to_hex_string(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Cosmetic grouping of block kinds. Has no runtime effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockCategory {
    Car,
    Control,
    Sensors,
    Math,
    State,
    Smart,
}

impl BlockCategory {
    pub const ALL: [BlockCategory; 6] = [
        BlockCategory::Car,
        BlockCategory::Control,
        BlockCategory::Sensors,
        BlockCategory::Math,
        BlockCategory::State,
        BlockCategory::Smart,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BlockCategory::Car => "🚗 Car",
            BlockCategory::Control => "🔁 Control",
            BlockCategory::Sensors => "📡 Sensors",
            BlockCategory::Math => "📐 Math",
            BlockCategory::State => "🧠 State",
            BlockCategory::Smart => "⚡ Smart conditions",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            BlockCategory::Car => Rgb::from_hex(0x0062BA),
            BlockCategory::Control => Rgb::from_hex(0xFFBF00),
            BlockCategory::Sensors => Rgb::from_hex(0x00897B),
            BlockCategory::Math => Rgb::from_hex(0x5C6BC0),
            BlockCategory::State => Rgb::from_hex(0x8E24AA),
            BlockCategory::Smart => Rgb::from_hex(0xE65100),
        }
    }
}

/// Every instruction a program can contain.
///
/// Serialized with the upper snake case names used by saved programs
/// (`"ROBOT_MOVE"`, `"LOOP_REPEAT"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    // Car
    StartHat,
    RobotMove,
    RobotMoveSoft,
    RobotTurn,
    RobotSetSpeed,
    RobotStop,
    MotorSingle,
    GoHome,
    RecordStart,
    ReplayTrack,
    ReplayLoop,
    WaitStart,
    StopAtStart,
    CountLaps,
    Autopilot,
    // Control
    WaitSeconds,
    LoopForever,
    LoopRepeat,
    LoopRepeatPause,
    LoopEverySec,
    TimerReset,
    // Sensors
    WaitUntilSensor,
    // Math
    TimerGet,
    MathPid,
    MathSmooth,
    MathPythagoras,
    MathPathVt,
    MathSpeedCms,
    CalibrateSpeed,
    // State machine
    StateSet,
    StateSetReason,
    StatePrev,
    StateIf,
    // Smart conditions
    WaitUntilTrueFor,
    TimeoutDoUntil,
    CooldownDo,
    LatchSet,
    LatchReset,
}

impl BlockKind {
    pub const ALL: [BlockKind; 38] = [
        BlockKind::StartHat,
        BlockKind::RobotMove,
        BlockKind::RobotMoveSoft,
        BlockKind::RobotTurn,
        BlockKind::RobotSetSpeed,
        BlockKind::RobotStop,
        BlockKind::MotorSingle,
        BlockKind::GoHome,
        BlockKind::RecordStart,
        BlockKind::ReplayTrack,
        BlockKind::ReplayLoop,
        BlockKind::WaitStart,
        BlockKind::StopAtStart,
        BlockKind::CountLaps,
        BlockKind::Autopilot,
        BlockKind::WaitSeconds,
        BlockKind::LoopForever,
        BlockKind::LoopRepeat,
        BlockKind::LoopRepeatPause,
        BlockKind::LoopEverySec,
        BlockKind::TimerReset,
        BlockKind::WaitUntilSensor,
        BlockKind::TimerGet,
        BlockKind::MathPid,
        BlockKind::MathSmooth,
        BlockKind::MathPythagoras,
        BlockKind::MathPathVt,
        BlockKind::MathSpeedCms,
        BlockKind::CalibrateSpeed,
        BlockKind::StateSet,
        BlockKind::StateSetReason,
        BlockKind::StatePrev,
        BlockKind::StateIf,
        BlockKind::WaitUntilTrueFor,
        BlockKind::TimeoutDoUntil,
        BlockKind::CooldownDo,
        BlockKind::LatchSet,
        BlockKind::LatchReset,
    ];

    /// Whether the kind owns a nested body sequence.
    pub fn has_body(self) -> bool {
        matches!(
            self,
            BlockKind::LoopForever
                | BlockKind::LoopRepeat
                | BlockKind::LoopRepeatPause
                | BlockKind::LoopEverySec
                | BlockKind::StateIf
                | BlockKind::TimeoutDoUntil
                | BlockKind::CooldownDo
        )
    }

    /// Whether the kind owns a second ("else") body sequence.
    pub fn has_else_body(self) -> bool {
        matches!(self, BlockKind::StateIf)
    }

    /// Every kind except the implicit start marker can appear in a sequence.
    pub fn is_sequenceable(self) -> bool {
        self != BlockKind::StartHat
    }

    pub fn is_compound(self) -> bool {
        self.has_body() || self.has_else_body()
    }

    /// The serialized name, e.g. `"LOOP_REPEAT"`.
    pub fn name(self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self))
    }

    /// Parse a serialized name, case-insensitively.
    pub fn from_name(name: &str) -> Option<BlockKind> {
        let upper = name.trim().to_ascii_uppercase();
        BlockKind::ALL.into_iter().find(|k| k.name() == upper)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parameter-level value types
// ────────────────────────────────────────────────────────────────────────────

/// Sensor comparison used by the waiting blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Lt,
    Gt,
}

impl Comparator {
    pub fn from_choice(value: &str) -> Option<Self> {
        match value {
            "LT" => Some(Comparator::Lt),
            "GT" => Some(Comparator::Gt),
            _ => None,
        }
    }

    pub fn holds(self, reading: u8, threshold: f64) -> bool {
        match self {
            Comparator::Lt => f64::from(reading) < threshold,
            Comparator::Gt => f64::from(reading) > threshold,
        }
    }
}

/// Drive side for the differential motor pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    L,
    R,
}

/// Individually addressable motor outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorId {
    A,
    B,
    C,
    D,
}

impl MotorId {
    pub fn from_choice(value: &str) -> Option<Self> {
        match value {
            "A" => Some(MotorId::A),
            "B" => Some(MotorId::B),
            "C" => Some(MotorId::C),
            "D" => Some(MotorId::D),
            _ => None,
        }
    }
}

/// Analog sensor port, 1 through 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorPort(u8);

impl SensorPort {
    pub const COUNT: usize = 4;
    pub const MIN: SensorPort = SensorPort(1);

    pub fn new(port: u8) -> Option<Self> {
        (1..=4).contains(&port).then_some(SensorPort(port))
    }

    pub fn from_choice(value: &str) -> Option<Self> {
        value.parse::<u8>().ok().and_then(SensorPort::new)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index, handy for per-port arrays.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for SensorPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Direction of a timed turn or an autopilot avoidance turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn from_choice(value: &str) -> Option<Self> {
        match value {
            "LEFT" => Some(TurnDirection::Left),
            "RIGHT" => Some(TurnDirection::Right),
            _ => None,
        }
    }

    /// `(left, right)` duty cycles that spin the robot in place.
    pub fn differential(self, duty: f64) -> (f64, f64) {
        match self {
            TurnDirection::Left => (-duty, duty),
            TurnDirection::Right => (duty, -duty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_name(&kind.name()), Some(kind));
        }
        assert_eq!(BlockKind::LoopRepeat.name(), "LOOP_REPEAT");
        assert_eq!(BlockKind::from_name("state_if"), Some(BlockKind::StateIf));
        assert_eq!(BlockKind::from_name("NOPE"), None);
    }

    #[test]
    fn test_structure_flags() {
        assert!(BlockKind::StateIf.has_body() && BlockKind::StateIf.has_else_body());
        assert!(BlockKind::CooldownDo.has_body() && !BlockKind::CooldownDo.has_else_body());
        assert!(!BlockKind::WaitSeconds.is_compound());
        assert!(!BlockKind::StartHat.is_sequenceable());
        assert!(BlockKind::RobotStop.is_sequenceable());
    }

    #[test]
    fn test_comparator_and_ports() {
        assert!(Comparator::Lt.holds(10, 25.0));
        assert!(!Comparator::Lt.holds(25, 25.0));
        assert!(Comparator::Gt.holds(26, 25.0));
        assert_eq!(SensorPort::from_choice("3").map(SensorPort::index), Some(2));
        assert!(SensorPort::new(0).is_none());
        assert!(SensorPort::new(5).is_none());
        assert_eq!(Rgb::from_hex(0x0062BA).to_hex_string(), "#0062ba");
    }
}
