//! Block catalog: display metadata and parameter slots for every block kind.
//!
//! The catalog is the single source of truth for the parameter shape of a
//! block. Each entry specifies the kind, a human-readable label, an emoji
//! glyph, the category it belongs to, a colour, a short description and the
//! ordered list of [`ParamSlot`]s.
//!
//! # Usage
//!
//! ```rust
//! use roboblocks::block_types::BlockKind;
//! use roboblocks::catalog::{get_block_catalog, slots};
//!
//! let turns: Vec<_> = get_block_catalog()
//!     .iter()
//!     .filter(|e| e.matches_query("turn"))
//!     .collect();
//! assert!(!turns.is_empty());
//! assert_eq!(slots(BlockKind::RobotMove).len(), 2);
//! ```

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::block_types::{BlockCategory, BlockKind, Rgb};
use crate::error::EditError;
use crate::model::{ParamValue, ProgramBlock};

// ────────────────────────────────────────────────────────────────────────────
// Parameter slots
// ────────────────────────────────────────────────────────────────────────────

/// Type, bounds and default of one parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotType {
    /// Bounded number, inclusive on both ends.
    Number { min: f64, max: f64, default: f64 },
    /// One value out of a fixed set of `(label, value)` pairs.
    Choice {
        options: Vec<(String, String)>,
        default: String,
    },
    /// Free text.
    Text { default: String },
}

/// A named, typed parameter position of a block kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSlot {
    pub label: String,
    pub ty: SlotType,
}

impl ParamSlot {
    pub fn default_value(&self) -> ParamValue {
        match &self.ty {
            SlotType::Number { default, .. } => ParamValue::Number(*default),
            SlotType::Choice { default, .. } => ParamValue::Choice(default.clone()),
            SlotType::Text { default } => ParamValue::Text(default.clone()),
        }
    }

    /// Check `value` against this slot's type and bounds.
    ///
    /// `kind` and `index` are only used to build the error.
    pub fn validate(&self, kind: BlockKind, index: usize, value: &ParamValue) -> Result<(), EditError> {
        match (&self.ty, value) {
            (SlotType::Number { min, max, .. }, ParamValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(EditError::invalid(kind, index, format!("{} is not a finite number", v)));
                }
                if *v < *min || *v > *max {
                    return Err(EditError::invalid(
                        kind,
                        index,
                        format!("{} = {} is outside [{}, {}]", self.label, v, min, max),
                    ));
                }
                Ok(())
            }
            (SlotType::Choice { options, .. }, ParamValue::Choice(v)) => {
                if options.iter().any(|(_, allowed)| allowed == v) {
                    Ok(())
                } else {
                    Err(EditError::invalid(
                        kind,
                        index,
                        format!("{:?} is not one of the choices for {}", v, self.label),
                    ))
                }
            }
            (SlotType::Text { .. }, ParamValue::Text(_)) => Ok(()),
            (_, other) => Err(EditError::invalid(
                kind,
                index,
                format!("{} expects a {} value, got {}", self.label, self.type_name(), other.type_name()),
            )),
        }
    }

    /// Parse raw editor input into a value of this slot's type, then validate it.
    pub fn parse(&self, kind: BlockKind, index: usize, raw: &str) -> Result<ParamValue, EditError> {
        let value = match &self.ty {
            SlotType::Number { .. } => {
                let v = raw.trim().parse::<f64>().map_err(|_| {
                    EditError::invalid(kind, index, format!("{:?} is not a number", raw))
                })?;
                ParamValue::Number(v)
            }
            SlotType::Choice { options, .. } => {
                let raw = raw.trim();
                // Accept either the stored value or its display label.
                let value = options
                    .iter()
                    .find(|(label, value)| value == raw || label == raw)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_else(|| raw.to_string());
                ParamValue::Choice(value)
            }
            SlotType::Text { .. } => ParamValue::Text(raw.to_string()),
        };
        self.validate(kind, index, &value)?;
        Ok(value)
    }

    fn type_name(&self) -> &'static str {
        match self.ty {
            SlotType::Number { .. } => "number",
            SlotType::Choice { .. } => "choice",
            SlotType::Text { .. } => "text",
        }
    }
}

fn num(label: &str, default: f64, min: f64, max: f64) -> ParamSlot {
    ParamSlot {
        label: label.to_string(),
        ty: SlotType::Number { min, max, default },
    }
}

fn choice(label: &str, options: &[(&str, &str)], default: &str) -> ParamSlot {
    ParamSlot {
        label: label.to_string(),
        ty: SlotType::Choice {
            options: options
                .iter()
                .map(|(l, v)| (l.to_string(), v.to_string()))
                .collect(),
            default: default.to_string(),
        },
    }
}

fn text(label: &str, default: &str) -> ParamSlot {
    ParamSlot {
        label: label.to_string(),
        ty: SlotType::Text {
            default: default.to_string(),
        },
    }
}

fn port() -> ParamSlot {
    choice("Port", &[("1", "1"), ("2", "2"), ("3", "3"), ("4", "4")], "1")
}

fn comparator() -> ParamSlot {
    choice("Condition", &[("< less", "LT"), ("> greater", "GT")], "LT")
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog entries
// ────────────────────────────────────────────────────────────────────────────

/// A single entry in the block catalog.
#[derive(Debug, Clone)]
pub struct BlockCatalogEntry {
    pub kind: BlockKind,
    /// Human-readable label shown on the block.
    pub label: String,
    /// Emoji glyph shown before the label.
    pub emoji: String,
    pub category: BlockCategory,
    /// Block colour; usually the category colour, some kinds stand out.
    pub color: Rgb,
    /// Brief description of what the block does.
    pub description: String,
    /// Ordered parameter slots.
    pub slots: Vec<ParamSlot>,
}

impl BlockCatalogEntry {
    /// Check if this entry matches a search query (case-insensitive substring match
    /// on kind name, label, category or description).
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.kind.name().to_lowercase().contains(&q)
            || self.label.to_lowercase().contains(&q)
            || self.category.label().to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
    }

    /// Fresh parameter list filled with slot defaults.
    pub fn default_params(&self) -> Vec<ParamValue> {
        self.slots.iter().map(ParamSlot::default_value).collect()
    }
}

/// A category of blocks in the catalog, with its entries in catalog order.
#[derive(Debug, Clone)]
pub struct BlockCatalogCategory {
    pub category: BlockCategory,
    pub entries: Vec<BlockCatalogEntry>,
}

/// Helper to create a catalog entry concisely.
fn entry(
    kind: BlockKind,
    label: &str,
    emoji: &str,
    category: BlockCategory,
    color: u32,
    description: &str,
    slots: Vec<ParamSlot>,
) -> BlockCatalogEntry {
    BlockCatalogEntry {
        kind,
        label: label.to_string(),
        emoji: emoji.to_string(),
        category,
        color: Rgb::from_hex(color),
        description: description.to_string(),
        slots,
    }
}

/// Returns the complete block catalog in display order.
///
/// The catalog is lazily initialized on first access and cached for the
/// lifetime of the process.
pub fn get_block_catalog() -> &'static [BlockCatalogEntry] {
    static CATALOG: Lazy<Vec<BlockCatalogEntry>> = Lazy::new(build_catalog);
    &CATALOG
}

/// Returns the catalog organized by category.
pub fn get_block_catalog_by_category() -> &'static [BlockCatalogCategory] {
    static CATEGORIES: Lazy<Vec<BlockCatalogCategory>> = Lazy::new(|| {
        let mut cat_map: IndexMap<BlockCategory, Vec<BlockCatalogEntry>> = IndexMap::new();
        for e in get_block_catalog() {
            cat_map.entry(e.category).or_default().push(e.clone());
        }
        cat_map
            .into_iter()
            .map(|(category, entries)| BlockCatalogCategory { category, entries })
            .collect()
    });
    &CATEGORIES
}

/// Look up the catalog entry for `kind`.
pub fn lookup(kind: BlockKind) -> Result<&'static BlockCatalogEntry, EditError> {
    get_block_catalog()
        .iter()
        .find(|e| e.kind == kind)
        .ok_or_else(|| EditError::UnknownKind(kind.name()))
}

/// Ordered parameter slots of `kind`. Empty for kinds without parameters.
pub fn slots(kind: BlockKind) -> &'static [ParamSlot] {
    lookup(kind).map(|e| e.slots.as_slice()).unwrap_or(&[])
}

/// Default parameter values of `kind`, one per slot.
pub fn default_params(kind: BlockKind) -> Vec<ParamValue> {
    slots(kind).iter().map(ParamSlot::default_value).collect()
}

/// Fresh block of `kind`: default parameters, empty body and else body.
pub fn default_instance(kind: BlockKind) -> ProgramBlock {
    ProgramBlock::new(kind)
}

/// Validate a full parameter list against the slots of `kind`.
pub fn validate_params(kind: BlockKind, params: &[ParamValue]) -> Result<(), EditError> {
    let slots = slots(kind);
    if slots.len() != params.len() {
        return Err(EditError::invalid(
            kind,
            params.len().min(slots.len()),
            format!("expected {} parameters, got {}", slots.len(), params.len()),
        ));
    }
    for (i, (slot, value)) in slots.iter().zip(params).enumerate() {
        slot.validate(kind, i, value)?;
    }
    Ok(())
}

fn build_catalog() -> Vec<BlockCatalogEntry> {
    use BlockCategory::*;
    use BlockKind as K;

    let mut c = Vec::with_capacity(BlockKind::ALL.len());

    // ── Car ─────────────────────────────────────────────────────────────
    let cat = Car;
    c.push(entry(K::StartHat, "START", "🏁", cat, 0x2E7D32, "Program entry point", vec![]));
    c.push(entry(K::RobotMove, "Drive L/R", "🚗", cat, 0x0062BA, "Set left and right duty cycle",
        vec![num("L", 100.0, -100.0, 100.0), num("R", 100.0, -100.0, 100.0)]));
    c.push(entry(K::RobotMoveSoft, "Soft start", "🚀", cat, 0x0062BA, "Ramp both motors to a target duty cycle",
        vec![num("Target", 100.0, -100.0, 100.0), num("Sec", 1.0, 0.0, 10.0)]));
    c.push(entry(K::RobotTurn, "Turn", "🔄", cat, 0x0062BA, "Spin in place for a duration, then stop",
        vec![choice("Direction", &[("Left ⬅️", "LEFT"), ("Right ➡️", "RIGHT")], "LEFT"), num("Sec", 0.5, 0.0, 10.0)]));
    c.push(entry(K::RobotSetSpeed, "Speed", "⚡", cat, 0x0062BA, "Scale all following motion commands",
        vec![num("Speed %", 50.0, 0.0, 100.0)]));
    c.push(entry(K::RobotStop, "Stop", "🛑", cat, 0xB71C1C, "Stop all motors immediately", vec![]));
    c.push(entry(K::MotorSingle, "Motor A/B/C/D", "⚙️", cat, 0x4527A0, "Set one motor's duty cycle",
        vec![choice("Motor", &[("A", "A"), ("B", "B"), ("C", "C"), ("D", "D")], "A"), num("Speed", 100.0, -100.0, 100.0)]));
    c.push(entry(K::GoHome, "Go home (reverse)", "🏠", cat, 0x0062BA, "Ramp into a fixed reverse drive", vec![]));
    c.push(entry(K::RecordStart, "Record track", "🔴", cat, 0x6A1B9A, "Start recording motor commands", vec![]));
    c.push(entry(K::ReplayTrack, "Replay track", "▶️", cat, 0x6A1B9A, "Replay the recorded track once", vec![]));
    c.push(entry(K::ReplayLoop, "Replay N times", "🔄", cat, 0x6A1B9A, "Replay the recorded track N times",
        vec![num("Times", 1.0, 1.0, 99.0)]));
    c.push(entry(K::WaitStart, "Wait for start line", "🏁", cat, 0x37474F, "Wait until the line sensor sees the start line", vec![]));
    c.push(entry(K::StopAtStart, "Stop at start line", "🛑", cat, 0x37474F, "Keep driving until the start line, then stop", vec![]));
    c.push(entry(K::CountLaps, "Count laps", "🔢", cat, 0x37474F, "Wait until the start line was crossed N times",
        vec![num("Laps", 3.0, 1.0, 99.0)]));
    c.push(entry(K::Autopilot, "Autopilot (sensor)", "🤖", cat, 0xE65100, "Drive forward, turn away from obstacles",
        vec![port(), choice("Turn", &[("RIGHT", "RIGHT"), ("LEFT", "LEFT")], "RIGHT"),
             num("Threshold <", 40.0, 0.0, 255.0), num("Speed", 60.0, 0.0, 100.0)]));

    // ── Control ─────────────────────────────────────────────────────────
    let cat = Control;
    c.push(entry(K::WaitSeconds, "Wait (sec)", "⏳", cat, 0x37474F, "Pause for a number of seconds",
        vec![num("Sec", 1.0, 0.0, 60.0)]));
    c.push(entry(K::LoopForever, "Forever", "♾️", cat, 0x2E7D32, "Repeat the body until stopped", vec![]));
    c.push(entry(K::LoopRepeat, "Repeat N times", "🔁", cat, 0x2E7D32, "Repeat the body N times",
        vec![num("Times", 3.0, 1.0, 99.0)]));
    c.push(entry(K::LoopRepeatPause, "Repeat with pause", "🔁", cat, 0x2E7D32, "Repeat N times with a pause between passes",
        vec![num("Times", 3.0, 1.0, 99.0), num("Pause (s)", 1.0, 0.0, 10.0)]));
    c.push(entry(K::LoopEverySec, "Every N seconds", "⏱", cat, 0x2E7D32, "Run the body once per period",
        vec![num("Every (s)", 1.0, 0.1, 60.0)]));
    c.push(entry(K::TimerReset, "Reset timer", "🔄", cat, 0x37474F, "Zero the program timer", vec![]));

    // ── Sensors ─────────────────────────────────────────────────────────
    let cat = Sensors;
    c.push(entry(K::WaitUntilSensor, "Wait until sensor", "⏳", cat, 0x00695C, "Wait until a sensor reading crosses a threshold",
        vec![port(), comparator(), num("Value", 25.0, 0.0, 255.0)]));

    // ── Math ────────────────────────────────────────────────────────────
    let cat = Math;
    c.push(entry(K::TimerGet, "Timer (s)", "⏱️", cat, 0x283593, "Read the program timer", vec![]));
    c.push(entry(K::MathPid, "PID controller", "🎛️", cat, 0x283593, "Steer with a PID correction on the primary sensor",
        vec![num("Kp", 1.0, 0.0, 100.0), num("Ki", 0.0, 0.0, 100.0), num("Kd", 0.0, 0.0, 100.0)]));
    c.push(entry(K::MathSmooth, "Smooth", "🌊", cat, 0x283593, "Moving average of the primary sensor",
        vec![num("Count", 5.0, 2.0, 50.0)]));
    c.push(entry(K::MathPythagoras, "Pythagoras (diagonal)", "📐", cat, 0x283593, "Diagonal of the last two results", vec![]));
    c.push(entry(K::MathPathVt, "Path length v×t", "📏", cat, 0x283593, "Distance from calibrated speed and timer", vec![]));
    c.push(entry(K::MathSpeedCms, "Speed (cm/s)", "🚗", cat, 0x283593, "Current speed from the calibration factor", vec![]));
    c.push(entry(K::CalibrateSpeed, "Calibrate speed", "⚙️", cat, 0x283593, "Drive a known distance to derive cm/s per duty %",
        vec![num("Distance (cm)", 50.0, 1.0, 500.0), port(), num("Threshold", 30.0, 0.0, 255.0), num("Speed", 60.0, 0.0, 100.0)]));

    // ── State machine ───────────────────────────────────────────────────
    let cat = State;
    c.push(entry(K::StateSet, "State =", "🧠", cat, 0x6A1B9A, "Switch to a named state",
        vec![text("State", "SEARCH")]));
    c.push(entry(K::StateSetReason, "State = (with reason)", "🧠", cat, 0x6A1B9A, "Switch state and record why",
        vec![text("State", "ATTACK"), text("Reason", "sensor")]));
    c.push(entry(K::StatePrev, "Back to previous state", "↩️", cat, 0x6A1B9A, "Swap current and previous state", vec![]));
    c.push(entry(K::StateIf, "If state =", "🧠", cat, 0x6A1B9A, "Run the body if the state matches, else the else body",
        vec![text("State", "SEARCH")]));

    // ── Smart conditions ────────────────────────────────────────────────
    let cat = Smart;
    c.push(entry(K::WaitUntilTrueFor, "Wait until condition holds", "⏳", cat, 0xBF360C, "Wait until a sensor condition holds continuously",
        vec![port(), comparator(), num("Value", 25.0, 0.0, 255.0), num("Time (s)", 0.2, 0.0, 10.0)]));
    c.push(entry(K::TimeoutDoUntil, "Do until (timeout)", "⏱", cat, 0xBF360C, "Repeat the body until a condition or a timeout",
        vec![port(), comparator(), num("Value", 25.0, 0.0, 255.0), num("Max (s)", 3.0, 0.0, 30.0)]));
    c.push(entry(K::CooldownDo, "At most once per N s", "🧊", cat, 0xBF360C, "Skip the body if it ran too recently",
        vec![num("Pause (s)", 1.0, 0.0, 30.0)]));
    c.push(entry(K::LatchSet, "Set flag", "📌", cat, 0xBF360C, "Set a named flag", vec![text("Flag", "flag1")]));
    c.push(entry(K::LatchReset, "Reset flag", "🧽", cat, 0xBF360C, "Clear a named flag", vec![text("Flag", "flag1")]));

    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_kind() {
        let catalog = get_block_catalog();
        assert_eq!(catalog.len(), BlockKind::ALL.len());
        for kind in BlockKind::ALL {
            assert!(lookup(kind).is_ok(), "missing {:?}", kind);
        }
    }

    #[test]
    fn test_catalog_by_category_keeps_order() {
        let cats = get_block_catalog_by_category();
        let order: Vec<_> = cats.iter().map(|c| c.category).collect();
        assert_eq!(order, BlockCategory::ALL.to_vec());
        assert_eq!(cats[0].entries[0].kind, BlockKind::StartHat);
    }

    #[test]
    fn test_default_params_validate() {
        for kind in BlockKind::ALL {
            let params = default_params(kind);
            assert_eq!(params.len(), slots(kind).len());
            validate_params(kind, &params).unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_and_wrong_type() {
        let slot = &slots(BlockKind::LoopRepeat)[0];
        assert!(slot.validate(BlockKind::LoopRepeat, 0, &ParamValue::Number(0.0)).is_err());
        assert!(slot.validate(BlockKind::LoopRepeat, 0, &ParamValue::Number(1.0)).is_ok());
        assert!(slot.validate(BlockKind::LoopRepeat, 0, &ParamValue::Number(f64::NAN)).is_err());
        assert!(slot.validate(BlockKind::LoopRepeat, 0, &ParamValue::Text("3".into())).is_err());

        let cmp = &slots(BlockKind::WaitUntilSensor)[1];
        assert!(cmp.validate(BlockKind::WaitUntilSensor, 1, &ParamValue::Choice("GT".into())).is_ok());
        assert!(cmp.validate(BlockKind::WaitUntilSensor, 1, &ParamValue::Choice("EQ".into())).is_err());
    }

    #[test]
    fn test_parse_accepts_labels_and_values() {
        let turn = &slots(BlockKind::RobotTurn)[0];
        assert_eq!(
            turn.parse(BlockKind::RobotTurn, 0, "RIGHT").unwrap(),
            ParamValue::Choice("RIGHT".into())
        );
        assert_eq!(
            turn.parse(BlockKind::RobotTurn, 0, "Left ⬅️").unwrap(),
            ParamValue::Choice("LEFT".into())
        );
        let secs = &slots(BlockKind::WaitSeconds)[0];
        assert_eq!(secs.parse(BlockKind::WaitSeconds, 0, " 2.5 ").unwrap(), ParamValue::Number(2.5));
        assert!(secs.parse(BlockKind::WaitSeconds, 0, "abc").is_err());
        assert!(secs.parse(BlockKind::WaitSeconds, 0, "61").is_err());
    }

    #[test]
    fn test_default_instance() {
        let b = default_instance(BlockKind::LoopRepeatPause);
        assert_eq!(b.params, vec![ParamValue::Number(3.0), ParamValue::Number(1.0)]);
        assert!(b.body.is_empty() && b.else_body.is_empty());
        assert_ne!(b.id, default_instance(BlockKind::LoopRepeatPause).id);
    }

    #[test]
    fn test_matches_query() {
        let e = lookup(BlockKind::MathPid).unwrap();
        assert!(e.matches_query("pid"));
        assert!(e.matches_query("MATH"));
        assert!(e.matches_query(""));
        assert!(!e.matches_query("laps"));
    }
}
