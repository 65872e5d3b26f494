//! Built-in sample programs.

use crate::block_types::BlockKind;
use crate::error::EditError;
use crate::model::{ParamValue, Program, ProgramBlock};

/// Names accepted by [`load`], in menu order.
pub const NAMES: [&str; 4] = ["autopilot", "square", "record", "new"];

/// One-line description shown next to each preset.
pub fn describe(name: &str) -> Option<&'static str> {
    match name {
        "autopilot" => Some("Avoid obstacles using the front sensor"),
        "square" => Some("Drive a square (four corners)"),
        "record" => Some("Record a track and replay it three times"),
        "new" => Some("Empty program"),
        _ => None,
    }
}

/// Build the preset called `name`. `Ok(None)` for an unknown name.
pub fn load(name: &str) -> Result<Option<Program>, EditError> {
    let blocks = match name {
        "autopilot" => vec![ProgramBlock::new(BlockKind::Autopilot)],
        "square" => square()?,
        "record" => record()?,
        "new" => Vec::new(),
        _ => return Ok(None),
    };
    Program::from_blocks(blocks).map(Some)
}

fn num(v: f64) -> ParamValue {
    ParamValue::Number(v)
}

fn choice(v: &str) -> ParamValue {
    ParamValue::Choice(v.to_string())
}

fn square() -> Result<Vec<ProgramBlock>, EditError> {
    let side = vec![
        ProgramBlock::new(BlockKind::RobotMove).with_params(vec![num(60.0), num(60.0)])?,
        ProgramBlock::new(BlockKind::WaitSeconds).with_params(vec![num(1.0)])?,
        ProgramBlock::new(BlockKind::RobotTurn).with_params(vec![choice("RIGHT"), num(0.5)])?,
    ];
    Ok(vec![
        ProgramBlock::new(BlockKind::LoopRepeat)
            .with_params(vec![num(4.0)])?
            .with_body(side),
        ProgramBlock::new(BlockKind::RobotStop),
    ])
}

fn record() -> Result<Vec<ProgramBlock>, EditError> {
    Ok(vec![
        ProgramBlock::new(BlockKind::RecordStart),
        ProgramBlock::new(BlockKind::RobotMove).with_params(vec![num(60.0), num(60.0)])?,
        ProgramBlock::new(BlockKind::WaitSeconds).with_params(vec![num(1.0)])?,
        ProgramBlock::new(BlockKind::RobotTurn).with_params(vec![choice("LEFT"), num(0.5)])?,
        ProgramBlock::new(BlockKind::RobotMove).with_params(vec![num(60.0), num(60.0)])?,
        ProgramBlock::new(BlockKind::WaitSeconds).with_params(vec![num(1.0)])?,
        ProgramBlock::new(BlockKind::RobotStop),
        ProgramBlock::new(BlockKind::ReplayLoop).with_params(vec![num(3.0)])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_builds() {
        for name in NAMES {
            let program = load(name).unwrap().unwrap();
            assert!(describe(name).is_some());
            for block in program.blocks() {
                block.validate().unwrap();
            }
        }
        assert!(load("nope").unwrap().is_none());
    }

    #[test]
    fn test_square_shape() {
        let p = load("square").unwrap().unwrap();
        assert_eq!(p.top().len(), 2);
        let lp = p.get(p.top()[0]).unwrap();
        assert_eq!(lp.kind, BlockKind::LoopRepeat);
        assert_eq!(lp.body.len(), 3);
        assert!(load("new").unwrap().unwrap().is_empty());
    }
}
