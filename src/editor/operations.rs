//! Editing operations for block programs.
//!
//! This module provides all model-mutation operations used by an editor. Each
//! operation works directly on a [`Program`] and returns an [`EditorCommand`]
//! that can be recorded for undo/redo.
//!
//! # Design
//!
//! Operations validate first and mutate second: a rejected edit returns an
//! [`EditError`] and leaves the program untouched. The [`EditorHistory`]
//! struct wraps them with undo/redo support by storing inverse commands.

use tracing::debug;

use crate::block_types::BlockKind;
use crate::catalog;
use crate::error::EditError;
use crate::model::{BlockId, ListRef, ParamValue, Program, ProgramBlock};

// ────────────────────────────────────────────────────────────────────────────
// Editor Command (undo/redo unit)
// ────────────────────────────────────────────────────────────────────────────

/// A single undoable editor operation.
///
/// Each variant captures enough state to reverse the operation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    /// A block (with its subtree) was inserted.
    InsertBlock {
        list: ListRef,
        index: usize,
        block: Box<ProgramBlock>,
    },
    /// A block (with its subtree) was removed.
    RemoveBlock {
        list: ListRef,
        index: usize,
        block: Box<ProgramBlock>,
    },
    /// Two neighbouring entries of a sibling list were swapped.
    MoveBlock {
        list: ListRef,
        from: usize,
        to: usize,
    },
    /// A parameter value was replaced.
    SetParam {
        block_id: BlockId,
        slot: usize,
        old_value: ParamValue,
        new_value: ParamValue,
    },
    /// The whole program was cleared.
    Clear { removed: Vec<ProgramBlock> },
    /// Batch command combining multiple sub-commands.
    Batch(Vec<EditorCommand>),
}

// ────────────────────────────────────────────────────────────────────────────
// Editor History (undo / redo stack)
// ────────────────────────────────────────────────────────────────────────────

/// Undo/redo history for the editor.
///
/// # Example
///
/// ```rust
/// use roboblocks::block_types::BlockKind;
/// use roboblocks::editor::{EditorHistory, add_block};
/// use roboblocks::model::Program;
///
/// let mut program = Program::new();
/// let mut history = EditorHistory::new(100);
/// history.push(add_block(&mut program, BlockKind::RobotStop).unwrap());
/// history.undo(&mut program); // removes the block again
/// assert!(program.is_empty());
/// history.redo(&mut program); // re-inserts it
/// assert_eq!(program.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EditorHistory {
    undo_stack: Vec<EditorCommand>,
    redo_stack: Vec<EditorCommand>,
    max_size: usize,
}

impl EditorHistory {
    /// Create a new history with the given maximum undo depth.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Push a command onto the undo stack and clear the redo stack.
    pub fn push(&mut self, cmd: EditorCommand) {
        self.undo_stack.push(cmd);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last command, returning true if an undo was performed.
    pub fn undo(&mut self, program: &mut Program) -> bool {
        if let Some(cmd) = self.undo_stack.pop() {
            let inverse = apply_inverse(program, &cmd);
            self.redo_stack.push(inverse);
            true
        } else {
            false
        }
    }

    /// Redo the last undone command, returning true if a redo was performed.
    pub fn redo(&mut self, program: &mut Program) -> bool {
        if let Some(cmd) = self.redo_stack.pop() {
            let inverse = apply_inverse(program, &cmd);
            self.undo_stack.push(inverse);
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Apply the inverse of a command to the program, returning the command that
/// re-applies it.
///
/// Commands come from operations that already succeeded on this program, so
/// the inverse edits are expected to succeed; a failure is logged and skipped.
fn apply_inverse(program: &mut Program, cmd: &EditorCommand) -> EditorCommand {
    match cmd {
        EditorCommand::InsertBlock { list, index, block } => {
            if let Err(err) = program.detach(block.id) {
                debug!(%err, "undo insert: block already gone");
            }
            EditorCommand::RemoveBlock {
                list: *list,
                index: *index,
                block: block.clone(),
            }
        }
        EditorCommand::RemoveBlock { list, index, block } => {
            if let Err(err) = program.attach(*list, *index, (**block).clone()) {
                debug!(%err, "undo remove: could not re-attach");
            }
            EditorCommand::InsertBlock {
                list: *list,
                index: *index,
                block: block.clone(),
            }
        }
        EditorCommand::MoveBlock { list, from, to } => {
            if let Err(err) = program.swap_in_list(*list, *to, *from) {
                debug!(%err, "undo move failed");
            }
            EditorCommand::MoveBlock {
                list: *list,
                from: *to,
                to: *from,
            }
        }
        EditorCommand::SetParam {
            block_id,
            slot,
            old_value,
            new_value,
        } => {
            if let Some(node) = program.node_mut(*block_id) {
                if let Some(v) = node.params.get_mut(*slot) {
                    *v = old_value.clone();
                }
            }
            EditorCommand::SetParam {
                block_id: *block_id,
                slot: *slot,
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            }
        }
        EditorCommand::Clear { removed } => {
            if program.is_empty() {
                for (i, block) in removed.iter().enumerate() {
                    if let Err(err) = program.attach(ListRef::Top, i, block.clone()) {
                        debug!(%err, "undo clear: could not re-attach");
                    }
                }
                // The forward command for redo clears again.
                EditorCommand::Clear {
                    removed: removed.clone(),
                }
            } else {
                program.take_all();
                EditorCommand::Clear {
                    removed: removed.clone(),
                }
            }
        }
        EditorCommand::Batch(cmds) => {
            let inverses: Vec<EditorCommand> =
                cmds.iter().rev().map(|c| apply_inverse(program, c)).collect();
            EditorCommand::Batch(inverses)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// Insert `block` into `list` at `index`. An index past the end appends.
pub fn insert_sibling(
    program: &mut Program,
    list: ListRef,
    index: usize,
    block: ProgramBlock,
) -> Result<EditorCommand, EditError> {
    block.validate()?;
    let index = program.attach(list, index, block.clone())?;
    debug!(kind = %block.kind, id = %block.id, ?list, index, "inserted block");
    Ok(EditorCommand::InsertBlock {
        list,
        index,
        block: Box::new(block),
    })
}

/// Append a fresh block of `kind` to the top-level sequence.
pub fn add_block(program: &mut Program, kind: BlockKind) -> Result<EditorCommand, EditError> {
    let index = program.top().len();
    insert_sibling(program, ListRef::Top, index, catalog::default_instance(kind))
}

/// Append a fresh block of `kind` to the body (or else body) of `parent`.
pub fn add_sub_block(
    program: &mut Program,
    parent: BlockId,
    kind: BlockKind,
    else_branch: bool,
) -> Result<EditorCommand, EditError> {
    let list = if else_branch {
        ListRef::Else(parent)
    } else {
        ListRef::Body(parent)
    };
    let index = program.list(list)?.len();
    insert_sibling(program, list, index, catalog::default_instance(kind))
}

/// Remove the block `id` together with its whole subtree.
pub fn remove(program: &mut Program, id: BlockId) -> Result<EditorCommand, EditError> {
    let (list, index, block) = program.detach(id)?;
    debug!(kind = %block.kind, %id, removed = block.count(), "removed block");
    Ok(EditorCommand::RemoveBlock {
        list,
        index,
        block: Box::new(block),
    })
}

/// Move `id` one position towards the start of its sibling list.
/// The first entry stays where it is.
pub fn move_up(program: &mut Program, id: BlockId) -> Result<EditorCommand, EditError> {
    shift(program, id, -1)
}

/// Move `id` one position towards the end of its sibling list.
/// The last entry stays where it is.
pub fn move_down(program: &mut Program, id: BlockId) -> Result<EditorCommand, EditError> {
    shift(program, id, 1)
}

fn shift(program: &mut Program, id: BlockId, delta: isize) -> Result<EditorCommand, EditError> {
    if id == program.start_id() {
        return Err(EditError::illegal("the start marker cannot be moved"));
    }
    let (list, from) = program.position(id)?;
    let len = program.list(list)?.len();
    let to = from
        .checked_add_signed(delta)
        .filter(|to| *to < len)
        .unwrap_or(from);
    if to != from {
        program.swap_in_list(list, from, to)?;
    }
    Ok(EditorCommand::MoveBlock { list, from, to })
}

/// Replace parameter `slot` of block `id` with `value` after validating it
/// against the slot's type and bounds. Never partially applies.
pub fn set_param(
    program: &mut Program,
    id: BlockId,
    slot: usize,
    value: ParamValue,
) -> Result<EditorCommand, EditError> {
    if id == program.start_id() {
        return Err(EditError::illegal("the start marker has no parameters"));
    }
    let node = program.get(id).ok_or(EditError::UnknownBlock(id))?;
    let kind = node.kind;
    let slot_def = catalog::slots(kind)
        .get(slot)
        .ok_or_else(|| EditError::invalid(kind, slot, "no such parameter slot"))?;
    slot_def.validate(kind, slot, &value)?;
    let old_value = node.params[slot].clone();

    let node = program.node_mut(id).ok_or(EditError::UnknownBlock(id))?;
    node.params[slot] = value.clone();
    Ok(EditorCommand::SetParam {
        block_id: id,
        slot,
        old_value,
        new_value: value,
    })
}

/// Like [`set_param`], but parses raw editor text for the slot's type first.
pub fn set_param_raw(
    program: &mut Program,
    id: BlockId,
    slot: usize,
    raw: &str,
) -> Result<EditorCommand, EditError> {
    let kind = program.get(id).ok_or(EditError::UnknownBlock(id))?.kind;
    let slot_def = catalog::slots(kind)
        .get(slot)
        .ok_or_else(|| EditError::invalid(kind, slot, "no such parameter slot"))?;
    let value = slot_def.parse(kind, slot, raw)?;
    set_param(program, id, slot, value)
}

/// Remove every block from the program.
pub fn clear_program(program: &mut Program) -> EditorCommand {
    EditorCommand::Clear {
        removed: program.take_all(),
    }
}
