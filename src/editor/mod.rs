//! Structural and parameter edits on a [`Program`](crate::model::Program).
//!
//! The engine never edits a program; these operations exist for an external
//! editor and preserve the invariants the engine relies on:
//!
//! - **Arity/type**: every block's parameters match its kind's catalog slots
//! - **Shape**: bodies and else bodies only exist on kinds that declare them
//! - **Start marker**: the implicit start block is never removed or moved
//! - **Undo/Redo**: every operation returns an invertible [`EditorCommand`]

pub mod operations;

pub use operations::{
    EditorCommand, EditorHistory, add_block, add_sub_block, clear_program, insert_sibling,
    move_down, move_up, remove, set_param, set_param_raw,
};
