//! Block-program model and execution engine for small wheeled robots.
//!
//! Programs are trees of blocks drawn from a fixed [`catalog`]. The
//! [`editor`] operations edit them without breaking their invariants, and the
//! [`runtime`] interprets them against a motor command sink and a sensor
//! source, such as the simulated robot in [`sim`].
//!
//! The binary `roboblocks` lists the catalog, writes presets, converts program
//! documents and runs programs against the simulator.

pub mod block_types;
pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod model;
pub mod presets;
pub mod runtime;
pub mod sim;
