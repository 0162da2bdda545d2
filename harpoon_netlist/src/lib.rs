//! Circuit graph model for gate-level netlists.
//!
//! This crate provides the identifier-keyed graph the locking flow edits,
//! the structural Verilog reader and writer used to move designs in and out
//! of it, and a small two-valued simulator for checking edits.

pub mod circuit;
pub mod error;
pub mod node;
pub mod sim;
pub mod verilog;

pub use circuit::Circuit;
pub use error::{GraphError, ParseError};
pub use node::{BlackBoxPins, Node, NodeKind};
pub use sim::{Evaluation, Simulator};
pub use verilog::{DFF_CELL, VerilogDisplay, VerilogWriter, parse_verilog};
