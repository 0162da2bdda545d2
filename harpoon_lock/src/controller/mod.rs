//! Authentication controller generation.
//!
//! [`ControllerTable`] holds what the machine does and formats itself as a
//! Verilog module through `Display`. [`ControllerSim`] steps it cycle by cycle.

mod emit;
mod sim;
mod table;

pub use sim::ControllerSim;
pub use table::{CaseArm, ControllerTable, OutputVector, StateRow, state_width};
