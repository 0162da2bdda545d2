//! Gate-level Verilog import and export.

mod reader;
mod writer;

pub use reader::parse_verilog;
pub use writer::{DFF_CELL, VerilogDisplay, VerilogWriter};
