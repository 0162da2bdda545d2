//! Common utilities and shared types for the harpoon workspace.
//!
//! This crate provides the run configuration and the yosys integration used
//! to synthesize locked designs.

mod config;
mod yosys;

pub use crate::config::*;
pub use crate::yosys::*;
