//! Yosys integration for harpoon.
//!
//! This module provides the synthesis backend configuration, design path
//! typing, and the process wrapper that runs yosys over the merged design.

mod config;
mod design_path;
mod synth;

pub use config::SynthConfig;
pub use design_path::DesignPath;
pub use synth::{SynthError, Synthesizer};
