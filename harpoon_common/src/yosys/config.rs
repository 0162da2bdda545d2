use std::path::PathBuf;

/// Options of the synthesis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Flatten the hierarchy below the wrapper.
    pub flatten: bool,
    /// Explicit yosys binary. Looked up on `PATH` when absent.
    pub yosys: Option<PathBuf>,
    /// Extra yosys commands run before the netlist is written.
    pub other_steps: Vec<String>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            flatten: true,
            yosys: None,
            other_steps: Vec::new(),
        }
    }
}

impl SynthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn with_yosys(mut self, yosys: impl Into<PathBuf>) -> Self {
        self.yosys = Some(yosys.into());
        self
    }

    pub fn with_step(mut self, step: &str) -> Self {
        self.other_steps.push(step.to_string());
        self
    }
}
