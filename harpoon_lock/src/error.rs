//! Error types for a locking run.
//!
//! Input, sampling and configuration errors are raised while everything is
//! still in memory, before the first file is written. Only I/O and the
//! synthesis backend can fail once output has started.

use harpoon_common::{ConfigError, SynthError};
use harpoon_netlist::{GraphError, ParseError};
use thiserror::Error;

/// Errors that can abort a locking run.
#[derive(Debug, Error)]
pub enum LockError {
    /// The source netlist could not be parsed.
    #[error("Malformed input at line {line}: {message}")]
    MalformedInput {
        /// 1-based source line.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The requested top module is absent from the source.
    #[error("Top module '{module}' not found (available: {available:?})")]
    TopModuleNotFound {
        /// Requested module name.
        module: String,
        /// Modules defined in the source.
        available: Vec<String>,
    },

    /// More nodes were requested than the design can offer.
    #[error("Cannot lock {requested} nodes: only {available} lockable nodes in the design")]
    InsufficientCandidates {
        /// Requested lock count.
        requested: usize,
        /// Internal gates that are not outputs.
        available: usize,
    },

    /// A graph edit referenced a node or edge that does not exist.
    #[error("Graph integrity violation: {0}")]
    GraphIntegrityViolation(#[from] GraphError),

    /// The locked design disagrees with the original with every flipper low.
    #[error("Locked design diverges from the original on '{net}' (sample {sample})")]
    EquivalenceMismatch {
        /// Output or register that differed.
        net: String,
        /// Index of the random vector that exposed it.
        sample: usize,
    },

    /// The synthesis backend failed.
    #[error("External tool failure: {0}")]
    ExternalToolFailure(#[from] SynthError),

    /// The run configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The configured clock is not an input of the design.
    #[error("Clock '{clock}' is not an input of module '{module}'")]
    ClockNotFound {
        /// Configured clock name.
        clock: String,
        /// Module that was searched.
        module: String,
    },

    /// The design has no input besides the clock to carry key digits.
    #[error("Module '{0}' has no inputs besides the clock to carry key digits")]
    NoKeyInputs(String),

    /// A generated port or wire name is already used by the design.
    #[error("Generated name '{0}' collides with a port of the design")]
    PortConflict(String),

    /// A register already has a reset net of its own.
    #[error("Register '{register}' already has reset '{reset}' bound")]
    ExistingReset {
        /// Register holding the reset.
        register: String,
        /// Net on its reset pin.
        reset: String,
    },

    /// A key file line is not a positive integer.
    #[error("Malformed key file at line {line}: '{content}'")]
    MalformedKey {
        /// 1-based line.
        line: usize,
        /// Offending text.
        content: String,
    },

    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The run manifest could not be serialized.
    #[error("Manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl From<ParseError> for LockError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Malformed { line, message } => Self::MalformedInput { line, message },
            ParseError::TopModuleNotFound { module, available } => {
                Self::TopModuleNotFound { module, available }
            },
        }
    }
}
