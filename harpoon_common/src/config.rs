//! Configuration for a locking run.
//!
//! ```ignore
//! use harpoon_common::LockConfig;
//! let cfg = LockConfig::builder()
//!     .key_length(8)
//!     .lock_count(16)
//!     .seed(Some(7))
//!     .build();
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::yosys::SynthConfig;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The authentication key must have at least one digit.
    #[error("Key length must be at least 1")]
    ZeroKeyLength,

    /// At least one node must be locked.
    #[error("Lock count must be at least 1")]
    ZeroLockCount,

    /// A port or module name was left empty.
    #[error("Configuration field '{0}' must not be empty")]
    EmptyName(&'static str),

    /// The controller and wrapper would share a module name.
    #[error("Controller and wrapper modules both named '{0}'")]
    DuplicateModuleName(String),
}

/// Global configuration of one locking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Number of key digits the controller expects.
    pub key_length: usize,
    /// Number of internal nodes to lock, which is also the flip-vector width.
    pub lock_count: usize,
    /// Seed of the run's random source. Drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Name of the clock input of the design.
    pub clock: String,
    /// Name of the reset input added to the locked design and the wrapper.
    pub reset_port: String,
    /// Module name of the generated authentication controller.
    pub controller_module: String,
    /// Module name of the generated top-level wrapper.
    pub wrapper_module: String,
    /// Random vectors used to check the locked design against the original.
    pub equivalence_samples: usize,
    /// Directory the generated files are written to.
    pub output_dir: PathBuf,
    /// Run the synthesis backend after writing the generated files.
    pub synthesize: bool,
    /// Synthesis backend options.
    pub synth: SynthConfig,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            key_length: 5,
            lock_count: 5,
            seed: None,
            clock: "CK".to_string(),
            reset_port: "reset".to_string(),
            controller_module: "auth_controller".to_string(),
            wrapper_module: "top_module".to_string(),
            equivalence_samples: 64,
            output_dir: PathBuf::from("generated"),
            synthesize: true,
            synth: SynthConfig::default(),
        }
    }
}

impl LockConfig {
    /// Starts from the defaults.
    pub fn builder() -> LockConfigBuilder {
        LockConfigBuilder::default()
    }

    /// Checks the values a run cannot proceed without.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_length == 0 {
            return Err(ConfigError::ZeroKeyLength);
        }
        if self.lock_count == 0 {
            return Err(ConfigError::ZeroLockCount);
        }
        for (field, value) in [
            ("clock", &self.clock),
            ("reset_port", &self.reset_port),
            ("controller_module", &self.controller_module),
            ("wrapper_module", &self.wrapper_module),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyName(field));
            }
        }
        if self.controller_module == self.wrapper_module {
            return Err(ConfigError::DuplicateModuleName(self.wrapper_module.clone()));
        }
        Ok(())
    }
}

/// Builder for [`LockConfig`].
#[derive(Debug, Clone, Default)]
pub struct LockConfigBuilder {
    config: LockConfig,
}

impl LockConfigBuilder {
    /// Sets [`LockConfig::key_length`].
    pub const fn key_length(mut self, key_length: usize) -> Self {
        self.config.key_length = key_length;
        self
    }

    /// Sets [`LockConfig::lock_count`].
    pub const fn lock_count(mut self, lock_count: usize) -> Self {
        self.config.lock_count = lock_count;
        self
    }

    /// Fixes the seed, or draws one per run with `None`.
    pub const fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets [`LockConfig::clock`].
    pub fn clock(mut self, clock: impl Into<String>) -> Self {
        self.config.clock = clock.into();
        self
    }

    /// Sets [`LockConfig::reset_port`].
    pub fn reset_port(mut self, reset_port: impl Into<String>) -> Self {
        self.config.reset_port = reset_port.into();
        self
    }

    /// Sets [`LockConfig::controller_module`].
    pub fn controller_module(mut self, name: impl Into<String>) -> Self {
        self.config.controller_module = name.into();
        self
    }

    /// Sets [`LockConfig::wrapper_module`].
    pub fn wrapper_module(mut self, name: impl Into<String>) -> Self {
        self.config.wrapper_module = name.into();
        self
    }

    /// Sets [`LockConfig::equivalence_samples`]. Zero skips the self-check.
    pub const fn equivalence_samples(mut self, samples: usize) -> Self {
        self.config.equivalence_samples = samples;
        self
    }

    /// Sets [`LockConfig::output_dir`].
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Enables or disables the synthesis step.
    pub const fn synthesize(mut self, synthesize: bool) -> Self {
        self.config.synthesize = synthesize;
        self
    }

    /// Replaces the synthesis backend options.
    pub fn synth(mut self, synth: SynthConfig) -> Self {
        self.config.synth = synth;
        self
    }

    /// Returns the configuration without validating it.
    pub fn build(self) -> LockConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_cli_defaults() {
        let cfg = LockConfig::default();
        assert_eq!(cfg.key_length, 5);
        assert_eq!(cfg.lock_count, 5);
        assert_eq!(cfg.clock, "CK");
        assert!(cfg.validate().is_ok());
    }

    #[rstest]
    #[case(LockConfig::builder().key_length(0).build(), ConfigError::ZeroKeyLength)]
    #[case(LockConfig::builder().lock_count(0).build(), ConfigError::ZeroLockCount)]
    #[case(LockConfig::builder().clock("").build(), ConfigError::EmptyName("clock"))]
    #[case(
        LockConfig::builder().controller_module("top_module").build(),
        ConfigError::DuplicateModuleName("top_module".into())
    )]
    fn validate_rejects(#[case] cfg: LockConfig, #[case] expected: ConfigError) {
        assert_eq!(cfg.validate(), Err(expected));
    }
}
