//! End-to-end locking run.
//!
//! Everything is generated in memory by [`Locker::lock_source`] before any
//! file is touched, so a bad netlist, an oversized lock count or a port
//! clash leaves the output directory as it was.

use std::path::{Path, PathBuf};

use harpoon_common::{DesignPath, LockConfig, SynthError, Synthesizer};
use harpoon_netlist::{VerilogWriter, parse_verilog};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::auth::{AuthGraph, AuthKey};
use crate::check::check_equivalence;
use crate::compose::TopLevel;
use crate::controller::ControllerTable;
use crate::error::LockError;
use crate::manifest::Manifest;
use crate::transform::lock_circuit;

/// Locked design with the `dff` cell.
pub const LOCKED_FILE: &str = "locked.v";
/// Controller module.
pub const CONTROLLER_FILE: &str = "controller.v";
/// Wrapper module.
pub const TOP_FILE: &str = "top.v";
/// One key digit per line.
pub const KEY_FILE: &str = "key.txt";
/// Run summary.
pub const MANIFEST_FILE: &str = "manifest.json";
/// All generated modules in one file, the synthesis input.
pub const MERGED_FILE: &str = "merged.v";
/// Mapped netlist written by yosys.
pub const SYNTH_FILE: &str = "synth.v";

/// Generated text of one run.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Locked design followed by the `dff` cell it instantiates.
    pub locked: String,
    /// Authentication controller module.
    pub controller: String,
    /// Wrapper module.
    pub top: String,
    /// Digits that unlock the design.
    pub key: AuthKey,
    /// Summary written as `manifest.json`.
    pub manifest: Manifest,
    wrapper: String,
}

impl Artifacts {
    /// Name of the wrapper module, the root for synthesis.
    #[must_use]
    pub fn wrapper(&self) -> &str {
        &self.wrapper
    }

    /// All three modules in one source, as handed to synthesis.
    #[must_use]
    pub fn merged(&self) -> String {
        format!("{}\n{}\n{}", self.locked, self.controller, self.top)
    }

    /// Writes every artifact under `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// I/O failures and manifest serialization failures.
    pub fn write_to(&self, dir: &Path) -> Result<ArtifactPaths, LockError> {
        let manifest = self.manifest.to_json()?;
        std::fs::create_dir_all(dir)?;

        let paths = ArtifactPaths {
            locked: dir.join(LOCKED_FILE),
            controller: dir.join(CONTROLLER_FILE),
            top: dir.join(TOP_FILE),
            key: dir.join(KEY_FILE),
            manifest: dir.join(MANIFEST_FILE),
            merged: dir.join(MERGED_FILE),
            synthesized: None,
        };
        for (path, contents) in [
            (&paths.locked, self.locked.as_str()),
            (&paths.controller, self.controller.as_str()),
            (&paths.top, self.top.as_str()),
            (&paths.manifest, manifest.as_str()),
            (&paths.merged, self.merged().as_str()),
        ] {
            std::fs::write(path, contents)?;
            info!("wrote {}", path.display());
        }
        self.key.write(&paths.key)?;
        info!("wrote {}", paths.key.display());

        Ok(paths)
    }
}

/// Where a run put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// See [`LOCKED_FILE`].
    pub locked: PathBuf,
    /// See [`CONTROLLER_FILE`].
    pub controller: PathBuf,
    /// See [`TOP_FILE`].
    pub top: PathBuf,
    /// See [`KEY_FILE`].
    pub key: PathBuf,
    /// See [`MANIFEST_FILE`].
    pub manifest: PathBuf,
    /// See [`MERGED_FILE`].
    pub merged: PathBuf,
    /// Mapped netlist, when synthesis ran.
    pub synthesized: Option<PathBuf>,
}

/// Runs the locking flow under one [`LockConfig`].
#[derive(Debug, Clone)]
pub struct Locker {
    config: LockConfig,
}

impl Locker {
    /// # Errors
    ///
    /// [`LockError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: LockConfig) -> Result<Self, LockError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Locks module `top` of the Verilog text `source`.
    ///
    /// All randomness comes from one generator seeded with the configured
    /// seed, or a fresh one that is logged and recorded in the manifest.
    ///
    /// # Errors
    ///
    /// Parse, sampling, port and self-check errors. Nothing is written.
    pub fn lock_source(&self, source: &str, top: &str) -> Result<Artifacts, LockError> {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(rand::random);
        info!("locking {top} with seed {seed}");
        let mut rng = StdRng::seed_from_u64(seed);

        let original = parse_verilog(source, top)?;
        let design = lock_circuit(&original, config.lock_count, &config.reset_port, &mut rng)?;
        let wrapper = TopLevel::new(
            &design,
            &config.wrapper_module,
            &config.controller_module,
            &config.clock,
        )?;
        let report = check_equivalence(&original, &design, config.equivalence_samples, &mut rng)?;

        let graph = AuthGraph::build(config.key_length, wrapper.alphabet(), &mut rng);
        let table = ControllerTable::build(
            &graph,
            &config.controller_module,
            wrapper.key_inputs().len(),
            config.lock_count,
            &mut rng,
        );
        let key = AuthKey::from(&graph);

        let manifest = Manifest {
            top: top.to_string(),
            seed,
            key_length: config.key_length,
            lock_count: config.lock_count,
            key_inputs: wrapper.key_inputs().to_vec(),
            locked: design.records().to_vec(),
            states: graph.state_count(),
            decoys: graph.decoy_states().to_vec(),
            state_width: table.state_width(),
            ineffective: report.ineffective,
        };

        Ok(Artifacts {
            locked: VerilogWriter::new()
                .with_cell_library(true)
                .write(design.circuit()),
            controller: table.to_verilog(),
            top: wrapper.to_verilog(),
            key,
            manifest,
            wrapper: wrapper.module().to_string(),
        })
    }

    /// Locks module `top` of the netlist at `path`.
    ///
    /// # Errors
    ///
    /// As [`Locker::lock_source`], plus failure to read `path`.
    pub fn lock_file(&self, path: &Path, top: &str) -> Result<Artifacts, LockError> {
        let source = std::fs::read_to_string(path)?;
        self.lock_source(&source, top)
    }

    /// Locks, writes every artifact to the output directory and synthesizes
    /// the merged design when enabled.
    ///
    /// # Errors
    ///
    /// Anything [`Locker::lock_file`] raises, I/O failures while writing, and
    /// [`LockError::ExternalToolFailure`] if synthesis fails. Written files
    /// are left in place on synthesis failure.
    pub fn run(&self, path: &Path, top: &str) -> Result<ArtifactPaths, LockError> {
        let artifacts = self.lock_file(path, top)?;
        let mut paths = artifacts.write_to(&self.config.output_dir)?;

        if !self.config.synthesize {
            info!("synthesis skipped");
            return Ok(paths);
        }

        let design = DesignPath::new(&paths.merged).map_err(SynthError::UnsupportedDesign)?;
        let output = self.config.output_dir.join(SYNTH_FILE);
        let synthesizer = Synthesizer::from_config(&self.config.synth)?;
        if let Err(err) = synthesizer.synthesize(&design, artifacts.wrapper(), &output, &self.config.synth) {
            warn!(
                "generated files kept in {}",
                self.config.output_dir.display()
            );
            return Err(err.into());
        }
        info!("wrote {}", output.display());
        paths.synthesized = Some(output);

        Ok(paths)
    }
}
