use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::yosys::{DesignPath, SynthConfig};

/// Failures of the synthesis backend.
#[derive(Debug, Error)]
pub enum SynthError {
    /// No usable yosys binary.
    #[error("Failed to find yosys binary: {0}")]
    YosysNotFound(String),
    /// The design file has an extension yosys cannot read.
    #[error("Unsupported design: {0}")]
    UnsupportedDesign(String),
    /// Spawning yosys or touching its files failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Yosys exited unsuccessfully.
    #[error("Yosys failed: status={status}\n{stderr}")]
    Failed {
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Runs yosys over a merged design and writes the mapped netlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesizer {
    yosys: PathBuf,
}

impl Synthesizer {
    /// Locates yosys on `PATH`.
    pub fn new() -> Result<Self, SynthError> {
        let yosys = which::which("yosys").map_err(|e| SynthError::YosysNotFound(e.to_string()))?;
        Ok(Self { yosys })
    }

    pub fn with_yosys<Y: AsRef<Path>>(yosys: Y) -> Result<Self, SynthError> {
        let yosys = yosys.as_ref().to_path_buf();
        if !yosys.exists() {
            return Err(SynthError::YosysNotFound(format!(
                "Yosys binary not found at: {}",
                yosys.display()
            )));
        }
        Ok(Self { yosys })
    }

    /// Uses the configured binary, falling back to `PATH`.
    pub fn from_config(config: &SynthConfig) -> Result<Self, SynthError> {
        match &config.yosys {
            Some(path) => Self::with_yosys(path),
            None => Self::new(),
        }
    }

    pub fn yosys_path(&self) -> &Path {
        &self.yosys
    }

    pub fn build_yosys_args(
        &self,
        design: &DesignPath,
        top: &str,
        output_path: &Path,
        config: &SynthConfig,
    ) -> Vec<String> {
        let mut args = Vec::new();

        // Read command
        args.push("-p".to_string());
        args.push(format!(
            "{} {}",
            design.read_command(),
            design.path().display()
        ));

        // Hierarchy
        args.push("-p".to_string());
        args.push(format!("hierarchy -top {top}"));

        // Process
        args.push("-p".to_string());
        args.push("proc".to_string());

        // Flatten
        if config.flatten {
            args.push("-p".to_string());
            args.push("flatten".to_string());
        }

        // Technology mapping
        args.push("-p".to_string());
        args.push(format!("synth -top {top}"));

        // Optimize and clean
        args.push("-p".to_string());
        args.push("opt_clean".to_string());

        // Other steps
        for step in &config.other_steps {
            args.push("-p".to_string());
            args.push(step.clone());
        }

        // Write output
        args.push("-p".to_string());
        args.push(format!("write_verilog -noattr {}", output_path.display()));

        args
    }

    /// Synthesizes `design` with `top` as the root module into `output_path`.
    pub fn synthesize(
        &self,
        design: &DesignPath,
        top: &str,
        output_path: &Path,
        config: &SynthConfig,
    ) -> Result<(), SynthError> {
        let args = self.build_yosys_args(design, top, output_path, config);
        tracing::info!("running {} {:?}", self.yosys.display(), args);

        let mut cmd = Command::new(&self.yosys);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output()?;

        if !output.status.success() {
            let stderr_str = String::from_utf8_lossy(&output.stderr);
            tracing::event!(
                tracing::Level::ERROR,
                "Yosys failed: status={:?}\n{}",
                output.status,
                stderr_str,
            );
            return Err(SynthError::Failed {
                status: output.status.to_string(),
                stderr: stderr_str.into_owned(),
            });
        }

        Ok(())
    }
}
