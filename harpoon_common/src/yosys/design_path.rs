//! Handling of design file paths and types.

use std::path::{Path, PathBuf};

/// A path to a structural Verilog file (.v).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesignPath(PathBuf);

impl DesignPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        match path.extension().and_then(|s| s.to_str()) {
            Some("v") => Ok(Self(path)),
            _ => Err(format!(
                "Unsupported design file extension: {:?}",
                path.extension()
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub const fn read_command(&self) -> &'static str {
        "read_verilog"
    }

    pub fn exists(&self) -> bool {
        self.0.exists()
    }
}
