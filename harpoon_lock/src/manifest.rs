//! Machine-readable summary of a locking run.

use serde::{Deserialize, Serialize};

use crate::auth::StateId;
use crate::error::LockError;
use crate::transform::LockedNode;

/// Everything needed to reproduce or audit a run, written as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Locked module.
    pub top: String,
    /// Seed the run's generator was built from.
    pub seed: u64,
    /// Number of key digits.
    pub key_length: usize,
    /// Number of locked nodes, also the flip-vector width.
    pub lock_count: usize,
    /// Inputs feeding the controller, most significant first.
    pub key_inputs: Vec<String>,
    /// Locked nodes in flip-vector bit order.
    pub locked: Vec<LockedNode>,
    /// Controller states including the decoy mesh.
    pub states: usize,
    /// Decoy state ids in creation order.
    pub decoys: Vec<StateId>,
    /// Bits of the controller's state register.
    pub state_width: usize,
    /// Locked nodes whose flipper showed no effect during the self-check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ineffective: Vec<String>,
}

impl Manifest {
    /// # Errors
    ///
    /// [`LockError::Manifest`] if serialization fails.
    pub fn to_json(&self) -> Result<String, LockError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// [`LockError::Manifest`] if `json` is not a manifest.
    pub fn from_json(json: &str) -> Result<Self, LockError> {
        Ok(serde_json::from_str(json)?)
    }
}
