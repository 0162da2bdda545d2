use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::auth::AuthGraph;
use crate::error::LockError;

/// The digit sequence that unlocks a design, one digit per clock cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthKey(Vec<u32>);

impl AuthKey {
    #[must_use]
    pub const fn new(digits: Vec<u32>) -> Self {
        Self(digits)
    }

    #[must_use]
    pub fn digits(&self) -> &[u32] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a key file: one decimal digit per line, blank lines ignored.
    ///
    /// # Errors
    ///
    /// [`LockError::MalformedKey`] for a line that is not a positive integer.
    pub fn parse(text: &str) -> Result<Self, LockError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                line.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| LockError::MalformedKey {
                        line: i + 1,
                        content: line.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Reads a key file written by [`AuthKey::write`].
    ///
    /// # Errors
    ///
    /// I/O failures and malformed lines.
    pub fn read(path: &Path) -> Result<Self, LockError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// # Errors
    ///
    /// Propagates I/O failures.
    pub fn write(&self, path: &Path) -> Result<(), LockError> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.0 {
            writeln!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl From<&AuthGraph> for AuthKey {
    fn from(graph: &AuthGraph) -> Self {
        Self(graph.key().to_vec())
    }
}
