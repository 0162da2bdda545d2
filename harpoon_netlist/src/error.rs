//! Error types for graph edits and netlist parsing.

use thiserror::Error;

/// Structural edits that would break the graph's referential integrity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node with this identifier already exists.
    #[error("Duplicate node identifier '{0}'")]
    DuplicateIdentifier(String),

    /// No node with this identifier exists.
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// The edge `from -> to` does not exist.
    #[error("Node '{from}' does not feed node '{to}'")]
    NotConnected {
        /// Producer side of the missing edge.
        from: String,
        /// Consumer side of the missing edge.
        to: String,
    },

    /// A combinational node would read its own output.
    #[error("Node '{0}' cannot appear in its own fanin")]
    SelfLoop(String),

    /// A non-input node has no producers.
    #[error("Node '{0}' has an empty fanin")]
    EmptyFanin(String),

    /// An edge or pin names a node that is not in the table.
    #[error("Node '{node}' references missing node '{missing}'")]
    DanglingReference {
        /// Node holding the stale reference.
        node: String,
        /// Identifier that could not be resolved.
        missing: String,
    },

    /// An edge is recorded on one endpoint only.
    #[error("Edge '{from}' -> '{to}' is not recorded on both endpoints")]
    AsymmetricEdge {
        /// Producer side of the edge.
        from: String,
        /// Consumer side of the edge.
        to: String,
    },

    /// A pin operation was applied to a node that is not a black box.
    #[error("Node '{0}' is not a sequential black box")]
    NotBlackBox(String),

    /// A black box already has a different net on its reset pin.
    #[error("Node '{node}' already has reset '{reset}' bound")]
    ResetAlreadyBound {
        /// The black box.
        node: String,
        /// Net currently on the reset pin.
        reset: String,
    },

    /// The combinational core contains a cycle through this node.
    #[error("Combinational cycle through node '{0}'")]
    CombinationalCycle(String),
}

/// Failures of the gate-level Verilog reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The source text is not a netlist the reader understands.
    #[error("Malformed netlist at line {line}: {message}")]
    Malformed {
        /// 1-based source line the problem was detected on.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The requested top module is not defined in the source.
    #[error("Top module '{module}' not found (available: {available:?})")]
    TopModuleNotFound {
        /// Requested module name.
        module: String,
        /// Modules that were found.
        available: Vec<String>,
    },
}

impl ParseError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}
