//! Nodes of the circuit graph.
//!
//! A node is identified by the net it drives. Edges are stored as sets of
//! node identifiers on both ends so the graph never holds references into
//! itself.

mod node_kind;

pub use node_kind::NodeKind;

use indexmap::IndexSet;

/// Pin bindings of a sequential black box.
///
/// Every bound net is also in the black box's fanin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackBoxPins {
    /// Net driving the clock pin.
    pub clock: String,
    /// Net driving the data pin.
    pub data: String,
    /// Net driving the reset pin, once one has been wired.
    pub reset: Option<String>,
}

/// A port, gate or black box in a [`crate::Circuit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: String,
    pub(crate) kind: NodeKind,
    pub(crate) fanin: IndexSet<String>,
    pub(crate) fanout: IndexSet<String>,
    pub(crate) instance: Option<String>,
    pub(crate) pins: Option<BlackBoxPins>,
}

impl Node {
    pub(crate) fn new(id: String, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            fanin: IndexSet::new(),
            fanout: IndexSet::new(),
            instance: None,
            pins: None,
        }
    }

    /// Identifier of the node, which is also the name of the net it drives.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Producers feeding this node, in connection order.
    #[must_use]
    pub const fn fanin(&self) -> &IndexSet<String> {
        &self.fanin
    }

    /// Consumers reading this node, in connection order.
    #[must_use]
    pub const fn fanout(&self) -> &IndexSet<String> {
        &self.fanout
    }

    /// Instance name carried over from the source netlist, if any.
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    #[must_use]
    pub const fn pins(&self) -> Option<&BlackBoxPins> {
        self.pins.as_ref()
    }

    /// Net bound to the data pin of a black box.
    #[must_use]
    pub fn data_net(&self) -> Option<&str> {
        self.pins.as_ref().map(|pins| pins.data.as_str())
    }
}
