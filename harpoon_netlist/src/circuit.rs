//! The identifier-keyed circuit graph.
//!
//! Nodes live in an insertion-ordered table keyed by the net they drive and
//! reference each other only through identifiers, so deleting a node can
//! never leave a dangling owner. Every edit keeps the fanin and fanout sets
//! of both endpoints in agreement; [`Circuit::validate`] re-checks that
//! invariant over the whole table.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::error::GraphError;
use crate::node::{BlackBoxPins, Node, NodeKind};

/// A single flattened module as a directed graph of ports, gates and black boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    name: String,
    nodes: IndexMap<String, Node>,
    outputs: IndexSet<String>,
}

impl Circuit {
    /// Creates an empty circuit for the module `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            outputs: IndexSet::new(),
        }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Kind of the node `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `id` is absent.
    pub fn kind(&self, id: &str) -> Result<NodeKind, GraphError> {
        self.get(id).map(Node::kind)
    }

    fn get(&self, id: &str) -> Result<&Node, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    /// Adds an unconnected node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateIdentifier`] if `id` already exists.
    pub fn add(&mut self, id: impl Into<String>, kind: NodeKind) -> Result<(), GraphError> {
        self.add_connected(id, kind, std::iter::empty::<&str>(), std::iter::empty::<&str>())
    }

    /// Adds a node together with its producer and consumer edges.
    ///
    /// Both ends of every edge are updated. Nothing is inserted unless every
    /// check passes.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateIdentifier`] if `id` already exists.
    /// - [`GraphError::SelfLoop`] if `id` appears in `fanin` or `fanout`.
    /// - [`GraphError::UnknownNode`] if a listed neighbour does not exist.
    pub fn add_connected<I, O, S, T>(
        &mut self,
        id: impl Into<String>,
        kind: NodeKind,
        fanin: I,
        fanout: O,
    ) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        O: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateIdentifier(id));
        }

        let fanin: IndexSet<String> = fanin.into_iter().map(|s| s.as_ref().to_string()).collect();
        let fanout: IndexSet<String> = fanout.into_iter().map(|s| s.as_ref().to_string()).collect();

        for neighbour in fanin.iter().chain(fanout.iter()) {
            if *neighbour == id {
                return Err(GraphError::SelfLoop(id));
            }
            if !self.nodes.contains_key(neighbour) {
                return Err(GraphError::UnknownNode(neighbour.clone()));
            }
        }

        for producer in &fanin {
            if let Some(node) = self.nodes.get_mut(producer) {
                node.fanout.insert(id.clone());
            }
        }
        for consumer in &fanout {
            if let Some(node) = self.nodes.get_mut(consumer) {
                node.fanin.insert(id.clone());
            }
        }

        trace!("add {} ({}) fanin={:?} fanout={:?}", id, kind, fanin, fanout);

        let mut node = Node::new(id.clone(), kind);
        node.fanin = fanin;
        node.fanout = fanout;
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Adds the edge `from -> to`. Adding an existing edge is a no-op.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownNode`] if either endpoint is absent.
    /// - [`GraphError::SelfLoop`] if `from == to` and the node is combinational.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.get(from)?;
        let kind = self.kind(to)?;
        if from == to && !kind.is_black_box() {
            return Err(GraphError::SelfLoop(to.to_string()));
        }

        self.get_mut(from)?.fanout.insert(to.to_string());
        self.get_mut(to)?.fanin.insert(from.to_string());
        Ok(())
    }

    /// Deletes `id` and detaches it from every neighbour.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `id` is absent.
    pub fn remove(&mut self, id: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;

        for producer in &node.fanin {
            if let Some(p) = self.nodes.get_mut(producer) {
                p.fanout.shift_remove(id);
            }
        }
        for consumer in &node.fanout {
            if let Some(c) = self.nodes.get_mut(consumer) {
                c.fanin.shift_remove(id);
            }
        }
        self.outputs.shift_remove(id);

        trace!("remove {}", id);
        Ok(())
    }

    /// Removes each listed producer from `id`'s fanin and `id` from each
    /// producer's fanout.
    ///
    /// All edges are checked before any is removed.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownNode`] if `id` is absent.
    /// - [`GraphError::NotConnected`] if a listed edge does not exist.
    pub fn disconnect<I, S>(&mut self, fanin: I, id: &str) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let producers: Vec<String> = fanin.into_iter().map(|s| s.as_ref().to_string()).collect();
        let consumer = self.get(id)?;
        for producer in &producers {
            if !consumer.fanin.contains(producer) {
                return Err(GraphError::NotConnected {
                    from: producer.clone(),
                    to: id.to_string(),
                });
            }
        }

        for producer in &producers {
            self.get_mut(id)?.fanin.shift_remove(producer);
            self.get_mut(producer)?.fanout.shift_remove(id);
        }
        Ok(())
    }

    /// Snapshot of the producers of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `id` is absent.
    pub fn fanin(&self, id: &str) -> Result<IndexSet<String>, GraphError> {
        self.get(id).map(|n| n.fanin.clone())
    }

    /// Snapshot of the consumers of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `id` is absent.
    pub fn fanout(&self, id: &str) -> Result<IndexSet<String>, GraphError> {
        self.get(id).map(|n| n.fanout.clone())
    }

    /// Identifiers of every node whose kind is in `kinds`, in insertion order.
    #[must_use]
    pub fn filter_type(&self, kinds: &[NodeKind]) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| kinds.contains(&n.kind))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Input ports in declaration order.
    #[must_use]
    pub fn inputs(&self) -> Vec<String> {
        self.filter_type(&[NodeKind::Input])
    }

    /// Output ports in declaration order.
    #[must_use]
    pub fn outputs(&self) -> Vec<String> {
        self.outputs.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_output(&self, id: &str) -> bool {
        self.outputs.contains(id)
    }

    /// Exposes the net driven by `id` as an output port.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `id` is absent.
    pub fn mark_output(&mut self, id: &str) -> Result<(), GraphError> {
        self.get(id)?;
        self.outputs.insert(id.to_string());
        Ok(())
    }

    /// Records the source instance name of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `id` is absent.
    pub fn set_instance(&mut self, id: &str, instance: impl Into<String>) -> Result<(), GraphError> {
        self.get_mut(id)?.instance = Some(instance.into());
        Ok(())
    }

    /// Wires `clock` and `data` to the clock and data pins of the black box `id`.
    ///
    /// Any earlier clock or data binding is replaced; its edge stays in the fanin.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownNode`] if any of the three nodes is absent.
    /// - [`GraphError::NotBlackBox`] if `id` is combinational.
    pub fn bind_pins(&mut self, id: &str, clock: &str, data: &str) -> Result<(), GraphError> {
        if !self.kind(id)?.is_black_box() {
            return Err(GraphError::NotBlackBox(id.to_string()));
        }
        self.connect(clock, id)?;
        self.connect(data, id)?;
        let node = self.get_mut(id)?;
        let reset = node.pins.take().and_then(|pins| pins.reset);
        node.pins = Some(BlackBoxPins {
            clock: clock.to_string(),
            data: data.to_string(),
            reset,
        });
        Ok(())
    }

    /// Wires `reset` to the reset pin of the black box `id`.
    ///
    /// Binding the net already on the pin again is a no-op.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownNode`] if either node is absent.
    /// - [`GraphError::NotBlackBox`] if `id` is combinational or has no pins bound.
    /// - [`GraphError::ResetAlreadyBound`] if a different net drives the pin.
    pub fn bind_reset(&mut self, id: &str, reset: &str) -> Result<(), GraphError> {
        self.get(reset)?;
        let node = self.get(id)?;
        let pins = match (&node.pins, node.kind.is_black_box()) {
            (Some(pins), true) => pins,
            _ => return Err(GraphError::NotBlackBox(id.to_string())),
        };
        if let Some(existing) = &pins.reset {
            if existing == reset {
                return Ok(());
            }
            return Err(GraphError::ResetAlreadyBound {
                node: id.to_string(),
                reset: existing.clone(),
            });
        }

        self.connect(reset, id)?;
        if let Some(pins) = self.get_mut(id)?.pins.as_mut() {
            pins.reset = Some(reset.to_string());
        }
        Ok(())
    }

    /// Points every black-box pin bound to `old` at `new`.
    ///
    /// Returns the number of pins rebound.
    pub fn rebind_pins(&mut self, old: &str, new: &str) -> usize {
        let mut rebound = 0;
        for node in self.nodes.values_mut() {
            let Some(pins) = node.pins.as_mut() else {
                continue;
            };
            for pin in [&mut pins.clock, &mut pins.data] {
                if *pin == old {
                    *pin = new.to_string();
                    rebound += 1;
                }
            }
            if pins.reset.as_deref() == Some(old) {
                pins.reset = Some(new.to_string());
                rebound += 1;
            }
        }
        rebound
    }

    /// Checks referential integrity and edge symmetry over the whole table.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (id, node) in &self.nodes {
            if !node.kind.is_input() && node.fanin.is_empty() {
                return Err(GraphError::EmptyFanin(id.clone()));
            }

            for producer in &node.fanin {
                if producer == id && !node.kind.is_black_box() {
                    return Err(GraphError::SelfLoop(id.clone()));
                }
                let p = self.nodes.get(producer).ok_or_else(|| GraphError::DanglingReference {
                    node: id.clone(),
                    missing: producer.clone(),
                })?;
                if !p.fanout.contains(id) {
                    return Err(GraphError::AsymmetricEdge {
                        from: producer.clone(),
                        to: id.clone(),
                    });
                }
            }

            for consumer in &node.fanout {
                let c = self.nodes.get(consumer).ok_or_else(|| GraphError::DanglingReference {
                    node: id.clone(),
                    missing: consumer.clone(),
                })?;
                if !c.fanin.contains(id) {
                    return Err(GraphError::AsymmetricEdge {
                        from: id.clone(),
                        to: consumer.clone(),
                    });
                }
            }

            if let Some(pins) = &node.pins {
                let bound = [&pins.clock, &pins.data].into_iter().chain(pins.reset.iter());
                for pin in bound {
                    if !node.fanin.contains(pin) {
                        return Err(GraphError::DanglingReference {
                            node: id.clone(),
                            missing: pin.clone(),
                        });
                    }
                }
            }
        }

        for output in &self.outputs {
            if !self.nodes.contains_key(output) {
                return Err(GraphError::DanglingReference {
                    node: self.name.clone(),
                    missing: output.clone(),
                });
            }
        }
        Ok(())
    }

    /// Orders the nodes so every combinational node follows its producers.
    ///
    /// Inputs and black boxes are sources: edges into a black box do not
    /// constrain the order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CombinationalCycle`] if the combinational core is cyclic.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        let mut indegree: IndexMap<&str, usize> = self
            .nodes
            .values()
            .map(|n| {
                let degree = if n.kind.is_input() || n.kind.is_black_box() {
                    0
                } else {
                    n.fanin.len()
                };
                (n.id.as_str(), degree)
            })
            .collect();

        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for consumer in &self.nodes[id].fanout {
                let node = &self.nodes[consumer.as_str()];
                if node.kind.is_input() || node.kind.is_black_box() {
                    continue;
                }
                if let Some(degree) = indegree.get_mut(consumer.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(consumer.as_str());
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = indegree
                .iter()
                .find(|(_, degree)| **degree > 0)
                .map_or_else(String::new, |(id, _)| (*id).to_string());
            return Err(GraphError::CombinationalCycle(stuck));
        }
        Ok(order)
    }
}
