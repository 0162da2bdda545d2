//! Node selection and XOR substitution.
//!
//! Each sampled gate `n` is split into a duplicate `n_orig` that keeps the
//! operator and producers of `n`, and an XOR `n_flipped` of that duplicate
//! with a new input `n_flipper` that takes over every consumer of `n`. With
//! the flipper low the circuit computes what it did before; with it high the
//! one signal is inverted downstream.

use harpoon_netlist::{Circuit, GraphError, Node, NodeKind};
use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LockError;

/// The nodes generated for one locked gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedNode {
    /// Identifier of the gate that was locked.
    pub original: String,
    /// Operator of the locked gate.
    pub kind: NodeKind,
    /// Copy of the gate reading the original producers.
    pub duplicate: String,
    /// Input that inverts the signal when high.
    pub flipper: String,
    /// XOR of the duplicate and the flipper, feeding the original consumers.
    pub flipped: String,
}

impl LockedNode {
    fn new(original: &str, kind: NodeKind) -> Self {
        Self {
            original: original.to_string(),
            kind,
            duplicate: format!("{original}_orig"),
            flipper: format!("{original}_flipper"),
            flipped: format!("{original}_flipped"),
        }
    }
}

/// Port names of the design before locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortLists {
    /// Inputs in declaration order.
    pub inputs: Vec<String>,
    /// Outputs in declaration order.
    pub outputs: Vec<String>,
}

/// A circuit after the locking transform together with what was done to it.
#[derive(Debug, Clone)]
pub struct LockedDesign {
    circuit: Circuit,
    records: Vec<LockedNode>,
    ports: PortLists,
    reset: String,
}

impl LockedDesign {
    #[must_use]
    pub const fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Locked gates in sampling order. Bit `i` of the flip vector drives `records()[i].flipper`.
    #[must_use]
    pub fn records(&self) -> &[LockedNode] {
        &self.records
    }

    /// Ports of the unmodified design.
    #[must_use]
    pub const fn original_ports(&self) -> &PortLists {
        &self.ports
    }

    /// Name of the reset input wired to every black box.
    #[must_use]
    pub fn reset(&self) -> &str {
        &self.reset
    }

    /// `(original, flipper)` pairs in sampling order.
    pub fn flipper_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records
            .iter()
            .map(|r| (r.original.as_str(), r.flipper.as_str()))
    }
}

/// Internal gates that are not themselves outputs, in graph order.
#[must_use]
pub fn lockable_candidates(circuit: &Circuit) -> Vec<String> {
    circuit
        .filter_type(&NodeKind::PRIMITIVE_GATES)
        .into_iter()
        .filter(|id| !circuit.is_output(id))
        .collect()
}

/// Locks `lock_count` uniformly sampled gates of `circuit`.
///
/// The input circuit is left untouched. After all gates are processed an
/// input named `reset` is added and wired to every black box reset pin.
///
/// # Errors
///
/// - [`LockError::InsufficientCandidates`] if `lock_count` exceeds the candidates.
/// - [`LockError::PortConflict`] if `reset` already names a node.
/// - [`LockError::ExistingReset`] if a black box already has a reset bound.
/// - [`LockError::GraphIntegrityViolation`] if an edit fails, including a
///   generated name colliding with an existing node.
pub fn lock_circuit<R>(
    circuit: &Circuit,
    lock_count: usize,
    reset: &str,
    rng: &mut R,
) -> Result<LockedDesign, LockError>
where
    R: Rng + ?Sized,
{
    let candidates = lockable_candidates(circuit);
    if lock_count > candidates.len() {
        return Err(LockError::InsufficientCandidates {
            requested: lock_count,
            available: candidates.len(),
        });
    }
    if circuit.contains(reset) {
        return Err(LockError::PortConflict(reset.to_string()));
    }
    let bound = circuit
        .nodes()
        .find_map(|n| n.pins().and_then(|p| p.reset.as_ref()).map(|r| (n.id(), r)));
    if let Some((register, existing)) = bound {
        return Err(LockError::ExistingReset {
            register: register.to_string(),
            reset: existing.clone(),
        });
    }

    let sampled: Vec<&String> = index::sample(rng, candidates.len(), lock_count)
        .into_iter()
        .map(|i| &candidates[i])
        .collect();

    let mut locked = circuit.clone();
    let mut records = Vec::with_capacity(lock_count);
    for id in sampled {
        let record = lock_node(&mut locked, id)?;
        info!("locked {} ({}) behind {}", record.original, record.kind, record.flipper);
        records.push(record);
    }

    locked.add(reset, NodeKind::Input)?;
    for black_box in locked.filter_type(&[NodeKind::Dff]) {
        locked.bind_reset(&black_box, reset)?;
    }
    locked.validate()?;

    debug!(
        "locked {} of {} candidates in {}",
        records.len(),
        candidates.len(),
        circuit.name()
    );

    Ok(LockedDesign {
        circuit: locked,
        records,
        ports: PortLists {
            inputs: circuit.inputs(),
            outputs: circuit.outputs(),
        },
        reset: reset.to_string(),
    })
}

fn lock_node(circuit: &mut Circuit, id: &str) -> Result<LockedNode, GraphError> {
    let kind = circuit.kind(id)?;
    let instance = circuit
        .node(id)
        .and_then(Node::instance)
        .map(str::to_string);
    let record = LockedNode::new(id, kind);

    circuit.add(&record.flipper, NodeKind::Input)?;

    let fanin = circuit.fanin(id)?;
    circuit.add_connected(&record.duplicate, kind, &fanin, std::iter::empty::<&str>())?;
    if let Some(instance) = instance {
        circuit.set_instance(&record.duplicate, instance)?;
    }
    circuit.disconnect(&fanin, id)?;

    let fanout = circuit.fanout(id)?;
    circuit.remove(id)?;
    circuit.add_connected(
        &record.flipped,
        NodeKind::Xor,
        [&record.duplicate, &record.flipper],
        &fanout,
    )?;
    circuit.rebind_pins(id, &record.flipped);

    Ok(record)
}
