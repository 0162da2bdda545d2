//! Two-valued netlist simulation.
//!
//! Black boxes behave as registers: their `Q` value is supplied as state and
//! their next value is sampled from the data pin, or forced low while the
//! bound reset net is high.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::circuit::Circuit;
use crate::error::GraphError;

/// Net values produced by one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    values: HashMap<String, bool>,
    outputs: IndexMap<String, bool>,
    next_state: IndexMap<String, bool>,
}

impl Evaluation {
    /// Value of any net.
    #[must_use]
    pub fn value(&self, net: &str) -> Option<bool> {
        self.values.get(net).copied()
    }

    /// Output port values in port order.
    #[must_use]
    pub const fn outputs(&self) -> &IndexMap<String, bool> {
        &self.outputs
    }

    /// Value every black box will hold after the next clock edge.
    #[must_use]
    pub const fn next_state(&self) -> &IndexMap<String, bool> {
        &self.next_state
    }
}

/// Evaluates a circuit in topological order.
#[derive(Debug, Clone)]
pub struct Simulator<'c> {
    circuit: &'c Circuit,
    order: Vec<String>,
}

impl<'c> Simulator<'c> {
    /// Prepares a simulator for `circuit`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CombinationalCycle`] if the circuit cannot be ordered.
    pub fn new(circuit: &'c Circuit) -> Result<Self, GraphError> {
        let order = circuit.topological_order()?;
        Ok(Self { circuit, order })
    }

    #[must_use]
    pub const fn circuit(&self) -> &'c Circuit {
        self.circuit
    }

    /// Evaluates every net.
    ///
    /// Inputs missing from `inputs` and black boxes missing from `state` are
    /// driven low.
    #[must_use]
    pub fn evaluate(&self, inputs: &HashMap<String, bool>, state: &HashMap<String, bool>) -> Evaluation {
        let mut values: HashMap<String, bool> = HashMap::with_capacity(self.order.len());

        for id in &self.order {
            let Some(node) = self.circuit.node(id) else {
                continue;
            };
            let kind = node.kind();
            let value = if kind.is_input() {
                inputs.get(id).copied().unwrap_or(false)
            } else if kind.is_black_box() {
                state.get(id).copied().unwrap_or(false)
            } else {
                kind.eval(
                    node.fanin()
                        .iter()
                        .map(|p| values.get(p).copied().unwrap_or(false)),
                )
            };
            values.insert(id.clone(), value);
        }

        let outputs = self
            .circuit
            .outputs()
            .into_iter()
            .map(|o| {
                let v = values.get(&o).copied().unwrap_or(false);
                (o, v)
            })
            .collect();

        let next_state = self
            .circuit
            .nodes()
            .filter(|n| n.kind().is_black_box())
            .map(|n| {
                let reset = n
                    .pins()
                    .and_then(|p| p.reset.as_ref())
                    .and_then(|r| values.get(r).copied())
                    .unwrap_or(false);
                let data = n
                    .data_net()
                    .and_then(|d| values.get(d).copied())
                    .unwrap_or(false);
                (n.id().to_string(), !reset && data)
            })
            .collect();

        Evaluation {
            values,
            outputs,
            next_state,
        }
    }
}
