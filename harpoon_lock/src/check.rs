//! Random-vector comparison of a locked design against its source.
//!
//! With every flipper and the added reset held low, the locked design must
//! produce the same outputs and register next-states as the original for any
//! input and register assignment. Each flipper is also toggled alone to spot
//! locked nodes whose inversion never reaches an observable net.

use std::collections::HashMap;

use harpoon_netlist::{Circuit, Evaluation, NodeKind, Simulator};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::LockError;
use crate::transform::LockedDesign;

/// Outcome of [`check_equivalence`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquivalenceReport {
    /// Vectors applied.
    pub samples: usize,
    /// Locked nodes whose flipper changed no output or next-state in any sample.
    pub ineffective: Vec<String>,
}

/// Compares `locked` against `original` over `samples` random vectors.
///
/// # Errors
///
/// - [`LockError::EquivalenceMismatch`] on the first differing output or register.
/// - [`LockError::GraphIntegrityViolation`] if either circuit has a combinational cycle.
pub fn check_equivalence<R>(
    original: &Circuit,
    locked: &LockedDesign,
    samples: usize,
    rng: &mut R,
) -> Result<EquivalenceReport, LockError>
where
    R: Rng + ?Sized,
{
    if samples == 0 {
        return Ok(EquivalenceReport::default());
    }

    let reference = Simulator::new(original)?;
    let candidate = Simulator::new(locked.circuit())?;
    let inputs = original.inputs();
    let registers = original.filter_type(&[NodeKind::Dff]);
    let records = locked.records();
    let mut observed = vec![false; records.len()];

    for sample in 0..samples {
        let assignment: HashMap<String, bool> = inputs
            .iter()
            .map(|name| (name.clone(), rng.gen_bool(0.5)))
            .collect();
        let state: HashMap<String, bool> = registers
            .iter()
            .map(|name| (name.clone(), rng.gen_bool(0.5)))
            .collect();

        let expected = reference.evaluate(&assignment, &state);
        let actual = candidate.evaluate(&assignment, &state);
        compare(&expected, &actual, sample)?;

        for (seen, record) in observed.iter_mut().zip(records) {
            if *seen {
                continue;
            }
            let mut flipped = assignment.clone();
            flipped.insert(record.flipper.clone(), true);
            let toggled = candidate.evaluate(&flipped, &state);
            *seen = toggled.outputs() != actual.outputs()
                || toggled.next_state() != actual.next_state();
        }
    }

    let ineffective: Vec<String> = records
        .iter()
        .zip(&observed)
        .filter(|(_, seen)| !**seen)
        .map(|(record, _)| record.original.clone())
        .collect();
    for node in &ineffective {
        warn!("flipping {node} changed no output or register over {samples} samples");
    }
    debug!("locked design matches {} over {samples} samples", original.name());

    Ok(EquivalenceReport {
        samples,
        ineffective,
    })
}

fn compare(expected: &Evaluation, actual: &Evaluation, sample: usize) -> Result<(), LockError> {
    let outputs = expected
        .outputs()
        .iter()
        .find(|(net, value)| actual.outputs().get(*net) != Some(*value));
    let registers = || {
        expected
            .next_state()
            .iter()
            .find(|(net, value)| actual.next_state().get(*net) != Some(*value))
    };
    let mismatch = outputs.or_else(registers);

    match mismatch {
        Some((net, _)) => Err(LockError::EquivalenceMismatch {
            net: net.clone(),
            sample,
        }),
        None => Ok(()),
    }
}
