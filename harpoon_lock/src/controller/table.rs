//! The controller as a finite-state table.
//!
//! One [`StateRow`] per authentication state, one [`CaseArm`] per outgoing
//! edge. The table fixes every value the emitted module will drive, so it can
//! be inspected and simulated without reading generated text.

use contracts::requires;
use rand::Rng;
use tracing::debug;

use crate::auth::{AuthGraph, Label, StateId, StateRole};

/// A constant driven onto `op_vec`, most significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputVector {
    bits: Vec<bool>,
}

impl OutputVector {
    /// The all-zero value that leaves every locked node intact.
    #[must_use]
    pub fn zero(width: usize) -> Self {
        Self {
            bits: vec![false; width],
        }
    }

    /// A uniform value in `[2^(width-1), 2^width - 1]`.
    ///
    /// The top bit is always set, so the value is never zero.
    #[requires(width >= 1)]
    pub fn upper_half<R>(width: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut bits = Vec::with_capacity(width);
        bits.push(true);
        bits.extend((1..width).map(|_| rng.gen_bool(0.5)));
        Self { bits }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bits.iter().all(|b| !b)
    }

    /// Bit `index` counted from the least significant end, as `op_vec[index]`.
    #[must_use]
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.bits
            .len()
            .checked_sub(index + 1)
            .and_then(|i| self.bits.get(i).copied())
    }

    /// Bits most significant first.
    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Sized binary literal such as `5'b10110`.
    #[must_use]
    pub fn to_verilog(&self) -> String {
        let digits: String = self.bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
        format!("{}'b{}", self.bits.len(), digits)
    }
}

/// One `case (ip_vec)` branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseArm {
    /// Symbol matched by the arm.
    pub label: Label,
    /// State loaded on the next edge.
    pub next: StateId,
    /// Value registered on `op_vec`.
    pub output: OutputVector,
    /// Drives the one-shot `reset_orig_fsm` pulse guarded by `reset_flag`.
    pub reset_pulse: bool,
}

/// All branches of one `case (state)` item, keyed arms before the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRow {
    /// State the row is selected by.
    pub state: StateId,
    /// Role of that state in the graph.
    pub role: StateRole,
    /// Keyed arms first, then at most one default.
    pub arms: Vec<CaseArm>,
}

impl StateRow {
    /// Arm taken on `symbol`: a keyed arm on exact match, the default otherwise.
    #[must_use]
    pub fn select(&self, symbol: u32) -> Option<&CaseArm> {
        self.arms
            .iter()
            .find(|arm| arm.label == Label::Key(symbol))
            .or_else(|| self.arms.iter().find(|arm| arm.label == Label::Default))
    }
}

/// Complete next-state and output table of the authentication controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerTable {
    module: String,
    input_width: usize,
    output_width: usize,
    state_width: usize,
    unlock: StateId,
    reset_output: OutputVector,
    rows: Vec<StateRow>,
}

impl ControllerTable {
    /// Lays out the controller for `graph`.
    ///
    /// `input_width` is the width of `ip_vec` and `output_width` the width of
    /// `op_vec`, one bit per locked node. The reset value and every arm except
    /// the unlock self-loop draw a fresh upper-half output vector, in state
    /// order and edge order within a state.
    #[requires(input_width >= 1)]
    #[requires(output_width >= 1)]
    #[requires(input_width >= 32 || graph.alphabet() >> input_width == 0, "ip_vec too narrow for the key alphabet")]
    pub fn build<R>(
        graph: &AuthGraph,
        module: impl Into<String>,
        input_width: usize,
        output_width: usize,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let reset_output = OutputVector::upper_half(output_width, rng);
        let unlock = graph.unlock_state();

        let rows: Vec<StateRow> = graph
            .states()
            .map(|(state, role)| {
                let mut arms: Vec<CaseArm> = graph
                    .outgoing(state)
                    .iter()
                    .map(|t| {
                        let unlocking = role == StateRole::Unlock && t.to == t.from;
                        CaseArm {
                            label: t.label,
                            next: t.to,
                            output: if unlocking {
                                OutputVector::zero(output_width)
                            } else {
                                OutputVector::upper_half(output_width, rng)
                            },
                            reset_pulse: unlocking,
                        }
                    })
                    .collect();
                arms.sort_by_key(|arm| arm.label == Label::Default);
                StateRow { state, role, arms }
            })
            .collect();

        let state_width = state_width(graph.max_state());
        debug!(
            "controller table: {} states, {}-bit state register",
            rows.len(),
            state_width
        );

        Self {
            module: module.into(),
            input_width,
            output_width,
            state_width,
            unlock,
            reset_output,
            rows,
        }
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub const fn input_width(&self) -> usize {
        self.input_width
    }

    #[must_use]
    pub const fn output_width(&self) -> usize {
        self.output_width
    }

    /// Bits in the `state` register.
    #[must_use]
    pub const fn state_width(&self) -> usize {
        self.state_width
    }

    #[must_use]
    pub const fn unlock_state(&self) -> StateId {
        self.unlock
    }

    /// Value loaded into `op_vec` on reset.
    #[must_use]
    pub const fn reset_output(&self) -> &OutputVector {
        &self.reset_output
    }

    #[must_use]
    pub fn rows(&self) -> &[StateRow] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, state: StateId) -> Option<&StateRow> {
        self.rows.iter().find(|row| row.state == state)
    }

    /// Emits the table as a Verilog module.
    #[must_use]
    pub fn to_verilog(&self) -> String {
        self.to_string()
    }
}

/// Minimum register width holding every id up to `max_state`.
#[must_use]
pub fn state_width(max_state: StateId) -> usize {
    ((StateId::BITS - max_state.leading_zeros()) as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn table(key_length: usize, alphabet: u32, outputs: usize, seed: u64) -> (AuthGraph, ControllerTable) {
        let mut rng = StdRng::seed_from_u64(seed);
        let graph = AuthGraph::build(key_length, alphabet, &mut rng);
        let table = ControllerTable::build(&graph, "auth_controller", alphabet as usize, outputs, &mut rng);
        (graph, table)
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 2)]
    #[case(7, 3)]
    #[case(8, 4)]
    #[case(10, 4)]
    fn register_width(#[case] max_state: StateId, #[case] expected: usize) {
        assert_eq!(state_width(max_state), expected);
    }

    #[test]
    fn upper_half_never_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        for width in 1..12 {
            for _ in 0..32 {
                let v = OutputVector::upper_half(width, &mut rng);
                assert_eq!(v.width(), width);
                assert_eq!(v.bit(width - 1), Some(true));
                assert!(!v.is_zero());
            }
        }
    }

    #[test]
    fn literal_is_msb_first() {
        let v = OutputVector {
            bits: vec![true, false, false, true, true],
        };
        assert_eq!(v.to_verilog(), "5'b10011");
        assert_eq!(v.bit(0), Some(true));
        assert_eq!(v.bit(2), Some(false));
        assert_eq!(v.bit(5), None);
        assert_eq!(OutputVector::zero(3).to_verilog(), "3'b000");
    }

    #[test]
    fn only_the_unlock_loop_is_zero() {
        let (graph, table) = table(4, 3, 6, 5);
        assert_eq!(table.rows().len(), graph.state_count());
        assert!(!table.reset_output().is_zero());

        for row in table.rows() {
            for arm in &row.arms {
                let unlock_loop = row.role == StateRole::Unlock;
                assert_eq!(arm.reset_pulse, unlock_loop);
                assert_eq!(arm.output.is_zero(), unlock_loop);
                assert_eq!(arm.output.width(), 6);
            }
        }
    }

    #[test]
    fn keyed_arms_come_first() {
        let (graph, table) = table(5, 5, 5, 8);
        for (i, digit) in graph.key().iter().enumerate() {
            let row = table.row(i as StateId).unwrap();
            assert_eq!(row.arms[0].label, Label::Key(*digit));
            assert_eq!(row.arms[1].label, Label::Default);
            assert_eq!(row.select(*digit).unwrap().next, i as StateId + 1);
        }
    }

    #[test]
    fn register_covers_the_decoys() {
        let (graph, table) = table(3, 4, 2, 13);
        assert!(graph.max_state() >= 6);
        assert!(1usize << table.state_width() > graph.max_state() as usize);
    }
}
