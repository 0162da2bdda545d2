use crate::auth::StateId;
use crate::controller::table::{ControllerTable, OutputVector};

/// Clock-accurate model of the emitted controller.
///
/// Each call to [`ControllerSim::step`] is one rising edge with `reset` low,
/// updating the same registers the Verilog module holds.
#[derive(Debug, Clone)]
pub struct ControllerSim<'t> {
    table: &'t ControllerTable,
    state: StateId,
    op_vec: OutputVector,
    reset_orig_fsm: bool,
    reset_flag: bool,
}

impl<'t> ControllerSim<'t> {
    /// Starts in the post-reset register state.
    #[must_use]
    pub fn new(table: &'t ControllerTable) -> Self {
        Self {
            table,
            state: 0,
            op_vec: table.reset_output().clone(),
            reset_orig_fsm: false,
            reset_flag: false,
        }
    }

    /// One rising edge with `reset` high.
    pub fn reset(&mut self) {
        self.state = 0;
        self.op_vec = self.table.reset_output().clone();
        self.reset_orig_fsm = false;
        self.reset_flag = false;
    }

    /// One rising edge with `reset` low and `symbol` on `ip_vec`.
    pub fn step(&mut self, symbol: u32) {
        let symbol = mask(symbol, self.table.input_width());
        let arm = self
            .table
            .row(self.state)
            .and_then(|row| row.select(symbol));

        match arm {
            Some(arm) => {
                self.state = arm.next;
                self.reset_orig_fsm = arm.reset_pulse && !self.reset_flag;
                if arm.reset_pulse {
                    self.reset_flag = true;
                }
                self.op_vec = arm.output.clone();
            },
            None => {
                self.state = 0;
                self.reset_orig_fsm = false;
                self.op_vec = self.table.reset_output().clone();
            },
        }
    }

    /// Steps through `symbols` and returns how many cycles pulsed `reset_orig_fsm`.
    pub fn run(&mut self, symbols: &[u32]) -> usize {
        let mut pulses = 0;
        for symbol in symbols {
            self.step(*symbol);
            pulses += usize::from(self.reset_orig_fsm);
        }
        pulses
    }

    #[must_use]
    pub const fn state(&self) -> StateId {
        self.state
    }

    #[must_use]
    pub const fn op_vec(&self) -> &OutputVector {
        &self.op_vec
    }

    #[must_use]
    pub const fn reset_orig_fsm(&self) -> bool {
        self.reset_orig_fsm
    }

    #[must_use]
    pub const fn reset_flag(&self) -> bool {
        self.reset_flag
    }

    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.state == self.table.unlock_state()
    }
}

fn mask(symbol: u32, width: usize) -> u32 {
    if width >= 32 {
        symbol
    } else {
        symbol & ((1u32 << width) - 1)
    }
}
