//! The top-level wrapper joining the controller and the locked design.
//!
//! The wrapper exposes the ports of the original design plus a `reset` input.
//! Every input except the clock feeds the controller's `ip_vec`, sorted by
//! name, and bit `i` of the controller's `op_vec` drives the flipper of the
//! `i`-th locked node.

use std::fmt;

use itertools::Itertools;
use tracing::debug;

use crate::error::LockError;
use crate::transform::LockedDesign;

/// Wire carrying the controller's one-shot reset pulse into the design.
pub const RESET_PULSE_WIRE: &str = "reset_orig_fsm";
/// Bus carrying the flip vector from the controller to the design.
pub const FLIP_VECTOR_WIRE: &str = "op_vec";

/// Port layout of the wrapper module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevel {
    module: String,
    design: String,
    controller: String,
    clock: String,
    reset: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    key_inputs: Vec<String>,
    flippers: Vec<String>,
}

impl TopLevel {
    /// Lays out a wrapper named `module` around `design` and a controller module named `controller`.
    ///
    /// # Errors
    ///
    /// - [`LockError::ClockNotFound`] if `clock` is not an input of the original design.
    /// - [`LockError::NoKeyInputs`] if the clock is the only input.
    /// - [`LockError::PortConflict`] if a wire or instance name the wrapper
    ///   declares is already a port, or the wrapper shares the design's name.
    pub fn new(
        design: &LockedDesign,
        module: &str,
        controller: &str,
        clock: &str,
    ) -> Result<Self, LockError> {
        let ports = design.original_ports();
        let name = design.circuit().name();

        if !ports.inputs.iter().any(|i| i == clock) {
            return Err(LockError::ClockNotFound {
                clock: clock.to_string(),
                module: name.to_string(),
            });
        }

        let key_inputs: Vec<String> = ports
            .inputs
            .iter()
            .filter(|i| *i != clock)
            .sorted()
            .cloned()
            .collect();
        if key_inputs.is_empty() {
            return Err(LockError::NoKeyInputs(name.to_string()));
        }

        let top = Self {
            module: module.to_string(),
            design: name.to_string(),
            controller: controller.to_string(),
            clock: clock.to_string(),
            reset: design.reset().to_string(),
            inputs: ports.inputs.clone(),
            outputs: ports.outputs.clone(),
            key_inputs,
            flippers: design.records().iter().map(|r| r.flipper.clone()).collect(),
        };
        top.check_names()?;

        debug!(
            "wrapper {}: {} key inputs, {} flippers",
            top.module,
            top.key_inputs.len(),
            top.flippers.len()
        );
        Ok(top)
    }

    fn check_names(&self) -> Result<(), LockError> {
        let declared = [
            RESET_PULSE_WIRE.to_string(),
            FLIP_VECTOR_WIRE.to_string(),
            self.controller_instance(),
            self.design_instance(),
        ];
        let taken = self
            .inputs
            .iter()
            .chain(&self.outputs)
            .chain(std::iter::once(&self.reset));

        for name in taken {
            if declared.contains(name) {
                return Err(LockError::PortConflict(name.clone()));
            }
        }
        for name in [&self.module, &self.controller] {
            if *name == self.design {
                return Err(LockError::PortConflict(name.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Inputs feeding `ip_vec`, most significant bit first.
    #[must_use]
    pub fn key_inputs(&self) -> &[String] {
        &self.key_inputs
    }

    /// Largest key symbol, one per key input.
    #[must_use]
    pub fn alphabet(&self) -> u32 {
        u32::try_from(self.key_inputs.len()).unwrap_or(u32::MAX)
    }

    /// Flipper ports in `op_vec` bit order.
    #[must_use]
    pub fn flippers(&self) -> &[String] {
        &self.flippers
    }

    fn controller_instance(&self) -> String {
        format!("{}_inst", self.controller)
    }

    fn design_instance(&self) -> String {
        format!("{}_inst", self.design)
    }

    /// Emits the wrapper module.
    #[must_use]
    pub fn to_verilog(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self
            .inputs
            .iter()
            .chain(&self.outputs)
            .chain(std::iter::once(&self.reset))
            .join(", ");
        writeln!(f, "module {} ({header});", self.module)?;
        for input in self.inputs.iter().chain(std::iter::once(&self.reset)) {
            writeln!(f, "  input {input};")?;
        }
        for output in &self.outputs {
            writeln!(f, "  output {output};")?;
        }
        writeln!(f)?;
        writeln!(f, "  wire {RESET_PULSE_WIRE};")?;
        writeln!(f, "  wire [{}:0] {FLIP_VECTOR_WIRE};", self.flippers.len() - 1)?;
        writeln!(f)?;

        writeln!(f, "  {} {} (", self.controller, self.controller_instance())?;
        writeln!(f, "    .clk({}),", self.clock)?;
        writeln!(f, "    .reset({}),", self.reset)?;
        writeln!(f, "    .ip_vec({{{}}}),", self.key_inputs.join(", "))?;
        writeln!(f, "    .op_vec({FLIP_VECTOR_WIRE}),")?;
        writeln!(f, "    .reset_orig_fsm({RESET_PULSE_WIRE})")?;
        writeln!(f, "  );")?;
        writeln!(f)?;

        let mut bindings: Vec<String> = self
            .inputs
            .iter()
            .sorted()
            .map(|i| format!(".{i}({i})"))
            .collect();
        bindings.push(format!(".{}({RESET_PULSE_WIRE})", self.reset));
        bindings.extend(
            self.flippers
                .iter()
                .enumerate()
                .map(|(bit, flipper)| format!(".{flipper}({FLIP_VECTOR_WIRE}[{bit}])")),
        );
        bindings.extend(self.outputs.iter().map(|o| format!(".{o}({o})")));

        writeln!(f, "  {} {} (", self.design, self.design_instance())?;
        writeln!(f, "    {}", bindings.join(",\n    "))?;
        writeln!(f, "  );")?;
        writeln!(f, "endmodule")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::lock_circuit;
    use harpoon_netlist::parse_verilog;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const SEQ: &str = "
module seq (CK, b, a, y);
  input CK, b, a;
  output y;
  dff R0 (CK, q, d);
  and A0 (p, a, q);
  or O0 (d, p, b);
  not N0 (y, d);
endmodule";

    fn locked(source: &str, count: usize) -> LockedDesign {
        let circuit = parse_verilog(source, "seq").unwrap();
        lock_circuit(&circuit, count, "reset", &mut StdRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn key_inputs_are_sorted_without_the_clock() {
        let top = TopLevel::new(&locked(SEQ, 2), "top_module", "auth_controller", "CK").unwrap();
        assert_eq!(top.key_inputs(), &["a", "b"]);
        assert_eq!(top.alphabet(), 2);
        assert_eq!(top.flippers().len(), 2);
    }

    #[test]
    fn missing_clock() {
        let err = TopLevel::new(&locked(SEQ, 1), "top_module", "auth_controller", "clk").unwrap_err();
        assert!(matches!(err, LockError::ClockNotFound { clock, module } if clock == "clk" && module == "seq"));
    }

    #[test]
    fn clock_only_design_has_no_key_inputs() {
        let source = "
module seq (CK, y);
  input CK;
  output y;
  dff R0 (CK, q, d);
  not N0 (d, q);
  buf B0 (y, d);
endmodule";
        let err = TopLevel::new(&locked(source, 1), "top_module", "auth_controller", "CK").unwrap_err();
        assert!(matches!(err, LockError::NoKeyInputs(_)));
    }

    #[test]
    fn generated_wire_collides_with_a_port() {
        let source = SEQ.replace("b", "op_vec");
        let err = TopLevel::new(&locked(&source, 1), "top_module", "auth_controller", "CK").unwrap_err();
        assert!(matches!(err, LockError::PortConflict(name) if name == "op_vec"));
    }

    #[test]
    fn wrapper_binds_flippers_in_sampling_order() {
        let design = locked(SEQ, 2);
        let top = TopLevel::new(&design, "top_module", "auth_controller", "CK").unwrap();
        let text = top.to_verilog();
        assert_eq!(format!("{top}"), text);

        assert!(text.starts_with("module top_module (CK, b, a, y, reset);\n"));
        assert!(text.contains("  input reset;\n"));
        assert!(text.contains("  wire [1:0] op_vec;\n"));
        assert!(text.contains("    .clk(CK),\n"));
        assert!(text.contains("    .ip_vec({a, b}),\n"));
        assert!(text.contains("  seq seq_inst (\n"));
        assert!(text.contains("    .reset(reset_orig_fsm),\n"));
        for (bit, (_, flipper)) in design.flipper_pairs().enumerate() {
            assert!(text.contains(&format!(".{flipper}(op_vec[{bit}])")));
        }
        assert!(text.contains("    .y(y)\n  );\nendmodule\n"));
    }
}
