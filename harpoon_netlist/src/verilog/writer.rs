use std::fmt;

use itertools::Itertools;

use crate::circuit::Circuit;
use crate::node::{Node, NodeKind};

/// Behavioural model of the reset-capable `dff` cell instantiated by the writer.
pub const DFF_CELL: &str = "\
module dff (CK, Q, D, reset);
  input CK, D, reset;
  output reg Q;

  always @(posedge CK)
    if (reset)
      Q <= 1'b0;
    else
      Q <= D;
endmodule
";

/// Serialises a [`Circuit`] back to structural Verilog.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerilogWriter {
    cell_library: bool,
}

impl VerilogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the `dff` cell definition when the circuit contains black boxes.
    pub const fn with_cell_library(mut self, cell_library: bool) -> Self {
        self.cell_library = cell_library;
        self
    }

    /// Borrows `circuit` as something that formats to Verilog.
    pub const fn display<'a>(&'a self, circuit: &'a Circuit) -> VerilogDisplay<'a> {
        VerilogDisplay {
            writer: self,
            circuit,
        }
    }

    pub fn write(&self, circuit: &Circuit) -> String {
        self.display(circuit).to_string()
    }
}

/// A circuit paired with the writer settings used to format it.
#[derive(Debug, Clone, Copy)]
pub struct VerilogDisplay<'a> {
    writer: &'a VerilogWriter,
    circuit: &'a Circuit,
}

impl fmt::Display for VerilogDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let circuit = self.circuit;
        let inputs = circuit.inputs();
        let outputs = circuit.outputs();

        writeln!(
            f,
            "module {} ({});",
            circuit.name(),
            inputs.iter().chain(outputs.iter()).join(", ")
        )?;
        for input in &inputs {
            writeln!(f, "  input {input};")?;
        }
        for output in &outputs {
            writeln!(f, "  output {output};")?;
        }
        for node in circuit.nodes() {
            if !node.kind().is_input() && !circuit.is_output(node.id()) {
                writeln!(f, "  wire {};", node.id())?;
            }
        }
        writeln!(f)?;

        let mut has_black_box = false;
        for node in circuit.nodes() {
            match node.kind() {
                NodeKind::Input => {},
                NodeKind::Dff => {
                    has_black_box = true;
                    write_black_box(f, node)?;
                },
                kind => writeln!(
                    f,
                    "  {} {} ({}, {});",
                    kind.keyword(),
                    instance_name(node),
                    node.id(),
                    node.fanin().iter().join(", ")
                )?,
            }
        }
        writeln!(f, "endmodule")?;

        if self.writer.cell_library && has_black_box {
            writeln!(f)?;
            f.write_str(DFF_CELL)?;
        }
        Ok(())
    }
}

fn instance_name(node: &Node) -> String {
    node.instance()
        .map_or_else(|| format!("g_{}", node.id()), str::to_string)
}

fn write_black_box(f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
    let mut pins = Vec::with_capacity(4);
    if let Some(bound) = node.pins() {
        pins.push(format!(".CK({})", bound.clock));
        pins.push(format!(".D({})", bound.data));
    }
    pins.push(format!(".Q({})", node.id()));
    if let Some(reset) = node.pins().and_then(|p| p.reset.as_ref()) {
        pins.push(format!(".reset({reset})"));
    }
    writeln!(
        f,
        "  {} {} ({});",
        NodeKind::Dff.keyword(),
        instance_name(node),
        pins.join(", ")
    )
}
