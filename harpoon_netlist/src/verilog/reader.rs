//! Structural Verilog reader for flattened gate-level netlists.
//!
//! Accepts the subset ISCAS-style benchmarks use: scalar port and wire
//! declarations, primitive gate instances, `dff` cells with positional
//! `(CK, Q, D)` or named pins (including the `reset` pin the writer emits),
//! and `assign` aliases. Modules other than the
//! requested top are skipped without being interpreted.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::circuit::Circuit;
use crate::error::ParseError;
use crate::node::NodeKind;

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").unwrap();
    static ref TOKEN_RE: Regex =
        Regex::new(r"[A-Za-z_][A-Za-z0-9_$]*|\d+'[bBoOdDhH][0-9a-fA-FxXzZ_]+|\d+|\S").unwrap();
}

/// Pin order of a positionally connected `dff` instance.
const DFF_POSITIONAL_PINS: [&str; 3] = ["CK", "Q", "D"];

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    line: usize,
}

#[derive(Debug)]
struct Driver {
    kind: NodeKind,
    instance: Option<String>,
    output: String,
    inputs: Vec<String>,
    clock: Option<String>,
    reset: Option<String>,
    line: usize,
}

#[derive(Debug, Default)]
struct ModuleAst {
    name: String,
    line: usize,
    inputs: Vec<(String, usize)>,
    outputs: Vec<(String, usize)>,
    drivers: Vec<Driver>,
}

/// Parses `source` and builds the circuit graph of module `top`.
///
/// # Errors
///
/// - [`ParseError::Malformed`] for syntax outside the supported subset,
///   undriven or multiply driven nets, and combinational cycles.
/// - [`ParseError::TopModuleNotFound`] if `top` is not defined.
pub fn parse_verilog(source: &str, top: &str) -> Result<Circuit, ParseError> {
    let stripped = strip_comments(source);
    let mut parser = Parser::new(tokenize(&stripped));
    let mut available = Vec::new();
    let mut found = None;

    while !parser.at_end() {
        parser.expect("module")?;
        let (name, line) = parser.ident()?;
        available.push(name.to_string());

        if name == top && found.is_none() {
            let mut ast = ModuleAst {
                name: name.to_string(),
                line,
                ..ModuleAst::default()
            };
            parser.module_body(&mut ast)?;
            found = Some(ast);
        } else {
            parser.skip_module()?;
        }
    }

    let ast = found.ok_or_else(|| ParseError::TopModuleNotFound {
        module: top.to_string(),
        available,
    })?;
    let circuit = build(ast)?;
    debug!(
        "parsed module {} ({} nodes, {} inputs, {} outputs)",
        circuit.name(),
        circuit.len(),
        circuit.inputs().len(),
        circuit.outputs().len()
    );
    Ok(circuit)
}

fn strip_comments(source: &str) -> String {
    // Comments collapse to their newlines so token line numbers stay accurate.
    COMMENT_RE
        .replace_all(source, |caps: &Captures| {
            caps[0].chars().filter(|c| *c == '\n').collect::<String>()
        })
        .into_owned()
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut line = 1;
    let mut last = 0;
    TOKEN_RE
        .find_iter(source)
        .map(|m| {
            line += source[last..m.start()].matches('\n').count();
            last = m.start();
            Token {
                text: m.as_str(),
                line,
            }
        })
        .collect()
}

fn is_identifier(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(tokens: Vec<Token<'a>>) -> Self {
        Self { tokens, pos: 0 }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last().copied())
            .map_or(1, |t| t.line)
    }

    fn next(&mut self) -> Result<Token<'a>, ParseError> {
        let token = self
            .peek()
            .ok_or_else(|| ParseError::malformed(self.line(), "unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.peek().is_some_and(|t| t.text == text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<usize, ParseError> {
        let token = self.next()?;
        if token.text == text {
            Ok(token.line)
        } else {
            Err(ParseError::malformed(
                token.line,
                format!("expected '{text}', found '{}'", token.text),
            ))
        }
    }

    fn ident(&mut self) -> Result<(&'a str, usize), ParseError> {
        let token = self.next()?;
        if is_identifier(token.text) {
            Ok((token.text, token.line))
        } else if token.text.contains('\'') || token.text.starts_with(|c: char| c.is_ascii_digit()) {
            Err(ParseError::malformed(
                token.line,
                format!("constant '{}' is not supported", token.text),
            ))
        } else {
            Err(ParseError::malformed(
                token.line,
                format!("expected identifier, found '{}'", token.text),
            ))
        }
    }

    /// Comma separated identifiers up to (and consuming) `close`.
    fn ident_list(&mut self, close: &str) -> Result<Vec<(&'a str, usize)>, ParseError> {
        let mut idents = Vec::new();
        if self.eat(close) {
            return Ok(idents);
        }
        loop {
            idents.push(self.ident()?);
            if self.eat(close) {
                return Ok(idents);
            }
            self.expect(",")?;
        }
    }

    fn skip_module(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            self.pos += 1;
            if token.text == "endmodule" {
                return Ok(());
            }
        }
        Err(ParseError::malformed(self.line(), "missing 'endmodule'"))
    }

    fn module_body(&mut self, ast: &mut ModuleAst) -> Result<(), ParseError> {
        if self.eat("(") {
            self.header_ports(ast)?;
        }
        self.expect(";")?;

        loop {
            let token = self.next()?;
            match token.text {
                "endmodule" => return Ok(()),
                "input" | "output" | "wire" => {
                    self.reject_vector()?;
                    let names = self.ident_list(";")?;
                    declare(ast, token.text, names);
                },
                "assign" => {
                    let (lhs, line) = self.ident()?;
                    self.expect("=")?;
                    let (rhs, _) = self.ident()?;
                    self.expect(";")?;
                    ast.drivers.push(Driver {
                        kind: NodeKind::Buf,
                        instance: None,
                        output: lhs.to_string(),
                        inputs: vec![rhs.to_string()],
                        clock: None,
                        reset: None,
                        line,
                    });
                },
                "dff" => {
                    let driver = self.dff_instance(token.line)?;
                    ast.drivers.push(driver);
                },
                text => match NodeKind::from_keyword(text) {
                    Some(kind) => {
                        let driver = self.gate_instance(kind, token.line)?;
                        ast.drivers.push(driver);
                    },
                    None => {
                        return Err(ParseError::malformed(
                            token.line,
                            format!("unsupported statement '{text}'"),
                        ));
                    },
                },
            }
        }
    }

    fn header_ports(&mut self, ast: &mut ModuleAst) -> Result<(), ParseError> {
        let mut direction: Option<&str> = None;
        if self.eat(")") {
            return Ok(());
        }
        loop {
            if let Some(token) = self.peek().filter(|t| matches!(t.text, "input" | "output" | "wire")) {
                self.pos += 1;
                direction = Some(token.text);
                self.reject_vector()?;
            }
            let name = self.ident()?;
            if let Some(direction) = direction {
                declare(ast, direction, vec![name]);
            }
            if self.eat(")") {
                return Ok(());
            }
            self.expect(",")?;
        }
    }

    fn reject_vector(&self) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if token.text == "[" => Err(ParseError::malformed(
                token.line,
                "vector declarations are not supported",
            )),
            _ => Ok(()),
        }
    }

    fn optional_instance_name(&mut self) -> Option<String> {
        let token = self.peek()?;
        if is_identifier(token.text) {
            self.pos += 1;
            Some(token.text.to_string())
        } else {
            None
        }
    }

    fn gate_instance(&mut self, kind: NodeKind, line: usize) -> Result<Driver, ParseError> {
        let instance = self.optional_instance_name();
        self.expect("(")?;
        let nets = self.ident_list(")")?;
        self.expect(";")?;

        let mut nets = nets.into_iter().map(|(n, _)| n.to_string());
        let output = nets
            .next()
            .ok_or_else(|| ParseError::malformed(line, format!("'{kind}' instance has no pins")))?;
        Ok(Driver {
            kind,
            instance,
            output,
            inputs: nets.collect(),
            clock: None,
            reset: None,
            line,
        })
    }

    fn dff_instance(&mut self, line: usize) -> Result<Driver, ParseError> {
        let instance = self.optional_instance_name();
        self.expect("(")?;

        let mut clock = None;
        let mut q = None;
        let mut d = None;
        let mut reset = None;

        if self.peek().is_some_and(|t| t.text == ".") {
            loop {
                self.expect(".")?;
                let (pin, pin_line) = self.ident()?;
                self.expect("(")?;
                let (net, _) = self.ident()?;
                self.expect(")")?;
                let slot = match pin {
                    "CK" => &mut clock,
                    "Q" => &mut q,
                    "D" => &mut d,
                    "reset" => &mut reset,
                    other => {
                        return Err(ParseError::malformed(
                            pin_line,
                            format!("unknown dff pin '{other}'"),
                        ));
                    },
                };
                *slot = Some(net.to_string());
                if self.eat(")") {
                    break;
                }
                self.expect(",")?;
            }
        } else {
            let nets = self.ident_list(")")?;
            if nets.len() != DFF_POSITIONAL_PINS.len() {
                return Err(ParseError::malformed(
                    line,
                    format!("dff expects pins {DFF_POSITIONAL_PINS:?}, found {}", nets.len()),
                ));
            }
            clock = Some(nets[0].0.to_string());
            q = Some(nets[1].0.to_string());
            d = Some(nets[2].0.to_string());
        }
        self.expect(";")?;

        let missing = |pin: &str| ParseError::malformed(line, format!("dff pin '{pin}' is not connected"));
        let clock = clock.ok_or_else(|| missing("CK"))?;
        let output = q.ok_or_else(|| missing("Q"))?;
        let data = d.ok_or_else(|| missing("D"))?;
        if data == clock {
            return Err(ParseError::malformed(
                line,
                format!("dff data and clock share net '{clock}'"),
            ));
        }

        Ok(Driver {
            kind: NodeKind::Dff,
            instance,
            output,
            inputs: vec![data],
            clock: Some(clock),
            reset,
            line,
        })
    }
}

fn declare(ast: &mut ModuleAst, direction: &str, names: Vec<(&str, usize)>) {
    let target = match direction {
        "input" => &mut ast.inputs,
        "output" => &mut ast.outputs,
        _ => return,
    };
    for (name, line) in names {
        if !target.iter().any(|(n, _)| n == name) {
            target.push((name.to_string(), line));
        }
    }
}

fn build(ast: ModuleAst) -> Result<Circuit, ParseError> {
    let mut circuit = Circuit::new(ast.name.as_str());
    let input_names: HashSet<&str> = ast.inputs.iter().map(|(n, _)| n.as_str()).collect();

    for (input, line) in &ast.inputs {
        circuit
            .add(input.as_str(), NodeKind::Input)
            .map_err(|e| ParseError::malformed(*line, e.to_string()))?;
    }

    for driver in &ast.drivers {
        if input_names.contains(driver.output.as_str()) {
            return Err(ParseError::malformed(
                driver.line,
                format!("input port '{}' cannot be driven", driver.output),
            ));
        }
        if circuit.add(driver.output.as_str(), driver.kind).is_err() {
            return Err(ParseError::malformed(
                driver.line,
                format!("net '{}' is driven more than once", driver.output),
            ));
        }
        if let Some(instance) = &driver.instance {
            circuit
                .set_instance(&driver.output, instance.as_str())
                .map_err(|e| ParseError::malformed(driver.line, e.to_string()))?;
        }
    }

    for driver in &ast.drivers {
        let line = driver.line;
        if driver.inputs.is_empty() {
            return Err(ParseError::malformed(
                line,
                format!("'{}' driving '{}' has no inputs", driver.kind, driver.output),
            ));
        }
        if driver.kind.is_unary() && driver.inputs.len() != 1 {
            return Err(ParseError::malformed(
                line,
                format!("'{}' takes exactly one input", driver.kind),
            ));
        }

        let mut seen = HashSet::new();
        for input in &driver.inputs {
            if !seen.insert(input.as_str()) {
                return Err(ParseError::malformed(
                    line,
                    format!("net '{input}' repeated on the inputs of '{}'", driver.output),
                ));
            }
            if !circuit.contains(input) {
                return Err(ParseError::malformed(line, format!("net '{input}' has no driver")));
            }
            circuit
                .connect(input, &driver.output)
                .map_err(|e| ParseError::malformed(line, e.to_string()))?;
        }

        if let (Some(clock), Some(data)) = (&driver.clock, driver.inputs.first()) {
            if !circuit.contains(clock) {
                return Err(ParseError::malformed(line, format!("net '{clock}' has no driver")));
            }
            circuit
                .bind_pins(&driver.output, clock, data)
                .map_err(|e| ParseError::malformed(line, e.to_string()))?;
        }

        if let Some(reset) = &driver.reset {
            if !circuit.contains(reset) {
                return Err(ParseError::malformed(line, format!("net '{reset}' has no driver")));
            }
            circuit
                .bind_reset(&driver.output, reset)
                .map_err(|e| ParseError::malformed(line, e.to_string()))?;
        }
    }

    for (output, line) in &ast.outputs {
        if input_names.contains(output.as_str()) {
            return Err(ParseError::malformed(
                *line,
                format!("port '{output}' declared as both input and output"),
            ));
        }
        if !circuit.contains(output) {
            return Err(ParseError::malformed(
                *line,
                format!("output port '{output}' is not driven"),
            ));
        }
        circuit
            .mark_output(output)
            .map_err(|e| ParseError::malformed(*line, e.to_string()))?;
    }

    circuit
        .topological_order()
        .map_err(|e| ParseError::malformed(ast.line, e.to_string()))?;
    circuit
        .validate()
        .map_err(|e| ParseError::malformed(ast.line, e.to_string()))?;
    Ok(circuit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const C17: &str = "
// c17 benchmark
module c17 (N1,N2,N3,N6,N7,N22,N23);
input N1,N2,N3,N6,N7;
output N22,N23;
wire N10,N11,N16,N19;
nand NAND2_1 (N10, N1, N3);
nand NAND2_2 (N11, N3, N6);
nand NAND2_3 (N16, N2, N11);
nand NAND2_4 (N19, N11, N7);
nand NAND2_5 (N22, N10, N16);
nand NAND2_6 (N23, N16, N19);
endmodule
";

    #[test]
    fn parses_c17() {
        let c = parse_verilog(C17, "c17").unwrap();
        assert_eq!(c.inputs(), vec!["N1", "N2", "N3", "N6", "N7"]);
        assert_eq!(c.outputs(), vec!["N22", "N23"]);
        assert_eq!(c.filter_type(&[NodeKind::Nand]).len(), 6);
        assert_eq!(c.node("N10").unwrap().instance(), Some("NAND2_1"));
        assert!(c.is_output("N22"));
    }

    #[test]
    fn missing_top_lists_available_modules() {
        let err = parse_verilog(C17, "c432").unwrap_err();
        assert_eq!(
            err,
            ParseError::TopModuleNotFound {
                module: "c432".into(),
                available: vec!["c17".into()],
            }
        );
    }

    #[test]
    fn skips_other_modules() {
        let source = format!(
            "module dff (CK, Q, D);\n input CK, D;\n output reg Q;\n always @(posedge CK) Q <= D;\nendmodule\n{C17}"
        );
        let c = parse_verilog(&source, "c17").unwrap();
        assert_eq!(c.len(), 11);
    }

    #[test]
    fn dff_named_and_positional_pins() {
        let source = "
module seq (CK, a, y);
  input CK, a;
  output y;
  /* two registers */
  dff R0 (CK, q0, a);
  dff R1 (.D(q0), .Q(q1), .CK(CK));
  not INV (y, q1);
endmodule";
        let c = parse_verilog(source, "seq").unwrap();
        let r1 = c.node("q1").unwrap();
        assert_eq!(r1.kind(), NodeKind::Dff);
        assert_eq!(r1.pins().unwrap().clock, "CK");
        assert_eq!(r1.data_net(), Some("q0"));
    }

    #[test]
    fn dff_reset_pin_is_kept_apart_from_data() {
        let source = "
module seq (CK, rst, a, b, y);
  input CK, rst, a, b;
  output y;
  dff R0 (.CK(CK), .Q(q), .D(d), .reset(rst));
  and A0 (d, a, b);
  not N0 (y, q);
endmodule";
        let c = parse_verilog(source, "seq").unwrap();
        let r0 = c.node("q").unwrap();
        let pins = r0.pins().unwrap();
        assert_eq!(pins.clock, "CK");
        assert_eq!(pins.reset.as_deref(), Some("rst"));
        assert_eq!(r0.data_net(), Some("d"));
        assert_eq!(r0.fanin().len(), 3);
    }

    #[test]
    fn undriven_net_reports_line() {
        let source = "module m (a, y);\ninput a;\noutput y;\nand g (y, a, ghost);\nendmodule";
        let err = parse_verilog(source, "m").unwrap_err();
        assert_eq!(
            err,
            ParseError::Malformed {
                line: 4,
                message: "net 'ghost' has no driver".into()
            }
        );
    }

    #[test]
    fn rejects_vectors_and_constants() {
        let vector = "module m (a, y);\ninput [3:0] a;\noutput y;\nendmodule";
        assert!(matches!(
            parse_verilog(vector, "m"),
            Err(ParseError::Malformed { line: 2, .. })
        ));

        let constant = "module m (y);\noutput y;\nassign y = 1'b0;\nendmodule";
        assert!(matches!(
            parse_verilog(constant, "m"),
            Err(ParseError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn rejects_combinational_cycle() {
        let source = "module m (a, y);\ninput a;\noutput y;\nand g0 (x, a, y);\nnot g1 (y, x);\nendmodule";
        assert!(matches!(
            parse_verilog(source, "m"),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_multiple_drivers() {
        let source = "module m (a, y);\ninput a;\noutput y;\nnot g0 (y, a);\nbuf g1 (y, a);\nendmodule";
        let err = parse_verilog(source, "m").unwrap_err();
        assert_eq!(
            err,
            ParseError::Malformed {
                line: 5,
                message: "net 'y' is driven more than once".into()
            }
        );
    }
}
