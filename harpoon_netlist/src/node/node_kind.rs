use std::fmt;
use std::fmt::Formatter;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Categorizes netlist nodes into the kinds the locking flow understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Module input port.
    Input,
    /// Buffer / Identity gate.
    Buf,
    /// Inverter gate.
    Not,
    /// Logical AND gate.
    And,
    /// Logical OR gate.
    Or,
    /// Logical XOR gate.
    Xor,
    /// Inverted AND gate.
    Nand,
    /// Inverted OR gate.
    Nor,
    /// Inverted XOR gate.
    Xnor,
    /// Flip-Flop black box (Sequential).
    Dff,
}

impl NodeKind {
    /// Primitive operators eligible for locking.
    pub const PRIMITIVE_GATES: [Self; 7] = [
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Not,
        Self::Nand,
        Self::Nor,
        Self::Xnor,
    ];

    /// Returns true if the node is an input port.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input)
    }

    /// Returns true for the seven primitive logic operators.
    #[must_use]
    pub const fn is_primitive_gate(&self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Xor | Self::Not | Self::Nand | Self::Nor | Self::Xnor
        )
    }

    /// Returns true if the node is a sequential black box.
    #[must_use]
    pub const fn is_black_box(&self) -> bool {
        matches!(self, Self::Dff)
    }

    /// Returns true if the inputs to this node can be swapped without changing logic.
    #[must_use]
    pub const fn has_commutative_inputs(&self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Xor | Self::Nand | Self::Nor | Self::Xnor
        )
    }

    /// Returns true if the operator takes exactly one input.
    #[must_use]
    pub const fn is_unary(&self) -> bool {
        matches!(self, Self::Buf | Self::Not)
    }

    /// The Verilog keyword used to instantiate this node.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Buf => "buf",
            Self::Not => "not",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Nand => "nand",
            Self::Nor => "nor",
            Self::Xnor => "xnor",
            Self::Dff => "dff",
        }
    }

    /// Parses a gate-level instantiation keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "buf" => Some(Self::Buf),
            "not" => Some(Self::Not),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "xor" => Some(Self::Xor),
            "nand" => Some(Self::Nand),
            "nor" => Some(Self::Nor),
            "xnor" => Some(Self::Xnor),
            "dff" => Some(Self::Dff),
            _ => None,
        }
    }

    /// Evaluates a combinational operator over its input values.
    ///
    /// Inputs and black boxes have no combinational function and evaluate to
    /// their first operand (or low when there is none); callers feed those
    /// from port and state assignments instead.
    pub fn eval<I>(&self, inputs: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut inputs = inputs.into_iter();
        match self {
            Self::And => inputs.all(|v| v),
            Self::Nand => !inputs.all(|v| v),
            Self::Or => inputs.any(|v| v),
            Self::Nor => !inputs.any(|v| v),
            Self::Xor => inputs.fold(false, |acc, v| acc ^ v),
            Self::Xnor => !inputs.fold(false, |acc, v| acc ^ v),
            Self::Not => !inputs.next().unwrap_or(false),
            Self::Buf | Self::Input | Self::Dff => inputs.next().unwrap_or(false),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NodeKind::And, &[true, true], true)]
    #[case(NodeKind::And, &[true, false], false)]
    #[case(NodeKind::Nand, &[true, true], false)]
    #[case(NodeKind::Or, &[false, false], false)]
    #[case(NodeKind::Nor, &[false, false], true)]
    #[case(NodeKind::Xor, &[true, true, true], true)]
    #[case(NodeKind::Xnor, &[true, false], false)]
    #[case(NodeKind::Not, &[true], false)]
    #[case(NodeKind::Buf, &[true], true)]
    fn eval_truth_table(#[case] kind: NodeKind, #[case] inputs: &[bool], #[case] expected: bool) {
        assert_eq!(kind.eval(inputs.iter().copied()), expected);
    }

    #[test]
    fn keyword_roundtrip_for_every_gate() {
        for kind in NodeKind::PRIMITIVE_GATES {
            assert_eq!(NodeKind::from_keyword(kind.keyword()), Some(kind));
        }
        assert_eq!(NodeKind::from_keyword("input"), None);
        assert_eq!(NodeKind::from_keyword("mux"), None);
    }

    #[test]
    fn buf_is_not_lockable() {
        assert!(!NodeKind::Buf.is_primitive_gate());
        assert!(!NodeKind::Dff.is_primitive_gate());
        assert!(NodeKind::Dff.is_black_box());
    }
}
