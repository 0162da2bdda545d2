#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

mod common;

use std::collections::HashMap;

use common::{assignment, load_fixture, setup_test_logging};
use harpoon_lock::{LockError, check_equivalence, lock_circuit, lockable_candidates};
use harpoon_netlist::{NodeKind, Simulator, VerilogWriter, parse_verilog};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::rstest;

#[rstest]
#[case("c17.v", "c17", vec!["N10", "N11", "N16", "N19"])]
#[case(
    "s27.v",
    "s27",
    vec!["G14", "G8", "G15", "G16", "G9", "G10", "G11", "G12", "G13"]
)]
fn test_candidates(#[case] file: &str, #[case] module: &str, #[case] expected: Vec<&str>) {
    let circuit = load_fixture(file, module);
    let mut candidates = lockable_candidates(&circuit);
    let mut expected: Vec<String> = expected.into_iter().map(String::from).collect();
    candidates.sort();
    expected.sort();
    assert_eq!(candidates, expected);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
fn test_c17_equivalent_with_flippers_low(#[case] seed: u64) {
    setup_test_logging();
    let original = load_fixture("c17.v", "c17");
    let design = lock_circuit(&original, 3, "reset", &mut StdRng::seed_from_u64(seed)).unwrap();

    let a = Simulator::new(&original).unwrap();
    let b = Simulator::new(design.circuit()).unwrap();
    let inputs = original.inputs();
    let none = HashMap::new();

    for vector in 0u32..(1 << inputs.len()) {
        let values = assignment(&inputs, vector);
        assert_eq!(
            a.evaluate(&values, &none).outputs(),
            b.evaluate(&values, &none).outputs(),
            "vector {vector:05b}"
        );
    }
}

#[test]
fn test_c17_every_flipper_is_observable() {
    let original = load_fixture("c17.v", "c17");
    let design = lock_circuit(&original, 4, "reset", &mut StdRng::seed_from_u64(11)).unwrap();
    let sim = Simulator::new(design.circuit()).unwrap();
    let inputs = original.inputs();
    let none = HashMap::new();

    for (node, flipper) in design.flipper_pairs() {
        let observable = (0u32..(1 << inputs.len())).any(|vector| {
            let low = assignment(&inputs, vector);
            let mut high = low.clone();
            high.insert(flipper.to_string(), true);
            sim.evaluate(&low, &none).outputs() != sim.evaluate(&high, &none).outputs()
        });
        assert!(observable, "flipping {node} never reached an output");
    }
}

#[test]
fn test_s27_registers_keep_their_pins() {
    let original = load_fixture("s27.v", "s27");
    let design = lock_circuit(&original, 9, "reset", &mut StdRng::seed_from_u64(4)).unwrap();
    let circuit = design.circuit();

    for id in circuit.filter_type(&[NodeKind::Dff]) {
        let node = circuit.node(&id).unwrap();
        let pins = node.pins().unwrap();
        assert_eq!(pins.clock, "CK");
        assert_eq!(pins.reset.as_deref(), Some("reset"));
        assert!(node.data_net().unwrap().ends_with("_flipped"));
    }
    assert_eq!(circuit.node("G5").unwrap().data_net(), Some("G10_flipped"));
    assert_invariant!(circuit.validate().is_ok(), "locked graph keeps referential integrity");
}

#[test]
fn test_s27_next_state_matches_for_every_assignment() {
    let original = load_fixture("s27.v", "s27");
    let design = lock_circuit(&original, 5, "reset", &mut StdRng::seed_from_u64(8)).unwrap();
    let a = Simulator::new(&original).unwrap();
    let b = Simulator::new(design.circuit()).unwrap();

    let inputs = original.inputs();
    let registers = original.filter_type(&[NodeKind::Dff]);
    for vector in 0u32..(1 << inputs.len()) {
        for state in 0u32..(1 << registers.len()) {
            let values = assignment(&inputs, vector);
            let regs = assignment(&registers, state);
            let expected = a.evaluate(&values, &regs);
            let actual = b.evaluate(&values, &regs);
            assert_eq!(expected.outputs(), actual.outputs());
            assert_eq!(expected.next_state(), actual.next_state());
        }
    }
}

#[test]
fn test_reset_clears_registers() {
    let original = load_fixture("s27.v", "s27");
    let design = lock_circuit(&original, 1, "reset", &mut StdRng::seed_from_u64(0)).unwrap();
    let sim = Simulator::new(design.circuit()).unwrap();

    let mut values = assignment(&original.inputs(), 0b11111);
    values.insert("reset".to_string(), true);
    let regs = assignment(&original.filter_type(&[NodeKind::Dff]), 0b111);
    assert!(sim.evaluate(&values, &regs).next_state().values().all(|v| !v));
}

#[rstest]
#[case("c17.v", "c17", 5, 4)]
#[case("s27.v", "s27", 10, 9)]
fn test_insufficient_candidates(
    #[case] file: &str,
    #[case] module: &str,
    #[case] requested: usize,
    #[case] available: usize,
) {
    let original = load_fixture(file, module);
    let err = lock_circuit(&original, requested, "reset", &mut StdRng::seed_from_u64(0)).unwrap_err();
    match err {
        LockError::InsufficientCandidates {
            requested: r,
            available: a,
        } => {
            assert_eq!((r, a), (requested, available));
        },
        other => panic!("unexpected error: {other}"),
    }
}

const NAMED_PINS: &str = "
module seq (CK, a, b, c, y);
  input CK, a, b, c;
  output y;
  dff R0 (.CK(CK), .Q(q), .D(d));
  and A0 (d, a, b);
  or O0 (p, q, c);
  not N0 (y, p);
endmodule";

#[test]
fn test_named_data_pin_follows_the_flipped_driver() {
    setup_test_logging();
    let original = parse_verilog(NAMED_PINS, "seq").unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    let design = lock_circuit(&original, 2, "reset", &mut rng).unwrap();
    let circuit = design.circuit();

    let register = circuit.node("q").unwrap();
    assert_eq!(register.data_net(), Some("d_flipped"));
    assert_eq!(register.pins().unwrap().reset.as_deref(), Some("reset"));
    assert_eq!(register.fanin().len(), 3);

    let text = VerilogWriter::new().write(circuit);
    assert!(text.contains("  dff R0 (.CK(CK), .D(d_flipped), .Q(q), .reset(reset));"));
    check_equivalence(&original, &design, 32, &mut rng).unwrap();
}

#[test]
fn test_register_with_its_own_reset_is_rejected() {
    let source = NAMED_PINS
        .replace("(CK, a, b, c, y)", "(CK, rst, a, b, c, y)")
        .replace("input CK,", "input CK, rst,")
        .replace(".D(d))", ".D(d), .reset(rst))");
    let original = parse_verilog(&source, "seq").unwrap();
    assert_eq!(original.node("q").unwrap().data_net(), Some("d"));

    let err = lock_circuit(&original, 1, "reset", &mut StdRng::seed_from_u64(0)).unwrap_err();
    assert!(matches!(
        err,
        LockError::ExistingReset { register, reset } if register == "q" && reset == "rst"
    ));
}
