#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use std::collections::HashMap;
use std::path::PathBuf;

use harpoon_netlist::{Circuit, NodeKind, Simulator, VerilogWriter, parse_verilog};
use rstest::rstest;

fn load_fixture(file: &str, module: &str) -> Circuit {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../fixtures")
        .join(file);
    let source = std::fs::read_to_string(&path).expect("Failed to read fixture");
    parse_verilog(&source, module).expect("Failed to parse fixture")
}

#[rstest]
#[case("c17.v", "c17", 5, 2, 6, 0)]
#[case("s27.v", "s27", 5, 1, 10, 3)]
fn test_fixture_shape(
    #[case] file: &str,
    #[case] module: &str,
    #[case] inputs: usize,
    #[case] outputs: usize,
    #[case] gates: usize,
    #[case] black_boxes: usize,
) {
    let circuit = load_fixture(file, module);
    assert_eq!(circuit.inputs().len(), inputs);
    assert_eq!(circuit.outputs().len(), outputs);
    assert_eq!(circuit.filter_type(&NodeKind::PRIMITIVE_GATES).len(), gates);
    assert_eq!(circuit.filter_type(&[NodeKind::Dff]).len(), black_boxes);
}

#[rstest]
#[case("c17.v", "c17")]
#[case("s27.v", "s27")]
fn test_fanin_fanout_symmetry(#[case] file: &str, #[case] module: &str) {
    let circuit = load_fixture(file, module);
    circuit.validate().unwrap();

    for node in circuit.nodes() {
        for consumer in node.fanout() {
            assert!(circuit.fanin(consumer).unwrap().contains(node.id()));
        }
        for producer in node.fanin() {
            assert!(circuit.fanout(producer).unwrap().contains(node.id()));
        }
    }
}

#[test]
fn test_c17_truth_table_survives_write_and_reparse() {
    let original = load_fixture("c17.v", "c17");
    let text = VerilogWriter::new().write(&original);
    let reparsed = parse_verilog(&text, "c17").unwrap();

    let a = Simulator::new(&original).unwrap();
    let b = Simulator::new(&reparsed).unwrap();
    let inputs = original.inputs();

    for vector in 0u32..(1 << inputs.len()) {
        let assignment: HashMap<String, bool> = inputs
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), vector >> i & 1 == 1))
            .collect();
        assert_eq!(
            a.evaluate(&assignment, &HashMap::new()).outputs(),
            b.evaluate(&assignment, &HashMap::new()).outputs(),
            "vector {vector:05b}"
        );
    }
}

#[test]
fn test_s27_clock_pins() {
    let circuit = load_fixture("s27.v", "s27");
    for id in circuit.filter_type(&[NodeKind::Dff]) {
        let node = circuit.node(&id).unwrap();
        assert_eq!(node.pins().unwrap().clock, "CK");
        assert!(node.data_net().is_some());
    }
    assert_eq!(circuit.node("G5").unwrap().data_net(), Some("G10"));
}
