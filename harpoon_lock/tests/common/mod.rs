#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Once;

use harpoon_netlist::{Circuit, parse_verilog};

static INIT: Once = Once::new();

/// Routes `tracing` output through the test harness once per binary.
pub fn setup_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn fixture_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../fixtures")
        .join(file)
}

pub fn fixture_source(file: &str) -> String {
    std::fs::read_to_string(fixture_path(file)).expect("Failed to read fixture")
}

pub fn load_fixture(file: &str, module: &str) -> Circuit {
    parse_verilog(&fixture_source(file), module).expect("Failed to parse fixture")
}

/// Assignment of `names` taken from the low bits of `vector`.
pub fn assignment(names: &[String], vector: u32) -> HashMap<String, bool> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), vector >> i & 1 == 1))
        .collect()
}

/// Assert that an invariant holds
#[macro_export]
macro_rules! assert_invariant {
    ($cond:expr, $invariant_name:expr) => {
        if !$cond {
            panic!(
                "Invariant violated: {}\nCondition: {}",
                $invariant_name,
                stringify!($cond)
            );
        }
    };
}
