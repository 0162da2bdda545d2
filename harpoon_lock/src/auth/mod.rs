//! Key-chain and decoy-mesh generation.

mod graph;
mod key;

pub use graph::{AuthGraph, Label, StateId, StateRole, Transition};
pub use key::AuthKey;
