//! Logic locking for gate-level netlists.
//!
//! A run samples internal gates of a design and puts each behind an XOR with
//! a new flipper input ([`transform`]), builds a key chain with a decoy mesh
//! ([`auth`]), turns it into an authentication controller that drives the
//! flippers ([`controller`]) and wraps both in a port-compatible top module
//! ([`compose`]). [`Locker`] ties the steps together.

pub mod auth;
pub mod check;
pub mod compose;
pub mod controller;
mod error;
pub mod manifest;
pub mod pipeline;
pub mod transform;

pub use auth::{AuthGraph, AuthKey};
pub use check::{EquivalenceReport, check_equivalence};
pub use compose::TopLevel;
pub use controller::{ControllerSim, ControllerTable};
pub use error::LockError;
pub use manifest::Manifest;
pub use pipeline::{ArtifactPaths, Artifacts, Locker};
pub use transform::{LockedDesign, LockedNode, PortLists, lock_circuit, lockable_candidates};
