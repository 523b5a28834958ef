//! # na-core
//!
//! Core types shared by the NanoAna crates: the error type, four-vector
//! kinematics and the NanoAOD-style event record consumed by the
//! analysis modules.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod kinematics;
pub mod traits;

pub use error::{Error, Result};
pub use event::{
    Event, EventWeights, FatJet, GenDressedLepton, GenJet, Jet, JetVariations, Muon, SubJet,
};
pub use kinematics::{LorentzVector, delta_phi};
pub use traits::HasP4;

/// Crate version, reported by the CLI and recorded in output provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
