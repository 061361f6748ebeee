//! Circuit network representation and validation.
//!
//! This module provides the network the solver works on. The [`Circuit`]
//! struct owns all elements and the node/unknown numbering they share.

mod graph;
mod types;
mod validate;

pub use graph::Circuit;
pub use types::*;
pub use validate::validate_circuit;
