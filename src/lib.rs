//! # Voltaic Core
//!
//! A transient circuit simulator built around time-varying sources.
//!
//! This library provides:
//! - A sinusoidal voltage source with DC bias, frequency, amplitude and phase
//! - Modified Nodal Analysis (MNA) assembly with overwrite-safe source stamps
//! - Newton-Raphson iteration for nonlinear elements (diodes)
//! - A compact text record format for saving and loading circuits
//!
//! ## Architecture
//!
//! - [`circuit`] - Circuit network, element handles and validation
//! - [`components`] - Element contract and element models
//! - [`solver`] - MNA assembler, Newton-Raphson driver and simulator clock
//! - [`netlist`] - Persisted records with unit-prefixed numbers
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! voltaic circuit.txt --timestep 10u --duration 20m --node 2 > trace.csv
//! ```
//!
//! ### Library
//!
//! ```
//! use voltaic_core::netlist::load_circuit;
//! use voltaic_core::circuit::NodeId;
//! use voltaic_core::Simulator;
//!
//! let circuit = load_circuit("vs,1,0,0,5,0,0,0,\nr,1,0,1k,\n").unwrap();
//! let mut sim = Simulator::new(circuit).unwrap();
//! sim.step().unwrap();
//! assert!((sim.node_voltage(NodeId(1)) - 5.0).abs() < 1e-9);
//! ```
//!
//! ## Timestep Lifecycle
//!
//! Each timestep moves through `Begin -> Iterating -> Ended`:
//!
//! 1. `Begin`: the assembler is cleared and every element stamps its
//!    timestep contributions (source values, companion models)
//! 2. `Iterating`: every element re-stamps, the system is solved and the
//!    elements read back their branch quantities, until converged
//! 3. `Ended`: reactive elements commit their state and the clock advances
//!
//! A timestep that does not converge within the iteration ceiling returns
//! [`SimError::ConvergenceFailure`] and leaves the clock where it was.

pub mod circuit;
pub mod components;
pub mod error;
pub mod netlist;
pub mod solver;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{Result, SimError};
pub use solver::Simulator;

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuitSim;

/// Thermal voltage at room temperature (approximately 26mV)
pub const THERMAL_VOLTAGE: f64 = 0.0258;
