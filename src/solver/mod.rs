//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for circuit simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and voltage-source branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources to nodes
//! - D is 0 for ideal voltage sources
//! - v is the vector of node voltages
//! - j is the vector of voltage source currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values
//!
//! ## Timestep lifecycle
//!
//! ```text
//! Begin ──► Iterating ──► Ended
//!             ▲    │
//!             └────┘  until converged or MAX_ITERATIONS
//! ```
//!
//! Each element's `solver_begin` runs once in `Begin`; every iteration runs
//! `solver_iteration_begin`, one linear solve, then `solver_iteration_end`.

mod mna;
mod newton;
mod simulator;
mod trace;

pub use mna::MnaMatrix;
pub use newton::NewtonRaphson;
pub use simulator::{SimContext, Simulator, SimulatorConfig, TimestepState};
pub use trace::Trace;

/// Default convergence tolerance for Newton-Raphson iteration (volts).
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default maximum Newton-Raphson iterations per time step.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default simulation timestep in seconds.
pub const DEFAULT_TIMESTEP: f64 = 5e-6;

/// Largest number of unknowns the dense solver will allocate.
pub const MAX_SYSTEM_SIZE: usize = 1024;

/// Minimum conductance to ground on every node to prevent a singular matrix.
pub const MIN_CONDUCTANCE: f64 = 1e-12;
