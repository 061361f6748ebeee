//! Error types for the Voltaic simulation engine.
//!
//! This module provides a unified error type [`SimError`] that covers
//! all error conditions that can occur while loading persisted circuits,
//! editing elements, and running the solver.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Unified error type for all Voltaic operations.
#[derive(Error, Debug)]
pub enum SimError {
    // ============ Record Loading Errors ============
    /// Malformed persisted record
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Unknown element save id
    #[error("Unknown element type '{save_id}' at line {line}")]
    UnknownElement { save_id: String, line: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for {element}: {message}")]
    InvalidParameter {
        element: String,
        param: String,
        message: String,
    },

    // ============ Circuit Errors ============
    /// Node index outside the network's node set
    #[error("Node {node} is out of range (circuit has {num_nodes} nodes)")]
    NodeOutOfRange { node: usize, num_nodes: usize },

    /// Element handle does not refer to a live element
    #[error("Element {id} not found in circuit")]
    ElementNotFound { id: usize },

    /// Edit does not apply to the element kind
    #[error("Cannot apply edit '{edit}' to {element}")]
    InvalidEdit { element: String, edit: String },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - circuit may have a voltage source loop or floating node")]
    SingularMatrix,

    /// Iteration did not converge within the ceiling
    #[error("Solver did not converge at t={time:.6e}s after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure {
        time: f64,
        iterations: usize,
        residual: f64,
    },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ I/O Errors ============
    /// Error reading circuit file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing simulation output
    #[error("Output error: {message}")]
    Output { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    Wasm { message: String },
}

impl SimError {
    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        element: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            element: element.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(time: f64, iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            time,
            iterations,
            residual,
        }
    }
}
