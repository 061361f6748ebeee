//! Newton-Raphson iteration within one timestep.

use crate::circuit::Circuit;
use crate::components::Element;
use crate::error::{Result, SimError};

use super::mna::MnaMatrix;
use super::simulator::SimContext;
use super::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

/// Drives the `Iterating` phase of a timestep.
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence tolerance
    pub tolerance: f64,
    /// Previous solution for convergence check
    x_prev: Vec<f64>,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new()
    }
}

impl NewtonRaphson {
    /// Create a new Newton-Raphson solver.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE)
    }

    /// Create a solver with an explicit iteration ceiling and tolerance.
    pub fn with_config(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            x_prev: Vec::new(),
        }
    }

    /// Iterate until the solution stops changing.
    ///
    /// Each iteration resets the working system to the timestep stamps,
    /// lets every element re-stamp, solves, then lets every element read
    /// back. A purely linear circuit is exact after one solve.
    ///
    /// Returns the number of iterations used.
    pub fn iterate(
        &mut self,
        circuit: &mut Circuit,
        matrix: &mut MnaMatrix,
        ctx: &SimContext,
    ) -> Result<usize> {
        let nonlinear = circuit.is_nonlinear();

        if self.x_prev.len() != matrix.size() {
            self.x_prev = vec![0.0; matrix.size()];
        }

        // Use previous timestep's solution as initial guess
        self.x_prev.copy_from_slice(matrix.solution());

        for iter in 0..self.max_iterations {
            let _span = tracing::debug_span!("newton_iter", iter).entered();

            matrix.begin_iteration();
            for component in circuit.components_mut() {
                component.solver_iteration_begin(ctx, matrix);
            }

            matrix.factor()?;
            matrix.solve()?;

            for component in circuit.components_mut() {
                component.solver_iteration_end(ctx, matrix);
            }

            if !nonlinear {
                return Ok(iter + 1);
            }

            let max_diff = self.max_change(matrix.solution());
            if max_diff < self.tolerance {
                tracing::trace!(iterations = iter + 1, "Newton converged");
                return Ok(iter + 1);
            }

            self.x_prev.copy_from_slice(matrix.solution());
        }

        let residual = self.max_change(matrix.solution());
        tracing::warn!(
            time = ctx.time,
            iterations = self.max_iterations,
            residual,
            "Newton did not converge"
        );
        Err(SimError::convergence_failure(
            ctx.time,
            self.max_iterations,
            residual,
        ))
    }

    /// Largest absolute change against the previous iterate.
    fn max_change(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(&self.x_prev)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
