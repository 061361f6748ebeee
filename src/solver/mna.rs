//! MNA matrix assembly and solving.

use crate::circuit::{NodeId, VarIndex, VoltageSourceId};
use crate::error::{SimError, Result};

use super::{MAX_SYSTEM_SIZE, MIN_CONDUCTANCE};

/// Which layer of the system stamps are currently written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StampLayer {
    /// Stamps made once per timestep (`solver_begin`).
    Timestep,
    /// Stamps made every iteration (`solver_iteration_begin`).
    Iteration,
}

/// MNA matrix system Ax = z.
///
/// Stamps land in one of two layers. The timestep layer is cleared by
/// [`begin_timestep`](Self::begin_timestep) and holds everything that stays
/// fixed while the clock is fixed. [`begin_iteration`](Self::begin_iteration)
/// copies it into the working system, so iteration stamps always start from
/// the same base and never accumulate across iterations.
#[derive(Debug)]
pub struct MnaMatrix {
    /// Working system matrix A (row-major)
    pub a: Vec<f64>,
    /// Working source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    size: usize,
    /// Number of nodes including ground
    num_nodes: usize,
    /// Number of auxiliary voltage-source unknowns
    num_voltage_sources: usize,
    /// Timestep layer of A
    base_a: Vec<f64>,
    /// Timestep layer of z
    base_z: Vec<f64>,
    layer: StampLayer,
    /// LU decomposition of A
    lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pivots: Vec<usize>,
    /// Whether x holds a solve from the current timestep
    solved: bool,
}

impl MnaMatrix {
    /// Create an assembler for `num_nodes` nodes (ground included) and
    /// `num_voltage_sources` auxiliary unknowns.
    ///
    /// Fails with [`SimError::InvalidTopology`] when the system would exceed
    /// [`MAX_SYSTEM_SIZE`] unknowns.
    pub fn new(num_nodes: usize, num_voltage_sources: usize) -> Result<Self> {
        let size = num_nodes
            .saturating_sub(1)
            .checked_add(num_voltage_sources)
            .filter(|&size| size <= MAX_SYSTEM_SIZE)
            .ok_or_else(|| SimError::InvalidTopology {
                message: format!(
                    "{num_nodes} nodes and {num_voltage_sources} voltage sources exceed \
                     the {MAX_SYSTEM_SIZE} unknown limit"
                ),
            })?;
        let cells = size.checked_mul(size).ok_or_else(|| SimError::InvalidTopology {
            message: format!("system of {size} unknowns is too large"),
        })?;
        Ok(Self {
            a: vec![0.0; cells],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            num_nodes,
            num_voltage_sources,
            base_a: vec![0.0; cells],
            base_z: vec![0.0; size],
            layer: StampLayer::Timestep,
            lu: vec![0.0; cells],
            pivots: vec![0; size],
            solved: false,
        })
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of nodes, ground included.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of auxiliary voltage-source unknowns.
    pub fn num_voltage_sources(&self) -> usize {
        self.num_voltage_sources
    }

    /// Start a new timestep: clear the timestep layer and tie every node to
    /// ground through a tiny conductance.
    pub fn begin_timestep(&mut self) {
        self.base_a.fill(0.0);
        self.base_z.fill(0.0);
        self.layer = StampLayer::Timestep;
        self.solved = false;
        for i in 0..self.num_nodes.saturating_sub(1) {
            self.base_a[i * self.size + i] += MIN_CONDUCTANCE;
        }
    }

    /// Start a new iteration: reset the working system to the timestep layer.
    pub fn begin_iteration(&mut self) {
        self.a.copy_from_slice(&self.base_a);
        self.z.copy_from_slice(&self.base_z);
        self.layer = StampLayer::Iteration;
    }

    fn layer_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        match self.layer {
            StampLayer::Timestep => (self.base_a.as_mut_slice(), self.base_z.as_mut_slice()),
            StampLayer::Iteration => (self.a.as_mut_slice(), self.z.as_mut_slice()),
        }
    }

    /// Get working matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Set matrix element at (row, col) in the active layer.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let size = self.size;
        self.layer_mut().0[row * size + col] = value;
    }

    /// Add to matrix element at (row, col) in the active layer.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        let size = self.size;
        self.layer_mut().0[row * size + col] += value;
    }

    /// Add to source vector element in the active layer.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.layer_mut().1[row] += value;
    }

    /// Set source vector element in the active layer.
    pub fn set_source(&mut self, row: usize, value: f64) {
        self.layer_mut().1[row] = value;
    }

    /// Matrix row of a node voltage, `None` for ground.
    pub fn node_row(&self, node: NodeId) -> Option<usize> {
        if node.is_ground() {
            None
        } else {
            debug_assert!(node.0 < self.num_nodes, "node {node} outside assembled system");
            Some(VarIndex::Voltage(node).to_index(self.num_nodes))
        }
    }

    /// Matrix row of an auxiliary voltage-source unknown.
    pub fn voltage_source_row(&self, vs: VoltageSourceId) -> usize {
        debug_assert!(
            vs.0 < self.num_voltage_sources,
            "voltage source {vs} outside assembled system"
        );
        VarIndex::Current(vs).to_index(self.num_nodes)
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: NodeId, n2: NodeId, g: f64) {
        let (r1, r2) = (self.node_row(n1), self.node_row(n2));
        if let Some(i) = r1 {
            self.add(i, i, g);
        }
        if let Some(j) = r2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (r1, r2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a current source between two nodes.
    /// Current flows from n+ to n- through the source.
    pub fn stamp_current_source(&mut self, n_pos: NodeId, n_neg: NodeId, current: f64) {
        // Current leaves n+ and enters n-
        if let Some(i) = self.node_row(n_pos) {
            self.add_source(i, -current);
        }
        if let Some(j) = self.node_row(n_neg) {
            self.add_source(j, current);
        }
    }

    /// Stamp the constraint V[a] - V[b] = value for the voltage source `vs`.
    ///
    /// Overwrites whatever was previously stamped for `vs` in the active
    /// layer, so repeated calls leave exactly one constraint behind.
    pub fn stamp_voltage(&mut self, vs: VoltageSourceId, a: NodeId, b: NodeId, value: f64) {
        let br = self.voltage_source_row(vs);
        let (ra, rb) = (self.node_row(a), self.node_row(b));

        // Both terminals on one node: coefficients cancel
        let coeff = if a == b { 0.0 } else { 1.0 };

        if let Some(i) = ra {
            self.set(br, i, coeff);
            self.set(i, br, coeff);
        }
        if let Some(j) = rb {
            self.set(br, j, -coeff);
            self.set(j, br, -coeff);
        }
        self.set_source(br, value);
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < 1e-15 {
                return Err(SimError::SingularMatrix);
            }

            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            let diag = self.lu[i * n + i];
            if diag.abs() < 1e-15 {
                return Err(SimError::SingularMatrix);
            }
            self.x[i] /= diag;
        }

        if let Some(bad) = self.x.iter().position(|v| !v.is_finite()) {
            tracing::warn!(row = bad, "non-finite value in solution");
            return Err(SimError::SingularMatrix);
        }

        self.solved = true;
        Ok(())
    }

    /// Whether a solve has completed in the current timestep.
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// The full solution vector (node voltages, then branch currents).
    pub fn solution(&self) -> &[f64] {
        &self.x
    }

    /// Get the solved voltage at a node (0 for ground).
    ///
    /// Before the first solve of a timestep this is the previous timestep's
    /// value, which nonlinear elements use as their linearization point.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        match self.node_row(node) {
            Some(i) => self.x[i],
            None => 0.0,
        }
    }

    /// Get the solved auxiliary unknown (branch current) of a voltage source.
    pub fn voltage_source_current(&self, vs: VoltageSourceId) -> f64 {
        debug_assert!(self.solved, "voltage source current read before solve");
        self.x[self.voltage_source_row(vs)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn solve(m: &mut MnaMatrix) {
        m.factor().unwrap();
        m.solve().unwrap();
    }

    #[test]
    fn test_voltage_divider() {
        // V1: 10V on node 1, R 1k from 1 to 2, R 1k from 2 to ground
        let mut m = MnaMatrix::new(3, 1).unwrap();
        m.begin_timestep();
        m.stamp_conductance(NodeId(1), NodeId(2), 1e-3);
        m.stamp_conductance(NodeId(2), NodeId::GROUND, 1e-3);
        m.begin_iteration();
        m.stamp_voltage(VoltageSourceId(0), NodeId(1), NodeId::GROUND, 10.0);
        solve(&mut m);

        assert_abs_diff_eq!(m.node_voltage(NodeId(1)), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.node_voltage(NodeId(2)), 5.0, epsilon = 1e-6);
        // 5mA flows out of the + terminal into the load
        assert_abs_diff_eq!(m.voltage_source_current(VoltageSourceId(0)), -5e-3, epsilon = 1e-9);
    }

    #[test]
    fn test_stamp_voltage_overwrites() {
        let mut once = MnaMatrix::new(2, 1).unwrap();
        once.begin_timestep();
        once.stamp_conductance(NodeId(1), NodeId::GROUND, 0.5);
        once.begin_iteration();
        once.stamp_voltage(VoltageSourceId(0), NodeId(1), NodeId::GROUND, 3.0);

        let mut twice = MnaMatrix::new(2, 1).unwrap();
        twice.begin_timestep();
        twice.stamp_conductance(NodeId(1), NodeId::GROUND, 0.5);
        twice.begin_iteration();
        twice.stamp_voltage(VoltageSourceId(0), NodeId(1), NodeId::GROUND, 7.0);
        twice.stamp_voltage(VoltageSourceId(0), NodeId(1), NodeId::GROUND, 3.0);

        assert_eq!(once.a, twice.a);
        assert_eq!(once.z, twice.z);
    }

    #[test]
    fn test_iteration_layer_resets() {
        let mut m = MnaMatrix::new(2, 0).unwrap();
        m.begin_timestep();
        m.stamp_conductance(NodeId(1), NodeId::GROUND, 1.0);
        m.begin_iteration();
        m.stamp_current_source(NodeId::GROUND, NodeId(1), 2.0);
        let first = (m.a.clone(), m.z.clone());

        m.begin_iteration();
        m.stamp_current_source(NodeId::GROUND, NodeId(1), 2.0);
        assert_eq!(first.0, m.a);
        assert_eq!(first.1, m.z);

        solve(&mut m);
        assert_abs_diff_eq!(m.node_voltage(NodeId(1)), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gmin_keeps_floating_node_solvable() {
        // Node 2 has no element attached at all
        let mut m = MnaMatrix::new(3, 0).unwrap();
        m.begin_timestep();
        m.stamp_conductance(NodeId(1), NodeId::GROUND, 1.0);
        m.begin_iteration();
        solve(&mut m);
        assert_eq!(m.node_voltage(NodeId(2)), 0.0);
    }

    #[test]
    fn test_voltage_source_loop_is_singular() {
        // Two sources in parallel across the same node pair
        let mut m = MnaMatrix::new(2, 2).unwrap();
        m.begin_timestep();
        m.begin_iteration();
        m.stamp_voltage(VoltageSourceId(0), NodeId(1), NodeId::GROUND, 1.0);
        m.stamp_voltage(VoltageSourceId(1), NodeId(1), NodeId::GROUND, 2.0);
        let result = m.factor().and_then(|_| m.solve());
        assert!(matches!(result, Err(SimError::SingularMatrix)));
    }

    #[test]
    fn test_oversized_system_rejected() {
        assert!(matches!(
            MnaMatrix::new(MAX_SYSTEM_SIZE + 2, 0),
            Err(SimError::InvalidTopology { .. })
        ));
        assert!(MnaMatrix::new(usize::MAX, usize::MAX).is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "voltage source current read before solve")]
    fn test_current_before_solve_asserts() {
        let mut m = MnaMatrix::new(2, 1).unwrap();
        m.begin_timestep();
        m.begin_iteration();
        m.stamp_voltage(VoltageSourceId(0), NodeId(1), NodeId::GROUND, 1.0);
        solve(&mut m);
        assert!(m.is_solved());

        // A new timestep invalidates the previous solve
        m.begin_timestep();
        m.voltage_source_current(VoltageSourceId(0));
    }

    #[test]
    fn test_ground_reads_zero() {
        let m = MnaMatrix::new(2, 0).unwrap();
        assert_eq!(m.node_voltage(NodeId::GROUND), 0.0);
        assert!(!m.is_solved());
    }
}
