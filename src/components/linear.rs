//! Linear passive elements: Resistor, Capacitor.

use crate::circuit::NodeId;
use crate::solver::{MnaMatrix, SimContext};

use super::Element;

/// Smallest resistance accepted, to keep the conductance finite.
const MIN_RESISTANCE: f64 = 1e-12;

/// A resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub nodes: [NodeId; 2],
    resistance: f64,
    /// Current from node0 to node1
    current: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(nodes: [NodeId; 2], resistance: f64) -> Self {
        Self {
            nodes,
            resistance: resistance.max(MIN_RESISTANCE),
            current: 0.0,
        }
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    pub fn set_resistance(&mut self, resistance: f64) {
        self.resistance = resistance.max(MIN_RESISTANCE);
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

impl Element for Resistor {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }

    fn solver_begin(&mut self, _ctx: &SimContext, mna: &mut MnaMatrix) {
        mna.stamp_conductance(self.nodes[0], self.nodes[1], self.conductance());
    }

    fn solver_iteration_end(&mut self, _ctx: &SimContext, mna: &MnaMatrix) {
        let v = mna.node_voltage(self.nodes[0]) - mna.node_voltage(self.nodes[1]);
        self.current = v * self.conductance();
    }

    fn current(&self) -> f64 {
        self.current
    }
}

/// A capacitor.
///
/// In discrete-time simulation, a capacitor is modeled using a companion model.
/// Using the trapezoidal rule:
///   i(t) = (2C/dt) * v(t) - i_eq(t-dt)
///
/// where i_eq(t-dt) = (2C/dt) * v(t-dt) + i(t-dt)
///
/// This gives an equivalent conductance G_eq = 2C/dt and an equivalent
/// current source I_eq = -i_eq(t-dt).
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub nodes: [NodeId; 2],
    capacitance: f64,
    /// Voltage across the capacitor at the last committed timestep
    pub v_prev: f64,
    /// Current through the capacitor at the last committed timestep
    pub i_prev: f64,
    /// Current from the latest iteration
    current: f64,
}

impl Capacitor {
    /// Create a new, discharged capacitor.
    pub fn new(nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self {
            nodes,
            capacitance,
            v_prev: 0.0,
            i_prev: 0.0,
            current: 0.0,
        }
    }

    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    pub fn set_capacitance(&mut self, capacitance: f64) {
        self.capacitance = capacitance;
    }

    /// Equivalent conductance of the trapezoidal companion model: 2C/dt.
    pub fn conductance(&self, dt: f64) -> f64 {
        2.0 * self.capacitance / dt
    }

    /// Equivalent current source value for the companion model.
    ///
    /// The history term is SUBTRACTED from the branch current, so it is
    /// returned negated for stamping as a source from node0 to node1.
    pub fn current_source(&self, dt: f64) -> f64 {
        -(self.conductance(dt) * self.v_prev + self.i_prev)
    }

    /// Branch current for a voltage `v` across the capacitor this timestep.
    fn current_for(&self, v: f64, dt: f64) -> f64 {
        self.conductance(dt) * (v - self.v_prev) - self.i_prev
    }

    fn voltage_across(&self, mna: &MnaMatrix) -> f64 {
        mna.node_voltage(self.nodes[0]) - mna.node_voltage(self.nodes[1])
    }
}

impl Element for Capacitor {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }

    fn solver_begin(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        let (n1, n2) = (self.nodes[0], self.nodes[1]);
        mna.stamp_conductance(n1, n2, self.conductance(ctx.dt));
        mna.stamp_current_source(n1, n2, self.current_source(ctx.dt));
    }

    fn solver_iteration_end(&mut self, ctx: &SimContext, mna: &MnaMatrix) {
        self.current = self.current_for(self.voltage_across(mna), ctx.dt);
    }

    fn solver_end(&mut self, ctx: &SimContext, mna: &MnaMatrix) {
        let v = self.voltage_across(mna);
        self.i_prev = self.current_for(v, ctx.dt);
        self.v_prev = v;
        self.current = self.i_prev;
    }

    fn current(&self) -> f64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new([NodeId(1), NodeId(0)], 1000.0);
        assert!((r.conductance() - 0.001).abs() < 1e-10);
    }

    #[test]
    fn test_resistor_clamps_zero() {
        let mut r = Resistor::new([NodeId(1), NodeId(0)], 0.0);
        assert_eq!(r.resistance(), MIN_RESISTANCE);
        r.set_resistance(50.0);
        assert_eq!(r.resistance(), 50.0);
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut c = Capacitor::new([NodeId(1), NodeId(0)], 1e-6);
        let dt = 1.0 / 48000.0;
        let g = c.conductance(dt);

        // G_eq = 2C/dt = 2 * 1e-6 / (1/48000) = 96 mS
        assert!((g - 0.096).abs() < 1e-6);

        // Initial current source should be 0
        assert!((c.current_source(dt)).abs() < 1e-10);

        // Commit 1V across the cap
        let ctx = SimContext { time: 0.0, dt };
        let mut mna = MnaMatrix::new(2, 0).unwrap();
        mna.x[0] = 1.0;
        c.solver_end(&ctx, &mna);
        assert_abs_diff_eq!(c.v_prev, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.i_prev, 0.096, epsilon = 1e-9);
    }
}
