//! Diode model.
//!
//! Uses the Shockley diode equation:
//!   I = Is * (exp(V / (n * Vt)) - 1)
//!
//! Each iteration linearizes around the previous iterate:
//!   I ≈ I0 + G_d * (V - V0)
//!
//! where G_d = dI/dV = Is/(n*Vt) * exp(V0/(n*Vt))

use crate::circuit::NodeId;
use crate::solver::{MnaMatrix, SimContext, MIN_CONDUCTANCE};
use crate::THERMAL_VOLTAGE;

use super::Element;

/// Parameters for a diode model.
#[derive(Debug, Clone, PartialEq)]
pub struct DiodeParams {
    /// Saturation current (Is), typically 1e-14 to 1e-12 A
    pub is: f64,
    /// Ideality factor (n), typically 1.0 to 2.0
    pub n: f64,
    /// Voltage above which the exponential is continued linearly
    pub v_crit: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self {
            is: 1e-14,
            n: 1.0,
            v_crit: 0.7,
        }
    }
}

impl DiodeParams {
    /// Build parameters from saturation current and ideality factor.
    pub fn new(is: f64, n: f64) -> Self {
        Self {
            is,
            n,
            ..Self::default()
        }
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.n * THERMAL_VOLTAGE
    }
}

/// A diode, anode at node0 and cathode at node1.
#[derive(Debug, Clone)]
pub struct Diode {
    pub nodes: [NodeId; 2],
    pub params: DiodeParams,
    /// Linearization voltage used by the latest iteration
    pub v_op: f64,
    /// Current from anode to cathode
    current: f64,
}

impl Diode {
    /// Create a new diode.
    pub fn new(nodes: [NodeId; 2], params: DiodeParams) -> Self {
        Self {
            nodes,
            params,
            v_op: 0.0,
            current: 0.0,
        }
    }

    /// Diode current at a given voltage.
    pub fn current_at(&self, v: f64) -> f64 {
        let n_vt = self.params.n_vt();
        let v_crit = self.params.v_crit;

        if v > v_crit {
            // Linear extrapolation past the critical voltage
            let i_crit = self.params.is * ((v_crit / n_vt).exp() - 1.0);
            i_crit + self.conductance_at(v_crit) * (v - v_crit)
        } else if v < -5.0 * n_vt {
            -self.params.is
        } else {
            self.params.is * ((v / n_vt).exp() - 1.0)
        }
    }

    /// Conductance (dI/dV) at a given voltage.
    pub fn conductance_at(&self, v: f64) -> f64 {
        let n_vt = self.params.n_vt();
        let v = v.min(self.params.v_crit);

        if v < -5.0 * n_vt {
            MIN_CONDUCTANCE
        } else {
            self.params.is / n_vt * (v / n_vt).exp()
        }
    }

    /// Linearized model at `v_op`: (conductance G, equivalent current I_eq)
    /// such that I = G * V + I_eq.
    pub fn linearize(&self, v_op: f64) -> (f64, f64) {
        let g = self.conductance_at(v_op);
        let i_eq = self.current_at(v_op) - g * v_op;
        (g.max(MIN_CONDUCTANCE), i_eq)
    }

    /// Limit the voltage step between iterations.
    pub fn limit_voltage_step(&self, v_old: f64, v_new: f64) -> f64 {
        let max_step = self.params.v_crit.max(0.5);

        if (v_new - v_old).abs() > max_step {
            if v_new > v_old {
                v_old + max_step
            } else {
                v_old - max_step
            }
        } else {
            v_new
        }
    }

    fn voltage_across(&self, mna: &MnaMatrix) -> f64 {
        mna.node_voltage(self.nodes[0]) - mna.node_voltage(self.nodes[1])
    }
}

impl Element for Diode {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }

    fn is_nonlinear(&self) -> bool {
        true
    }

    fn solver_iteration_begin(&mut self, _ctx: &SimContext, mna: &mut MnaMatrix) {
        let v_d = self.voltage_across(mna);
        self.v_op = self.limit_voltage_step(self.v_op, v_d);

        let (g, i_eq) = self.linearize(self.v_op);
        let (anode, cathode) = (self.nodes[0], self.nodes[1]);
        mna.stamp_conductance(anode, cathode, g);
        mna.stamp_current_source(anode, cathode, i_eq);
    }

    fn solver_iteration_end(&mut self, _ctx: &SimContext, mna: &MnaMatrix) {
        self.current = self.current_at(self.voltage_across(mna));
    }

    fn current(&self) -> f64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diode() -> Diode {
        Diode::new([NodeId(1), NodeId(0)], DiodeParams::default())
    }

    #[test]
    fn test_diode_forward_bias() {
        let d = diode();

        // At 0V, current should be approximately 0
        assert!(d.current_at(0.0).abs() < 1e-10);

        // At forward bias, current should increase exponentially
        let i_small = d.current_at(0.3);
        let i_large = d.current_at(0.6);
        assert!(i_large > i_small * 100.0);
    }

    #[test]
    fn test_diode_reverse_bias() {
        let d = diode();

        // In reverse bias, current should approach -Is
        let i_rev = d.current_at(-1.0);
        assert!(i_rev < 0.0);
        assert!(i_rev > -2.0 * d.params.is);
    }

    #[test]
    fn test_linearization_matches_at_operating_point() {
        let d = diode();
        let v = 0.55;
        let (g, i_eq) = d.linearize(v);
        assert!((g * v + i_eq - d.current_at(v)).abs() < 1e-12);
    }

    #[test]
    fn test_step_limiting() {
        let d = diode();
        assert_eq!(d.limit_voltage_step(0.0, 5.0), 0.7);
        assert_eq!(d.limit_voltage_step(0.0, -5.0), -0.7);
        assert_eq!(d.limit_voltage_step(0.2, 0.4), 0.4);
        assert!(d.is_nonlinear());
    }
}
