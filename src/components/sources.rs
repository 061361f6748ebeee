//! Voltage and current sources.

use crate::circuit::{NodeId, VoltageSourceId};
use crate::solver::{MnaMatrix, SimContext};

use super::{Element, Waveform};

/// A time-varying ideal voltage source.
///
/// Voltage sources require an extra row/column in the MNA matrix for the
/// branch current. The source enforces: V[node0] - V[node1] = waveform(t)
///
/// `current` is positive when flowing from node1 to node0 through the
/// source, i.e. the negation of the solved auxiliary unknown.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub nodes: [NodeId; 2],
    pub waveform: Waveform,
    /// Auxiliary unknown assigned by the assembly pass
    voltage_source: Option<VoltageSourceId>,
    /// Last driven value
    voltage: f64,
    /// Last solved branch current
    current: f64,
}

impl VoltageSource {
    /// Create a source with the default waveform (5 V, 60 Hz).
    pub fn new(nodes: [NodeId; 2]) -> Self {
        Self::with_waveform(nodes, Waveform::default())
    }

    /// Create a source driven by `waveform`.
    pub fn with_waveform(nodes: [NodeId; 2], waveform: Waveform) -> Self {
        Self {
            nodes,
            waveform,
            voltage_source: None,
            voltage: 0.0,
            current: 0.0,
        }
    }

    /// The auxiliary unknown, once assembled.
    pub fn voltage_source(&self) -> Option<VoltageSourceId> {
        self.voltage_source
    }

    /// Driving value at the context's time.
    pub fn calculate_voltage(&self, ctx: &SimContext) -> f64 {
        self.waveform.value(ctx.time)
    }

    /// Value stamped at the most recent timestep.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Power delivered to the rest of the circuit (watts).
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.waveform.set_amplitude(amplitude);
    }

    pub fn set_dc_bias(&mut self, dc_bias: f64) {
        self.waveform.set_dc_bias(dc_bias);
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.waveform.set_frequency(frequency);
    }

    pub fn set_phase_offset(&mut self, phase_offset: f64) {
        self.waveform.set_phase_offset(phase_offset);
    }

    fn stamp(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        let Some(vs) = self.voltage_source else {
            debug_assert!(false, "voltage source stamped before assembly");
            return;
        };
        self.voltage = self.calculate_voltage(ctx);
        mna.stamp_voltage(vs, self.nodes[0], self.nodes[1], self.voltage);
    }
}

impl Element for VoltageSource {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn set_voltage_source(&mut self, vs: VoltageSourceId) {
        self.voltage_source = Some(vs);
    }

    fn solver_begin(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        self.stamp(ctx, mna);
    }

    fn solver_iteration_begin(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        self.stamp(ctx, mna);
    }

    fn solver_iteration_end(&mut self, _ctx: &SimContext, mna: &MnaMatrix) {
        if let Some(vs) = self.voltage_source {
            self.current = -mna.voltage_source_current(vs);
        }
    }

    fn current(&self) -> f64 {
        self.current
    }
}

/// A time-varying ideal current source.
///
/// Current sources add directly to the RHS vector of the MNA equations.
/// Positive current flows from node0 to node1 through the source.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub nodes: [NodeId; 2],
    pub waveform: Waveform,
    /// Value stamped at the most recent timestep
    current: f64,
}

impl CurrentSource {
    /// Create a source driven by `waveform`.
    pub fn new(nodes: [NodeId; 2], waveform: Waveform) -> Self {
        Self {
            nodes,
            waveform,
            current: 0.0,
        }
    }

    /// A constant current source.
    pub fn dc(nodes: [NodeId; 2], current: f64) -> Self {
        Self::new(nodes, Waveform::dc(current))
    }
}

impl Element for CurrentSource {
    fn nodes(&self) -> [NodeId; 2] {
        self.nodes
    }

    fn solver_begin(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        self.current = self.waveform.value(ctx.time);
        mna.stamp_current_source(self.nodes[0], self.nodes[1], self.current);
    }

    fn current(&self) -> f64 {
        self.current
    }
}
