//! Main simulator interface.

use crate::circuit::{Circuit, ElementId, NodeId};
use crate::components::{Component, Edit, Element};
use crate::error::{Result, SimError};

use super::mna::MnaMatrix;
use super::trace::Trace;
use super::{NewtonRaphson, DEFAULT_MAX_ITERATIONS, DEFAULT_TIMESTEP, DEFAULT_TOLERANCE};

/// Read-only view of the simulation clock handed to every element hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimContext {
    /// Simulation time in seconds, fixed for the whole timestep
    pub time: f64,
    /// Timestep length in seconds
    pub dt: f64,
}

/// Phase of the current timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestepState {
    /// Clock fixed, `solver_begin` hooks running
    Begin,
    /// Stamp/solve/readback loop running
    Iterating,
    /// Timestep converged and committed
    Ended,
}

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Timestep length in seconds.
    pub timestep: f64,
    /// Maximum Newton-Raphson iterations per timestep.
    pub max_iterations: usize,
    /// Convergence tolerance for Newton-Raphson (volts).
    pub tolerance: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            timestep: DEFAULT_TIMESTEP,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timestep length (in seconds).
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance (in volts).
    ///
    /// Higher tolerance = fewer iterations but less accuracy for circuits
    /// with nonlinear elements. Linear circuits are unaffected.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reject values the solver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(SimError::invalid_param(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if self.max_iterations == 0 {
            return Err(SimError::invalid_param("max_iterations must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SimError::invalid_param(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// The main circuit simulator.
///
/// Owns the network, the assembler and the clock. Elements only ever see
/// the clock through a shared [`SimContext`].
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    /// MNA matrix system
    matrix: MnaMatrix,
    /// Newton-Raphson solver
    newton: NewtonRaphson,
    /// Clock
    ctx: SimContext,
    /// Phase of the latest timestep
    state: TimestepState,
    /// Completed timesteps
    steps: u64,
}

impl Simulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(circuit: Circuit) -> Result<Self> {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let matrix = MnaMatrix::new(circuit.num_nodes(), circuit.num_voltage_sources())?;
        let newton = NewtonRaphson::with_config(config.max_iterations, config.tolerance);

        Ok(Self {
            circuit,
            matrix,
            newton,
            ctx: SimContext {
                time: 0.0,
                dt: config.timestep,
            },
            state: TimestepState::Ended,
            steps: 0,
        })
    }

    /// Current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.ctx.time
    }

    /// Timestep length in seconds.
    pub fn timestep(&self) -> f64 {
        self.ctx.dt
    }

    /// Number of completed timesteps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Phase of the latest timestep.
    pub fn state(&self) -> TimestepState {
        self.state
    }

    /// The clock as seen by elements.
    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Step the simulation by one timestep.
    ///
    /// Returns the number of iterations used. On non-convergence the error
    /// is returned and the clock is not advanced.
    pub fn step(&mut self) -> Result<usize> {
        let _span = tracing::trace_span!("timestep", time = self.ctx.time).entered();

        self.state = TimestepState::Begin;
        self.matrix.begin_timestep();
        for component in self.circuit.components_mut() {
            component.solver_begin(&self.ctx, &mut self.matrix);
        }

        self.state = TimestepState::Iterating;
        let iterations = self
            .newton
            .iterate(&mut self.circuit, &mut self.matrix, &self.ctx)?;

        for component in self.circuit.components_mut() {
            component.solver_end(&self.ctx, &self.matrix);
        }
        self.state = TimestepState::Ended;

        self.steps += 1;
        self.ctx.time = self.steps as f64 * self.ctx.dt;
        Ok(iterations)
    }

    /// Run `steps` timesteps, recording node voltages after each one.
    pub fn run(&mut self, steps: usize) -> Result<Trace> {
        let _span = tracing::info_span!("transient", steps, dt = self.ctx.dt).entered();
        let mut trace = Trace::new(self.circuit.num_nodes());
        for _ in 0..steps {
            let time = self.ctx.time;
            self.step()?;
            trace.push(time, &self.node_voltages());
        }
        Ok(trace)
    }

    /// Run until the clock reaches `t_end` (seconds).
    pub fn run_until(&mut self, t_end: f64) -> Result<Trace> {
        let remaining = ((t_end - self.ctx.time) / self.ctx.dt).round();
        let steps = if remaining > 0.0 { remaining as usize } else { 0 };
        self.run(steps)
    }

    /// Voltage at a node from the latest solve.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        if node.0 >= self.circuit.num_nodes() {
            return 0.0;
        }
        self.matrix.node_voltage(node)
    }

    /// All node voltages, ground first.
    pub fn node_voltages(&self) -> Vec<f64> {
        (0..self.circuit.num_nodes())
            .map(|n| self.matrix.node_voltage(NodeId(n)))
            .collect()
    }

    /// Cached branch current of an element.
    pub fn element_current(&self, id: ElementId) -> Option<f64> {
        self.circuit.element(id).map(|c| c.current())
    }

    /// Apply a parameter edit between timesteps.
    pub fn edit(&mut self, id: ElementId, edit: Edit) -> Result<()> {
        self.circuit.edit(id, edit)
    }

    /// Add an element, rebuilding the assembler for the new topology.
    ///
    /// If the grown system cannot be allocated the element is taken back
    /// out and the circuit is left as it was.
    pub fn add_element(&mut self, component: Component) -> Result<ElementId> {
        let id = self.circuit.add(component);
        if let Err(e) = self.reassemble() {
            self.circuit.remove(id)?;
            return Err(e);
        }
        Ok(id)
    }

    /// Remove an element, rebuilding the assembler for the new topology.
    pub fn remove_element(&mut self, id: ElementId) -> Result<Component> {
        let component = self.circuit.remove(id)?;
        self.reassemble()?;
        Ok(component)
    }

    fn reassemble(&mut self) -> Result<()> {
        self.matrix = MnaMatrix::new(self.circuit.num_nodes(), self.circuit.num_voltage_sources())?;
        Ok(())
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::MAX_SYSTEM_SIZE;
    use crate::components::{Capacitor, Diode, DiodeParams, Resistor, VoltageSource, Waveform};
    use approx::assert_abs_diff_eq;

    fn vsource(a: usize, b: usize, waveform: Waveform) -> Component {
        Component::VoltageSource(VoltageSource::with_waveform([NodeId(a), NodeId(b)], waveform))
    }

    fn resistor(a: usize, b: usize, r: f64) -> Component {
        Component::Resistor(Resistor::new([NodeId(a), NodeId(b)], r))
    }

    #[test]
    fn test_config_validation() {
        assert!(SimulatorConfig::new().with_timestep(0.0).validate().is_err());
        assert!(SimulatorConfig::new().with_max_iterations(0).validate().is_err());
        assert!(SimulatorConfig::new().with_tolerance(-1.0).validate().is_err());
        assert!(SimulatorConfig::new().validate().is_ok());
    }

    #[test]
    fn test_constant_source_across_resistor() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::new(0.0, 0.0, 5.0, 0.0)),
            resistor(1, 0, 1e3),
        ]);
        let mut sim = Simulator::new(circuit).unwrap();

        for _ in 0..10 {
            sim.step().unwrap();
            assert_eq!(sim.state(), TimestepState::Ended);
            // Amplitude only appears through the sine: 5 * sin(0°) = 0
            assert_abs_diff_eq!(sim.node_voltage(NodeId(1)), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_five_volt_source_stays_constant() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::new(0.0, 0.0, 5.0, 90.0)),
            resistor(1, 0, 1e3),
        ]);
        let mut sim = Simulator::new(circuit).unwrap();
        let trace = sim.run(20).unwrap();

        for v in trace.node(NodeId(1)) {
            assert_abs_diff_eq!(v, 5.0, epsilon = 1e-9);
        }
        let current = sim.element_current(ElementId(0)).unwrap();
        assert_abs_diff_eq!(current, 5e-3, epsilon = 1e-9);
    }

    #[test]
    fn test_sine_source_tracks_clock() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::new(0.0, 60.0, 5.0, 0.0)),
            resistor(1, 0, 1e3),
        ]);
        let config = SimulatorConfig::new().with_timestep(1.0 / 2400.0);
        let mut sim = Simulator::with_config(circuit, config).unwrap();

        // Ten steps of 1/2400s solve at t = 0 .. 9/2400
        let trace = sim.run(10).unwrap();
        assert_eq!(trace.len(), 10);
        assert_abs_diff_eq!(trace.times()[0], 0.0);

        // The next solve is at t = 10/2400 = 1/240 (quarter period)
        sim.step().unwrap();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(1)), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_edit_between_steps() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::dc(1.0)),
            resistor(1, 0, 1e3),
        ]);
        let mut sim = Simulator::new(circuit).unwrap();
        sim.step().unwrap();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(1)), 1.0, epsilon = 1e-9);

        sim.edit(ElementId(0), Edit::DcBias(2.5)).unwrap();
        sim.step().unwrap();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(1)), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_rc_charging() {
        // 1V step into 1k / 1uF, tau = 1ms
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::dc(1.0)),
            resistor(1, 2, 1e3),
            Component::Capacitor(Capacitor::new([NodeId(2), NodeId(0)], 1e-6)),
        ]);
        let config = SimulatorConfig::new().with_timestep(1e-5);
        let mut sim = Simulator::with_config(circuit, config).unwrap();
        sim.run_until(1e-3).unwrap();

        let expected = 1.0 - (-1.0f64).exp();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(2)), expected, epsilon = 1e-2);
        assert_abs_diff_eq!(sim.time(), 1e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_topology_change_reassembles() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::dc(4.0)),
            resistor(1, 0, 1e3),
        ]);
        let mut sim = Simulator::new(circuit).unwrap();
        let r2 = sim.add_element(resistor(1, 2, 1e3)).unwrap();
        sim.add_element(resistor(2, 0, 1e3)).unwrap();
        sim.step().unwrap();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(2)), 2.0, epsilon = 1e-6);

        // Without the divider top node 2 only sees the bottom resistor
        sim.remove_element(r2).unwrap();
        sim.step().unwrap();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(2)), 0.0, epsilon = 1e-9);
        assert!(sim.remove_element(r2).is_err());
    }

    #[test]
    fn test_oversized_element_rolled_back() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::dc(1.0)),
            resistor(1, 0, 1e3),
        ]);
        let mut sim = Simulator::new(circuit).unwrap();
        let err = sim
            .add_element(resistor(MAX_SYSTEM_SIZE + 10, 0, 1e3))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidTopology { .. }));
        assert_eq!(sim.circuit().len(), 2);
        assert_eq!(sim.circuit().num_nodes(), 2);

        sim.step().unwrap();
        assert_abs_diff_eq!(sim.node_voltage(NodeId(1)), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nonconvergence_holds_clock() {
        let circuit = Circuit::from_components([
            vsource(1, 0, Waveform::dc(5.0)),
            resistor(1, 2, 1e3),
            Component::Diode(Diode::new([NodeId(2), NodeId(0)], DiodeParams::default())),
        ]);
        let config = SimulatorConfig::new().with_max_iterations(1).with_tolerance(1e-12);
        let mut sim = Simulator::with_config(circuit, config).unwrap();

        let err = sim.step().unwrap_err();
        assert!(matches!(err, SimError::ConvergenceFailure { .. }));
        assert_eq!(sim.state(), TimestepState::Iterating);
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.steps(), 0);
    }
}
