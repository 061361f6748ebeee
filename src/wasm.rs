//! WASM bindings for Voltaic Core.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuitSim } from 'voltaic_core';
//!
//! await init();
//!
//! const records = `
//! vs,1,0,0,0,60,5,0,
//! r,1,2,1k,
//! c,2,0,1u,
//! `;
//!
//! const sim = new WasmCircuitSim(records, 5e-6);
//! sim.run(1000);
//! const v = sim.node_voltage(2);
//! sim.set_parameter(0, "frequency", 120);
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{validate_circuit, ElementId, NodeId};
use crate::components::Edit;
use crate::error::SimError;
use crate::netlist;
use crate::solver::{Simulator, SimulatorConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: SimError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Browser-facing transient simulator.
#[wasm_bindgen]
pub struct WasmCircuitSim {
    simulator: Simulator,
}

#[wasm_bindgen]
impl WasmCircuitSim {
    /// Create a simulator from circuit records and a timestep in seconds.
    #[wasm_bindgen(constructor)]
    pub fn new(records: &str, timestep: f64) -> Result<WasmCircuitSim, JsValue> {
        Self::with_config(records, timestep, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE)
    }

    /// Create a simulator with a custom Newton-Raphson configuration.
    #[wasm_bindgen]
    pub fn with_config(
        records: &str,
        timestep: f64,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<WasmCircuitSim, JsValue> {
        let circuit = netlist::load_circuit(records).map_err(to_js)?;
        validate_circuit(&circuit).map_err(to_js)?;

        let config = SimulatorConfig::new()
            .with_timestep(timestep)
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance);
        let simulator = Simulator::with_config(circuit, config).map_err(to_js)?;

        Ok(WasmCircuitSim { simulator })
    }

    /// Advance one timestep. Returns the Newton iterations used.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<usize, JsValue> {
        self.simulator.step().map_err(to_js)
    }

    /// Advance `steps` timesteps and return the flattened node voltages,
    /// one row of `num_nodes` values per step.
    #[wasm_bindgen]
    pub fn run(&mut self, steps: usize) -> Result<Vec<f64>, JsValue> {
        let trace = self.simulator.run(steps).map_err(to_js)?;
        Ok((0..trace.len())
            .flat_map(|i| trace.sample(i).to_vec())
            .collect())
    }

    /// Current simulation time in seconds.
    #[wasm_bindgen(getter)]
    pub fn time(&self) -> f64 {
        self.simulator.time()
    }

    /// Number of nodes, ground included.
    #[wasm_bindgen(getter)]
    pub fn num_nodes(&self) -> usize {
        self.simulator.circuit().num_nodes()
    }

    /// Voltage at a node from the latest solve.
    #[wasm_bindgen]
    pub fn node_voltage(&self, node: usize) -> f64 {
        self.simulator.node_voltage(NodeId(node))
    }

    /// Cached branch current of an element, or `undefined` for a stale handle.
    #[wasm_bindgen]
    pub fn element_current(&self, element: usize) -> Option<f64> {
        self.simulator.element_current(ElementId(element))
    }

    /// Set a named parameter (`amplitude`, `frequency`, `dc_bias`, `phase`,
    /// `resistance`, ...) on an element. Takes effect from the next step.
    #[wasm_bindgen]
    pub fn set_parameter(&mut self, element: usize, name: &str, value: f64) -> Result<(), JsValue> {
        let edit = Edit::from_name(name, value).ok_or_else(|| {
            to_js(SimError::Wasm {
                message: format!("unknown parameter '{name}'"),
            })
        })?;
        self.simulator
            .edit(ElementId(element), edit)
            .map_err(to_js)
    }

    /// Serialize the current circuit as records.
    #[wasm_bindgen]
    pub fn save(&self) -> String {
        netlist::save_circuit(self.simulator.circuit())
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
