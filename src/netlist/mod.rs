//! Persisted circuit records.
//!
//! A circuit is stored as text, one element per line:
//!
//! ```text
//! # save_id,fields...,
//! vs,1,0,0,0,60,5,0,
//! r,1,2,4.7k,
//! c,2,0,100n,
//! d,2,0,1e-14,1,
//! ```
//!
//! Numbers use the compact unit-prefixed form from [`format_value`]. The
//! field after the node pair of a source record is a version tag; it is
//! written as `0` and ignored when loading.

mod reader;
mod units;

pub use reader::RecordReader;
pub use units::{format_value, parse_value};

use crate::circuit::Circuit;
use crate::components::{
    Capacitor, Component, CurrentSource, Diode, DiodeParams, Element, Resistor, VoltageSource,
    Waveform,
};
use crate::error::{Result, SimError};

/// Version tag written into source records.
const RECORD_VERSION: u32 = 0;

/// Serialize every element of `circuit` in topology order.
pub fn save_circuit(circuit: &Circuit) -> String {
    let mut out = String::new();
    for (_, component) in circuit.elements() {
        out.push_str(&save_component(component));
        out.push('\n');
    }
    out
}

/// Serialize one element as a single record, trailing separator included.
pub fn save_component(component: &Component) -> String {
    let [n0, n1] = component.nodes();
    let mut record = format!("{},{},{},", component.save_id(), n0.0, n1.0);

    let values: Vec<f64> = match component {
        Component::VoltageSource(v) => {
            record.push_str(&format!("{RECORD_VERSION},"));
            waveform_fields(&v.waveform)
        }
        Component::CurrentSource(i) => {
            record.push_str(&format!("{RECORD_VERSION},"));
            waveform_fields(&i.waveform)
        }
        Component::Resistor(r) => vec![r.resistance()],
        Component::Capacitor(c) => vec![c.capacitance()],
        Component::Diode(d) => vec![d.params.is, d.params.n],
    };
    for value in values {
        record.push_str(&format_value(value));
        record.push(',');
    }
    record
}

fn waveform_fields(w: &Waveform) -> Vec<f64> {
    vec![w.dc_bias, w.frequency, w.amplitude, w.phase_offset]
}

/// Parse circuit text into an assembled circuit.
///
/// Blank lines and lines starting with `#` are skipped. Line numbers in
/// errors are 1-based. `k` two-terminal records touch at most `2k` nodes,
/// so any node index at or past `2k` can only be a gap and is rejected
/// here, before anything is sized from it.
pub fn load_circuit(text: &str) -> Result<Circuit> {
    let mut records = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        records.push((index + 1, load_component(line, index + 1)?));
    }

    let node_limit = 2 * records.len();
    let mut circuit = Circuit::new();
    for (line, component) in records {
        if let Some(node) = component.nodes().into_iter().find(|n| n.0 >= node_limit) {
            return Err(SimError::parse(
                line,
                format!("node {} out of range for {node_limit} terminals", node.0),
            ));
        }
        circuit.add(component);
    }
    tracing::debug!(elements = circuit.len(), "loaded circuit records");
    Ok(circuit)
}

/// Parse a single record.
pub fn load_component(record: &str, line: usize) -> Result<Component> {
    let mut r = RecordReader::new(record, line);
    let save_id = r.read()?;
    let nodes = [r.read_node()?, r.read_node()?];

    let component = match save_id {
        "vs" => {
            // Version tag, consumed and not interpreted
            r.read()?;
            Component::VoltageSource(VoltageSource::with_waveform(nodes, read_waveform(&mut r)?))
        }
        "cs" => {
            r.read()?;
            Component::CurrentSource(CurrentSource::new(nodes, read_waveform(&mut r)?))
        }
        "r" => {
            let resistance = read_positive(&mut r, "resistance")?;
            Component::Resistor(Resistor::new(nodes, resistance))
        }
        "c" => {
            let capacitance = read_positive(&mut r, "capacitance")?;
            Component::Capacitor(Capacitor::new(nodes, capacitance))
        }
        "d" => {
            let is = read_positive(&mut r, "saturation current")?;
            let n = read_positive(&mut r, "emission coefficient")?;
            Component::Diode(Diode::new(nodes, DiodeParams::new(is, n)))
        }
        other => {
            return Err(SimError::UnknownElement {
                save_id: other.to_string(),
                line,
            })
        }
    };

    r.finish()?;
    Ok(component)
}

fn read_waveform(r: &mut RecordReader<'_>) -> Result<Waveform> {
    let dc_bias = read_finite(r, "dc bias")?;
    let frequency = read_finite(r, "frequency")?;
    let amplitude = read_finite(r, "amplitude")?;
    let phase_offset = read_finite(r, "phase offset")?;
    Ok(Waveform::new(dc_bias, frequency, amplitude, phase_offset))
}

fn read_finite(r: &mut RecordReader<'_>, what: &str) -> Result<f64> {
    let value = r.read_number()?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::parse(r.line(), format!("{what} must be finite")))
    }
}

fn read_positive(r: &mut RecordReader<'_>, what: &str) -> Result<f64> {
    let value = read_finite(r, what)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(SimError::parse(r.line(), format!("{what} must be positive")))
    }
}

/// Read and parse a circuit file.
#[cfg(feature = "cli")]
pub fn load_file(path: &std::path::Path) -> Result<Circuit> {
    let text = std::fs::read_to_string(path).map_err(|source| SimError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    load_circuit(&text)
}
