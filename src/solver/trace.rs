//! Recorded node voltages over a transient run.

use std::io::Write;

use crate::circuit::NodeId;
use crate::error::{Result, SimError};

/// Node voltages sampled after each timestep.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    num_nodes: usize,
    times: Vec<f64>,
    /// Row-major: one row of `num_nodes` voltages per sample
    voltages: Vec<f64>,
}

impl Trace {
    /// Create an empty trace for a network of `num_nodes` nodes.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            ..Self::default()
        }
    }

    /// Record one sample. `voltages` holds one value per node, ground first.
    pub fn push(&mut self, time: f64, voltages: &[f64]) {
        debug_assert_eq!(voltages.len(), self.num_nodes);
        self.times.push(time);
        self.voltages.extend_from_slice(voltages);
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Sample times in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Voltages of every node at sample `index`.
    pub fn sample(&self, index: usize) -> &[f64] {
        let start = index * self.num_nodes;
        &self.voltages[start..start + self.num_nodes]
    }

    /// Voltage history of one node.
    pub fn node(&self, node: NodeId) -> impl Iterator<Item = f64> + '_ {
        self.voltages
            .chunks(self.num_nodes.max(1))
            .map(move |row| row.get(node.0).copied().unwrap_or(0.0))
    }

    /// Write the trace as CSV: `time,V(N1),V(N2),...`.
    ///
    /// `nodes` selects the columns; an empty slice writes every non-ground node.
    pub fn write_csv<W: Write>(&self, out: &mut W, nodes: &[NodeId]) -> Result<()> {
        let columns: Vec<NodeId> = if nodes.is_empty() {
            (1..self.num_nodes).map(NodeId).collect()
        } else {
            nodes.to_vec()
        };

        let io_err = |e: std::io::Error| SimError::Output {
            message: e.to_string(),
        };

        write!(out, "time").map_err(io_err)?;
        for node in &columns {
            write!(out, ",V({node})").map_err(io_err)?;
        }
        writeln!(out).map_err(io_err)?;

        for (i, time) in self.times.iter().enumerate() {
            let row = self.sample(i);
            write!(out, "{time:e}").map_err(io_err)?;
            for node in &columns {
                let v = row.get(node.0).copied().unwrap_or(0.0);
                write!(out, ",{v:e}").map_err(io_err)?;
            }
            writeln!(out).map_err(io_err)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace() -> Trace {
        let mut t = Trace::new(3);
        t.push(0.0, &[0.0, 1.0, 0.5]);
        t.push(1e-3, &[0.0, 2.0, 1.0]);
        t
    }

    #[test]
    fn test_node_history() {
        let t = trace();
        assert_eq!(t.len(), 2);
        assert_eq!(t.node(NodeId(1)).collect::<Vec<_>>(), vec![1.0, 2.0]);
        assert_eq!(t.sample(1), &[0.0, 2.0, 1.0]);
    }

    #[test]
    fn test_csv_output() {
        let mut out = Vec::new();
        trace().write_csv(&mut out, &[NodeId(2)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time,V(N2)");
        assert_eq!(lines[1], "0e0,5e-1");
        assert_eq!(lines.len(), 3);
    }
}
