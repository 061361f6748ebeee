//! Circuit network: elements in topology order plus the assembly pass.

use super::types::{ElementId, NodeId, VoltageSourceId};
use crate::components::{Component, Edit, Element};
use crate::error::{Result, SimError};

/// An element together with its stable handle.
#[derive(Debug, Clone)]
struct Entry {
    id: ElementId,
    component: Component,
}

/// A circuit network ready for simulation.
///
/// Elements are kept in insertion (topology) order, which is the order the
/// iteration driver calls their hooks in. Every topology change re-runs the
/// assembly pass so voltage-source unknowns stay dense.
#[derive(Debug, Clone)]
pub struct Circuit {
    entries: Vec<Entry>,

    /// Number of nodes (including ground)
    num_nodes: usize,

    /// Number of auxiliary voltage-source unknowns
    num_voltage_sources: usize,

    /// Next handle to hand out
    next_id: usize,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty circuit containing only the ground node.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            num_nodes: 1,
            num_voltage_sources: 0,
            next_id: 0,
        }
    }

    /// Build a circuit from components in topology order.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        let mut circuit = Self::new();
        for component in components {
            circuit.push(component);
        }
        circuit.assemble();
        circuit
    }

    /// Add an element and re-run assembly.
    pub fn add(&mut self, component: Component) -> ElementId {
        let id = self.push(component);
        self.assemble();
        id
    }

    /// Remove an element and re-run assembly. The handle becomes invalid.
    pub fn remove(&mut self, id: ElementId) -> Result<Component> {
        let pos = self.position(id)?;
        let entry = self.entries.remove(pos);
        self.assemble();
        Ok(entry.component)
    }

    /// Apply a parameter edit to one element. Does not re-run assembly.
    pub fn edit(&mut self, id: ElementId, edit: Edit) -> Result<()> {
        let pos = self.position(id)?;
        self.entries[pos].component.apply_edit(edit)
    }

    fn push(&mut self, component: Component) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, component });
        id
    }

    fn position(&self, id: ElementId) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(SimError::ElementNotFound { id: id.0 })
    }

    /// Assembly pass: size the node set and hand out voltage-source
    /// unknowns densely in topology order.
    pub fn assemble(&mut self) {
        let mut num_nodes = 1;
        let mut next_vs = 0;

        for entry in &mut self.entries {
            for node in entry.component.nodes() {
                num_nodes = num_nodes.max(node.0 + 1);
            }
            for _ in 0..entry.component.voltage_source_count() {
                entry.component.set_voltage_source(VoltageSourceId(next_vs));
                next_vs += 1;
            }
        }

        self.num_nodes = num_nodes;
        self.num_voltage_sources = next_vs;

        tracing::debug!(
            elements = self.entries.len(),
            nodes = num_nodes,
            voltage_sources = next_vs,
            "assembled circuit"
        );
    }

    /// Get an element by handle.
    pub fn element(&self, id: ElementId) -> Option<&Component> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.component)
    }

    /// Handles and elements in topology order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Component)> {
        self.entries.iter().map(|e| (e.id, &e.component))
    }

    /// Elements in topology order, for the iteration driver.
    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.entries.iter_mut().map(|e| &mut e.component)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes, ground included.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of auxiliary voltage-source unknowns.
    pub fn num_voltage_sources(&self) -> usize {
        self.num_voltage_sources
    }

    /// Get the total size of the MNA solution vector.
    pub fn matrix_size(&self) -> usize {
        // Nodes (excluding ground) + branch currents
        self.num_nodes.saturating_sub(1) + self.num_voltage_sources
    }

    /// Whether any element needs iterative linearization.
    pub fn is_nonlinear(&self) -> bool {
        self.entries.iter().any(|e| e.component.is_nonlinear())
    }

    /// Check that a node index belongs to this network.
    pub fn check_node(&self, node: NodeId) -> Result<()> {
        if node.0 < self.num_nodes {
            Ok(())
        } else {
            Err(SimError::NodeOutOfRange {
                node: node.0,
                num_nodes: self.num_nodes,
            })
        }
    }
}
