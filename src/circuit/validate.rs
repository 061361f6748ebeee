//! Circuit validation.

use crate::components::{Component, Element};
use crate::error::{Result, SimError};

use super::{Circuit, NodeId};

/// Validate a circuit for simulation.
///
/// Checks:
/// - The circuit has at least one element
/// - Some element connects to ground
/// - Every non-ground node is connected to an element
/// - No voltage source has both terminals on the same node
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.is_empty() {
        return Err(SimError::InvalidTopology {
            message: "Circuit has no elements".to_string(),
        });
    }

    let mut connected = vec![false; circuit.num_nodes()];
    for (id, component) in circuit.elements() {
        let [a, b] = component.nodes();
        connected[a.0] = true;
        connected[b.0] = true;

        if matches!(component, Component::VoltageSource(_)) && a == b {
            return Err(SimError::InvalidTopology {
                message: format!("voltage source {id} has both terminals on {a}"),
            });
        }
    }

    if !connected[NodeId::GROUND.0] {
        return Err(SimError::InvalidTopology {
            message: "no element connects to ground (node 0)".to_string(),
        });
    }

    if let Some(node) = connected.iter().position(|c| !c) {
        return Err(SimError::InvalidTopology {
            message: format!("node {} is not connected to any element", NodeId(node)),
        });
    }

    // TODO: detect voltage source loops before the first factorization

    Ok(())
}
