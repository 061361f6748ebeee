//! Handle types shared by the network, the elements and the assembler.

use std::fmt;

/// Index of an electrical junction in the network.
/// Node 0 is always ground and never appears in the unknown vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node (always index 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

/// Stable handle to an element of a [`Circuit`](super::Circuit).
///
/// Handles are never reused within one circuit, so a handle to a removed
/// element stays invalid instead of silently pointing at a newer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Dense index of an auxiliary voltage-source unknown.
///
/// Assigned by the assembly pass; exactly one per ideal voltage source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoltageSourceId(pub usize);

impl fmt::Display for VoltageSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Variable index in the MNA solution vector.
/// Can be either a node voltage or a voltage-source branch current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarIndex {
    /// Node voltage variable
    Voltage(NodeId),
    /// Auxiliary branch current variable
    Current(VoltageSourceId),
}

impl VarIndex {
    /// Get the raw index into the solution vector.
    /// Node voltages come first (excluding ground), then branch currents.
    pub fn to_index(&self, num_nodes: usize) -> usize {
        match self {
            // Node 0 (ground) is not in the matrix, so subtract 1
            VarIndex::Voltage(NodeId(n)) => {
                debug_assert!(*n > 0, "Ground node should not be in solution vector");
                n - 1
            }
            VarIndex::Current(VoltageSourceId(b)) => (num_nodes - 1) + b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_index_layout() {
        // 4 nodes including ground -> 3 voltage unknowns, then branch currents
        assert_eq!(VarIndex::Voltage(NodeId(1)).to_index(4), 0);
        assert_eq!(VarIndex::Voltage(NodeId(3)).to_index(4), 2);
        assert_eq!(VarIndex::Current(VoltageSourceId(0)).to_index(4), 3);
        assert_eq!(VarIndex::Current(VoltageSourceId(2)).to_index(4), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId::GROUND.to_string(), "GND");
        assert_eq!(NodeId(2).to_string(), "N2");
        assert_eq!(VoltageSourceId(1).to_string(), "I1");
    }
}
