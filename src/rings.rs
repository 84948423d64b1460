//! Ring perception.
//!
//! Every bond that lies on a cycle contributes the shortest cycle running
//! through it. The union of those cycles covers every ring bond and, for the
//! fused and bridged systems found in drug-like molecules, matches the rings a
//! chemist would draw.

use crate::MoleculeGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, VecDeque};

/// A ring as a cycle of atoms, in bond order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub atoms: Vec<NodeIndex>,
}

impl Ring {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn contains(&self, atom: NodeIndex) -> bool {
        self.atoms.contains(&atom)
    }

    /// Whether `a` and `b` are adjacent in the ring.
    pub fn contains_bond(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.bonds().any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Consecutive atom pairs, including the closing pair.
    pub fn bonds(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        let n = self.atoms.len();
        (0..n).map(move |i| (self.atoms[i], self.atoms[(i + 1) % n]))
    }
}

/// Finds the smallest ring through every cyclic bond.
pub fn find_rings(graph: &MoleculeGraph) -> Vec<Ring> {
    let mut seen: BTreeSet<Vec<NodeIndex>> = BTreeSet::new();
    let mut rings = Vec::new();

    for edge in graph.edge_references() {
        let (a, b) = (edge.source(), edge.target());
        if let Some(path) = shortest_path_avoiding(graph, a, b) {
            let mut key = path.clone();
            key.sort();
            if seen.insert(key) {
                rings.push(Ring { atoms: path });
            }
        }
    }

    rings.sort_by_key(|ring| {
        (
            ring.len(),
            ring.atoms.iter().min().copied().unwrap_or_default(),
        )
    });
    rings
}

/// Breadth-first search from `a` to `b` that does not use the bond `a-b`.
fn shortest_path_avoiding(
    graph: &MoleculeGraph,
    a: NodeIndex,
    b: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut parent: Vec<Option<NodeIndex>> = vec![None; graph.node_count()];
    let mut visited = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    visited[a.index()] = true;
    queue.push_back(a);

    while let Some(node) = queue.pop_front() {
        let mut neighbors: Vec<NodeIndex> = graph.neighbors(node).collect();
        neighbors.sort();
        for next in neighbors {
            if (node == a && next == b) || (node == b && next == a) || visited[next.index()] {
                continue;
            }
            visited[next.index()] = true;
            parent[next.index()] = Some(node);
            if next == b {
                let mut path = vec![b];
                let mut cursor = b;
                while let Some(p) = parent[cursor.index()] {
                    path.push(p);
                    cursor = p;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Groups rings that share at least one atom. Each group lists indices into
/// `rings`, in ascending order.
pub fn ring_systems(rings: &[Ring]) -> Vec<Vec<usize>> {
    let mut system_of: Vec<Option<usize>> = vec![None; rings.len()];
    let mut systems: Vec<Vec<usize>> = Vec::new();

    for start in 0..rings.len() {
        if system_of[start].is_some() {
            continue;
        }
        let id = systems.len();
        let mut members = vec![start];
        system_of[start] = Some(id);
        let mut queue = VecDeque::from([start]);
        while let Some(r) = queue.pop_front() {
            for other in 0..rings.len() {
                if system_of[other].is_none()
                    && rings[other].atoms.iter().any(|atom| rings[r].contains(*atom))
                {
                    system_of[other] = Some(id);
                    members.push(other);
                    queue.push_back(other);
                }
            }
        }
        members.sort();
        systems.push(members);
    }
    systems
}
