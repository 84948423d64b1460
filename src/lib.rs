use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::level_filters::LevelFilter;

mod element;
pub use element::*;

mod parse;
pub use parse::*;

pub mod rings;
pub use rings::{find_rings, Ring};

pub mod layout;
pub use layout::{compute_2d_coords, Point};

mod glyphs;

pub mod visualize;
pub use visualize::{render_molecule, render_smiles, DrawOptions};

pub mod augment;
pub mod background;
pub mod composite;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;

pub use error::*;

/// An atom as written in a SMILES string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Hydrogen count written inside brackets. `None` means the count is implied
    /// by the element's standard valence.
    pub hydrogens: Option<u8>,
    pub class: Option<u32>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            hydrogens: None,
            class: None,
        }
    }

    pub fn aromatic(element: Element) -> Self {
        Self {
            aromatic: true,
            ..Self::new(element)
        }
    }

    pub fn is_aromatic(&self) -> bool {
        self.aromatic
    }
}

impl From<Element> for Atom {
    fn from(element: Element) -> Self {
        Atom::new(element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl Bond {
    /// Contribution of the bond to an atom's explicit valence. Aromatic bonds
    /// count as one; the extra pi electron is accounted for per atom.
    pub fn valence(&self) -> u8 {
        match self {
            Bond::Single | Bond::Aromatic => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
        }
    }
}

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

/// Sum of bond valences around an atom, excluding implicit hydrogens.
pub fn explicit_valence(graph: &MoleculeGraph, node: NodeIndex) -> u32 {
    let bonds: u32 = graph
        .edges(node)
        .map(|edge| edge.weight().valence() as u32)
        .sum();
    bonds + graph[node].hydrogens.unwrap_or(0) as u32
}

/// Number of hydrogens attached to an atom that are not explicit graph nodes.
pub fn hydrogen_count(graph: &MoleculeGraph, node: NodeIndex) -> u8 {
    let atom = &graph[node];
    if let Some(h) = atom.hydrogens {
        return h;
    }
    let bonds: u32 = graph
        .edges(node)
        .map(|edge| edge.weight().valence() as u32)
        .sum();
    let valences = atom.element.default_valences();
    if atom.aromatic {
        let first = valences.first().copied().unwrap_or(0) as u32;
        return first.saturating_sub(bonds + 1) as u8;
    }
    valences
        .iter()
        .map(|&v| v as u32)
        .find(|&v| v >= bonds)
        .map(|v| (v - bonds) as u8)
        .unwrap_or(0)
}

/// Installs a `tracing` subscriber writing to stderr. Unknown levels fall back
/// to `info`; calling it more than once is harmless.
pub fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h_counts(smiles: &str) -> Vec<u8> {
        let graph = parse_smiles(smiles).expect("Failed to parse SMILES");
        graph
            .node_indices()
            .map(|n| hydrogen_count(&graph, n))
            .collect()
    }

    #[test]
    fn implicit_hydrogens_ethanol() {
        assert_eq!(h_counts("CCO"), vec![3, 2, 1]);
    }

    #[test]
    fn implicit_hydrogens_carbonyl_and_nitrile() {
        assert_eq!(h_counts("CC=O"), vec![3, 1, 0]);
        assert_eq!(h_counts("CC#N"), vec![3, 0, 0]);
    }

    #[test]
    fn implicit_hydrogens_aromatic() {
        assert_eq!(h_counts("c1ccccc1"), vec![1; 6]);
        assert_eq!(h_counts("c1ccncc1"), vec![1, 1, 1, 0, 1, 1]);
        assert_eq!(h_counts("c1ccsc1"), vec![1, 1, 1, 0, 1]);
    }

    #[test]
    fn bracket_hydrogens_are_taken_verbatim() {
        assert_eq!(h_counts("[NH4+]"), vec![4]);
        assert_eq!(h_counts("C[N+](C)(C)C"), vec![3, 0, 3, 3, 3]);
    }

    #[test]
    fn hypervalent_sulfur_uses_next_valence() {
        // dimethyl sulfoxide: S has explicit valence 4
        assert_eq!(h_counts("CS(=O)C"), vec![3, 0, 0, 3]);
    }

    #[test]
    fn init_logging_twice_does_not_panic() {
        init_logging("debug");
        init_logging("not-a-level");
    }
}
