use super::bracket::parse_bracket_atom;
use crate::{explicit_valence, find_rings, Atom, Bond, Element, MoleculeGraph};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Unknown element '{0}' at position {1}")]
    UnknownElement(String, usize),
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Empty branch '()' at position {0}")]
    EmptyBranch(usize),
    #[error("Branch opened at position {0} is never closed")]
    UnclosedBranch(usize),
    #[error("Bond symbol '{0}' at position {1} does not connect two atoms")]
    DanglingBond(char, usize),
    #[error("Ring closure '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(String, usize),
    #[error("Ring closure '{0}' at position {1} bonds an atom to itself")]
    RingClosureSelfBond(String, usize),
    #[error("Ring closure '{0}' at position {1} duplicates an existing bond")]
    DuplicateBond(String, usize),
    #[error("Ring closure '{0}' at position {1} has conflicting bond symbols")]
    RingBondConflict(String, usize),
    #[error("Ring closure '{0}' opened at position {1} is never closed")]
    UnclosedRing(String, usize),
    #[error("Incomplete ring closure label after '%' at position {0}")]
    IncompleteRingLabel(usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid bracket atom '[{0}]' at position {1}")]
    InvalidBracketAtom(String, usize),
    #[error("Aromatic atom {symbol} (atom #{index}) is not in a ring")]
    AromaticOutsideRing { symbol: String, index: usize },
    #[error("Explicit valence {valence} of atom {symbol} (atom #{index}) exceeds the permitted {allowed}")]
    Valence {
        symbol: String,
        index: usize,
        valence: u32,
        allowed: u32,
    },
}

/// A ring closure label that has been opened but not yet closed.
struct OpenRing {
    atom: NodeIndex,
    bond: Option<Bond>,
    position: usize,
}

/// Parser state shared by the main loop.
struct State {
    graph: MoleculeGraph,
    current_atom: Option<NodeIndex>,
    // bond symbol waiting for the next atom, with its character and position
    pending_bond: Option<(Bond, char, usize)>,
    branch_stack: Vec<(NodeIndex, usize)>,
    // set right after '(' until an atom is read
    branch_opened: Option<usize>,
    ring_map: BTreeMap<u16, OpenRing>,
}

impl State {
    fn new() -> Self {
        Self {
            graph: MoleculeGraph::new_undirected(),
            current_atom: None,
            pending_bond: None,
            branch_stack: Vec::new(),
            branch_opened: None,
            ring_map: BTreeMap::new(),
        }
    }

    /// Adds an atom and bonds it to the current atom, if any.
    fn add_atom(&mut self, atom: Atom) -> Result<(), SmilesError> {
        let new_atom = self.graph.add_node(atom);
        match self.current_atom {
            Some(prev_atom) => {
                let bond = match self.pending_bond.take() {
                    Some((bond, _, _)) => bond,
                    None if self.graph[prev_atom].is_aromatic()
                        && self.graph[new_atom].is_aromatic() =>
                    {
                        Bond::Aromatic
                    }
                    None => Bond::Single,
                };
                self.graph.add_edge(prev_atom, new_atom, bond);
            }
            None => {
                if let Some((_, symbol, position)) = self.pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, position));
                }
            }
        }
        self.current_atom = Some(new_atom);
        self.branch_opened = None;
        Ok(())
    }

    fn ring_closure(&mut self, number: u16, label: String, i: usize) -> Result<(), SmilesError> {
        if self.branch_opened.is_some() {
            return Err(SmilesError::UnexpectedCharacter(
                label.chars().next().unwrap_or('%'),
                i,
            ));
        }
        let current = self
            .current_atom
            .ok_or_else(|| SmilesError::RingClosureNoCurrentAtom(label.clone(), i))?;
        let pending = self.pending_bond.take().map(|(bond, _, _)| bond);

        match self.ring_map.remove(&number) {
            Some(open) => {
                if open.atom == current {
                    return Err(SmilesError::RingClosureSelfBond(label, i));
                }
                if self.graph.find_edge(open.atom, current).is_some() {
                    return Err(SmilesError::DuplicateBond(label, i));
                }
                let bond = match (open.bond, pending) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError::RingBondConflict(label, i))
                    }
                    (Some(bond), _) | (None, Some(bond)) => bond,
                    (None, None)
                        if self.graph[open.atom].is_aromatic()
                            && self.graph[current].is_aromatic() =>
                    {
                        Bond::Aromatic
                    }
                    (None, None) => Bond::Single,
                };
                self.graph.add_edge(open.atom, current, bond);
            }
            None => {
                self.ring_map.insert(
                    number,
                    OpenRing {
                        atom: current,
                        bond: pending,
                        position: i,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Parses a SMILES string into a validated MoleculeGraph.
///
/// Stereo markers (`/`, `\`, `@`) are accepted and discarded. The resulting
/// graph is checked for aromatic atoms outside rings and for atoms whose
/// explicit valence exceeds what their element allows.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    let graph = parse_smiles_helper(smiles)?;
    validate(&graph)?;
    Ok(graph)
}

fn parse_smiles_helper(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    if smiles.is_empty() {
        return Err(SmilesError::Empty);
    }
    let mut state = State::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                // Start of a branch: remember the atom it hangs off
                if let Some((_, symbol, position)) = state.pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, position));
                }
                match state.current_atom {
                    Some(atom) if state.branch_opened.is_none() => {
                        state.branch_stack.push((atom, i));
                        state.branch_opened = Some(i);
                    }
                    _ => return Err(SmilesError::BranchNoCurrentAtom(i)),
                }
                i += 1;
            }
            ')' => {
                if let Some((_, symbol, position)) = state.pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, position));
                }
                if let Some(position) = state.branch_opened {
                    return Err(SmilesError::EmptyBranch(position));
                }
                let (atom, _) = state
                    .branch_stack
                    .pop()
                    .ok_or(SmilesError::BranchEndNoStart(i))?;
                state.current_atom = Some(atom);
                i += 1;
            }
            '-' | '=' | '#' | ':' | '/' | '\\' => {
                if state.pending_bond.is_some() {
                    return Err(SmilesError::UnexpectedCharacter(c, i));
                }
                let bond = match c {
                    '=' => Bond::Double,
                    '#' => Bond::Triple,
                    ':' => Bond::Aromatic,
                    // '/' and '\' are directional single bonds
                    _ => Bond::Single,
                };
                state.pending_bond = Some((bond, c, i));
                i += 1;
            }
            '%' => {
                // Two digit ring closure label
                let digits: String = chars.iter().skip(i + 1).take(2).collect();
                if digits.len() != 2 || !digits.chars().all(|d| d.is_ascii_digit()) {
                    return Err(SmilesError::IncompleteRingLabel(i));
                }
                let number: u16 = digits
                    .parse()
                    .map_err(|_| SmilesError::IncompleteRingLabel(i))?;
                state.ring_closure(number, format!("%{digits}"), i)?;
                i += 3;
            }
            '0'..='9' => {
                let number = c.to_digit(10).unwrap_or(0) as u16;
                state.ring_closure(number, c.to_string(), i)?;
                i += 1;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .map(|offset| i + offset)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..end].iter().collect();
                let atom = parse_bracket_atom(&content)
                    .ok_or_else(|| SmilesError::InvalidBracketAtom(content.clone(), i))?;
                state.add_atom(atom)?;
                i = end + 1;
            }
            '.' => {
                // Disconnected fragment
                if let Some((_, symbol, position)) = state.pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, position));
                }
                state.current_atom = None;
                i += 1;
            }
            c if c.is_ascii_uppercase() => {
                // Prefer the two letter organic symbols (Cl, Br)
                let two: String = chars.iter().skip(i).take(2).collect();
                let (element, width) = match Element::from_organic_subset(&two) {
                    Some(element) if two.len() == 2 => (element, 2),
                    _ => {
                        let one = c.to_string();
                        let element = Element::from_organic_subset(&one).ok_or_else(|| {
                            SmilesError::UnknownElement(unknown_symbol(&chars, i), i)
                        })?;
                        (element, 1)
                    }
                };
                state.add_atom(Atom::new(element))?;
                i += width;
            }
            c if c.is_ascii_lowercase() => {
                let element = Element::from_aromatic_symbol(&c.to_string())
                    .filter(|e| {
                        matches!(
                            e,
                            Element::B | Element::C | Element::N | Element::O | Element::P | Element::S
                        )
                    })
                    .ok_or_else(|| SmilesError::UnknownElement(c.to_string(), i))?;
                state.add_atom(Atom::aromatic(element))?;
                i += 1;
            }
            _ => return Err(SmilesError::UnexpectedCharacter(c, i)),
        }
    }

    if let Some((_, symbol, position)) = state.pending_bond {
        return Err(SmilesError::DanglingBond(symbol, position));
    }
    if let Some(&(_, position)) = state.branch_stack.first() {
        return Err(SmilesError::UnclosedBranch(position));
    }
    if let Some((number, open)) = state.ring_map.iter().min_by_key(|(_, open)| open.position) {
        let label = if *number >= 10 {
            format!("%{number}")
        } else {
            number.to_string()
        };
        return Err(SmilesError::UnclosedRing(label, open.position));
    }
    if state.graph.node_count() == 0 {
        return Err(SmilesError::Empty);
    }

    Ok(state.graph)
}

/// The letters making up an unrecognised symbol, for error messages.
fn unknown_symbol(chars: &[char], i: usize) -> String {
    let mut symbol = chars[i].to_string();
    if let Some(next) = chars.get(i + 1).filter(|c| c.is_ascii_lowercase()) {
        symbol.push(*next);
    }
    symbol
}

/// Rejects graphs that no depiction could make sense of.
fn validate(graph: &MoleculeGraph) -> Result<(), SmilesError> {
    let ring_atoms: BTreeSet<NodeIndex> = find_rings(graph)
        .into_iter()
        .flat_map(|ring| ring.atoms)
        .collect();

    for node in graph.node_indices() {
        let atom = &graph[node];
        if atom.aromatic {
            if !ring_atoms.contains(&node) {
                return Err(SmilesError::AromaticOutsideRing {
                    symbol: atom.element.symbol().to_lowercase(),
                    index: node.index(),
                });
            }
            continue;
        }
        let Some(max) = atom.element.max_valence() else {
            continue;
        };
        let max = max as i32;
        let charge = atom.charge as i32;
        let allowed = match atom.element {
            Element::C | Element::Si | Element::Ge => max - charge.abs(),
            Element::B => max - charge,
            _ => max + charge,
        }
        .max(0) as u32;
        let valence = explicit_valence(graph, node);
        if valence > allowed {
            return Err(SmilesError::Valence {
                symbol: atom.element.symbol().to_string(),
                index: node.index(),
                valence,
                allowed,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::visit::EdgeRef;
    use Element::*;

    fn elements(graph: &MoleculeGraph) -> Vec<Element> {
        graph.node_indices().map(|n| graph[n].element).collect()
    }

    fn bond_between(graph: &MoleculeGraph, a: usize, b: usize) -> Option<Bond> {
        graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| graph[e])
    }

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 3);
        assert_eq!(elements(&molecule), vec![C, C, O]);

        let edges: Vec<_> = molecule.edge_references().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(bond_between(&molecule, 0, 1), Some(Bond::Single));
        assert_eq!(bond_between(&molecule, 1, 2), Some(Bond::Single));
    }

    #[test]
    fn test_parse_cyclohexane() {
        let molecule = parse_smiles("C1CCCCC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 6);
        assert_eq!(molecule.edge_count(), 6);
        for node in molecule.node_indices() {
            assert_eq!(molecule.edges(node).count(), 2);
        }
    }

    #[test]
    fn test_parse_benzene() {
        let molecule = parse_smiles("c1ccccc1").expect("Failed to parse SMILES");
        assert_eq!(molecule.edge_count(), 6);
        for node in molecule.node_indices() {
            assert!(molecule[node].aromatic);
            assert_eq!(molecule[node].element, C);
        }
        for edge in molecule.edge_references() {
            assert_eq!(*edge.weight(), Bond::Aromatic);
        }
    }

    #[test]
    fn test_parse_isobutane() {
        let molecule = parse_smiles("CC(C)C").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 4);
        assert_eq!(molecule.edges(NodeIndex::new(1)).count(), 3);
    }

    #[test]
    fn test_parse_chloroethane() {
        let molecule = parse_smiles("CCCl").expect("Failed to parse SMILES");
        assert_eq!(elements(&molecule), vec![C, C, Cl]);
        let molecule = parse_smiles("BrCCBr").expect("Failed to parse SMILES");
        assert_eq!(elements(&molecule), vec![Br, C, C, Br]);
    }

    #[test]
    fn test_bond_symbols() {
        let molecule = parse_smiles("C=CC#N").expect("Failed to parse SMILES");
        assert_eq!(bond_between(&molecule, 0, 1), Some(Bond::Double));
        assert_eq!(bond_between(&molecule, 1, 2), Some(Bond::Single));
        assert_eq!(bond_between(&molecule, 2, 3), Some(Bond::Triple));
    }

    #[test]
    fn test_stereo_markers_are_single_bonds() {
        let molecule = parse_smiles("F/C=C/F").expect("Failed to parse SMILES");
        assert_eq!(bond_between(&molecule, 0, 1), Some(Bond::Single));
        assert_eq!(bond_between(&molecule, 1, 2), Some(Bond::Double));
        assert_eq!(bond_between(&molecule, 2, 3), Some(Bond::Single));
    }

    #[test]
    fn test_ring_closure_bond_on_either_end() {
        let molecule = parse_smiles("C=1CCCCC1").expect("Failed to parse SMILES");
        assert_eq!(bond_between(&molecule, 0, 5), Some(Bond::Double));
        let molecule = parse_smiles("C1CCCCC=1").expect("Failed to parse SMILES");
        assert_eq!(bond_between(&molecule, 0, 5), Some(Bond::Double));
    }

    #[test]
    fn test_percent_ring_labels() {
        let molecule = parse_smiles("C%10CCCC%10").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 5);
        assert_eq!(molecule.edge_count(), 5);
    }

    #[test]
    fn test_reused_ring_label() {
        // both rings of biphenyl-like dicyclohexyl reuse label 1
        let molecule = parse_smiles("C1CCCCC1C1CCCCC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 12);
        assert_eq!(molecule.edge_count(), 13);
    }

    #[test]
    fn test_bracket_atoms() {
        let molecule = parse_smiles("[NH4+].[Cl-]").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 2);
        assert_eq!(molecule.edge_count(), 0);
        assert_eq!(molecule[NodeIndex::new(0)].charge, 1);
        assert_eq!(molecule[NodeIndex::new(1)].charge, -1);
    }

    #[test]
    fn test_pyrrole_with_bracket_nh() {
        let molecule = parse_smiles("c1cc[nH]c1").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 5);
        assert_eq!(bond_between(&molecule, 2, 3), Some(Bond::Aromatic));
        assert_eq!(molecule[NodeIndex::new(3)].hydrogens, Some(1));
    }

    #[test]
    fn test_ciprofloxacin() {
        let smiles = "C1CNCCN1c(c2)c(F)cc3c2N(C4CC4)C=C(C3=O)C(=O)O";
        let molecule = parse_smiles(smiles).expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 24);
    }

    #[test]
    fn test_strychnine() {
        let smiles = "O=C7N2c1ccccc1[C@@]64[C@@H]2[C@@H]3[C@@H](OC/C=C5\\[C@@H]3C[C@@H]6N(CC4)C5)C7";
        let molecule = parse_smiles(smiles).expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 25);
    }

    #[test]
    fn test_errors_are_descriptive() {
        assert_eq!(parse_smiles(""), Err(SmilesError::Empty));
        assert_eq!(parse_smiles("(C)"), Err(SmilesError::BranchNoCurrentAtom(0)));
        assert_eq!(parse_smiles("CC)"), Err(SmilesError::BranchEndNoStart(2)));
        assert_eq!(parse_smiles("CC(C"), Err(SmilesError::UnclosedBranch(2)));
        assert_eq!(parse_smiles("C()C"), Err(SmilesError::EmptyBranch(1)));
        assert_eq!(
            parse_smiles("C1CC"),
            Err(SmilesError::UnclosedRing("1".to_string(), 1))
        );
        assert_eq!(
            parse_smiles("C11"),
            Err(SmilesError::RingClosureSelfBond("1".to_string(), 2))
        );
        assert_eq!(
            parse_smiles("C12CC12"),
            Err(SmilesError::DuplicateBond("2".to_string(), 6))
        );
        assert_eq!(
            parse_smiles("C=1CCCC#1"),
            Err(SmilesError::RingBondConflict("1".to_string(), 8))
        );
        assert_eq!(parse_smiles("C%1"), Err(SmilesError::IncompleteRingLabel(1)));
        assert_eq!(parse_smiles("C[NH4"), Err(SmilesError::UnclosedBracket(1)));
        assert_eq!(
            parse_smiles("C[Xx]"),
            Err(SmilesError::InvalidBracketAtom("Xx".to_string(), 1))
        );
        let charged = format!("C{}", "-".repeat(128));
        assert_eq!(
            parse_smiles(&format!("[{charged}]")),
            Err(SmilesError::InvalidBracketAtom(charged, 0))
        );
        assert!(matches!(
            parse_smiles(&format!("[C{}]", "+".repeat(130))),
            Err(SmilesError::InvalidBracketAtom(..))
        ));
        assert_eq!(
            parse_smiles("CXC"),
            Err(SmilesError::UnknownElement("X".to_string(), 1))
        );
        assert_eq!(parse_smiles("CC="), Err(SmilesError::DanglingBond('=', 2)));
        assert_eq!(parse_smiles("=CC"), Err(SmilesError::DanglingBond('=', 0)));
        assert_eq!(parse_smiles("C==C"), Err(SmilesError::UnexpectedCharacter('=', 2)));
        assert_eq!(parse_smiles("C C"), Err(SmilesError::UnexpectedCharacter(' ', 1)));
    }

    #[test]
    fn test_aromatic_atom_outside_ring() {
        assert_eq!(
            parse_smiles("Ccc"),
            Err(SmilesError::AromaticOutsideRing {
                symbol: "c".to_string(),
                index: 1
            })
        );
    }

    #[test]
    fn test_pentavalent_carbon_is_rejected() {
        let err = parse_smiles("CC(C)(C)(C)C").unwrap_err();
        assert!(matches!(err, SmilesError::Valence { valence: 5, allowed: 4, .. }));
        assert!(err.to_string().contains("exceeds the permitted 4"));
    }

    #[test]
    fn test_charged_atoms_extend_valence() {
        assert!(parse_smiles("C[N+](C)(C)C").is_ok());
        assert!(parse_smiles("C[N](C)(C)(C)(C)C").is_err());
        assert!(parse_smiles("[O-]C=O").is_ok());
    }
}
