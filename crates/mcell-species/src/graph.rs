use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// A node of a complex graph: either an elementary-molecule node or a
/// component node (spec.md §3's "Complex graph").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLabel {
    Molecule {
        mol_type: String,
    },
    Component {
        comp_type: String,
        /// `None` means the state is unset (a wildcard in a pattern, or
        /// simply absent for a stateless component type).
        state: Option<String>,
    },
}

impl NodeLabel {
    /// The colouring used to seed canonicalization (spec.md §4.2.1 step 1):
    /// `"M:<mol-type-name>"` for molecules, `"C:<comp-type-name>[~state]"`
    /// for components.
    pub fn color(&self) -> String {
        match self {
            NodeLabel::Molecule { mol_type } => format!("M:{mol_type}"),
            NodeLabel::Component {
                comp_type,
                state: Some(s),
            } => format!("C:{comp_type}~{s}"),
            NodeLabel::Component {
                comp_type,
                state: None,
            } => format!("C:{comp_type}"),
        }
    }
}

/// Graph edges: either a component's link to its owning molecule, or a
/// bond between two components. `Bond` carries the *raw* bond number as
/// it appeared when the graph was built; canonicalization renumbers
/// bonds by first appearance and does not reuse this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLabel {
    Parent,
    Bond(u32),
}

pub type Graph = UnGraph<NodeLabel, EdgeLabel>;

/// An undirected labelled multigraph representing one connected complex
/// (spec.md §3). Bond numbers in `graph` are whatever the builder was
/// given; `mcell_species::canon` is responsible for producing a
/// deterministic renumbering.
#[derive(Debug, Clone)]
pub struct ComplexGraph {
    pub graph: Graph,
    /// Molecule node indices, in construction order.
    pub molecules: Vec<NodeIndex>,
    /// `components[i]` holds the component node indices belonging to
    /// `molecules[i]`, in construction order.
    pub components: Vec<Vec<NodeIndex>>,
    pub orientation: mcell_core::Orientation,
}

impl ComplexGraph {
    /// Every numeric bond id must appear on exactly two component nodes
    /// (spec.md §3's bond invariant).
    pub fn check_bond_invariant(&self) -> mcell_core::Result<()> {
        use std::collections::HashMap;
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for e in self.graph.edge_references() {
            if let EdgeLabel::Bond(n) = e.weight() {
                *counts.entry(*n).or_insert(0) += 1;
            }
        }
        for (bond, count) in counts {
            if count != 2 {
                return Err(mcell_core::McellError::Internal(format!(
                    "bond {bond} appears on {count} components, expected exactly 2"
                )));
            }
        }
        Ok(())
    }

    pub fn is_single_molecule_no_components(&self) -> bool {
        self.molecules.len() == 1 && self.components.first().map_or(true, |c| c.is_empty())
    }
}

/// Incrementally builds a [`ComplexGraph`] (used by both the pattern
/// parser and any code constructing complexes programmatically, e.g.
/// reaction products).
#[derive(Debug, Default)]
pub struct ComplexBuilder {
    graph: Graph,
    molecules: Vec<NodeIndex>,
    components: Vec<Vec<NodeIndex>>,
}

/// Handle to a molecule added via [`ComplexBuilder::add_molecule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoleculeHandle(pub usize);

/// Handle to a component added via [`ComplexBuilder::add_component`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentHandle(pub NodeIndex);

impl ComplexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_molecule(&mut self, mol_type: impl Into<String>) -> MoleculeHandle {
        let idx = self.graph.add_node(NodeLabel::Molecule {
            mol_type: mol_type.into(),
        });
        self.molecules.push(idx);
        self.components.push(Vec::new());
        MoleculeHandle(self.molecules.len() - 1)
    }

    pub fn add_component(
        &mut self,
        mol: MoleculeHandle,
        comp_type: impl Into<String>,
        state: Option<String>,
    ) -> ComponentHandle {
        let comp_idx = self.graph.add_node(NodeLabel::Component {
            comp_type: comp_type.into(),
            state,
        });
        let mol_idx = self.molecules[mol.0];
        self.graph.add_edge(mol_idx, comp_idx, EdgeLabel::Parent);
        self.components[mol.0].push(comp_idx);
        ComponentHandle(comp_idx)
    }

    pub fn bond(&mut self, a: ComponentHandle, b: ComponentHandle, raw_bond_number: u32) {
        self.graph
            .add_edge(a.0, b.0, EdgeLabel::Bond(raw_bond_number));
    }

    pub fn finish(self, orientation: mcell_core::Orientation) -> ComplexGraph {
        ComplexGraph {
            graph: self.graph,
            molecules: self.molecules,
            components: self.components,
            orientation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_invariant_catches_dangling_bond() {
        let mut b = ComplexBuilder::new();
        let m1 = b.add_molecule("A");
        let c1 = b.add_component(m1, "b", None);
        let m2 = b.add_molecule("B");
        let _c2 = b.add_component(m2, "a", None);
        // c1 has no matching partner for bond 1.
        b.graph.add_edge(c1.0, c1.0, EdgeLabel::Bond(1));
        let cplx = b.finish(mcell_core::Orientation::None);
        assert!(cplx.check_bond_invariant().is_err());
    }

    #[test]
    fn bond_invariant_passes_for_matched_pair() {
        let mut b = ComplexBuilder::new();
        let m1 = b.add_molecule("A");
        let c1 = b.add_component(m1, "b", None);
        let m2 = b.add_molecule("B");
        let c2 = b.add_component(m2, "a", None);
        b.bond(c1, c2, 1);
        let cplx = b.finish(mcell_core::Orientation::None);
        assert!(cplx.check_bond_invariant().is_ok());
    }
}
