//! Canonical labelling of complex graphs (spec.md §4.2.1).
//!
//! The algorithm is a small from-scratch individualization-refinement
//! procedure in the style of nauty/Traces, scoped to the tiny graphs BNGL
//! complexes actually produce (a handful of molecules, a handful of
//! components each): 1-WL colour refinement to a fixpoint, then
//! exhaustive backtracking over the first non-singleton colour class,
//! keeping whichever branch yields the lexicographically smallest
//! rendered string. No external graph-canonicalization crate exists in
//! this ecosystem, so the procedure is self-contained.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::{ComplexGraph, EdgeLabel, Graph, NodeLabel};

/// One component in canonical position within its molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalComponent {
    pub comp_type: String,
    pub state: Option<String>,
    /// Renumbered bond id (1-based, by first appearance); `None` if the
    /// component is unbound.
    pub bond: Option<u32>,
}

impl CanonicalComponent {
    pub fn to_bngl_string(&self) -> String {
        let mut s = self.comp_type.clone();
        if let Some(state) = &self.state {
            s.push('~');
            s.push_str(state);
        }
        if let Some(bond) = self.bond {
            s.push('!');
            s.push_str(&bond.to_string());
        }
        s
    }
}

/// One molecule in canonical position within the complex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMolecule {
    pub mol_type: String,
    pub components: Vec<CanonicalComponent>,
}

impl CanonicalMolecule {
    pub fn to_bngl_string(&self) -> String {
        let comps = self
            .components
            .iter()
            .map(CanonicalComponent::to_bngl_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.mol_type, comps)
    }
}

/// The canonical form of a whole complex: a molecule list in canonical
/// order, each with its components in canonical order and bonds
/// renumbered by first appearance (spec.md §4.2.1 steps 2-4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalComplex {
    pub molecules: Vec<CanonicalMolecule>,
}

impl CanonicalComplex {
    pub fn to_bngl_string(&self) -> String {
        self.molecules
            .iter()
            .map(CanonicalMolecule::to_bngl_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Canonicalize `cplx` and return both the structured form and its
/// canonical string.
pub fn canonicalize(cplx: &ComplexGraph) -> CanonicalComplex {
    let colors = initial_colors(&cplx.graph);
    let colors = refine(&cplx.graph, colors);
    let (order, _) = best_order(&cplx.graph, cplx, colors);
    build_canonical(&cplx.graph, cplx, &order)
}

/// Convenience wrapper: `canonicalize(cplx).to_bngl_string()`.
pub fn canonical_string(cplx: &ComplexGraph) -> String {
    canonicalize(cplx).to_bngl_string()
}

fn initial_colors(g: &Graph) -> HashMap<NodeIndex, String> {
    g.node_indices().map(|n| (n, g[n].color())).collect()
}

/// 1-WL colour refinement to a fixpoint. Each vertex's new colour folds
/// in the multiset of (edge kind, neighbour colour) pairs, so molecule
/// nodes and component nodes never get confused with each other even
/// though they share one underlying graph.
fn refine(g: &Graph, mut colors: HashMap<NodeIndex, String>) -> HashMap<NodeIndex, String> {
    loop {
        let mut next: HashMap<NodeIndex, String> = HashMap::with_capacity(colors.len());
        for n in g.node_indices() {
            let mut sig: Vec<String> = g
                .edges(n)
                .map(|e| {
                    let other = if e.source() == n {
                        e.target()
                    } else {
                        e.source()
                    };
                    let kind = match e.weight() {
                        EdgeLabel::Parent => "P".to_string(),
                        EdgeLabel::Bond(_) => "B".to_string(),
                    };
                    format!("{kind}:{}", colors[&other])
                })
                .collect();
            sig.sort();
            next.insert(n, format!("{}|[{}]", colors[&n], sig.join(",")));
        }
        if next == colors {
            return colors;
        }
        colors = next;
    }
}

fn group_by_color(colors: &HashMap<NodeIndex, String>) -> Vec<(String, Vec<NodeIndex>)> {
    let mut classes: HashMap<String, Vec<NodeIndex>> = HashMap::new();
    for (&n, c) in colors {
        classes.entry(c.clone()).or_default().push(n);
    }
    for v in classes.values_mut() {
        v.sort_by_key(|n| n.index());
    }
    let mut out: Vec<(String, Vec<NodeIndex>)> = classes.into_iter().collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

/// Exhaustive individualization-refinement: branch on the first
/// non-singleton colour class, trying every vertex in it as the
/// individualized one, and keep the branch whose eventual rendering is
/// lexicographically smallest. Returns the winning total node order
/// together with its rendered key.
fn best_order(
    g: &Graph,
    cplx: &ComplexGraph,
    colors: HashMap<NodeIndex, String>,
) -> (Vec<NodeIndex>, String) {
    let classes = group_by_color(&colors);
    if classes.iter().all(|(_, v)| v.len() == 1) {
        let order: Vec<NodeIndex> = classes.into_iter().map(|(_, v)| v[0]).collect();
        let key = build_canonical(g, cplx, &order).to_bngl_string();
        return (order, key);
    }

    let (_, candidates) = classes
        .into_iter()
        .find(|(_, v)| v.len() > 1)
        .expect("a non-singleton class exists since the discrete check above failed");

    let mut best: Option<(Vec<NodeIndex>, String)> = None;
    for v in candidates {
        let mut branched = colors.clone();
        // Individualize v: tag it uniquely so it sorts before its former
        // classmates, then re-refine from that perturbed colouring.
        let tag = format!("{}\u{0}indiv", branched[&v]);
        branched.insert(v, tag);
        let refined = refine(g, branched);
        let (order, key) = best_order(g, cplx, refined);
        if best.as_ref().map_or(true, |(_, best_key)| key < *best_key) {
            best = Some((order, key));
        }
    }
    best.expect("candidates is non-empty")
}

/// Given a total node order, extract the molecule/component canonical
/// grouping and renumber bonds by first appearance along that order
/// (spec.md §4.2.1 steps 2-4).
fn build_canonical(g: &Graph, cplx: &ComplexGraph, order: &[NodeIndex]) -> CanonicalComplex {
    let rank: HashMap<NodeIndex, usize> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let mut mol_order: Vec<(usize, NodeIndex)> = cplx
        .molecules
        .iter()
        .enumerate()
        .map(|(i, &n)| (i, n))
        .collect();
    mol_order.sort_by_key(|&(_, n)| rank[&n]);

    let mut comps_by_mol: Vec<Vec<NodeIndex>> = Vec::with_capacity(mol_order.len());
    for &(orig_idx, _) in &mol_order {
        let mut comps = cplx.components[orig_idx].clone();
        comps.sort_by_key(|n| rank[n]);
        comps_by_mol.push(comps);
    }

    // Renumber bonds by first appearance, scanning in canonical
    // molecule/component order.
    let mut bond_id_map: HashMap<u32, u32> = HashMap::new();
    let mut next_bond = 1u32;
    for comps in &comps_by_mol {
        for &cn in comps {
            for e in g.edges(cn) {
                if let EdgeLabel::Bond(raw) = e.weight() {
                    bond_id_map.entry(*raw).or_insert_with(|| {
                        let id = next_bond;
                        next_bond += 1;
                        id
                    });
                }
            }
        }
    }

    let mut molecules = Vec::with_capacity(mol_order.len());
    for (i, &(_, mn)) in mol_order.iter().enumerate() {
        let mol_type = match &g[mn] {
            NodeLabel::Molecule { mol_type } => mol_type.clone(),
            NodeLabel::Component { .. } => unreachable!("molecule slot holds a component node"),
        };
        let mut components: Vec<CanonicalComponent> = comps_by_mol[i]
            .iter()
            .map(|&cn| {
                let (comp_type, state) = match &g[cn] {
                    NodeLabel::Component { comp_type, state } => {
                        (comp_type.clone(), state.clone())
                    }
                    NodeLabel::Molecule { .. } => unreachable!("component slot holds a molecule node"),
                };
                let bond = g.edges(cn).find_map(|e| match e.weight() {
                    EdgeLabel::Bond(raw) => Some(bond_id_map[raw]),
                    EdgeLabel::Parent => None,
                });
                CanonicalComponent {
                    comp_type,
                    state,
                    bond,
                }
            })
            .collect();
        // Re-run the component sort (spec.md §4.2.1 step 4): stable, so
        // it only breaks ties within an already-adjacent same-colour run
        // by ascending renumbered bond id.
        components.sort_by(|a, b| {
            (a.comp_type.as_str(), a.state.as_deref())
                .cmp(&(b.comp_type.as_str(), b.state.as_deref()))
                .then(a.bond.unwrap_or(0).cmp(&b.bond.unwrap_or(0)))
        });
        molecules.push(CanonicalMolecule {
            mol_type,
            components,
        });
    }

    CanonicalComplex { molecules }
}
