//! Pattern matching against concrete complex graphs (spec.md §4.2.2):
//! `matches_fully` decides whether a pattern denotes exactly one species,
//! `matches_pattern`/`count_pattern_matches` decide (and count) injective
//! subgraph embeddings of a pattern into a larger complex, for use by
//! reaction-rule applicability and the rate-multiplicity rule.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use mcell_core::Result;

use crate::canon::canonical_string;
use crate::graph::{ComplexGraph, EdgeLabel, NodeLabel};
use crate::pattern::{pattern_to_complex_graph, BondConstraint, Pattern};

/// True if `pattern` is fully resolved and describes exactly `target`:
/// same molecules, same components, same bonds, nothing left unmatched
/// (spec.md §4.2.2's "full-graph" sense of a species identity check).
pub fn matches_fully(pattern: &Pattern, target: &ComplexGraph) -> Result<bool> {
    if !pattern.is_fully_resolved() {
        return Ok(false);
    }
    let built = pattern_to_complex_graph(pattern)?;
    if built.molecules.len() != target.molecules.len() {
        return Ok(false);
    }
    Ok(canonical_string(&built) == canonical_string(target))
}

struct TargetComponent {
    node: NodeIndex,
    comp_type: String,
    state: Option<String>,
    bond_partner: Option<NodeIndex>,
}

struct TargetMolecule {
    node: NodeIndex,
    mol_type: String,
    components: Vec<TargetComponent>,
}

fn collect_target_molecules(target: &ComplexGraph) -> Vec<TargetMolecule> {
    target
        .molecules
        .iter()
        .enumerate()
        .map(|(i, &mn)| {
            let mol_type = match &target.graph[mn] {
                NodeLabel::Molecule { mol_type } => mol_type.clone(),
                NodeLabel::Component { .. } => unreachable!(),
            };
            let components = target.components[i]
                .iter()
                .map(|&cn| {
                    let (comp_type, state) = match &target.graph[cn] {
                        NodeLabel::Component { comp_type, state } => {
                            (comp_type.clone(), state.clone())
                        }
                        NodeLabel::Molecule { .. } => unreachable!(),
                    };
                    let bond_partner = target.graph.edges(cn).find_map(|e| match e.weight() {
                        EdgeLabel::Bond(_) => Some(if e.source() == cn {
                            e.target()
                        } else {
                            e.source()
                        }),
                        EdgeLabel::Parent => None,
                    });
                    TargetComponent {
                        node: cn,
                        comp_type,
                        state,
                        bond_partner,
                    }
                })
                .collect();
            TargetMolecule {
                node: mn,
                mol_type,
                components,
            }
        })
        .collect()
}

/// One (pattern molecule index, component index) flattened in pattern
/// iteration order, used to drive the backtracking search below.
struct FlatComponent<'p> {
    mol_idx: usize,
    mol_type: &'p str,
    comp_type: &'p str,
    state: Option<&'p str>,
    bond: &'p BondConstraint,
}

struct Search<'p> {
    flat: Vec<FlatComponent<'p>>,
    target_mols: Vec<TargetMolecule>,
}

impl<'p> Search<'p> {
    fn run(&self) -> usize {
        let mut pattern_to_target_mol: HashMap<usize, usize> = HashMap::new();
        let mut used_target_mols: HashSet<usize> = HashSet::new();
        let mut used_target_comps: HashSet<NodeIndex> = HashSet::new();
        let mut bond_first_seen: HashMap<u32, NodeIndex> = HashMap::new();
        self.step(
            0,
            &mut pattern_to_target_mol,
            &mut used_target_mols,
            &mut used_target_comps,
            &mut bond_first_seen,
        )
    }

    fn step(
        &self,
        flat_idx: usize,
        pattern_to_target_mol: &mut HashMap<usize, usize>,
        used_target_mols: &mut HashSet<usize>,
        used_target_comps: &mut HashSet<NodeIndex>,
        bond_first_seen: &mut HashMap<u32, NodeIndex>,
    ) -> usize {
        if flat_idx == self.flat.len() {
            return 1;
        }
        let fc = &self.flat[flat_idx];
        let mut total = 0usize;

        let newly_bound_molecule = !pattern_to_target_mol.contains_key(&fc.mol_idx);
        let candidate_mol_indices: Vec<usize> = if let Some(&tm) = pattern_to_target_mol.get(&fc.mol_idx) {
            vec![tm]
        } else {
            (0..self.target_mols.len())
                .filter(|i| !used_target_mols.contains(i) && self.target_mols[*i].mol_type == fc.mol_type)
                .collect()
        };

        for tm_idx in candidate_mol_indices {
            let tm = &self.target_mols[tm_idx];
            for tc in &tm.components {
                if used_target_comps.contains(&tc.node) {
                    continue;
                }
                if tc.comp_type != fc.comp_type {
                    continue;
                }
                if let Some(want_state) = fc.state {
                    if tc.state.as_deref() != Some(want_state) {
                        continue;
                    }
                }
                let bond_ok = match fc.bond {
                    BondConstraint::Unbound => tc.bond_partner.is_none(),
                    BondConstraint::Any => tc.bond_partner.is_some(),
                    BondConstraint::Id(n) => match bond_first_seen.get(n) {
                        None => true, // first occurrence, checked fully once paired
                        Some(&other) => tc.bond_partner == Some(other),
                    },
                };
                if !bond_ok {
                    continue;
                }

                let inserted_molecule = newly_bound_molecule;
                if inserted_molecule {
                    pattern_to_target_mol.insert(fc.mol_idx, tm_idx);
                    used_target_mols.insert(tm_idx);
                }
                used_target_comps.insert(tc.node);
                let inserted_bond = matches!(fc.bond, BondConstraint::Id(n) if !bond_first_seen.contains_key(n));
                if let BondConstraint::Id(n) = fc.bond {
                    bond_first_seen.entry(*n).or_insert(tc.node);
                }

                total += self.step(
                    flat_idx + 1,
                    pattern_to_target_mol,
                    used_target_mols,
                    used_target_comps,
                    bond_first_seen,
                );

                used_target_comps.remove(&tc.node);
                if inserted_bond {
                    if let BondConstraint::Id(n) = fc.bond {
                        bond_first_seen.remove(n);
                    }
                }
                if inserted_molecule {
                    pattern_to_target_mol.remove(&fc.mol_idx);
                    used_target_mols.remove(&tm_idx);
                }
            }
        }
        total
    }
}

/// Number of distinct injective embeddings of `pattern` into `target`
/// (spec.md §4.2.2's multiplicity used by reaction-class construction).
/// Molecule type compatibility is enforced by only ever proposing a
/// target molecule whose type the caller has pre-filtered; see
/// [`count_pattern_matches`] for the entry point that does this filtering.
fn count_pattern_matches_typed(pattern: &Pattern, target: &ComplexGraph) -> usize {
    let target_mols = collect_target_molecules(target);

    let mut flat = Vec::new();
    for (mol_idx, m) in pattern.molecules.iter().enumerate() {
        for c in &m.components {
            flat.push(FlatComponent {
                mol_idx,
                mol_type: m.mol_type.as_str(),
                comp_type: c.comp_type.as_str(),
                state: c.state.as_deref(),
                bond: &c.bond,
            });
        }
    }

    // Narrowing target_mols up front is an optimization only; `Search`
    // itself also checks molecule-type compatibility per component.
    let search = Search {
        flat,
        target_mols: target_mols
            .into_iter()
            .filter(|tm| pattern.molecules.iter().any(|m| m.mol_type == tm.mol_type))
            .collect(),
    };

    if pattern.molecules.iter().any(|m| m.components.is_empty()) {
        // Molecules with no mentioned components never appear in `flat`,
        // so their molecule-type match (and injective molecule-slot
        // consumption) is handled by `count_molecule_only_matches`
        // instead of the component-driven backtracking above.
        return count_molecule_only_matches(pattern, target);
    }

    search.run()
}

/// Slow-path fallback used only when some pattern molecule mentions no
/// components at all (so the component-flattening search above has no
/// slot to place it in): exhaustively assigns molecules by type.
fn count_molecule_only_matches(pattern: &Pattern, target: &ComplexGraph) -> usize {
    let target_mols = collect_target_molecules(target);

    fn rec(
        pattern: &Pattern,
        target_mols: &[TargetMolecule],
        mol_idx: usize,
        used: &mut HashSet<usize>,
        used_comps: &mut HashSet<NodeIndex>,
        bond_first_seen: &mut HashMap<u32, NodeIndex>,
    ) -> usize {
        if mol_idx == pattern.molecules.len() {
            return 1;
        }
        let pm = &pattern.molecules[mol_idx];
        let mut total = 0;
        for (ti, tm) in target_mols.iter().enumerate() {
            if used.contains(&ti) || tm.mol_type != pm.mol_type {
                continue;
            }
            // Try to place this molecule's components against tm.
            total += place_components(
                pattern,
                target_mols,
                mol_idx,
                ti,
                0,
                used,
                used_comps,
                bond_first_seen,
            );
        }
        total
    }

    #[allow(clippy::too_many_arguments)]
    fn place_components(
        pattern: &Pattern,
        target_mols: &[TargetMolecule],
        mol_idx: usize,
        tm_idx: usize,
        comp_idx: usize,
        used: &mut HashSet<usize>,
        used_comps: &mut HashSet<NodeIndex>,
        bond_first_seen: &mut HashMap<u32, NodeIndex>,
    ) -> usize {
        let pm = &pattern.molecules[mol_idx];
        if comp_idx == pm.components.len() {
            used.insert(tm_idx);
            let total = rec(
                pattern,
                target_mols,
                mol_idx + 1,
                used,
                used_comps,
                bond_first_seen,
            );
            used.remove(&tm_idx);
            return total;
        }
        let pc = &pm.components[comp_idx];
        let tm = &target_mols[tm_idx];
        let mut total = 0;
        for tc in &tm.components {
            if used_comps.contains(&tc.node) || tc.comp_type != pc.comp_type {
                continue;
            }
            if let Some(state) = &pc.state {
                if tc.state.as_deref() != Some(state.as_str()) {
                    continue;
                }
            }
            let bond_ok = match &pc.bond {
                BondConstraint::Unbound => tc.bond_partner.is_none(),
                BondConstraint::Any => tc.bond_partner.is_some(),
                BondConstraint::Id(n) => match bond_first_seen.get(n) {
                    None => true,
                    Some(&other) => tc.bond_partner == Some(other),
                },
            };
            if !bond_ok {
                continue;
            }
            used_comps.insert(tc.node);
            let inserted_bond = matches!(&pc.bond, BondConstraint::Id(n) if !bond_first_seen.contains_key(n));
            if let BondConstraint::Id(n) = &pc.bond {
                bond_first_seen.entry(*n).or_insert(tc.node);
            }
            total += place_components(
                pattern,
                target_mols,
                mol_idx,
                tm_idx,
                comp_idx + 1,
                used,
                used_comps,
                bond_first_seen,
            );
            used_comps.remove(&tc.node);
            if inserted_bond {
                if let BondConstraint::Id(n) = &pc.bond {
                    bond_first_seen.remove(n);
                }
            }
        }
        total
    }

    let mut used = HashSet::new();
    let mut used_comps = HashSet::new();
    let mut bond_first_seen = HashMap::new();
    rec(
        pattern,
        &target_mols,
        0,
        &mut used,
        &mut used_comps,
        &mut bond_first_seen,
    )
}

/// Number of distinct injective embeddings of `pattern` into `target`.
pub fn count_pattern_matches(pattern: &Pattern, target: &ComplexGraph) -> usize {
    if pattern.molecules.len() > target.molecules.len() {
        return 0;
    }
    count_pattern_matches_typed(pattern, target)
}

/// Whether `pattern` has at least one injective embedding into `target`.
pub fn matches_pattern(pattern: &Pattern, target: &ComplexGraph) -> bool {
    count_pattern_matches(pattern, target) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ComplexBuilder;
    use crate::pattern::parse_pattern;
    use mcell_core::Orientation;

    fn linear_abc() -> ComplexGraph {
        let mut b = ComplexBuilder::new();
        let ma = b.add_molecule("A");
        let ca_b = b.add_component(ma, "b", None);
        let mb = b.add_molecule("B");
        let cb_a = b.add_component(mb, "a", None);
        let cb_c = b.add_component(mb, "c", Some("X".to_string()));
        let mc = b.add_molecule("C");
        let cc_b = b.add_component(mc, "b", None);
        b.bond(ca_b, cb_a, 1);
        b.bond(cb_c, cc_b, 2);
        b.finish(Orientation::None)
    }

    #[test]
    fn matches_fully_on_identical_complex() {
        let target = linear_abc();
        let pattern = parse_pattern("A(b!1).B(a!1,c~X!2).C(b!2)").unwrap();
        assert!(matches_fully(&pattern, &target).unwrap());
    }

    #[test]
    fn matches_fully_rejects_partial_pattern() {
        let target = linear_abc();
        let pattern = parse_pattern("B(a!1).A(b!1)").unwrap();
        assert!(!matches_fully(&pattern, &target).unwrap());
    }

    #[test]
    fn single_molecule_pattern_matches_as_subgraph() {
        let target = linear_abc();
        let pattern = parse_pattern("B(c~X)").unwrap();
        assert!(matches_pattern(&pattern, &target));
        assert_eq!(count_pattern_matches(&pattern, &target), 1);
    }

    #[test]
    fn unbound_component_pattern_does_not_match_bound_component() {
        let target = linear_abc();
        let pattern = parse_pattern("A(b)").unwrap();
        assert!(!matches_pattern(&pattern, &target));
    }

    #[test]
    fn two_molecule_bonded_pattern_matches_once() {
        let target = linear_abc();
        let pattern = parse_pattern("A(b!1).B(a!1)").unwrap();
        assert_eq!(count_pattern_matches(&pattern, &target), 1);
    }

    #[test]
    fn homodimer_pattern_counts_both_orientations() {
        // A(b!1).A(b!1): two identical A molecules bonded at `b`.
        let mut bld = ComplexBuilder::new();
        let m1 = bld.add_molecule("A");
        let c1 = bld.add_component(m1, "b", None);
        let m2 = bld.add_molecule("A");
        let c2 = bld.add_component(m2, "b", None);
        bld.bond(c1, c2, 1);
        let target = bld.finish(Orientation::None);

        let pattern = parse_pattern("A(b!1).A(b!1)").unwrap();
        // Two ways to map the symmetric pattern onto the symmetric dimer.
        assert_eq!(count_pattern_matches(&pattern, &target), 2);
    }
}
