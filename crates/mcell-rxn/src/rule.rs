use mcell_core::{McellError, Orientation, Rate, Result, RxnRuleId};
use mcell_species::Pattern;

/// A single reaction rule: one or two reactant patterns, a rate constant
/// and the products to create when it fires (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct ReactionRule {
    pub id: RxnRuleId,
    pub name: String,
    pub reactants: Vec<Pattern>,
    pub reactant_orientations: Vec<Orientation>,
    pub products: Vec<Pattern>,
    pub rate: Rate,
}

impl ReactionRule {
    pub fn is_unimolecular(&self) -> bool {
        self.reactants.len() == 1
    }

    pub fn is_bimolecular(&self) -> bool {
        self.reactants.len() == 2
    }
}

/// Collection of reaction rules, assigning each a stable [`RxnRuleId`] on
/// insertion (spec.md §4.3's `RxnRuleVector`).
#[derive(Debug, Default)]
pub struct RxnRuleVector {
    rules: Vec<ReactionRule>,
}

impl RxnRuleVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, validating its reactant arity (every rule is uni- or
    /// bimolecular; spec.md §4.3's arity invariant).
    pub fn add(
        &mut self,
        name: impl Into<String>,
        reactants: Vec<Pattern>,
        products: Vec<Pattern>,
        rate: Rate,
    ) -> Result<RxnRuleId> {
        if reactants.is_empty() || reactants.len() > 2 {
            return Err(McellError::Value(format!(
                "reaction rule '{}' has {} reactants, expected 1 or 2",
                name.into(),
                reactants.len()
            )));
        }
        if rate < 0.0 {
            return Err(McellError::Value("reaction rate must be non-negative".to_string()));
        }
        let id = RxnRuleId(self.rules.len() as u32);
        let orientation_count = reactants.len();
        self.rules.push(ReactionRule {
            id,
            name: name.into(),
            reactants,
            reactant_orientations: vec![Orientation::None; orientation_count],
            products,
            rate,
        });
        Ok(id)
    }

    pub fn get(&self, id: RxnRuleId) -> &ReactionRule {
        &self.rules[id.0 as usize]
    }

    pub fn unimolecular(&self) -> impl Iterator<Item = &ReactionRule> {
        self.rules.iter().filter(|r| r.is_unimolecular())
    }

    pub fn bimolecular(&self) -> impl Iterator<Item = &ReactionRule> {
        self.rules.iter().filter(|r| r.is_bimolecular())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcell_species::parse_pattern;

    #[test]
    fn rejects_rule_with_three_reactants() {
        let mut rules = RxnRuleVector::new();
        let p = parse_pattern("A").unwrap();
        let err = rules
            .add("bad", vec![p.clone(), p.clone(), p], vec![], 1.0)
            .unwrap_err();
        assert!(matches!(err, McellError::Value(_)));
    }

    #[test]
    fn accepts_unimolecular_and_bimolecular_rules() {
        let mut rules = RxnRuleVector::new();
        let a = parse_pattern("A").unwrap();
        let b = parse_pattern("B").unwrap();
        rules.add("decay", vec![a.clone()], vec![], 1.0).unwrap();
        rules
            .add("bind", vec![a, b], vec![], 1e6)
            .unwrap();
        assert_eq!(rules.unimolecular().count(), 1);
        assert_eq!(rules.bimolecular().count(), 1);
    }
}
