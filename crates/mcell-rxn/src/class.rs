use mcell_core::{Rate, RxnRuleId};

/// One applicable rule within a [`RxnClass`], with its match multiplicity
/// and resulting propensity (spec.md §4.3.1: `rate * multiplicity`).
#[derive(Debug, Clone)]
pub struct Pathway {
    pub rule_id: RxnRuleId,
    pub multiplicity: usize,
    pub propensity: Rate,
}

/// The set of reaction pathways available to one reactant (unimolecular)
/// or reactant pair (bimolecular), built lazily and cached by
/// [`crate::container::RxnContainer`] (spec.md §4.3.1-§4.3.2).
#[derive(Debug, Clone, Default)]
pub struct RxnClass {
    pub pathways: Vec<Pathway>,
    pub total_propensity: Rate,
}

impl RxnClass {
    pub fn from_pathways(pathways: Vec<Pathway>) -> Self {
        let total_propensity = pathways.iter().map(|p| p.propensity).sum();
        Self {
            pathways,
            total_propensity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }

    /// Pick the pathway whose cumulative propensity interval contains
    /// `u * total_propensity`, for `u` drawn uniformly from `[0, 1)`
    /// (spec.md §4.3.1's "choose among co-applicable rules" step). `None`
    /// when the class has no pathways.
    pub fn pick(&self, u: f64) -> Option<&Pathway> {
        if self.pathways.is_empty() || self.total_propensity <= 0.0 {
            return None;
        }
        let target = u * self.total_propensity;
        let mut acc = 0.0;
        for p in &self.pathways {
            acc += p.propensity;
            if target < acc {
                return Some(p);
            }
        }
        self.pathways.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcell_core::RxnRuleId;

    fn class() -> RxnClass {
        RxnClass::from_pathways(vec![
            Pathway {
                rule_id: RxnRuleId(0),
                multiplicity: 1,
                propensity: 1.0,
            },
            Pathway {
                rule_id: RxnRuleId(1),
                multiplicity: 2,
                propensity: 3.0,
            },
        ])
    }

    #[test]
    fn pick_respects_cumulative_propensity() {
        let c = class();
        assert_eq!(c.pick(0.0).unwrap().rule_id, RxnRuleId(0));
        assert_eq!(c.pick(0.99).unwrap().rule_id, RxnRuleId(1));
    }

    #[test]
    fn empty_class_never_picks() {
        let c = RxnClass::default();
        assert!(c.pick(0.5).is_none());
    }
}
