//! Complex-pattern mini-grammar (spec.md §4.2.2): the textual notation
//! shared by fully-qualified species definitions (e.g.
//! `A(b!1).B(a!1,c~X!2).C(b!2)`) and reaction-rule patterns, which may
//! additionally omit components, leave a state unset, or mark a bond
//! `!?` ("bound to something, don't care what").
//!
//! Grounded on this workspace's existing `pest`/`pest_derive` usage in
//! `genesis-rs`'s SLI parser: an inline grammar on a unit parser struct,
//! walked with `Pairs` rather than a hand-rolled character scanner.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use mcell_core::{McellError, Result};

#[derive(Parser)]
#[grammar_inline = r#"
WHITESPACE = _{ " " | "\t" }
ident      = @{ (ASCII_ALPHANUMERIC | "_")+ }
state      = @{ "~" ~ ident }
bond_num   = @{ ASCII_DIGIT+ }
bond       =  { "!" ~ (bond_num | "?") }
component  =  { ident ~ state? ~ bond? }
comp_list  =  { component ~ ("," ~ component)* }
molecule   =  { ident ~ ("(" ~ comp_list? ~ ")")? }
complex    =  { SOI ~ molecule ~ ("." ~ molecule)* ~ EOI }
"#]
struct ComplexParser;

/// A bond constraint on one pattern component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BondConstraint {
    /// Component mentioned without a `!` suffix: must be unbound.
    Unbound,
    /// `!?`: must be bound, to anything.
    Any,
    /// `!<n>`: bound to whichever other component in this same pattern
    /// carries the same local bond number `n`.
    Id(u32),
}

/// One component mentioned in a pattern. Components of a molecule type
/// that are *not* mentioned are wildcards and have no representation
/// here at all (spec.md §4.2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternComponent {
    pub comp_type: String,
    pub state: Option<String>,
    pub bond: BondConstraint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMolecule {
    pub mol_type: String,
    pub components: Vec<PatternComponent>,
}

/// A parsed complex pattern: an ordered list of molecules (order is not
/// semantically meaningful for matching, only for display) connected by
/// local bond ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub molecules: Vec<PatternMolecule>,
}

impl Pattern {
    /// True if every bond constraint is a concrete id and every local id
    /// appears on exactly two components: the form required of a fully
    /// qualified species definition (spec.md §3).
    pub fn is_fully_resolved(&self) -> bool {
        use std::collections::HashMap;
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for m in &self.molecules {
            for c in &m.components {
                match c.bond {
                    BondConstraint::Unbound => {}
                    BondConstraint::Any => return false,
                    BondConstraint::Id(n) => *counts.entry(n).or_insert(0) += 1,
                }
            }
        }
        counts.values().all(|&n| n == 2)
    }
}

pub fn parse_pattern(input: &str) -> Result<Pattern> {
    let mut pairs = ComplexParser::parse(Rule::complex, input.trim())
        .map_err(|e| McellError::Value(format!("malformed complex pattern '{input}': {e}")))?;
    let complex_pair = pairs.next().expect("complex rule always produces one pair");

    let mut molecules = Vec::new();
    for pair in complex_pair.into_inner() {
        if pair.as_rule() == Rule::molecule {
            molecules.push(parse_molecule(pair)?);
        }
    }
    if molecules.is_empty() {
        return Err(McellError::Value(format!(
            "pattern '{input}' contains no molecules"
        )));
    }
    Ok(Pattern { molecules })
}

fn parse_molecule(pair: Pair<Rule>) -> Result<PatternMolecule> {
    let mut inner = pair.into_inner();
    let mol_type = inner.next().expect("molecule always starts with ident").as_str().to_string();
    let mut components = Vec::new();
    if let Some(list) = inner.next() {
        if list.as_rule() == Rule::comp_list {
            for comp_pair in list.into_inner() {
                components.push(parse_component(comp_pair)?);
            }
        }
    }
    Ok(PatternMolecule {
        mol_type,
        components,
    })
}

fn parse_component(pair: Pair<Rule>) -> Result<PatternComponent> {
    let mut inner = pair.into_inner();
    let comp_type = inner.next().expect("component always starts with ident").as_str().to_string();
    let mut state = None;
    let mut bond = BondConstraint::Unbound;
    for p in inner {
        match p.as_rule() {
            Rule::state => {
                // strip the leading "~"
                state = Some(p.as_str()[1..].to_string());
            }
            Rule::bond => {
                let text = p.as_str();
                bond = if text == "!?" {
                    BondConstraint::Any
                } else {
                    let n: u32 = text[1..].parse().map_err(|_| {
                        McellError::Value(format!("malformed bond number in '{text}'"))
                    })?;
                    BondConstraint::Id(n)
                };
            }
            _ => {}
        }
    }
    Ok(PatternComponent {
        comp_type,
        state,
        bond,
    })
}

/// Build a [`crate::graph::ComplexGraph`] from a fully-resolved pattern
/// (used to parse a species definition string, and by `matches_fully` to
/// compare a pattern against a concrete complex). Rejects patterns
/// carrying a wildcard (`!?`) bond, since those cannot denote a single
/// concrete complex.
pub fn pattern_to_complex_graph(p: &Pattern) -> Result<crate::graph::ComplexGraph> {
    use std::collections::HashMap;

    use crate::graph::ComplexBuilder;

    let mut builder = ComplexBuilder::new();
    let mut bond_first: HashMap<u32, crate::graph::ComponentHandle> = HashMap::new();
    let mut pending_bonds = Vec::new();

    for m in &p.molecules {
        let mh = builder.add_molecule(m.mol_type.clone());
        for c in &m.components {
            let ch = builder.add_component(mh, c.comp_type.clone(), c.state.clone());
            match c.bond {
                BondConstraint::Unbound => {}
                BondConstraint::Any => {
                    return Err(McellError::Semantic(format!(
                        "complex '{}' has a wildcard bond, which cannot describe a concrete species",
                        m.mol_type
                    )));
                }
                BondConstraint::Id(n) => {
                    if let Some(&other) = bond_first.get(&n) {
                        pending_bonds.push((other, ch, n));
                    } else {
                        bond_first.insert(n, ch);
                    }
                }
            }
        }
    }
    for (a, b, n) in pending_bonds {
        builder.bond(a, b, n);
    }
    let cplx = builder.finish(mcell_core::Orientation::None);
    cplx.check_bond_invariant()?;
    Ok(cplx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fully_resolved_linear_complex() {
        let p = parse_pattern("A(b!1).B(a!1,c~X!2).C(b!2)").unwrap();
        assert_eq!(p.molecules.len(), 3);
        assert!(p.is_fully_resolved());
        assert_eq!(p.molecules[1].components[1].state.as_deref(), Some("X"));
    }

    #[test]
    fn pattern_with_wildcard_bond_is_not_fully_resolved() {
        let p = parse_pattern("A(b!?)").unwrap();
        assert!(!p.is_fully_resolved());
        assert_eq!(p.molecules[0].components[0].bond, BondConstraint::Any);
    }

    #[test]
    fn pattern_may_omit_components() {
        let p = parse_pattern("A()").unwrap();
        assert_eq!(p.molecules[0].components.len(), 0);
        let p2 = parse_pattern("A").unwrap();
        assert_eq!(p2.molecules[0].components.len(), 0);
    }

    #[test]
    fn malformed_pattern_is_a_value_error() {
        let err = parse_pattern("A(b!!1)").unwrap_err();
        assert!(matches!(err, McellError::Value(_)));
    }

    #[test]
    fn fully_resolved_pattern_builds_a_complex_graph() {
        let p = parse_pattern("A(b!1).B(a!1,c~X!2).C(b!2)").unwrap();
        let cplx = pattern_to_complex_graph(&p).unwrap();
        assert_eq!(cplx.molecules.len(), 3);
        assert_eq!(crate::canon::canonical_string(&cplx), "A(b!1).B(a!1,c~X!2).C(b!2)");
    }

    #[test]
    fn wildcard_bond_cannot_build_a_complex_graph() {
        let p = parse_pattern("A(b!?)").unwrap();
        assert!(pattern_to_complex_graph(&p).is_err());
    }
}
