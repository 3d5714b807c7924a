//! # mcell-species
//!
//! Canonical labelled complex graphs, the BNGL-style complex-pattern
//! mini-grammar, subgraph-isomorphism pattern matching and species
//! interning (spec.md §3, §4.2 — component C2).
//!
//! A complex is a graph of molecule and component nodes (see
//! [`graph::ComplexGraph`]); [`canon::canonicalize`] gives it a unique
//! string identity regardless of how it was built, and [`species`]
//! interns that identity into a [`mcell_core::SpeciesId`]. Reaction
//! rules and observables are expressed against [`pattern::Pattern`]s,
//! matched with [`matching::matches_fully`] and
//! [`matching::matches_pattern`].

pub mod canon;
pub mod graph;
pub mod matching;
pub mod moltype;
pub mod pattern;
pub mod species;

pub use canon::{canonical_string, canonicalize, CanonicalComplex};
pub use graph::{ComplexBuilder, ComplexGraph};
pub use matching::{count_pattern_matches, matches_fully, matches_pattern};
pub use moltype::{ComponentType, MolType, MolTypeRegistry};
pub use pattern::{parse_pattern, pattern_to_complex_graph, Pattern};
pub use species::{derive_kinetics, Species, SpeciesTable};
