//! # mcell-rxn
//!
//! Reaction rule storage and lazily-built, cached reaction classes
//! (spec.md §4.3 — component C3).

pub mod class;
pub mod container;
pub mod rule;

pub use class::{Pathway, RxnClass};
pub use container::RxnContainer;
pub use rule::{ReactionRule, RxnRuleVector};
