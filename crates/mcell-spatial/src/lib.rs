//! # mcell-spatial
//!
//! Coarse partition and N×N×N sub-partition grid for molecule residency
//! and wall indexing (spec.md §4.4 — component C4).

pub mod partition;

pub use partition::{CellIndex, Partition};
