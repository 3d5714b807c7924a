//! Numeric constants carried over from the original engine's `defines.h`,
//! given names instead of being re-derived ad hoc at each call site.

/// General-purpose epsilon for geometric and probability comparisons.
pub const EPS: f64 = 1e-12;

/// sqrt(2), used by the Brownian-motion space-step derivation.
pub const SQRT2: f64 = 1.414_213_562_38;

/// Default number of diffusion events between defragmentation passes.
pub const DEFRAGMENTATION_PERIODICITY: u64 = 500;

/// Maximum recursion depth for the hierarchical scheduler (spec.md §4.5).
pub const SCHEDULER_MAX_LEVELS: u32 = 10;

/// Ring length (slots per wheel level) used when the caller does not
/// specify one explicitly.
pub const SCHEDULER_DEFAULT_RING_LEN: usize = 10;

/// Simulation time unit, τ, in seconds (one internal scheduler tick).
pub const DEFAULT_TIME_UNIT: f64 = 1e-6;

/// Simulation length unit, λ, in microns.
pub const DEFAULT_LENGTH_UNIT: f64 = 1e-4; // 1 micron expressed in cm, MCell convention

/// Default number of sub-partitions per coarse-partition dimension.
pub const DEFAULT_SUBPARTITIONS_PER_DIMENSION: usize = 10;

/// Avogadro's number, for molar-concentration releases (spec.md §6).
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Default bimolecular interaction radius, in simulation length units.
/// The original engine derives this per-reaction from the rate constant
/// (a Collins-Kimball/Erban-Chapman correction); this port uses one
/// fixed radius across all bimolecular reactions instead, documented as
/// a simplification in DESIGN.md.
pub const DEFAULT_INTERACTION_RADIUS: f64 = 1e-3;
