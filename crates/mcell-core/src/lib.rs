//! # mcell-core
//!
//! Shared numeric primitives, error type and PRNG plumbing for the mcell
//! simulation core.
//!
//! ## Design Philosophy
//!
//! 1. Preserve the numerical model of the original MCell engine (space/time
//!    step derivation, partitioning constants, scheduler recursion bound).
//! 2. Typed errors instead of process aborts for anything user-facing.
//! 3. A single seeded PRNG stream per simulation so identical seeds
//!    reproduce identical runs.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod constants;

/// Simulation time, in seconds.
pub type Time = f64;
/// Length, in simulation length units (see [`constants::DEFAULT_LENGTH_UNIT`]).
pub type Length = f64;
/// A reaction rate constant (units depend on the reaction's order).
pub type Rate = f64;

/// A point or displacement in simulation space.
///
/// Grounded on `gokay-avci-PolySURF`'s use of `nalgebra` for 3D molecular
/// geometry: the original engine's own `Vec3` (src4/defines.h) is just a
/// dense 3-vector with dot/cross/normalize, which is exactly what
/// `nalgebra::Vector3` already provides idiomatically.
pub type Vec3 = nalgebra::Vector3<f64>;

/// Errors surfaced by the simulation core, ordered by ascending severity.
///
/// `Value`, `Semantic` and `Runtime` are user-facing: the caller gets a
/// tagged `Result` and the offending event is dropped without corrupting
/// engine state. `Internal` indicates a broken invariant and is never
/// recovered from.
#[derive(Debug, Error)]
pub enum McellError {
    #[error("value error: {0}")]
    Value(String),

    #[error("semantic error: {0}")]
    Semantic(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, McellError>;

/// Normalize `v`, returning the zero vector instead of `NaN` when `v` is
/// (numerically) the zero vector — triangles and displacement vectors in
/// this engine occasionally degenerate and callers should not have to
/// special-case `NaN` propagation at every call site.
pub fn safe_normalize(v: Vec3) -> Vec3 {
    let n = v.norm();
    if n < constants::EPS {
        Vec3::zeros()
    } else {
        v / n
    }
}

/// Molecule identity: unique, never reused across a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoleculeId(pub u32);

impl MoleculeId {
    pub const INVALID: MoleculeId = MoleculeId(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

/// Index of a wall in the geometry store's flat wall array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallIndex(pub u32);

impl WallIndex {
    pub const INVALID: WallIndex = WallIndex(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

/// Index of a vertex in the geometry store's flat vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexIndex(pub u32);

impl VertexIndex {
    pub const INVALID: VertexIndex = VertexIndex(u32::MAX);
}

/// Interned species identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u32);

impl SpeciesId {
    pub const INVALID: SpeciesId = SpeciesId(u32::MAX);
}

/// Interned reaction rule identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RxnRuleId(pub u32);

/// Compartment identity (BNGL `@IN`/`@OUT` and named compartments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompartmentId(pub u32);

impl CompartmentId {
    /// No compartment restriction (non-compartmental model).
    pub const NONE: CompartmentId = CompartmentId(u32::MAX);
}

/// Index of a geometry object (a named collection of walls) in the
/// geometry store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryObjectId(pub u32);

impl GeometryObjectId {
    pub const INVALID: GeometryObjectId = GeometryObjectId(u32::MAX);
}

/// Index of a named region (subset of one object's walls) in the
/// geometry store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

/// Index of a surface class (a bundle of reaction rules attached to a
/// region) in the reaction container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceClassId(pub u32);

/// Whether a species/complex lives in a 3D volume or on a 2D surface.
/// Geometry regions carry this via their `spatial_dimensions`; the species
/// engine consults it only to classify complexes (spec.md §4.2, C2's sole
/// dependency on C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialKind {
    Volume,
    Surface,
}

/// Orientation of a surface (or oriented-pattern) molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Up,
    Down,
    /// No orientation restriction: matches either `Up` or `Down`.
    None,
}

impl Orientation {
    /// True when `self` (a pattern orientation) is satisfied by `actual`
    /// (a molecule's concrete orientation), per spec.md §4.2.2.
    pub fn matches(&self, actual: Orientation, orientation_insensitive: bool) -> bool {
        if orientation_insensitive || matches!(self, Orientation::None) {
            return true;
        }
        match (self, actual) {
            (Orientation::Up, Orientation::Up) => true,
            (Orientation::Down, Orientation::Down) => true,
            _ => false,
        }
    }
}

/// Create the simulation's single PRNG stream from a seed.
///
/// Grounded on the `rand`/`rand_distr` `SmallRng` usage in `hgrecco-rebop`:
/// a small, fast, seedable generator is all a single-threaded stochastic
/// core needs, and a fixed seed must reproduce a run bit-exactly (spec.md
/// §5's ordering guarantee).
pub fn seeded_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_normalize_handles_zero() {
        assert_eq!(safe_normalize(Vec3::zeros()), Vec3::zeros());
    }

    #[test]
    fn vec3_cross_is_orthogonal() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(&b);
        assert!((c.dot(&a)).abs() < 1e-12);
        assert!((c.dot(&b)).abs() < 1e-12);
        assert_eq!(c, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn molecule_id_invalid_round_trips() {
        assert!(!MoleculeId::INVALID.is_valid());
        assert!(MoleculeId(0).is_valid());
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        use rand::Rng;
        let mut a = seeded_rng(7);
        let mut b = seeded_rng(7);
        let xs: Vec<f64> = (0..8).map(|_| a.gen::<f64>()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.gen::<f64>()).collect();
        assert_eq!(xs, ys);
    }
}
