//! In-memory model ingestion (spec.md §6): the data a caller hands the
//! core. `Model` is plain `serde`-able data — no text grammar beyond the
//! in-scope complex-pattern mini-grammar (`mcell_species::pattern`) is
//! involved in reading it back from JSON, matching `copasi-rs`/`nest-rs`'s
//! own serde-first model types in this workspace.

use std::collections::HashMap;

use mcell_core::{Length, Orientation, Rate, Time, Vec3};
use mcell_species::MolTypeRegistry;
use serde::{Deserialize, Serialize};

/// One reaction rule as BNGL-style pattern text (spec.md §6's `begin/end
/// reaction rules` block): parsed into [`mcell_rxn::ReactionRule`]s at
/// model load, one entry per direction for a reversible rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRuleSpec {
    pub name: String,
    pub reactants: Vec<String>,
    pub products: Vec<String>,
    pub forward_rate: Rate,
    /// `Some(k)` makes the rule reversible (spec.md §6's `<->` arrow);
    /// loading emits a second, reversed rule at rate `k`.
    pub backward_rate: Option<Rate>,
}

/// A geometry object given as a raw vertex/triangle mesh (spec.md §6's
/// "vertex list, triangle element connections").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryObjectSpec {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

/// The shape a release instantiates molecules over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ReleaseShape {
    Point(Vec3),
    Box { min: Vec3, max: Vec3 },
    Sphere { center: Vec3, radius: Length },
}

/// How many molecules a release creates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ReleaseQuantity {
    Count(u32),
    /// Molar concentration, converted to a count using the release
    /// shape's volume at load time.
    Concentration(f64),
}

/// One initial (or scheduled) release event (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSpec {
    pub species_pattern: String,
    pub shape: ReleaseShape,
    pub quantity: ReleaseQuantity,
    pub orientation: Orientation,
    pub time: Time,
}

/// One count observable: a time series of live-molecule population for
/// molecules matching `species_pattern` (spec.md §6's "counts").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountSpec {
    pub name: String,
    pub species_pattern: String,
    pub every_n_steps: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservablesSpec {
    pub counts: Vec<CountSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notifications {
    pub verbosity: Verbosity,
    pub stats_cadence: u64,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            stats_cadence: 1_000,
        }
    }
}

/// The complete in-memory model the core accepts (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub parameters: HashMap<String, f64>,
    pub mol_types: MolTypeRegistry,
    /// Species declared up front rather than only appearing as reaction
    /// products; pattern text must be fully resolved (spec.md §3).
    pub declared_species: Vec<String>,
    pub reaction_rules: Vec<ReactionRuleSpec>,
    pub geometry_objects: Vec<GeometryObjectSpec>,
    pub releases: Vec<ReleaseSpec>,
    pub observables: ObservablesSpec,
    pub notifications: Notifications,

    /// Simulation time unit tau, in seconds (spec.md §4.2.3).
    pub time_unit: Time,
    /// Simulation length unit lambda, in simulation length units.
    pub length_unit: Length,
    /// Target mean diffusion-step length used to derive per-species time
    /// steps (spec.md §4.2.3).
    pub target_step_length: Length,
    /// Coarse-partition origin and extent.
    pub box_origin: Vec3,
    pub box_extent: Vec3,
    pub subpartitions_per_dimension: usize,
    pub seed: u64,
    /// Fixed bimolecular interaction radius (see
    /// `mcell_core::constants::DEFAULT_INTERACTION_RADIUS`).
    pub interaction_radius: Length,
}

impl Model {
    /// A minimal model with no geometry, species, rules or releases —
    /// a starting point for programmatic construction (as opposed to
    /// deserializing a complete one).
    pub fn empty(box_origin: Vec3, box_extent: Vec3) -> Self {
        Self {
            parameters: HashMap::new(),
            mol_types: MolTypeRegistry::new(),
            declared_species: Vec::new(),
            reaction_rules: Vec::new(),
            geometry_objects: Vec::new(),
            releases: Vec::new(),
            observables: ObservablesSpec::default(),
            notifications: Notifications::default(),
            time_unit: mcell_core::constants::DEFAULT_TIME_UNIT,
            length_unit: mcell_core::constants::DEFAULT_LENGTH_UNIT,
            target_step_length: 1e-7,
            box_origin,
            box_extent,
            subpartitions_per_dimension: mcell_core::constants::DEFAULT_SUBPARTITIONS_PER_DIMENSION,
            seed: 1,
            interaction_radius: mcell_core::constants::DEFAULT_INTERACTION_RADIUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_round_trips_through_json() {
        let model = Model::empty(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let json = serde_json::to_string(&model).expect("serialize");
        let back: Model = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.box_extent, model.box_extent);
        assert_eq!(back.seed, model.seed);
    }
}
