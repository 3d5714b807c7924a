//! # mcell-sim
//!
//! Diffusion/collision step, model ingestion and the simulation driver
//! (spec.md §4.6, §6 — component C6). Ties together `mcell-core`,
//! `mcell-geom`, `mcell-species`, `mcell-rxn`, `mcell-spatial` and
//! `mcell-sched` into a runnable engine: [`Model`] is what a caller
//! hands in, [`Simulation`] is what runs it.

pub mod event;
pub mod model;
pub mod molecule;
pub mod observe;
pub mod simulation;
pub mod step;

pub use event::SimEvent;
pub use model::{
    CountSpec, GeometryObjectSpec, Model, Notifications, ObservablesSpec, ReactionRuleSpec,
    ReleaseQuantity, ReleaseShape, ReleaseSpec, Verbosity,
};
pub use molecule::{Molecule, MoleculeKind, MoleculeStore};
pub use observe::{CountRecorder, TimeSeries};
pub use simulation::Simulation;
