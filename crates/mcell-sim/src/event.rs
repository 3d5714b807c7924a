//! Scheduler payload (spec.md §4.5/§4.6): the four event kinds the
//! hierarchical time wheel dispatches.

use mcell_core::MoleculeId;

#[derive(Debug, Clone, Copy)]
pub enum SimEvent {
    /// Take one diffusion/collision step for this molecule.
    Diffuse(MoleculeId),
    /// This molecule's scheduled unimolecular lifetime has expired; fire
    /// its reaction unless it has since gone defunct (spec.md §4.6's
    /// lazy-cancellation rule).
    UnimolRxn(MoleculeId),
    /// Release the release-spec at this index in the model's release
    /// list.
    Release(usize),
    /// Periodic species-cleanup pass (spec.md §3's "Lifecycles").
    Cleanup,
}
