//! Species interning and diffusion kinetics (spec.md §4.2.3).
//!
//! A [`Species`] is a canonicalized complex graph plus the per-species
//! diffusion parameters the scheduler and diffusion step consume. The
//! [`SpeciesTable`] deduplicates by canonical name, so two structurally
//! isomorphic complexes (built independently, e.g. as two different
//! reaction products) always resolve to the same [`mcell_core::SpeciesId`].

use std::collections::HashMap;

use mcell_core::{Length, SpatialKind, SpeciesId, Time};

use crate::canon::canonical_string;
use crate::graph::ComplexGraph;

#[derive(Debug, Clone)]
pub struct Species {
    pub id: SpeciesId,
    pub canonical_name: String,
    pub graph: ComplexGraph,
    pub diffusion_constant: f64,
    pub time_step: Time,
    pub space_step: Length,
    pub spatial_kind: SpatialKind,
    /// Whether species cleanup may retire this species once its
    /// instantiation count reaches zero (spec.md §3's "Lifecycles"):
    /// false for species the model declares explicitly, true for
    /// species that only ever arose as reaction products.
    pub removable: bool,
    /// Set by [`SpeciesTable::retire`] once cleanup has dropped this
    /// species; its slot and id stay valid (ids are never reused) but
    /// it is no longer considered live.
    pub retired: bool,
}

/// Derive a species' simulation time step and mean per-step displacement
/// from its diffusion constant (spec.md §4.2.3): the characteristic 3D
/// displacement over one base tick is `sigma = sqrt(4 D dt_min) / lambda`;
/// slow diffusers are given a coarser, species-specific time step (an
/// integer multiple of `dt_min`) so their average step still covers
/// roughly `target_step_length`, rather than taking many tiny steps at
/// the simulation's base tick.
pub fn derive_kinetics(
    diffusion_constant: f64,
    dt_min: Time,
    target_step_length: Length,
    length_unit: Length,
) -> (Time, Length) {
    let sigma_base = (4.0 * diffusion_constant * dt_min).sqrt() / length_unit;
    if diffusion_constant <= 0.0 || target_step_length <= 0.0 {
        return (dt_min, sigma_base);
    }
    let multiplier = (sigma_base / target_step_length).ceil().max(1.0);
    let time_step = multiplier * dt_min;
    let space_step = (4.0 * diffusion_constant * time_step).sqrt() / length_unit;
    (time_step, space_step)
}

/// Interning table mapping canonical complex names to [`Species`].
#[derive(Debug, Default)]
pub struct SpeciesTable {
    by_name: HashMap<String, SpeciesId>,
    entries: Vec<Species>,
}

impl SpeciesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `graph`, returning its (possibly pre-existing) species id.
    /// `graph` is moved into the table only the first time its canonical
    /// form is seen. `removable` marks whether species cleanup may ever
    /// retire this species (spec.md §3); re-interning an existing species
    /// with `removable: false` permanently clears the flag, since a
    /// species the model declares explicitly is never eligible for
    /// cleanup even if some earlier caller first produced it as a
    /// reaction product.
    pub fn intern(
        &mut self,
        graph: ComplexGraph,
        diffusion_constant: f64,
        dt_min: Time,
        target_step_length: Length,
        length_unit: Length,
        spatial_kind: SpatialKind,
        removable: bool,
    ) -> SpeciesId {
        let name = canonical_string(&graph);
        if let Some(&id) = self.by_name.get(&name) {
            if !removable {
                self.entries[id.0 as usize].removable = false;
            }
            return id;
        }
        let id = SpeciesId(self.entries.len() as u32);
        let (time_step, space_step) =
            derive_kinetics(diffusion_constant, dt_min, target_step_length, length_unit);
        self.entries.push(Species {
            id,
            canonical_name: name.clone(),
            graph,
            diffusion_constant,
            time_step,
            space_step,
            spatial_kind,
            removable,
            retired: false,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Intern `graph` using an explicit time/space step rather than
    /// deriving one from a diffusion constant — for molecule types that
    /// declare a custom time or space step (spec.md §6's model ingestion
    /// fields), which overrides `derive_kinetics` entirely rather than
    /// feeding into it.
    pub fn intern_with_explicit_steps(
        &mut self,
        graph: ComplexGraph,
        diffusion_constant: f64,
        time_step: Time,
        space_step: Length,
        spatial_kind: SpatialKind,
        removable: bool,
    ) -> SpeciesId {
        let name = canonical_string(&graph);
        if let Some(&id) = self.by_name.get(&name) {
            if !removable {
                self.entries[id.0 as usize].removable = false;
            }
            return id;
        }
        let id = SpeciesId(self.entries.len() as u32);
        self.entries.push(Species {
            id,
            canonical_name: name.clone(),
            graph,
            diffusion_constant,
            time_step,
            space_step,
            spatial_kind,
            removable,
            retired: false,
        });
        self.by_name.insert(name, id);
        id
    }

    pub fn get(&self, id: SpeciesId) -> &Species {
        &self.entries[id.0 as usize]
    }

    /// Retire a species (species cleanup, spec.md §3): only species with
    /// zero live instantiations and `removable: true` should ever be
    /// passed here — the simulation driver is responsible for that check,
    /// since only it tracks live molecule counts.
    pub fn retire(&mut self, id: SpeciesId) {
        self.entries[id.0 as usize].retired = true;
    }

    pub fn is_active(&self, id: SpeciesId) -> bool {
        !self.entries[id.0 as usize].retired
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Species> {
        self.entries.iter().filter(|s| !s.retired)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Species> {
        self.by_name.get(name).map(|&id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ComplexBuilder;
    use mcell_core::Orientation;

    fn single(mol_type: &str) -> ComplexGraph {
        let mut b = ComplexBuilder::new();
        b.add_molecule(mol_type);
        b.finish(Orientation::None)
    }

    #[test]
    fn interning_dedups_isomorphic_graphs() {
        let mut table = SpeciesTable::new();
        let a1 = table.intern(single("A"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, true);
        let a2 = table.intern(single("A"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, true);
        assert_eq!(a1, a2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_species_get_distinct_ids() {
        let mut table = SpeciesTable::new();
        let a = table.intern(single("A"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, true);
        let b = table.intern(single("B"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, true);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn kinetics_time_step_is_at_least_dt_min() {
        let (dt, sigma) = derive_kinetics(1e-7, 1e-6, 2e-3, 1.0);
        assert!(dt >= 1e-6);
        assert!(sigma > 0.0);
    }

    #[test]
    fn zero_diffusion_constant_keeps_base_time_step() {
        let (dt, sigma) = derive_kinetics(0.0, 1e-6, 2e-3, 1.0);
        assert_eq!(dt, 1e-6);
        assert_eq!(sigma, 0.0);
    }

    #[test]
    fn larger_length_unit_shrinks_the_space_step() {
        let (_, sigma_1) = derive_kinetics(1e-7, 1e-6, 2e-3, 1.0);
        let (_, sigma_2) = derive_kinetics(1e-7, 1e-6, 2e-3, 2.0);
        assert!((sigma_1 / sigma_2 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn retired_species_are_excluded_from_iter_active() {
        let mut table = SpeciesTable::new();
        let a = table.intern(single("A"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, true);
        assert!(table.is_active(a));
        table.retire(a);
        assert!(!table.is_active(a));
        assert_eq!(table.iter_active().count(), 0);
    }

    #[test]
    fn declaring_a_species_non_removable_overrides_an_earlier_removable_intern() {
        let mut table = SpeciesTable::new();
        let first = table.intern(single("A"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, true);
        assert!(table.get(first).removable);
        let second = table.intern(single("A"), 1e-6, 1e-6, 1e-7, 1.0, SpatialKind::Volume, false);
        assert_eq!(first, second);
        assert!(!table.get(first).removable);
    }
}
