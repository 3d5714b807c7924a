//! The simulation driver (spec.md §6, §4.6 — component C6): loads a
//! [`Model`] into the C1-C5 data structures and drives the hierarchical
//! scheduler until a target time, dispatching diffusion, unimolecular
//! reaction, release and species-cleanup events.
//!
//! Grounded on `original_source/src/diffuse_react_event.c`'s dispatch
//! loop and `oldies-core`'s `Simulation`-style driver shape (own RNG
//! stream, a recorder, a `run_until`): unlike the neuron/ODE solvers
//! elsewhere in this workspace, there is no fixed global tick — the
//! scheduler itself determines what runs next.

use mcell_core::{
    constants, seeded_rng, McellError, MoleculeId, Orientation, Rate, Result, RxnRuleId,
    SpatialKind, SpeciesId, Time, Vec3, WallIndex,
};
use mcell_geom::GeometryStore;
use mcell_rxn::RxnContainer;
use mcell_sched::Scheduler;
use mcell_species::graph::NodeLabel;
use mcell_species::{matches_pattern, parse_pattern, pattern_to_complex_graph, ComplexGraph, MolTypeRegistry, Pattern, SpeciesTable};
use mcell_spatial::Partition;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::event::SimEvent;
use crate::model::{Model, ReleaseShape, ReleaseSpec, ReleaseQuantity};
use crate::molecule::{MoleculeKind, MoleculeStore};
use crate::observe::CountRecorder;
use crate::step;

/// Resolve a fully-qualified complex pattern into a molecule type name:
/// the first molecule named in the pattern, whose [`MolType`] supplies
/// the complex's diffusion parameters (spec.md §4.2.3 does not define
/// multi-molecule-complex kinetics; this port takes the lead molecule's,
/// documented as a simplification in DESIGN.md).
fn first_molecule_type(graph: &ComplexGraph) -> Option<&str> {
    let node = *graph.molecules.first()?;
    match &graph.graph[node] {
        NodeLabel::Molecule { mol_type } => Some(mol_type.as_str()),
        NodeLabel::Component { .. } => None,
    }
}

fn shape_volume(shape: &ReleaseShape) -> f64 {
    match shape {
        ReleaseShape::Point(_) => 0.0,
        ReleaseShape::Box { min, max } => {
            let d = max - min;
            (d.x * d.y * d.z).abs()
        }
        ReleaseShape::Sphere { radius, .. } => (4.0 / 3.0) * std::f64::consts::PI * radius.powi(3),
    }
}

fn sample_position_in_shape(rng: &mut impl Rng, shape: &ReleaseShape) -> Vec3 {
    match shape {
        ReleaseShape::Point(p) => *p,
        ReleaseShape::Box { min, max } => Vec3::new(
            rng.gen_range(min.x.min(max.x)..=min.x.max(max.x)),
            rng.gen_range(min.y.min(max.y)..=min.y.max(max.y)),
            rng.gen_range(min.z.min(max.z)..=min.z.max(max.z)),
        ),
        ReleaseShape::Sphere { center, radius } => loop {
            let candidate = Vec3::new(
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
            );
            if candidate.norm() <= 1.0 {
                return center + candidate * *radius;
            }
        },
    }
}

/// Ties the geometry store, species table, reaction container, spatial
/// partition, molecule store and scheduler together into one runnable
/// simulation (spec.md §6).
pub struct Simulation {
    geometry: GeometryStore,
    mol_types: MolTypeRegistry,
    species: SpeciesTable,
    rxn: RxnContainer,
    partition: Partition,
    molecules: MoleculeStore,
    scheduler: Scheduler<SimEvent>,
    rng: SmallRng,

    time_unit: Time,
    length_unit: f64,
    target_step_length: f64,
    interaction_radius: f64,

    releases: Vec<ReleaseSpec>,
    cleanup_interval: Time,

    recorder: CountRecorder,
    count_patterns: Vec<Pattern>,
    count_every: Vec<u64>,
    step_counter: u64,
}

impl Simulation {
    /// Build a runnable simulation from a loaded [`Model`] (spec.md §6):
    /// geometry objects become indexed walls, declared species and
    /// reaction rules are parsed and interned, and initial releases plus
    /// a periodic species-cleanup event are scheduled.
    pub fn from_model(model: &Model) -> Result<Self> {
        let mut geometry = GeometryStore::new();
        let mut partition = Partition::new(
            model.box_origin,
            model.box_extent,
            model.subpartitions_per_dimension,
        );

        for obj_spec in &model.geometry_objects {
            let obj_id = geometry.add_object(obj_spec.name.clone());
            let vidx: Vec<_> = obj_spec
                .vertices
                .iter()
                .map(|&p| geometry.add_vertex(p))
                .collect();
            geometry.object_mut(obj_id).vertex_indices = vidx.clone();

            let mut wall_indices = Vec::with_capacity(obj_spec.triangles.len());
            for tri in &obj_spec.triangles {
                let (v0, v1, v2) = (
                    vidx[tri[0] as usize],
                    vidx[tri[1] as usize],
                    vidx[tri[2] as usize],
                );
                let w = geometry.add_wall(obj_id, v0, v1, v2);
                partition.index_wall(w, geometry.vertex(v0), geometry.vertex(v1), geometry.vertex(v2));
                wall_indices.push(w);
            }
            geometry.object_mut(obj_id).wall_indices = wall_indices;
            geometry.build_edge_neighbors(obj_id);
        }

        // A generous ceiling on the scheduler's total span: the hierarchy
        // eagerly builds out to `SCHEDULER_MAX_LEVELS` regardless (see
        // mcell-sched), so this only needs to be larger than any run this
        // engine is asked to drive.
        let scheduler = Scheduler::new(
            model.time_unit,
            model.time_unit * 1e10,
            constants::SCHEDULER_DEFAULT_RING_LEN,
            0.0,
        )?;

        let mut sim = Simulation {
            geometry,
            mol_types: model.mol_types.clone(),
            species: SpeciesTable::new(),
            rxn: RxnContainer::new(),
            partition,
            molecules: MoleculeStore::new(),
            scheduler,
            rng: seeded_rng(model.seed),
            time_unit: model.time_unit,
            length_unit: model.length_unit,
            target_step_length: model.target_step_length,
            interaction_radius: model.interaction_radius,
            releases: model.releases.clone(),
            cleanup_interval: model.time_unit * 1000.0,
            recorder: CountRecorder::new(model.observables.counts.iter().map(|c| c.name.clone())),
            count_patterns: Vec::new(),
            count_every: Vec::new(),
            step_counter: 0,
        };

        for count in &model.observables.counts {
            sim.count_patterns.push(parse_pattern(&count.species_pattern)?);
            sim.count_every.push(count.every_n_steps.max(1));
        }

        for rule_spec in &model.reaction_rules {
            let reactants: Vec<Pattern> = rule_spec
                .reactants
                .iter()
                .map(|s| parse_pattern(s))
                .collect::<Result<_>>()?;
            let products: Vec<Pattern> = rule_spec
                .products
                .iter()
                .map(|s| parse_pattern(s))
                .collect::<Result<_>>()?;
            sim.rxn.rules_mut().add(
                rule_spec.name.clone(),
                reactants.clone(),
                products.clone(),
                rule_spec.forward_rate,
            )?;
            if let Some(backward_rate) = rule_spec.backward_rate {
                sim.rxn.rules_mut().add(
                    format!("{}_reverse", rule_spec.name),
                    products,
                    reactants,
                    backward_rate,
                )?;
            }
        }

        for pattern_text in &model.declared_species {
            let pattern = parse_pattern(pattern_text)?;
            sim.intern_species_from_pattern(&pattern, false)?;
        }

        for i in 0..sim.releases.len() {
            let time = sim.releases[i].time;
            sim.scheduler.insert(time, SimEvent::Release(i), true)?;
        }
        sim.scheduler
            .insert(sim.cleanup_interval, SimEvent::Cleanup, true)?;

        Ok(sim)
    }

    pub fn now(&self) -> Time {
        self.scheduler.now()
    }

    pub fn recorder(&self) -> &CountRecorder {
        &self.recorder
    }

    pub fn species_table(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules.iter_live().count()
    }

    /// Intern a fully-resolved complex pattern as a species, deriving
    /// its kinetics from the lead molecule's declared [`MolType`]
    /// (spec.md §4.2.3 / §6).
    fn intern_species_from_pattern(&mut self, pattern: &Pattern, removable: bool) -> Result<SpeciesId> {
        if !pattern.is_fully_resolved() {
            return Err(McellError::Semantic(
                "species pattern must be fully resolved (every bond a concrete id)".to_string(),
            ));
        }
        let graph = pattern_to_complex_graph(pattern)?;
        let mol_type_name = first_molecule_type(&graph)
            .ok_or_else(|| McellError::Semantic("pattern names no molecule".to_string()))?
            .to_string();
        let mol_type = self
            .mol_types
            .get(&mol_type_name)
            .cloned()
            .ok_or_else(|| McellError::Semantic(format!("undeclared molecule type '{mol_type_name}'")))?;
        let spatial_kind = if mol_type.is_surface {
            SpatialKind::Surface
        } else {
            SpatialKind::Volume
        };
        let id = match (mol_type.custom_time_step, mol_type.custom_space_step) {
            (Some(ts), Some(ss)) => self.species.intern_with_explicit_steps(
                graph,
                mol_type.diffusion_constant,
                ts,
                ss,
                spatial_kind,
                removable,
            ),
            _ => self.species.intern(
                graph,
                mol_type.diffusion_constant,
                self.time_unit,
                self.target_step_length,
                self.length_unit,
                spatial_kind,
                removable,
            ),
        };
        Ok(id)
    }

    fn schedule_unimol_if_reactive(&mut self, species_id: SpeciesId, mid: MoleculeId, now: Time) -> Result<()> {
        let class = self.rxn.unimol_class(&self.species, species_id);
        if class.is_empty() || class.total_propensity <= 0.0 {
            return Ok(());
        }
        let total_propensity: Rate = class.total_propensity;
        let lifetime = step::sample_unimol_lifetime(&mut self.rng, total_propensity);
        self.scheduler.insert(now + lifetime, SimEvent::UnimolRxn(mid), true)
    }

    fn schedule_diffuse_if_mobile(&mut self, species_id: SpeciesId, mid: MoleculeId, now: Time) -> Result<()> {
        let sp = self.species.get(species_id);
        if sp.spatial_kind != SpatialKind::Volume || sp.diffusion_constant <= 0.0 {
            return Ok(());
        }
        let dt = sp.time_step;
        self.scheduler.insert(now + dt, SimEvent::Diffuse(mid), true)
    }

    /// Run the scheduler forward until the next due event's own
    /// timestamp passes `end_time` (spec.md §4.5's dispatch loop, driven
    /// here rather than in `mcell-sched` itself since dispatch needs the
    /// whole simulation state, not just the event payload). Gate on the
    /// popped event's own time, not `Scheduler::now()`: the time wheel's
    /// internal clock advances one `dt` per drained slot *before* that
    /// slot's events are handed back, so `now()` can already read past an
    /// event that itself still falls within `end_time`.
    pub fn run_until(&mut self, end_time: Time) -> Result<()> {
        loop {
            let Some((event_time, event)) = self.scheduler.next_due() else {
                break;
            };
            if event_time > end_time {
                break;
            }
            self.dispatch(event, event_time)?;
            self.step_counter += 1;
            self.record_counts(event_time);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: SimEvent, now: Time) -> Result<()> {
        match event {
            SimEvent::Diffuse(mid) => self.step_diffuse(mid, now),
            SimEvent::UnimolRxn(mid) => self.step_unimol(mid, now),
            SimEvent::Release(i) => self.step_release(i, now),
            SimEvent::Cleanup => self.step_cleanup(now),
        }
    }

    fn step_diffuse(&mut self, mid: MoleculeId, now: Time) -> Result<()> {
        if self.molecules.is_defunct(mid) {
            return Ok(());
        }
        let species_id = self.molecules.get(mid).species_id;
        let origin = match self.molecules.get(mid).position() {
            Some(p) => p,
            None => return Ok(()), // surface molecule diffusion is out of scope
        };
        let sp = self.species.get(species_id);
        let sigma = sp.space_step;
        let dt = sp.time_step;
        let displacement = step::sample_displacement(&mut self.rng, sigma);

        let geometry = &self.geometry;
        let partition = &self.partition;
        let molecules = &self.molecules;
        let rxn = &mut self.rxn;
        let species = &self.species;
        let rng = &mut self.rng;
        let interaction_radius = self.interaction_radius;

        let outcome = step::diffusion_collision_step(
            geometry,
            partition,
            &|other| partition.position_of(other),
            mid,
            origin,
            displacement,
            interaction_radius,
            |other| {
                let other_species = molecules.get(other).species_id;
                let class = rxn.bimol_class(species, species_id, other_species);
                if class.is_empty() {
                    return None;
                }
                let u: f64 = rng.gen();
                class.pick(u).map(|p| p.rule_id)
            },
        );

        match outcome {
            step::StepOutcome::Moved(new_pos) => {
                self.molecules.get_mut(mid).kind = MoleculeKind::Volume { position: new_pos };
                self.partition.move_molecule(mid, new_pos)?;
                self.scheduler.insert(now + dt, SimEvent::Diffuse(mid), true)?;
            }
            step::StepOutcome::ReactedWith { partner, rule_id } => {
                self.apply_rule(rule_id, &[mid, partner], now)?;
            }
        }
        Ok(())
    }

    fn step_unimol(&mut self, mid: MoleculeId, now: Time) -> Result<()> {
        if self.molecules.is_defunct(mid) {
            return Ok(());
        }
        let species_id = self.molecules.get(mid).species_id;
        let u: f64 = self.rng.gen();
        let rule_id = {
            let class = self.rxn.unimol_class(&self.species, species_id);
            class.pick(u).map(|pathway| pathway.rule_id)
        };
        match rule_id {
            Some(rule_id) => self.apply_rule(rule_id, &[mid], now),
            None => Ok(()),
        }
    }

    fn step_release(&mut self, release_index: usize, now: Time) -> Result<()> {
        let release = self.releases[release_index].clone();
        let pattern = parse_pattern(&release.species_pattern)?;
        // Species cleanup (spec.md §3) only protects species the model
        // actually declared up front; one named only in a release is
        // eligible once its population drops to zero, same as a pure
        // reaction product.
        let species_id = self.intern_species_from_pattern(&pattern, true)?;

        let count = match release.quantity {
            ReleaseQuantity::Count(n) => n as usize,
            ReleaseQuantity::Concentration(conc) => {
                let volume = shape_volume(&release.shape);
                (conc * constants::AVOGADRO * volume).round().max(0.0) as usize
            }
        };

        let is_volume = self.species.get(species_id).spatial_kind == SpatialKind::Volume;
        for _ in 0..count {
            let kind = if is_volume {
                let position = sample_position_in_shape(&mut self.rng, &release.shape);
                MoleculeKind::Volume { position }
            } else {
                MoleculeKind::Surface {
                    wall: WallIndex::INVALID,
                    tile: 0,
                    orientation: release.orientation,
                }
            };
            let mid = self.molecules.create(species_id, now, kind);
            if let MoleculeKind::Volume { position } = kind {
                self.partition.insert_molecule(mid, position);
            }
            self.schedule_unimol_if_reactive(species_id, mid, now)?;
            self.schedule_diffuse_if_mobile(species_id, mid, now)?;
        }
        Ok(())
    }

    fn step_cleanup(&mut self, now: Time) -> Result<()> {
        let retirable: Vec<SpeciesId> = self
            .species
            .iter_active()
            .filter(|s| s.removable && self.molecules.count_live_of_species(s.id) == 0)
            .map(|s| s.id)
            .collect();
        for id in retirable {
            self.species.retire(id);
            self.rxn.evict_species(id);
        }
        self.scheduler
            .insert(now + self.cleanup_interval, SimEvent::Cleanup, true)
    }

    /// Apply a fired rule: mark every reactant defunct, remove volume
    /// reactants from the partition, and instantiate each product at the
    /// reactants' centroid (spec.md §4.6 step 5, §3's creation/removal
    /// lifecycle).
    fn apply_rule(&mut self, rule_id: RxnRuleId, reactant_ids: &[MoleculeId], now: Time) -> Result<()> {
        let rule = self.rxn.rules().get(rule_id).clone();

        let mut positions = Vec::new();
        for &mid in reactant_ids {
            if let Some(p) = self.molecules.get(mid).position() {
                positions.push(p);
            }
            self.molecules.mark_defunct(mid);
            if self.molecules.get(mid).is_volume() {
                self.partition.remove_molecule(mid)?;
            }
        }
        let centroid = if positions.is_empty() {
            Vec3::zeros()
        } else {
            positions.iter().fold(Vec3::zeros(), |acc, p| acc + p) / positions.len() as f64
        };

        for product_pattern in &rule.products {
            if !product_pattern.is_fully_resolved() {
                return Err(McellError::Semantic(format!(
                    "reaction rule '{}' has an unresolved product pattern",
                    rule.name
                )));
            }
            let species_id = self.intern_species_from_pattern(product_pattern, true)?;
            let spatial_kind = self.species.get(species_id).spatial_kind;
            let kind = match spatial_kind {
                SpatialKind::Volume => MoleculeKind::Volume { position: centroid },
                SpatialKind::Surface => MoleculeKind::Surface {
                    wall: WallIndex::INVALID,
                    tile: 0,
                    orientation: Orientation::Up,
                },
            };
            let mid = self.molecules.create(species_id, now, kind);
            if spatial_kind == SpatialKind::Volume {
                self.partition.insert_molecule(mid, centroid);
            }
            self.schedule_unimol_if_reactive(species_id, mid, now)?;
            self.schedule_diffuse_if_mobile(species_id, mid, now)?;
        }
        Ok(())
    }

    fn record_counts(&mut self, now: Time) {
        for i in 0..self.count_patterns.len() {
            if self.step_counter % self.count_every[i] != 0 {
                continue;
            }
            let pattern = &self.count_patterns[i];
            let mut total = 0usize;
            for sp in self.species.iter_active() {
                if matches_pattern(pattern, &sp.graph) {
                    total += self.molecules.count_live_of_species(sp.id);
                }
            }
            self.recorder.record(i, now, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CountSpec, ObservablesSpec, ReactionRuleSpec};
    use mcell_species::moltype::MolType;

    fn mol_type(name: &str, diffusion_constant: f64) -> MolType {
        MolType {
            name: name.to_string(),
            components: vec![],
            diffusion_constant,
            custom_time_step: None,
            custom_space_step: None,
            is_surface: false,
        }
    }

    #[test]
    fn simple_decay_survivor_count_tracks_exponential_decay() {
        let mut model = Model::empty(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(2.0, 2.0, 2.0));
        model.time_unit = 1.0;
        model.seed = 42;
        model.mol_types.insert(mol_type("A", 0.0));
        model.reaction_rules.push(ReactionRuleSpec {
            name: "decay".to_string(),
            reactants: vec!["A".to_string()],
            products: vec![],
            forward_rate: std::f64::consts::LN_2,
            backward_rate: None,
        });
        model.releases.push(ReleaseSpec {
            species_pattern: "A".to_string(),
            shape: ReleaseShape::Box {
                min: Vec3::new(-1.0, -1.0, -1.0),
                max: Vec3::new(1.0, 1.0, 1.0),
            },
            quantity: ReleaseQuantity::Count(1000),
            orientation: Orientation::None,
            time: 0.0,
        });

        let mut sim = Simulation::from_model(&model).unwrap();
        sim.run_until(1.0).unwrap();

        let alive = sim.molecule_count();
        // Expected ~500 (1000 * 2^-1); a 1000-trial binomial(p=0.5) has
        // stddev ~15.8, so this window is comfortably wider than 6 sigma.
        assert!(alive > 350 && alive < 650, "alive = {alive}");
    }

    #[test]
    fn bimolecular_reaction_consumes_reactants_and_produces_products() {
        let mut model = Model::empty(Vec3::zeros(), Vec3::new(1e-2, 1e-2, 1e-2));
        model.time_unit = 1e-3;
        // Box coordinates, target step length and interaction radius above
        // are all already expressed directly in simulation length units,
        // so length_unit = 1 keeps derive_kinetics's lambda divisor a
        // no-op here.
        model.length_unit = 1.0;
        model.target_step_length = 1e-3;
        model.interaction_radius = 2e-3;
        model.seed = 7;
        model.mol_types.insert(mol_type("A", 1e-1));
        model.mol_types.insert(mol_type("B", 1e-1));
        model.mol_types.insert(mol_type("C", 1e-1));
        model.reaction_rules.push(ReactionRuleSpec {
            name: "bind".to_string(),
            reactants: vec!["A".to_string(), "B".to_string()],
            products: vec!["C".to_string()],
            forward_rate: 1e6,
            backward_rate: None,
        });
        model.releases.push(ReleaseSpec {
            species_pattern: "A".to_string(),
            shape: ReleaseShape::Box {
                min: Vec3::zeros(),
                max: Vec3::new(1e-2, 1e-2, 1e-2),
            },
            quantity: ReleaseQuantity::Count(100),
            orientation: Orientation::None,
            time: 0.0,
        });
        model.releases.push(ReleaseSpec {
            species_pattern: "B".to_string(),
            shape: ReleaseShape::Box {
                min: Vec3::zeros(),
                max: Vec3::new(1e-2, 1e-2, 1e-2),
            },
            quantity: ReleaseQuantity::Count(100),
            orientation: Orientation::None,
            time: 0.0,
        });
        model.observables = ObservablesSpec {
            counts: vec![CountSpec {
                name: "C".to_string(),
                species_pattern: "C".to_string(),
                every_n_steps: 1,
            }],
        };

        let mut sim = Simulation::from_model(&model).unwrap();
        sim.run_until(1.0).unwrap();

        let products = sim.recorder().by_name("C").unwrap().last_value().unwrap_or(0.0);
        assert!(products > 0.0, "expected at least one A+B->C reaction to fire");
    }

    #[test]
    fn species_cleanup_retires_a_species_once_its_population_hits_zero() {
        let mut model = Model::empty(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(2.0, 2.0, 2.0));
        model.time_unit = 1.0;
        model.seed = 3;
        model.mol_types.insert(mol_type("A", 0.0));
        model.reaction_rules.push(ReactionRuleSpec {
            name: "decay".to_string(),
            reactants: vec!["A".to_string()],
            products: vec![],
            forward_rate: 50.0,
            backward_rate: None,
        });
        model.releases.push(ReleaseSpec {
            species_pattern: "A".to_string(),
            shape: ReleaseShape::Point(Vec3::zeros()),
            quantity: ReleaseQuantity::Count(20),
            orientation: Orientation::None,
            time: 0.0,
        });

        let mut sim = Simulation::from_model(&model).unwrap();
        // The default cleanup cadence is `time_unit * 1000`; run well past
        // it so the periodic cleanup event has a chance to fire at least
        // once after the population has fully decayed.
        sim.run_until(1001.0).unwrap();

        assert_eq!(sim.molecule_count(), 0);

        let graph = pattern_to_complex_graph(&parse_pattern("A").unwrap()).unwrap();
        let name = mcell_species::canonical_string(&graph);
        let species_id = sim.species_table().get_by_name(&name).unwrap().id;
        assert!(!sim.species_table().is_active(species_id));
    }

    #[test]
    fn empty_geometry_model_runs_without_error() {
        let model = Model::empty(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let mut sim = Simulation::from_model(&model).unwrap();
        sim.run_until(0.1).unwrap();
        assert_eq!(sim.molecule_count(), 0);
    }
}
