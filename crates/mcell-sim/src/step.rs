//! Diffusion / ray-trace / reaction-selection step (spec.md §4.6 —
//! component C6).
//!
//! Grounded on `mcell_geom::store::ray_triangle_intersect` for the wall
//! intersection test and `mcell_spatial::Partition::neighbor_cells` for
//! the sub-partition candidate search; reaction sampling reuses
//! `mcell_rxn::RxnClass::pick`'s cumulative-propensity draw.

use mcell_core::{constants, Length, MoleculeId, Time, Vec3};
use mcell_geom::store::ray_triangle_intersect;
use mcell_geom::GeometryStore;
use mcell_spatial::Partition;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Isotropic Gaussian displacement with characteristic step length
/// `sigma` (the species' space step, spec.md §4.2.3): each axis
/// component is drawn independently from a zero-mean normal scaled so
/// the 3D displacement's expected magnitude matches `sigma`.
pub fn sample_displacement(rng: &mut impl Rng, sigma: Length) -> Vec3 {
    if sigma <= 0.0 {
        return Vec3::zeros();
    }
    let per_axis = Normal::new(0.0, sigma / 3.0_f64.sqrt()).expect("sigma is finite and positive");
    Vec3::new(
        per_axis.sample(rng),
        per_axis.sample(rng),
        per_axis.sample(rng),
    )
}

/// One candidate event along a diffusing molecule's displacement
/// segment, ordered by parametric position `t` in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
enum Candidate {
    Wall { t: f64, wall_normal: Vec3 },
    Molecule { t: f64, other: MoleculeId },
}

impl Candidate {
    fn t(&self) -> f64 {
        match self {
            Candidate::Wall { t, .. } => *t,
            Candidate::Molecule { t, .. } => *t,
        }
    }

    /// Wall hits sort before molecule hits at equal `t` (spec.md
    /// §4.6.1's tie-break, "prevents ghost crossings").
    fn rank(&self) -> u8 {
        match self {
            Candidate::Wall { .. } => 0,
            Candidate::Molecule { .. } => 1,
        }
    }
}

fn collect_candidates(
    geometry: &GeometryStore,
    partition: &Partition,
    molecule_positions: &dyn Fn(MoleculeId) -> Option<Vec3>,
    self_id: MoleculeId,
    origin: Vec3,
    displacement: Vec3,
    interaction_radius: Length,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let seg_len = displacement.norm();
    if seg_len < constants::EPS {
        return candidates;
    }
    let dir = displacement / seg_len;

    let start_cell = partition.cell_of(origin);
    let end_cell = partition.cell_of(origin + displacement);
    let mut cells: Vec<usize> = partition.neighbor_cells(start_cell);
    if end_cell != start_cell {
        cells.extend(partition.neighbor_cells(end_cell));
    }
    cells.sort_unstable();
    cells.dedup();

    let mut seen_walls = std::collections::HashSet::new();
    for &cell in &cells {
        for &wi in partition.cell_walls(cell) {
            if !seen_walls.insert(wi) {
                continue;
            }
            let w = geometry.wall(wi);
            let p0 = geometry.vertex(w.vertices[0]);
            let p1 = geometry.vertex(w.vertices[1]);
            let p2 = geometry.vertex(w.vertices[2]);
            if let Some(t_dist) = ray_triangle_intersect(origin, dir, p0, p1, p2) {
                let t = t_dist / seg_len;
                if t <= 1.0 {
                    candidates.push(Candidate::Wall {
                        t,
                        wall_normal: w.normal,
                    });
                }
            }
        }

        for other in partition.cell_molecules(cell) {
            if other == self_id {
                continue;
            }
            let Some(other_pos) = molecule_positions(other) else {
                continue;
            };
            // Closest approach of the stationary partner to the moving
            // molecule's segment; within the interaction radius counts
            // as a candidate collision (spec.md §4.6 step 3).
            let to_other = other_pos - origin;
            let proj = to_other.dot(&dir).clamp(0.0, seg_len);
            let closest = origin + dir * proj;
            if (closest - other_pos).norm() <= interaction_radius {
                candidates.push(Candidate::Molecule {
                    t: proj / seg_len,
                    other,
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.t()
            .partial_cmp(&b.t())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.rank().cmp(&b.rank()))
    });
    candidates
}

/// Outcome of one diffusion/collision step for a single molecule.
pub enum StepOutcome {
    /// No reaction fired; the molecule moved to this position.
    Moved(Vec3),
    /// A bimolecular reaction consumed this molecule against `partner`.
    ReactedWith {
        partner: MoleculeId,
        rule_id: mcell_core::RxnRuleId,
    },
}

/// Trace `origin + displacement`, resolving wall reflections and
/// returning either the final resting position or the first
/// bimolecular collision selected to fire (spec.md §4.6 steps 2-5).
///
/// `roll_bimol` is called once per candidate molecule hit with a
/// uniform `[0,1)` draw and must report whether a reaction fires; the
/// step function only handles geometry, leaving reaction-class lookups
/// to the caller (which needs `&mut` access to the species table and
/// reaction container that this function does not take, to keep
/// borrow scopes narrow).
#[allow(clippy::too_many_arguments)]
pub fn diffusion_collision_step(
    geometry: &GeometryStore,
    partition: &Partition,
    molecule_positions: &dyn Fn(MoleculeId) -> Option<Vec3>,
    self_id: MoleculeId,
    origin: Vec3,
    displacement: Vec3,
    interaction_radius: Length,
    mut roll_bimol: impl FnMut(MoleculeId) -> Option<mcell_core::RxnRuleId>,
) -> StepOutcome {
    const MAX_BOUNCES: u32 = 8;

    let mut pos = origin;
    let mut remaining = displacement;

    for _ in 0..MAX_BOUNCES {
        let candidates = collect_candidates(
            geometry,
            partition,
            molecule_positions,
            self_id,
            pos,
            remaining,
            interaction_radius,
        );

        let Some(first) = candidates.into_iter().next() else {
            return StepOutcome::Moved(pos + remaining);
        };

        match first {
            Candidate::Molecule { t, other } => {
                if let Some(rule_id) = roll_bimol(other) {
                    return StepOutcome::ReactedWith {
                        partner: other,
                        rule_id,
                    };
                }
                // Rejected: treat the partner as transparent and keep
                // tracing past it rather than stopping the step dead.
                let hit_point = pos + remaining * t;
                let residual = remaining * (1.0 - t);
                pos = hit_point;
                remaining = residual;
            }
            Candidate::Wall { t, wall_normal } => {
                let hit_point = pos + remaining * t;
                let residual = remaining * (1.0 - t);
                // Specular reflection: no surface-class reaction lookup
                // here (out of scope for this engine's reduced wall
                // model, see DESIGN.md).
                let reflected = residual - wall_normal * 2.0 * residual.dot(&wall_normal);
                pos = hit_point;
                remaining = reflected;
            }
        }
    }
    StepOutcome::Moved(pos + remaining)
}

/// Draw a unimolecular lifetime from the exponential distribution with
/// rate `total_propensity` (spec.md §4.6's "per-species unimolecular
/// rate-sum lambda yields an exponentially distributed lifetime").
pub fn sample_unimol_lifetime(rng: &mut impl Rng, total_propensity: mcell_core::Rate) -> Time {
    let dist = rand_distr::Exp::new(total_propensity).expect("propensity is positive");
    dist.sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcell_core::seeded_rng;

    #[test]
    fn zero_sigma_never_displaces() {
        let mut rng = seeded_rng(1);
        assert_eq!(sample_displacement(&mut rng, 0.0), Vec3::zeros());
    }

    #[test]
    fn nonzero_sigma_displaces_with_bounded_magnitude() {
        let mut rng = seeded_rng(1);
        for _ in 0..50 {
            let d = sample_displacement(&mut rng, 1e-7);
            // A normal draw can exceed the nominal step length, but not
            // by an unbounded amount in any reasonable sample.
            assert!(d.norm() < 1e-5);
        }
    }

    #[test]
    fn unimol_lifetime_is_positive_and_varies() {
        let mut rng = seeded_rng(2);
        let a = sample_unimol_lifetime(&mut rng, 1.0);
        let b = sample_unimol_lifetime(&mut rng, 1.0);
        assert!(a > 0.0);
        assert!(b > 0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn unobstructed_step_moves_to_the_full_displacement() {
        let geometry = GeometryStore::new();
        let partition = Partition::new(Vec3::new(-10.0, -10.0, -10.0), Vec3::new(20.0, 20.0, 20.0), 4);
        let origin = Vec3::new(0.0, 0.0, 0.0);
        let disp = Vec3::new(1.0, 0.0, 0.0);
        let outcome = diffusion_collision_step(
            &geometry,
            &partition,
            &|_| None,
            MoleculeId(0),
            origin,
            disp,
            1e-3,
            |_| None,
        );
        match outcome {
            StepOutcome::Moved(p) => assert_eq!(p, Vec3::new(1.0, 0.0, 0.0)),
            StepOutcome::ReactedWith { .. } => panic!("expected no collision in an empty box"),
        }
    }
}
