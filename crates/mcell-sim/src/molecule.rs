//! Molecule records (spec.md §3): a volume molecule carries a position,
//! a surface molecule a wall/tile/orientation triple. Both share an id,
//! species, birth time and defunct flag.

use mcell_core::{MoleculeId, Orientation, SpeciesId, Time, Vec3, WallIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoleculeKind {
    Volume { position: Vec3 },
    Surface {
        wall: WallIndex,
        tile: usize,
        orientation: Orientation,
    },
}

#[derive(Debug, Clone)]
pub struct Molecule {
    pub id: MoleculeId,
    pub species_id: SpeciesId,
    pub birth_time: Time,
    pub defunct: bool,
    pub kind: MoleculeKind,
}

impl Molecule {
    pub fn position(&self) -> Option<Vec3> {
        match self.kind {
            MoleculeKind::Volume { position } => Some(position),
            MoleculeKind::Surface { .. } => None,
        }
    }

    pub fn is_volume(&self) -> bool {
        matches!(self.kind, MoleculeKind::Volume { .. })
    }
}

/// Flat store of every molecule ever created in a run. Ids are never
/// reused (spec.md §3), so the store only ever grows; a molecule
/// consumed by a reaction is marked `defunct` rather than removed —
/// physical removal of its spatial-partition residency happens at the
/// next defragmentation ([`mcell_spatial::Partition::defragment`]), the
/// record here just stops being scheduled.
#[derive(Debug, Default)]
pub struct MoleculeStore {
    molecules: Vec<Molecule>,
}

impl MoleculeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        species_id: SpeciesId,
        birth_time: Time,
        kind: MoleculeKind,
    ) -> MoleculeId {
        let id = MoleculeId(self.molecules.len() as u32);
        self.molecules.push(Molecule {
            id,
            species_id,
            birth_time,
            defunct: false,
            kind,
        });
        id
    }

    pub fn get(&self, id: MoleculeId) -> &Molecule {
        &self.molecules[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: MoleculeId) -> &mut Molecule {
        &mut self.molecules[id.0 as usize]
    }

    pub fn mark_defunct(&mut self, id: MoleculeId) {
        self.molecules[id.0 as usize].defunct = true;
    }

    pub fn is_defunct(&self, id: MoleculeId) -> bool {
        self.molecules[id.0 as usize].defunct
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Molecule> {
        self.molecules.iter().filter(|m| !m.defunct)
    }

    pub fn count_live_of_species(&self, species_id: SpeciesId) -> usize {
        self.iter_live().filter(|m| m.species_id == species_id).count()
    }
}
