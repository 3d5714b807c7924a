//! Coarse partition + N×N×N sub-partition grid (spec.md §4.4 —
//! component C4).
//!
//! Molecule residency lists are tombstoned rather than shift-compacted on
//! removal (an `Option<MoleculeId>` slot goes to `None`), and swept back
//! to dense storage every [`mcell_core::constants::DEFRAGMENTATION_PERIODICITY`]
//! removals via [`Partition::defragment`] — cheap removal at the cost of
//! slowly growing cells between sweeps, same trade the original engine's
//! subvolume lists make.

use std::collections::HashMap;

use mcell_core::{constants, McellError, MoleculeId, Result, Vec3, WallIndex};

/// Flat index of one sub-partition cell.
pub type CellIndex = usize;

#[derive(Debug, Clone, Copy)]
struct Slot {
    cell: CellIndex,
    idx: usize,
}

#[derive(Debug)]
pub struct Partition {
    origin: Vec3,
    extent: Vec3,
    n: usize,
    cell_size: Vec3,

    cells: Vec<Vec<Option<MoleculeId>>>,
    positions: HashMap<MoleculeId, Vec3>,
    index: HashMap<MoleculeId, Slot>,

    wall_cells: Vec<Vec<WallIndex>>,

    removals_since_defrag: u64,
    defrag_period: u64,
}

impl Partition {
    /// `origin` is the coarse box's minimum corner, `extent` its size
    /// along each axis, `n` the number of sub-partitions per dimension.
    pub fn new(origin: Vec3, extent: Vec3, n: usize) -> Self {
        let n = n.max(1);
        let cell_size = Vec3::new(extent.x / n as f64, extent.y / n as f64, extent.z / n as f64);
        Self {
            origin,
            extent,
            n,
            cell_size,
            cells: (0..n * n * n).map(|_| Vec::new()).collect(),
            positions: HashMap::new(),
            index: HashMap::new(),
            wall_cells: (0..n * n * n).map(|_| Vec::new()).collect(),
            removals_since_defrag: 0,
            defrag_period: constants::DEFRAGMENTATION_PERIODICITY,
        }
    }

    pub fn num_cells(&self) -> usize {
        self.n * self.n * self.n
    }

    pub fn subdivisions(&self) -> usize {
        self.n
    }

    fn axis_index(&self, coord: f64, origin: f64, size: f64) -> usize {
        if size <= 0.0 {
            return 0;
        }
        let raw = ((coord - origin) / size).floor();
        (raw.max(0.0) as usize).min(self.n - 1)
    }

    /// Map a point in simulation space to its sub-partition cell. Points
    /// outside the coarse box are clamped to the nearest edge cell,
    /// since a diffusing molecule can momentarily overshoot the box by a
    /// fraction of a step before the collision step catches it.
    pub fn cell_of(&self, point: Vec3) -> CellIndex {
        let ix = self.axis_index(point.x, self.origin.x, self.cell_size.x);
        let iy = self.axis_index(point.y, self.origin.y, self.cell_size.y);
        let iz = self.axis_index(point.z, self.origin.z, self.cell_size.z);
        self.linear(ix, iy, iz)
    }

    fn linear(&self, ix: usize, iy: usize, iz: usize) -> CellIndex {
        ix + iy * self.n + iz * self.n * self.n
    }

    fn coords(&self, cell: CellIndex) -> (usize, usize, usize) {
        let iz = cell / (self.n * self.n);
        let rem = cell % (self.n * self.n);
        let iy = rem / self.n;
        let ix = rem % self.n;
        (ix, iy, iz)
    }

    /// The 3×3×3 block of cells around (and including) `cell`, clipped to
    /// the grid's bounds — candidates for a displacement that may cross
    /// a sub-partition boundary.
    pub fn neighbor_cells(&self, cell: CellIndex) -> Vec<CellIndex> {
        let (cx, cy, cz) = self.coords(cell);
        let mut out = Vec::with_capacity(27);
        for dz in -1i64..=1 {
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let x = cx as i64 + dx;
                    let y = cy as i64 + dy;
                    let z = cz as i64 + dz;
                    if x < 0 || y < 0 || z < 0 {
                        continue;
                    }
                    let (x, y, z) = (x as usize, y as usize, z as usize);
                    if x >= self.n || y >= self.n || z >= self.n {
                        continue;
                    }
                    out.push(self.linear(x, y, z));
                }
            }
        }
        out
    }

    pub fn insert_molecule(&mut self, id: MoleculeId, position: Vec3) {
        let cell = self.cell_of(position);
        let idx = self.cells[cell].len();
        self.cells[cell].push(Some(id));
        self.positions.insert(id, position);
        self.index.insert(id, Slot { cell, idx });
    }

    pub fn remove_molecule(&mut self, id: MoleculeId) -> Result<()> {
        let slot = self
            .index
            .remove(&id)
            .ok_or_else(|| McellError::Internal(format!("{id:?} is not resident in any cell")))?;
        self.cells[slot.cell][slot.idx] = None;
        self.positions.remove(&id);
        self.removals_since_defrag += 1;
        if self.removals_since_defrag >= self.defrag_period {
            self.defragment();
        }
        Ok(())
    }

    /// Move a resident molecule to `new_position`, re-homing it to a
    /// different cell if the move crosses a sub-partition boundary.
    pub fn move_molecule(&mut self, id: MoleculeId, new_position: Vec3) -> Result<()> {
        let old_cell = self
            .index
            .get(&id)
            .ok_or_else(|| McellError::Internal(format!("{id:?} is not resident in any cell")))?
            .cell;
        let new_cell = self.cell_of(new_position);
        if new_cell == old_cell {
            self.positions.insert(id, new_position);
            return Ok(());
        }
        self.remove_molecule(id)?;
        self.insert_molecule(id, new_position);
        Ok(())
    }

    pub fn position_of(&self, id: MoleculeId) -> Option<Vec3> {
        self.positions.get(&id).copied()
    }

    pub fn cell_molecules(&self, cell: CellIndex) -> impl Iterator<Item = MoleculeId> + '_ {
        self.cells[cell].iter().filter_map(|s| *s)
    }

    /// Sweep every cell's tombstones out and rebuild the index
    /// (spec.md §4.4's periodic defragmentation).
    pub fn defragment(&mut self) {
        for cell in 0..self.cells.len() {
            self.cells[cell].retain(Option::is_some);
            for (idx, slot) in self.cells[cell].iter().enumerate() {
                let id = slot.expect("retain kept only Some entries");
                self.index.insert(id, Slot { cell, idx });
            }
        }
        self.removals_since_defrag = 0;
    }

    /// Register `wall` as intersecting every cell whose box overlaps the
    /// triangle's axis-aligned bounding box (a conservative, cheap
    /// over-approximation rather than an exact triangle/box test).
    pub fn index_wall(&mut self, wall: WallIndex, p0: Vec3, p1: Vec3, p2: Vec3) {
        let min = Vec3::new(
            p0.x.min(p1.x).min(p2.x),
            p0.y.min(p1.y).min(p2.y),
            p0.z.min(p1.z).min(p2.z),
        );
        let max = Vec3::new(
            p0.x.max(p1.x).max(p2.x),
            p0.y.max(p1.y).max(p2.y),
            p0.z.max(p1.z).max(p2.z),
        );
        let lo = self.cell_of(min);
        let hi = self.cell_of(max);
        let (lx, ly, lz) = self.coords(lo);
        let (hx, hy, hz) = self.coords(hi);
        for iz in lz..=hz {
            for iy in ly..=hy {
                for ix in lx..=hx {
                    let cell = self.linear(ix, iy, iz);
                    self.wall_cells[cell].push(wall);
                }
            }
        }
    }

    pub fn cell_walls(&self, cell: CellIndex) -> &[WallIndex] {
        &self.wall_cells[cell]
    }

    pub fn extent(&self) -> Vec3 {
        self.extent
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_partition() -> Partition {
        Partition::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 10.0), 5)
    }

    #[test]
    fn insert_and_remove_round_trip() {
        let mut p = small_partition();
        let id = MoleculeId(0);
        p.insert_molecule(id, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p.position_of(id), Some(Vec3::new(1.0, 1.0, 1.0)));
        p.remove_molecule(id).unwrap();
        assert_eq!(p.position_of(id), None);
    }

    #[test]
    fn move_across_cell_boundary_rehomes_molecule() {
        let mut p = small_partition();
        let id = MoleculeId(0);
        p.insert_molecule(id, Vec3::new(0.5, 0.5, 0.5));
        let old_cell = p.cell_of(Vec3::new(0.5, 0.5, 0.5));
        p.move_molecule(id, Vec3::new(9.5, 9.5, 9.5)).unwrap();
        let new_cell = p.cell_of(Vec3::new(9.5, 9.5, 9.5));
        assert_ne!(old_cell, new_cell);
        assert!(p.cell_molecules(new_cell).any(|m| m == id));
        assert!(!p.cell_molecules(old_cell).any(|m| m == id));
    }

    #[test]
    fn points_outside_the_box_clamp_to_an_edge_cell() {
        let p = small_partition();
        let inside = p.cell_of(Vec3::new(9.9, 9.9, 9.9));
        let outside = p.cell_of(Vec3::new(100.0, 100.0, 100.0));
        assert_eq!(inside, outside);
    }

    #[test]
    fn defragmentation_compacts_tombstones_and_preserves_residents() {
        let mut p = small_partition();
        let a = MoleculeId(0);
        let b = MoleculeId(1);
        let pos = Vec3::new(1.0, 1.0, 1.0);
        p.insert_molecule(a, pos);
        p.insert_molecule(b, pos);
        p.remove_molecule(a).unwrap();
        let cell = p.cell_of(pos);
        assert_eq!(p.cells[cell].len(), 2); // a tombstoned, not yet swept
        p.defragment();
        assert_eq!(p.cells[cell].len(), 1);
        assert!(p.cell_molecules(cell).any(|m| m == b));
    }

    #[test]
    fn wall_indexing_covers_every_overlapping_cell() {
        let mut p = small_partition();
        // A triangle spanning from the first to the last cell along x.
        p.index_wall(
            WallIndex(0),
            Vec3::new(0.1, 1.0, 1.0),
            Vec3::new(9.9, 1.0, 1.0),
            Vec3::new(5.0, 1.9, 1.0),
        );
        let lo = p.cell_of(Vec3::new(0.1, 1.0, 1.0));
        let hi = p.cell_of(Vec3::new(9.9, 1.0, 1.0));
        assert!(p.cell_walls(lo).contains(&WallIndex(0)));
        assert!(p.cell_walls(hi).contains(&WallIndex(0)));
    }
}
