use mcell_core::{MoleculeId, McellError, Result};
use serde::{Deserialize, Serialize};

/// A regular subdivision of a wall into `n * n` triangular tiles, each
/// holding at most one surface molecule (spec.md §3 — tile occupancy set
/// is the surface exclusion mechanism).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceGrid {
    n: usize,
    tiles: Vec<Option<MoleculeId>>,
}

impl SurfaceGrid {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            tiles: vec![None; n * n],
        }
    }

    pub fn subdivision(&self) -> usize {
        self.n
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn occupant(&self, tile: usize) -> Option<MoleculeId> {
        self.tiles[tile]
    }

    /// First unoccupied tile, if any — used when a surface product needs
    /// the nearest free tile (spec.md §4.6's collision step).
    pub fn first_free_tile(&self) -> Option<usize> {
        self.tiles.iter().position(|t| t.is_none())
    }

    pub fn is_free(&self, tile: usize) -> bool {
        self.tiles[tile].is_none()
    }

    pub fn place(&mut self, tile: usize, molecule: MoleculeId) -> Result<()> {
        if tile >= self.tiles.len() {
            return Err(McellError::Runtime(format!(
                "tile {tile} out of range for a {}x{} surface grid",
                self.n, self.n
            )));
        }
        if self.tiles[tile].is_some() {
            return Err(McellError::Runtime(format!(
                "tile {tile} is already occupied"
            )));
        }
        self.tiles[tile] = Some(molecule);
        Ok(())
    }

    pub fn vacate(&mut self, tile: usize) {
        self.tiles[tile] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_and_vacate_round_trips() {
        let mut g = SurfaceGrid::new(4);
        assert_eq!(g.num_tiles(), 16);
        assert_eq!(g.first_free_tile(), Some(0));

        g.place(3, MoleculeId(7)).unwrap();
        assert!(!g.is_free(3));
        assert_eq!(g.occupant(3), Some(MoleculeId(7)));

        g.vacate(3);
        assert!(g.is_free(3));
    }

    #[test]
    fn place_on_occupied_tile_fails() {
        let mut g = SurfaceGrid::new(2);
        g.place(0, MoleculeId(1)).unwrap();
        assert!(g.place(0, MoleculeId(2)).is_err());
    }

    #[test]
    fn first_free_tile_is_none_when_full() {
        let mut g = SurfaceGrid::new(1);
        g.place(0, MoleculeId(1)).unwrap();
        assert_eq!(g.first_free_tile(), None);
    }
}
