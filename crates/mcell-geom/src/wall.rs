use mcell_core::{GeometryObjectId, RegionId, VertexIndex, Vec3};
use serde::{Deserialize, Serialize};

use crate::surface_grid::SurfaceGrid;

/// A triangular wall: three vertices, a unit outward normal, up to three
/// edge-neighbour walls (one per edge, for wall-to-wall crossing during
/// ray tracing), and an optional surface grid for surface-molecule
/// placement (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    pub vertices: [VertexIndex; 3],
    pub normal: Vec3,
    pub area: f64,
    /// Edge `i` connects `vertices[i]` to `vertices[(i + 1) % 3]`.
    pub edge_neighbors: [Option<mcell_core::WallIndex>; 3],
    pub surface_grid: Option<SurfaceGrid>,
    pub movable: bool,
    pub object_id: GeometryObjectId,
    pub regions: Vec<RegionId>,
}

impl Wall {
    pub fn new(vertices: [VertexIndex; 3], object_id: GeometryObjectId) -> Self {
        Self {
            vertices,
            normal: Vec3::zeros(),
            area: 0.0,
            edge_neighbors: [None, None, None],
            surface_grid: None,
            movable: false,
            object_id,
            regions: Vec::new(),
        }
    }

    /// Recompute `normal` and `area` from the three given vertex
    /// positions. Normal follows right-hand winding: `(p1-p0) x (p2-p0)`,
    /// normalized.
    pub fn recompute_geometry(&mut self, p0: Vec3, p1: Vec3, p2: Vec3) {
        let cross = (p1 - p0).cross(&(p2 - p0));
        self.area = cross.norm() * 0.5;
        self.normal = mcell_core::safe_normalize(cross);
    }

    /// Create a regular N×N subdivision surface grid on this wall.
    pub fn install_surface_grid(&mut self, n: usize) {
        self.surface_grid = Some(SurfaceGrid::new(n));
    }

    /// The two vertex indices bounding edge `i` (i in 0..3).
    pub fn edge_vertices(&self, i: usize) -> (VertexIndex, VertexIndex) {
        (self.vertices[i], self.vertices[(i + 1) % 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recompute_geometry_gives_outward_normal_for_ccw_triangle() {
        let mut w = Wall::new(
            [VertexIndex(0), VertexIndex(1), VertexIndex(2)],
            GeometryObjectId(0),
        );
        let p0 = Vec3::new(0.0, 0.0, 0.0);
        let p1 = Vec3::new(1.0, 0.0, 0.0);
        let p2 = Vec3::new(0.0, 1.0, 0.0);
        w.recompute_geometry(p0, p1, p2);
        assert_eq!(w.normal, Vec3::new(0.0, 0.0, 1.0));
        assert!((w.area - 0.5).abs() < 1e-12);
    }
}
