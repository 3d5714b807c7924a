use mcell_core::{
    GeometryObjectId, RegionId, Result, VertexIndex, Vec3, WallIndex,
};
use serde::{Deserialize, Serialize};

use crate::region::Region;
use crate::wall::Wall;

/// A named collection of vertices and walls, created during geometry
/// init (spec.md §3's "Lifecycles").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryObject {
    pub id: GeometryObjectId,
    pub name: String,
    pub vertex_indices: Vec<VertexIndex>,
    pub wall_indices: Vec<WallIndex>,
    pub regions: Vec<RegionId>,
}

/// Owns the vertex array, wall array, per-wall edge-neighbour map and
/// per-vertex incident-wall list for every geometry object in the model
/// (spec.md §4.1 — component C1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryStore {
    vertices: Vec<Vec3>,
    incident_walls: Vec<Vec<WallIndex>>,
    walls: Vec<Wall>,
    objects: Vec<GeometryObject>,
    regions: Vec<Region>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, p: Vec3) -> VertexIndex {
        let idx = VertexIndex(self.vertices.len() as u32);
        self.vertices.push(p);
        self.incident_walls.push(Vec::new());
        idx
    }

    pub fn vertex(&self, idx: VertexIndex) -> Vec3 {
        self.vertices[idx.0 as usize]
    }

    pub fn incident_walls(&self, idx: VertexIndex) -> &[WallIndex] {
        &self.incident_walls[idx.0 as usize]
    }

    /// A vertex's unit normal: the normalized sum of its incident walls'
    /// normals (spec.md §4.1).
    pub fn vertex_normal(&self, idx: VertexIndex) -> Vec3 {
        let sum = self
            .incident_walls(idx)
            .iter()
            .fold(Vec3::zeros(), |acc, &w| acc + self.wall(w).normal);
        mcell_core::safe_normalize(sum)
    }

    pub fn add_wall(
        &mut self,
        object_id: GeometryObjectId,
        v0: VertexIndex,
        v1: VertexIndex,
        v2: VertexIndex,
    ) -> WallIndex {
        let idx = WallIndex(self.walls.len() as u32);
        let mut wall = Wall::new([v0, v1, v2], object_id);
        wall.recompute_geometry(self.vertex(v0), self.vertex(v1), self.vertex(v2));
        self.walls.push(wall);
        for v in [v0, v1, v2] {
            self.incident_walls[v.0 as usize].push(idx);
        }
        idx
    }

    pub fn wall(&self, idx: WallIndex) -> &Wall {
        &self.walls[idx.0 as usize]
    }

    pub fn wall_mut(&mut self, idx: WallIndex) -> &mut Wall {
        &mut self.walls[idx.0 as usize]
    }

    pub fn add_object(&mut self, name: impl Into<String>) -> GeometryObjectId {
        let id = GeometryObjectId(self.objects.len() as u32);
        self.objects.push(GeometryObject {
            id,
            name: name.into(),
            vertex_indices: Vec::new(),
            wall_indices: Vec::new(),
            regions: Vec::new(),
        });
        id
    }

    pub fn object(&self, id: GeometryObjectId) -> &GeometryObject {
        &self.objects[id.0 as usize]
    }

    pub fn object_mut(&mut self, id: GeometryObjectId) -> &mut GeometryObject {
        &mut self.objects[id.0 as usize]
    }

    pub fn add_region(&mut self, region: Region) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        let object_id = region.object_id;
        self.regions.push(region);
        self.object_mut(object_id).regions.push(id);
        id
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0 as usize]
    }

    /// Fill in each wall's edge-neighbour slots by finding, for every
    /// edge of every wall in `object_id`, the other wall of the same
    /// object sharing that pair of vertices (undirected).
    pub fn build_edge_neighbors(&mut self, object_id: GeometryObjectId) {
        let walls = self.object(object_id).wall_indices.clone();
        for &wi in &walls {
            for edge in 0..3 {
                if self.wall(wi).edge_neighbors[edge].is_some() {
                    continue;
                }
                let (a, b) = self.wall(wi).edge_vertices(edge);
                let mut found = None;
                'search: for &wj in &walls {
                    if wj == wi {
                        continue;
                    }
                    for other_edge in 0..3 {
                        let (c, d) = self.wall(wj).edge_vertices(other_edge);
                        if (a == c && b == d) || (a == d && b == c) {
                            found = Some((wj, other_edge));
                            break 'search;
                        }
                    }
                }
                if let Some((wj, other_edge)) = found {
                    self.wall_mut(wi).edge_neighbors[edge] = Some(wj);
                    self.wall_mut(wj).edge_neighbors[other_edge] = Some(wi);
                }
            }
        }
    }

    /// Build an axis-aligned unit-edge cube, centered at `origin`, with
    /// outward-facing winding (spec.md §4.1, testable property #1): 8
    /// vertices, 12 triangles.
    pub fn add_unit_cube(&mut self, name: impl Into<String>, origin: Vec3, edge: f64) -> GeometryObjectId {
        let obj = self.add_object(name);
        let h = edge / 2.0;
        let corners: [Vec3; 8] = [
            origin + Vec3::new(-h, -h, -h),
            origin + Vec3::new(h, -h, -h),
            origin + Vec3::new(h, h, -h),
            origin + Vec3::new(-h, h, -h),
            origin + Vec3::new(-h, -h, h),
            origin + Vec3::new(h, -h, h),
            origin + Vec3::new(h, h, h),
            origin + Vec3::new(-h, h, h),
        ];
        let vidx: Vec<VertexIndex> = corners.iter().map(|&p| self.add_vertex(p)).collect();
        self.object_mut(obj).vertex_indices = vidx.clone();

        // Each face as two CCW (outward-normal) triangles.
        #[rustfmt::skip]
        let faces: [[usize; 3]; 12] = [
            // bottom (z=0), normal -z
            [0, 3, 2], [0, 2, 1],
            // top (z=e), normal +z
            [4, 5, 6], [4, 6, 7],
            // front (y=0), normal -y
            [0, 1, 5], [0, 5, 4],
            // back (y=e), normal +y
            [3, 7, 6], [3, 6, 2],
            // left (x=0), normal -x
            [0, 4, 7], [0, 7, 3],
            // right (x=e), normal +x
            [1, 2, 6], [1, 6, 5],
        ];

        let mut wall_indices = Vec::with_capacity(12);
        for f in faces {
            let w = self.add_wall(obj, vidx[f[0]], vidx[f[1]], vidx[f[2]]);
            wall_indices.push(w);
        }
        self.object_mut(obj).wall_indices = wall_indices;
        self.build_edge_neighbors(obj);
        obj
    }

    /// Axis-aligned bounding box test.
    pub fn point_in_box(point: Vec3, min: Vec3, max: Vec3) -> bool {
        point.x >= min.x
            && point.x <= max.x
            && point.y >= min.y
            && point.y <= max.y
            && point.z >= min.z
            && point.z <= max.z
    }

    /// Ray-parity ("is the point inside the closed surface") test: cast a
    /// ray from `point` in a fixed, deliberately non-axis-aligned
    /// direction and count how many of the object's walls it crosses.
    /// Odd means inside (spec.md §4.1's BSP/ray-parity method).
    pub fn point_in_object(&self, point: Vec3, object_id: GeometryObjectId) -> Result<bool> {
        // A direction unlikely to graze an axis-aligned edge or vertex.
        let dir = Vec3::new(0.61913, 0.51717, 0.33333).normalize();
        let mut crossings = 0usize;
        for &wi in &self.object(object_id).wall_indices {
            let w = self.wall(wi);
            let p0 = self.vertex(w.vertices[0]);
            let p1 = self.vertex(w.vertices[1]);
            let p2 = self.vertex(w.vertices[2]);
            if ray_hits_triangle(point, dir, p0, p1, p2) {
                crossings += 1;
            }
        }
        Ok(crossings % 2 == 1)
    }
}

/// Möller-Trumbore ray-triangle intersection, restricted to forward hits
/// (t > 0); used for both ray-parity point classification and the
/// diffusion step's wall-hit search (spec.md §4.6).
pub fn ray_triangle_intersect(
    origin: Vec3,
    dir: Vec3,
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
) -> Option<f64> {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let h = dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < mcell_core::constants::EPS {
        return None; // ray parallel to the triangle's plane
    }
    let f = 1.0 / a;
    let s = origin - p0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = f * edge2.dot(&q);
    if t > mcell_core::constants::EPS {
        Some(t)
    } else {
        None
    }
}

fn ray_hits_triangle(origin: Vec3, dir: Vec3, p0: Vec3, p1: Vec3, p2: Vec3) -> bool {
    ray_triangle_intersect(origin, dir, p0, p1, p2).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_in_box_basic() {
        let min = Vec3::new(0.0, 0.0, 0.0);
        let max = Vec3::new(1.0, 1.0, 1.0);
        assert!(GeometryStore::point_in_box(Vec3::new(0.5, 0.5, 0.5), min, max));
        assert!(!GeometryStore::point_in_box(Vec3::new(1.5, 0.5, 0.5), min, max));
    }

    #[test]
    fn edge_neighbors_are_mutual() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::zeros(), 1.0);
        for &wi in &store.object(obj).wall_indices {
            for edge in 0..3 {
                let neighbor = store.wall(wi).edge_neighbors[edge];
                assert!(neighbor.is_some(), "every cube edge has a neighbour wall");
                let wj = neighbor.unwrap();
                assert!(store.wall(wj).edge_neighbors.contains(&Some(wi)));
            }
        }
    }

    #[test]
    fn unit_cube_has_twelve_walls_and_eight_vertices() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::zeros(), 1.0);
        assert_eq!(store.object(obj).wall_indices.len(), 12);
        assert_eq!(store.object(obj).vertex_indices.len(), 8);
    }

    #[test]
    fn unit_cube_wall_normals_are_unit_length() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::zeros(), 1.0);
        for &wi in &store.object(obj).wall_indices {
            let len = store.wall(wi).normal.norm();
            assert!((len - 1.0).abs() < 1e-9, "wall normal length = {len}");
        }
    }

    #[test]
    fn point_in_object_distinguishes_interior_from_exterior() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::zeros(), 1.0);
        assert!(store.point_in_object(Vec3::zeros(), obj).unwrap());
        assert!(!store
            .point_in_object(Vec3::new(5.0, 5.0, 5.0), obj)
            .unwrap());
    }
}
