//! # mcell-geom
//!
//! Vertex store, triangular wall meshes, per-wall edge adjacency, surface
//! grids and named regions (spec.md §3, §4.1 — component C1).
//!
//! Vertices and walls live in a flat arena (`GeometryStore`) and reference
//! each other by index rather than by pointer, since wall adjacency and
//! vertex incidence are both naturally cyclic graphs (spec.md §9's "graph
//! cycles and shared ownership" design note).

pub mod region;
pub mod store;
pub mod surface_grid;
pub mod wall;

pub use region::Region;
pub use store::GeometryStore;
pub use surface_grid::SurfaceGrid;
pub use wall::Wall;

#[cfg(test)]
mod tests {
    use super::*;
    use mcell_core::{GeometryObjectId, Vec3};

    #[test]
    fn unit_cube_has_twelve_walls_and_eight_vertices() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::new(0.0, 0.0, 0.0), 1.0);

        assert_eq!(store.object(obj).wall_indices.len(), 12);
        assert_eq!(store.object(obj).vertex_indices.len(), 8);
    }

    #[test]
    fn unit_cube_vertices_have_five_incident_walls() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::new(0.0, 0.0, 0.0), 1.0);
        for &v in &store.object(obj).vertex_indices {
            assert_eq!(store.incident_walls(v).len(), 5);
        }
    }

    #[test]
    fn unit_cube_wall_normals_are_unit_length() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::new(0.0, 0.0, 0.0), 1.0);
        for &w in &store.object(obj).wall_indices {
            let n = store.wall(w).normal.norm();
            assert!((n - 1.0).abs() < 1e-9, "normal length was {n}");
        }
    }

    #[test]
    fn unit_cube_classifies_interior_and_exterior_points() {
        // Scenario from spec.md §8: a unit cube centered at the origin
        // contains its own center and does not contain (1,1,1).
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::new(0.0, 0.0, 0.0), 1.0);

        assert!(store.point_in_object(Vec3::new(0.0, 0.0, 0.0), obj).unwrap());
        assert!(!store
            .point_in_object(Vec3::new(1.0, 1.0, 1.0), obj)
            .unwrap());
    }

    #[test]
    fn object_id_is_not_invalid_after_creation() {
        let mut store = GeometryStore::new();
        let obj = store.add_unit_cube("cube", Vec3::new(0.0, 0.0, 0.0), 1.0);
        assert_ne!(obj, GeometryObjectId::INVALID);
    }
}
