use mcell_core::{GeometryObjectId, SurfaceClassId, WallIndex};
use serde::{Deserialize, Serialize};

/// A named set of walls belonging to one geometry object; may carry a
/// surface class modifying reactions on its walls (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub object_id: GeometryObjectId,
    pub walls: Vec<WallIndex>,
    pub surface_class: Option<SurfaceClassId>,
}

impl Region {
    pub fn new(name: impl Into<String>, object_id: GeometryObjectId) -> Self {
        Self {
            name: name.into(),
            object_id,
            walls: Vec::new(),
            surface_class: None,
        }
    }

    pub fn contains_wall(&self, wall: WallIndex) -> bool {
        self.walls.contains(&wall)
    }
}
