//! Elementary-molecule type declarations (spec.md §6 model ingestion):
//! the schema that a [`crate::species::Species`] is checked to be fully
//! qualified against.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One named component slot on a molecule type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentType {
    pub name: String,
    /// Allowed state names; empty means the component is stateless.
    pub states: Vec<String>,
}

/// An elementary-molecule type: its component slots and per-molecule
/// diffusion parameters (spec.md §4.2.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MolType {
    pub name: String,
    pub components: Vec<ComponentType>,
    pub diffusion_constant: f64,
    pub custom_time_step: Option<f64>,
    pub custom_space_step: Option<f64>,
    pub is_surface: bool,
}

impl MolType {
    pub fn component(&self, name: &str) -> Option<&ComponentType> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Lookup table of declared molecule types, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MolTypeRegistry {
    types: HashMap<String, MolType>,
}

impl MolTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mol_type: MolType) {
        self.types.insert(mol_type.name.clone(), mol_type);
    }

    pub fn get(&self, name: &str) -> Option<&MolType> {
        self.types.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trips_a_type() {
        let mut reg = MolTypeRegistry::new();
        reg.insert(MolType {
            name: "A".to_string(),
            components: vec![ComponentType {
                name: "b".to_string(),
                states: vec![],
            }],
            diffusion_constant: 1e-6,
            custom_time_step: None,
            custom_space_step: None,
            is_surface: false,
        });
        assert!(reg.get("A").is_some());
        assert_eq!(reg.get("A").unwrap().component("b").unwrap().name, "b");
        assert!(reg.get("Missing").is_none());
    }
}
