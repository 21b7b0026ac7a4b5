//! Surface materials and the per-pair contact parameters derived from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// Identifies a [`Material`] registered in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    /// Placeholder used by the default contact material
    pub const NONE: Self = Self(u32::MAX);
}

/// A named surface tag.
///
/// When both materials of a contact define `friction` (or `restitution`), the
/// product of the two overrides the contact material's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub friction: Option<f32>,
    pub restitution: Option<f32>,
}

/// Friction, restitution and equation tuning for a pair of materials
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactMaterial {
    pub materials: (MaterialId, MaterialId),
    pub friction: f32,
    pub restitution: f32,
    pub contact_equation_stiffness: f32,
    pub contact_equation_relaxation: f32,
    pub friction_equation_stiffness: f32,
    pub friction_equation_relaxation: f32,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            materials: (MaterialId::NONE, MaterialId::NONE),
            friction: 0.3,
            restitution: 0.0,
            contact_equation_stiffness: 1e7,
            contact_equation_relaxation: 3.0,
            friction_equation_stiffness: 1e7,
            friction_equation_relaxation: 3.0,
        }
    }
}

impl ContactMaterial {
    pub fn new(a: MaterialId, b: MaterialId, friction: f32, restitution: f32) -> Self {
        Self {
            materials: (a, b),
            friction,
            restitution,
            ..Self::default()
        }
    }

    pub fn with_contact_equation(mut self, stiffness: f32, relaxation: f32) -> Self {
        self.contact_equation_stiffness = stiffness;
        self.contact_equation_relaxation = relaxation;
        self
    }

    pub fn with_friction_equation(mut self, stiffness: f32, relaxation: f32) -> Self {
        self.friction_equation_stiffness = stiffness;
        self.friction_equation_relaxation = relaxation;
        self
    }
}

fn pair_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Materials and contact materials known to a world
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    contact_materials: HashMap<(MaterialId, MaterialId), ContactMaterial>,
    default_contact_material: ContactMaterial,
}

impl MaterialRegistry {
    pub fn new(default_contact_material: ContactMaterial) -> Self {
        Self {
            default_contact_material,
            ..Self::default()
        }
    }

    pub fn add_material(&mut self, name: impl Into<String>) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Material {
            id,
            name: name.into(),
            friction: None,
            restitution: None,
        });
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0 as usize)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Registers `cm`, replacing any entry for the same pair in either order
    pub fn add_contact_material(&mut self, cm: ContactMaterial) -> PhysicsResult<()> {
        let (a, b) = cm.materials;
        for id in [a, b] {
            if self.material(id).is_none() {
                return Err(PhysicsError::MaterialNotFound(id));
            }
        }
        self.contact_materials.insert(pair_key(a, b), cm);
        Ok(())
    }

    /// Symmetric lookup: `(a, b)` and `(b, a)` give the same entry
    pub fn contact_material(&self, a: MaterialId, b: MaterialId) -> Option<&ContactMaterial> {
        self.contact_materials.get(&pair_key(a, b))
    }

    pub fn default_contact_material(&self) -> &ContactMaterial {
        &self.default_contact_material
    }

    pub fn set_default_contact_material(&mut self, cm: ContactMaterial) {
        self.default_contact_material = cm;
    }

    /// Contact parameters for two (optional) surface materials
    pub fn resolve(&self, a: Option<MaterialId>, b: Option<MaterialId>) -> ContactMaterial {
        let mut cm = match (a, b) {
            (Some(a), Some(b)) => self
                .contact_material(a, b)
                .copied()
                .unwrap_or(self.default_contact_material),
            _ => self.default_contact_material,
        };

        if let (Some(ma), Some(mb)) = (a.and_then(|id| self.material(id)), b.and_then(|id| self.material(id))) {
            if let (Some(fa), Some(fb)) = (ma.friction, mb.friction) {
                cm.friction = fa * fb;
            }
            if let (Some(ra), Some(rb)) = (ma.restitution, mb.restitution) {
                cm.restitution = ra * rb;
            }
        }
        cm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_lookup_is_symmetric() {
        let mut registry = MaterialRegistry::default();
        let ice = registry.add_material("ice");
        let steel = registry.add_material("steel");
        registry
            .add_contact_material(ContactMaterial::new(ice, steel, 0.05, 0.1))
            .unwrap();

        let forward = registry.contact_material(ice, steel).unwrap();
        let backward = registry.contact_material(steel, ice).unwrap();
        assert_eq!(forward, backward);
        assert!(registry.contact_material(ice, ice).is_none());
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let mut registry = MaterialRegistry::default();
        let ice = registry.add_material("ice");
        let result = registry.add_contact_material(ContactMaterial::new(ice, MaterialId(9), 0.1, 0.0));
        assert!(matches!(result, Err(PhysicsError::MaterialNotFound(MaterialId(9)))));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let mut registry = MaterialRegistry::default();
        let rubber = registry.add_material("rubber");

        let cm = registry.resolve(Some(rubber), None);
        assert!((cm.friction - 0.3).abs() < EPSILON);
        assert_eq!(cm.restitution, 0.0);
    }

    #[test]
    fn test_default_contact_material_can_be_replaced() {
        let mut registry = MaterialRegistry::default();
        registry.set_default_contact_material(
            ContactMaterial::new(MaterialId::NONE, MaterialId::NONE, 0.8, 0.2)
                .with_contact_equation(1e6, 4.0)
                .with_friction_equation(1e5, 2.0),
        );

        let cm = registry.resolve(None, None);
        assert!((cm.friction - 0.8).abs() < EPSILON);
        assert_eq!(cm.contact_equation_stiffness, 1e6);
        assert_eq!(cm.contact_equation_relaxation, 4.0);
        assert_eq!(cm.friction_equation_stiffness, 1e5);
        assert_eq!(cm.friction_equation_relaxation, 2.0);
    }

    #[test]
    fn test_material_products_override() {
        let mut registry = MaterialRegistry::default();
        let a = registry.add_material("a");
        let b = registry.add_material("b");
        registry
            .add_contact_material(ContactMaterial::new(a, b, 0.9, 0.9))
            .unwrap();

        registry.material_mut(a).unwrap().friction = Some(0.5);
        registry.material_mut(b).unwrap().friction = Some(0.4);
        registry.material_mut(a).unwrap().restitution = Some(0.5);

        let cm = registry.resolve(Some(a), Some(b));
        assert!((cm.friction - 0.2).abs() < EPSILON);
        // Only one side defines restitution, so the contact material wins
        assert!((cm.restitution - 0.9).abs() < EPSILON);
    }
}
