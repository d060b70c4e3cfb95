use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::errors::{PenumbraError, Result};
use crate::resources::material::{
    Material, MaterialShaderMap, MeshShaderMap, ShaderId, VertexFactoryType,
};
use crate::scene::light::Light;
use crate::scene::primitive::Primitive;
use crate::scene::{LightKey, MaterialKey, PrimitiveKey};

/// How a light shadows a dynamically interacting primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DynamicShadowType {
    None,
    #[default]
    Projected,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightInteraction {
    pub primitive: PrimitiveKey,
    pub shadow_type: DynamicShadowType,
}

/// Adjacency lists of one light.
#[derive(Debug, Clone, Default)]
pub struct LightInteractions {
    /// Primitives lit dynamically, in registration order.
    pub dynamic: Vec<LightInteraction>,
    /// Primitives with precomputed lighting. Candidate preshadow casters.
    pub static_primitives: Vec<PrimitiveKey>,
}

/// Storage for everything the shadow subsystem reads.
///
/// Lights, primitives and materials live in slot maps; shadow records only
/// hold their keys.
pub struct Scene {
    pub lights: SlotMap<LightKey, Light>,
    pub primitives: SlotMap<PrimitiveKey, Primitive>,
    pub materials: SlotMap<MaterialKey, Material>,

    interactions: SecondaryMap<LightKey, LightInteractions>,
    default_material: MaterialKey,
    next_shader_id: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        let mut scene = Self {
            lights: SlotMap::with_key(),
            primitives: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            interactions: SecondaryMap::new(),
            default_material: MaterialKey::default(),
            next_shader_id: 0,
        };
        scene.default_material = scene.add_material("DefaultMaterial", false);
        scene
    }

    // ====Lights====

    pub fn add_light(&mut self, light: Light) -> LightKey {
        let key = self.lights.insert(light);
        self.interactions.insert(key, LightInteractions::default());
        key
    }

    #[must_use]
    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    // ====Primitives====

    pub fn add_primitive(&mut self, primitive: Primitive) -> PrimitiveKey {
        self.primitives.insert(primitive)
    }

    #[must_use]
    pub fn primitive(&self, key: PrimitiveKey) -> Option<&Primitive> {
        self.primitives.get(key)
    }

    pub fn primitive_mut(&mut self, key: PrimitiveKey) -> Option<&mut Primitive> {
        self.primitives.get_mut(key)
    }

    /// Groups `child` under `parent` so the parent's shadow also covers it.
    ///
    /// Groups are one level deep: the parent must not itself be a child and
    /// the child must not already belong to a group.
    pub fn attach_shadow_child(&mut self, parent: PrimitiveKey, child: PrimitiveKey) -> Result<()> {
        let invalid = PenumbraError::InvalidShadowParent { child, parent };
        if parent == child {
            return Err(invalid);
        }

        let child_prim = self
            .primitives
            .get(child)
            .ok_or(PenumbraError::UnknownPrimitive(child))?;
        if child_prim.shadow_parent.is_some() || !child_prim.shadow_children.is_empty() {
            return Err(invalid);
        }

        let parent_prim = self
            .primitives
            .get_mut(parent)
            .ok_or(PenumbraError::UnknownPrimitive(parent))?;
        if parent_prim.shadow_parent.is_some() {
            return Err(invalid);
        }
        parent_prim.shadow_children.push(child);

        if let Some(child_prim) = self.primitives.get_mut(child) {
            child_prim.shadow_parent = Some(parent);
        }
        Ok(())
    }

    // ====Interactions====

    pub fn add_dynamic_interaction(
        &mut self,
        light: LightKey,
        primitive: PrimitiveKey,
        shadow_type: DynamicShadowType,
    ) -> Result<()> {
        if !self.primitives.contains_key(primitive) {
            return Err(PenumbraError::UnknownPrimitive(primitive));
        }
        let list = self
            .interactions
            .get_mut(light)
            .ok_or(PenumbraError::UnknownLight(light))?;
        list.dynamic.push(LightInteraction {
            primitive,
            shadow_type,
        });
        Ok(())
    }

    pub fn add_static_interaction(&mut self, light: LightKey, primitive: PrimitiveKey) -> Result<()> {
        if !self.primitives.contains_key(primitive) {
            return Err(PenumbraError::UnknownPrimitive(primitive));
        }
        let list = self
            .interactions
            .get_mut(light)
            .ok_or(PenumbraError::UnknownLight(light))?;
        list.static_primitives.push(primitive);
        Ok(())
    }

    #[must_use]
    pub fn interactions(&self, light: LightKey) -> Option<&LightInteractions> {
        self.interactions.get(light)
    }

    // ====Materials====

    /// Adds a material compiled for every vertex factory.
    pub fn add_material(&mut self, name: &str, masked: bool) -> MaterialKey {
        self.add_material_for(name, masked, &VertexFactoryType::ALL)
    }

    /// Adds a material compiled only for `vertex_factories`.
    pub fn add_material_for(
        &mut self,
        name: &str,
        masked: bool,
        vertex_factories: &[VertexFactoryType],
    ) -> MaterialKey {
        let mut shader_map = MaterialShaderMap::default();
        for &vertex_factory in vertex_factories {
            let map = MeshShaderMap {
                depth_vertex_shader: self.allocate_shader_id(),
                depth_pixel_shader: self.allocate_shader_id(),
            };
            shader_map.insert(vertex_factory, map);
        }
        self.materials.insert(Material::new(name, masked, shader_map))
    }

    #[must_use]
    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    /// Opaque material substituted for non-masked materials in depth passes.
    #[must_use]
    pub fn default_material(&self) -> MaterialKey {
        self.default_material
    }

    /// Material whose shaders render `material` into a shadow depth map.
    ///
    /// Masked materials keep their own shaders so cutouts still let light
    /// through. Everything else (including unknown keys) uses the default.
    #[must_use]
    pub fn shadow_depth_material(&self, material: MaterialKey) -> MaterialKey {
        match self.materials.get(material) {
            Some(m) if m.masked => material,
            _ => self.default_material,
        }
    }

    fn allocate_shader_id(&mut self) -> ShaderId {
        let id = ShaderId(self.next_shader_id);
        self.next_shader_id += 1;
        id
    }
}
