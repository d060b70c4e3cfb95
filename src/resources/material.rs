//! Material Shader Contract
//!
//! The shadow passes only need two things from a material:
//! - whether it is masked (cutouts must keep their own depth shader)
//! - the shadow depth shader permutation compiled for a vertex factory
//!
//! [`Material::shader_map`] and [`MaterialShaderMap::mesh_shader_map`] expose
//! exactly that.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Vertex input layouts a mesh can be drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexFactoryType {
    Local,
    GpuSkin,
    ParticleSprite,
    Terrain,
}

impl VertexFactoryType {
    pub const ALL: [Self; 4] = [Self::Local, Self::GpuSkin, Self::ParticleSprite, Self::Terrain];
}

/// Opaque handle of a compiled shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShaderId(pub u32);

/// Shadow depth shaders compiled for one vertex factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshShaderMap {
    pub depth_vertex_shader: ShaderId,
    pub depth_pixel_shader: ShaderId,
}

/// All per-vertex-factory permutations of a material.
#[derive(Debug, Clone, Default)]
pub struct MaterialShaderMap {
    mesh_maps: FxHashMap<VertexFactoryType, MeshShaderMap>,
}

impl MaterialShaderMap {
    #[must_use]
    pub fn mesh_shader_map(&self, vertex_factory: VertexFactoryType) -> Option<&MeshShaderMap> {
        self.mesh_maps.get(&vertex_factory)
    }

    pub fn insert(&mut self, vertex_factory: VertexFactoryType, map: MeshShaderMap) {
        self.mesh_maps.insert(vertex_factory, map);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mesh_maps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mesh_maps.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Alpha tested; depth rendering must evaluate the material.
    pub masked: bool,
    shader_map: MaterialShaderMap,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>, masked: bool, shader_map: MaterialShaderMap) -> Self {
        Self {
            name: name.into(),
            masked,
            shader_map,
        }
    }

    #[must_use]
    pub fn shader_map(&self) -> &MaterialShaderMap {
        &self.shader_map
    }
}
