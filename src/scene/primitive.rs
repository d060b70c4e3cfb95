use bitflags::bitflags;
use glam::Mat4;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::resources::material::VertexFactoryType;
use crate::scene::bounds::BoxSphereBounds;
use crate::scene::{MaterialKey, PrimitiveKey};

/// Coarse back-to-front rendering bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthPriorityGroup {
    #[default]
    World,
    Foreground,
}

bitflags! {
    /// Set of depth priority groups a primitive renders in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DepthPriorityGroups: u8 {
        const WORLD      = 1 << 0;
        const FOREGROUND = 1 << 1;
    }
}

impl From<DepthPriorityGroup> for DepthPriorityGroups {
    fn from(dpg: DepthPriorityGroup) -> Self {
        match dpg {
            DepthPriorityGroup::World => Self::WORLD,
            DepthPriorityGroup::Foreground => Self::FOREGROUND,
        }
    }
}

/// How a primitive is relevant to one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimitiveViewRelevance {
    pub static_relevance: bool,
    pub dynamic_relevance: bool,
    pub shadow_relevance: bool,
    pub depth_priority_groups: DepthPriorityGroups,
}

impl Default for PrimitiveViewRelevance {
    fn default() -> Self {
        Self {
            static_relevance: true,
            dynamic_relevance: false,
            shadow_relevance: true,
            depth_priority_groups: DepthPriorityGroups::WORLD,
        }
    }
}

impl PrimitiveViewRelevance {
    /// Not relevant in any way; the view ignores the primitive.
    pub const NONE: Self = Self {
        static_relevance: false,
        dynamic_relevance: false,
        shadow_relevance: false,
        depth_priority_groups: DepthPriorityGroups::empty(),
    };

    #[inline]
    #[must_use]
    pub fn is_relevant(&self) -> bool {
        self.static_relevance || self.dynamic_relevance
    }

    #[inline]
    #[must_use]
    pub fn has_dpg(&self, dpg: DepthPriorityGroup) -> bool {
        self.depth_priority_groups.contains(dpg.into())
    }
}

/// A mesh cached in the scene at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMesh {
    pub vertex_factory: VertexFactoryType,
    pub material: MaterialKey,
    pub cast_shadow: bool,
}

/// A mesh element gathered every frame from a dynamic primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshElement {
    pub vertex_factory: VertexFactoryType,
    pub material: MaterialKey,
    pub cast_shadow: bool,
    pub local_to_world: Mat4,
}

/// A renderable object.
///
/// Primitives with static meshes contribute to shadow draw lists. Primitives
/// without them are drawn through their dynamic elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub bounds: BoxSphereBounds,
    pub local_to_world: Mat4,
    pub static_meshes: Vec<StaticMesh>,
    pub dynamic_elements: Vec<MeshElement>,

    /// Set when this primitive's shadow is cast by its parent's group.
    pub shadow_parent: Option<PrimitiveKey>,
    pub shadow_children: SmallVec<[PrimitiveKey; 4]>,

    /// World time at which the primitive was last rendered in any view.
    pub last_render_time: f32,
    /// Relevance used by views that do not override it.
    pub relevance: PrimitiveViewRelevance,
}

impl Primitive {
    #[must_use]
    pub fn new(bounds: BoxSphereBounds) -> Self {
        Self {
            bounds,
            local_to_world: Mat4::from_translation(bounds.origin),
            static_meshes: Vec::new(),
            dynamic_elements: Vec::new(),
            shadow_parent: None,
            shadow_children: SmallVec::new(),
            last_render_time: 0.0,
            relevance: PrimitiveViewRelevance::default(),
        }
    }

    #[must_use]
    pub fn with_static_mesh(mut self, mesh: StaticMesh) -> Self {
        self.static_meshes.push(mesh);
        self
    }

    #[must_use]
    pub fn with_dynamic_element(mut self, element: MeshElement) -> Self {
        self.dynamic_elements.push(element);
        self.relevance.dynamic_relevance = true;
        self
    }

    #[must_use]
    pub fn with_relevance(mut self, relevance: PrimitiveViewRelevance) -> Self {
        self.relevance = relevance;
        self
    }
}
