use glam::{Mat4, UVec2};
use rustc_hash::FxHashSet;
use slotmap::SecondaryMap;

use crate::scene::frustum::ConvexVolume;
use crate::scene::primitive::{Primitive, PrimitiveViewRelevance};
use crate::scene::{LightKey, PrimitiveKey};

/// One view of the scene for the current frame.
///
/// Carries the camera matrices plus the per-view results the shadow
/// scheduler consumes: primitive relevance overrides, primitive visibility
/// and shadow occlusion query results.
#[derive(Debug, Clone)]
pub struct SceneView {
    /// Top-left corner of the view inside the render target.
    pub origin: UVec2,
    pub size: UVec2,

    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_projection_matrix: Mat4,
    pub near_plane: f32,

    /// Current world time in seconds.
    pub world_time: f32,
    pub ignore_occlusion_queries: bool,

    frustum: ConvexVolume,
    relevance: SecondaryMap<PrimitiveKey, PrimitiveViewRelevance>,
    visible_primitives: FxHashSet<PrimitiveKey>,
    occluded_shadows: FxHashSet<(PrimitiveKey, LightKey)>,
}

impl SceneView {
    #[must_use]
    pub fn new(size: UVec2, view_matrix: Mat4, projection_matrix: Mat4, near_plane: f32) -> Self {
        let view_projection_matrix = projection_matrix * view_matrix;
        Self {
            origin: UVec2::ZERO,
            size,
            view_matrix,
            projection_matrix,
            view_projection_matrix,
            near_plane,
            world_time: 0.0,
            ignore_occlusion_queries: false,
            frustum: ConvexVolume::from_matrix(view_projection_matrix),
            relevance: SecondaryMap::new(),
            visible_primitives: FxHashSet::default(),
            occluded_shadows: FxHashSet::default(),
        }
    }

    #[must_use]
    pub fn frustum(&self) -> &ConvexVolume {
        &self.frustum
    }

    /// Relevance of `primitive` in this view, falling back to the
    /// primitive's own relevance.
    #[must_use]
    pub fn relevance(&self, key: PrimitiveKey, primitive: &Primitive) -> PrimitiveViewRelevance {
        self.relevance.get(key).copied().unwrap_or(primitive.relevance)
    }

    pub fn set_relevance(&mut self, key: PrimitiveKey, relevance: PrimitiveViewRelevance) {
        self.relevance.insert(key, relevance);
    }

    /// Whether the primitive itself passed visibility for this view.
    #[must_use]
    pub fn is_primitive_visible(&self, key: PrimitiveKey) -> bool {
        self.visible_primitives.contains(&key)
    }

    pub fn set_primitive_visible(&mut self, key: PrimitiveKey, visible: bool) {
        if visible {
            self.visible_primitives.insert(key);
        } else {
            self.visible_primitives.remove(&key);
        }
    }

    /// Occlusion query result for the shadow `primitive` casts from `light`.
    #[must_use]
    pub fn is_shadow_occluded(&self, primitive: PrimitiveKey, light: LightKey) -> bool {
        self.occluded_shadows.contains(&(primitive, light))
    }

    pub fn set_shadow_occluded(&mut self, primitive: PrimitiveKey, light: LightKey, occluded: bool) {
        if occluded {
            self.occluded_shadows.insert((primitive, light));
        } else {
            self.occluded_shadows.remove(&(primitive, light));
        }
    }
}
