//! Scene Data Model
//!
//! The minimal scene contract consumed by the shadow subsystem:
//! - [`Light`]: shadow-casting light sources and their per-type frustum setup
//! - [`Primitive`]: renderable objects with bounds, meshes and shadow grouping
//! - [`SceneView`]: per-view relevance, occlusion and visibility queries
//! - [`Scene`]: storage plus the light → primitive interaction lists
//! - [`ConvexVolume`] / [`BoxSphereBounds`]: culling geometry

pub mod bounds;
pub mod frustum;
pub mod light;
pub mod primitive;
pub mod scene;
pub mod view;

pub use bounds::{BoxSphereBounds, Sphere};
pub use frustum::ConvexVolume;
pub use light::{Light, LightKind, LightShadowMode, ShadowFilterQuality, ShadowProjectionTechnique};
pub use primitive::{
    DepthPriorityGroup, DepthPriorityGroups, MeshElement, Primitive, PrimitiveViewRelevance,
    StaticMesh,
};
pub use scene::{DynamicShadowType, LightInteraction, LightInteractions, Scene};
pub use view::SceneView;

use slotmap::new_key_type;

new_key_type! {
    pub struct LightKey;
    pub struct PrimitiveKey;
    pub struct MaterialKey;
}
