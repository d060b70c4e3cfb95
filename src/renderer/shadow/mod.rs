//! Projected Shadows
//!
//! Per-frame dynamic shadow pipeline:
//! - frustum: light space projections of a shadow subject
//! - record: ShadowRecord, the frame arena and per-view visibility
//! - scheduler: build_frame_shadows, which shadows exist this frame
//! - atlas: TextureLayout, greedy packing of shadow tiles
//! - depth_pass: caster depths into atlas tiles
//! - projection_pass: stencil masked projection onto the scene
//! - technique / params: projection technique selection and shader inputs
//! - renderer: ShadowRenderer, the per-light atlas loop

pub mod atlas;
pub mod depth_pass;
pub mod draw_list;
pub mod frustum;
pub mod params;
pub mod projection_pass;
pub mod record;
pub mod renderer;
pub mod scheduler;
pub mod technique;

pub use atlas::TextureLayout;
pub use draw_list::{DrawBatch, DrawListKey, StaticDrawList, StaticMeshRef};
pub use frustum::{FrustumTransforms, ProjectedShadowInitializer};
pub use params::{DepthShaderParameters, ProjectionParameters, TechniqueParameters};
pub use record::{FrameShadows, ShadowArena, ShadowId, ShadowRecord, ShadowVisibilityMap};
pub use renderer::{ShadowFrustumWireframe, ShadowRenderer};
pub use scheduler::build_frame_shadows;
pub use technique::{BranchingPcfQuality, ProjectionTechnique, select_projection_technique};
