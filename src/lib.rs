#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{PenumbraError, Result};
pub use renderer::shadow::{FrameShadows, ShadowRecord, ShadowRenderer, build_frame_shadows};
pub use renderer::{CommandContext, DeviceCapabilities, RenderCommand, ShadowSettings};
pub use resources::{Material, VertexFactoryType};
pub use scene::{
    DepthPriorityGroup, Light, LightKey, MaterialKey, Primitive, PrimitiveKey, Scene, SceneView,
};
