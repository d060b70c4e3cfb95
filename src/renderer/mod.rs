//! Shadow Rendering
//!
//! - settings: ShadowSettings and DeviceCapabilities
//! - command: CommandContext, the recorded device command stream
//! - shadow: scheduling, atlas packing, depth and projection passes

pub mod command;
pub mod settings;
pub mod shadow;

pub use command::{CommandContext, RenderCommand};
pub use settings::{DeviceCapabilities, DeviceFeatures, ShaderModel, ShadowSettings};
pub use shadow::ShadowRenderer;
