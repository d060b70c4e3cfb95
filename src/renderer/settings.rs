//! Shadow Settings & Device Capabilities
//!
//! This module defines the engine-wide configuration consumed by the shadow
//! scheduler and the shadow render passes.
//!
//! - [`ShadowSettings`] holds tunables (resolution range, atlas size, fade
//!   and filter parameters). It can be loaded from JSON and validated.
//! - [`DeviceCapabilities`] describes what the graphics device supports.
//!   Technique selection and clear/blend policies branch on it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use penumbra::renderer::settings::{DeviceCapabilities, ShadowSettings};
//!
//! let settings = ShadowSettings {
//!     max_shadow_resolution: 1024,
//!     ..Default::default()
//! };
//! settings.validate()?;
//!
//! let caps = DeviceCapabilities::default();
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::errors::{PenumbraError, Result};

// ---------------------------------------------------------------------------
// ShadowSettings
// ---------------------------------------------------------------------------

/// Global configuration for dynamic projected shadows.
///
/// Per-light overrides (see [`Light`](crate::scene::light::Light)) take
/// precedence over the resolution range when they are non-zero.
///
/// # Fields
///
/// | Field                          | Description                                   | Default   |
/// |--------------------------------|-----------------------------------------------|-----------|
/// | `min_shadow_resolution`        | Smallest tile edge a shadow may request        | `32`      |
/// | `max_shadow_resolution`        | Largest tile edge (border included)            | `512`     |
/// | `shadow_buffer_resolution`     | Edge length of the square shadow atlas         | `2048`    |
/// | `shadow_border`                | Texels of padding around every tile            | `5`       |
/// | `resolution_scale`             | Screen radius to tile resolution factor        | `2.0`     |
/// | `resolution_fade_exponent`     | Exponent applied to the resolution fraction    | `0.2`     |
/// | `shadow_filter_radius`         | PCF kernel radius in texels                    | `2.0`     |
/// | `shadow_depth_bias`            | Depth bias for PCF techniques                  | `0.012`   |
/// | `filter_quality_bias`          | Added to every light's filter quality          | `0`       |
/// | `enable_vsm_shadows`           | Lights with the default technique use VSM      | `false`   |
/// | `enable_branching_pcf_shadows` | Lights with the default technique use BPCF     | `false`   |
/// | `optimize_stencil_clear`       | Fold the stencil clear into the projection     | `true`    |
/// | `use_hi_stencil`               | Use hierarchical stencil when supported        | `true`    |
/// | `world_half_extent`            | Depth range of directional light shadows       | `262144`  |
/// | `max_atlas_passes`             | Atlas passes per light before giving up        | `8`       |
/// | `show_shadow_frusta`           | Collect frustum wireframes for debugging       | `false`   |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    // === Resolution ===
    pub min_shadow_resolution: u32,
    pub max_shadow_resolution: u32,
    pub shadow_buffer_resolution: u32,
    pub shadow_border: u32,
    pub resolution_scale: f32,
    pub resolution_fade_exponent: f32,

    // === Filtering ===
    pub shadow_filter_radius: f32,
    pub shadow_depth_bias: f32,
    /// Signed offset applied to each light's [`ShadowFilterQuality`](crate::scene::light::ShadowFilterQuality).
    pub filter_quality_bias: i32,
    pub enable_vsm_shadows: bool,
    pub enable_branching_pcf_shadows: bool,

    // === Stencil ===
    pub optimize_stencil_clear: bool,
    pub use_hi_stencil: bool,

    // === Misc ===
    pub world_half_extent: f32,
    pub max_atlas_passes: u32,
    pub show_shadow_frusta: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            min_shadow_resolution: 32,
            max_shadow_resolution: 512,
            shadow_buffer_resolution: 2048,
            shadow_border: 5,
            resolution_scale: 2.0,
            resolution_fade_exponent: 0.2,
            shadow_filter_radius: 2.0,
            shadow_depth_bias: 0.012,
            filter_quality_bias: 0,
            enable_vsm_shadows: false,
            enable_branching_pcf_shadows: false,
            optimize_stencil_clear: true,
            use_hi_stencil: true,
            world_half_extent: 262_144.0,
            max_atlas_passes: 8,
            show_shadow_frusta: false,
        }
    }
}

impl ShadowSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    /// The result is validated before it is returned.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the values describe a usable configuration.
    pub fn validate(&self) -> Result<()> {
        if self.min_shadow_resolution == 0 {
            return Err(PenumbraError::InvalidSettings(
                "min_shadow_resolution must be non-zero".into(),
            ));
        }
        if self.min_shadow_resolution > self.max_shadow_resolution {
            return Err(PenumbraError::InvalidSettings(format!(
                "min_shadow_resolution ({}) exceeds max_shadow_resolution ({})",
                self.min_shadow_resolution, self.max_shadow_resolution
            )));
        }
        if self
            .shadow_border
            .checked_mul(2)
            .is_none_or(|borders| self.shadow_buffer_resolution <= borders)
        {
            return Err(PenumbraError::InvalidSettings(format!(
                "shadow_buffer_resolution ({}) leaves no room inside a {}-texel border",
                self.shadow_buffer_resolution, self.shadow_border
            )));
        }
        if self.resolution_scale.is_nan() || self.resolution_scale <= 0.0 {
            return Err(PenumbraError::InvalidSettings(
                "resolution_scale must be positive".into(),
            ));
        }
        if self.resolution_fade_exponent.is_nan() || self.resolution_fade_exponent < 0.0 {
            return Err(PenumbraError::InvalidSettings(
                "resolution_fade_exponent must be non-negative".into(),
            ));
        }
        if self.shadow_filter_radius.is_nan() || self.shadow_filter_radius < 0.0 {
            return Err(PenumbraError::InvalidSettings(
                "shadow_filter_radius must be non-negative".into(),
            ));
        }
        if self.world_half_extent.is_nan() || self.world_half_extent <= 0.0 {
            return Err(PenumbraError::InvalidSettings(
                "world_half_extent must be positive".into(),
            ));
        }
        if self.max_atlas_passes == 0 {
            return Err(PenumbraError::InvalidSettings(
                "max_atlas_passes must be at least 1".into(),
            ));
        }
        if self.max_shadow_resolution > self.shadow_buffer_resolution {
            log::warn!(
                "max_shadow_resolution ({}) is larger than the shadow atlas ({}); tiles will be clamped",
                self.max_shadow_resolution,
                self.shadow_buffer_resolution
            );
        }
        Ok(())
    }

    /// Tile edge (resolution plus border on both sides) for a shadow.
    #[inline]
    #[must_use]
    pub fn tile_size(&self, resolution: u32) -> u32 {
        resolution + 2 * self.shadow_border
    }
}

// ---------------------------------------------------------------------------
// DeviceCapabilities
// ---------------------------------------------------------------------------

bitflags! {
    /// Optional device features the shadow passes branch on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeviceFeatures: u32 {
        /// Depth textures can be sampled directly.
        const DEPTH_TEXTURES = 1 << 0;
        /// Depth comparisons are filtered by the texture unit.
        const HARDWARE_PCF   = 1 << 1;
        /// Four neighbouring depth samples can be fetched at once.
        const FETCH4         = 1 << 2;
        /// Hierarchical stencil record/playback.
        const HI_STENCIL     = 1 << 3;
        /// Blending into floating point render targets.
        const FP_BLENDING    = 1 << 4;
    }
}

/// Shader model class of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderModel {
    Sm2,
    #[default]
    Sm3,
}

/// What the graphics device can do. Evaluated once per light when a
/// projection technique is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCapabilities {
    pub features: DeviceFeatures,
    pub shader_model: ShaderModel,
    /// Offset from pixel corner to pixel center in texels.
    pub pixel_center_offset: f32,
    /// The renderer uses the inverse winding convention for culling.
    pub inverted_cull: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            features: DeviceFeatures::DEPTH_TEXTURES
                | DeviceFeatures::HARDWARE_PCF
                | DeviceFeatures::FP_BLENDING,
            shader_model: ShaderModel::Sm3,
            pixel_center_offset: 0.0,
            inverted_cull: false,
        }
    }
}

impl DeviceCapabilities {
    #[inline]
    #[must_use]
    pub fn supports(&self, features: DeviceFeatures) -> bool {
        self.features.contains(features)
    }

    /// Whether shadow depth lives in a depth target that can be sampled,
    /// as opposed to a color-encoded depth value.
    #[inline]
    #[must_use]
    pub fn samples_depth_directly(&self) -> bool {
        self.features.intersects(
            DeviceFeatures::DEPTH_TEXTURES | DeviceFeatures::HARDWARE_PCF | DeviceFeatures::FETCH4,
        )
    }
}
