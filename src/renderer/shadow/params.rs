//! Shadow Shader Parameters
//!
//! Values bound by the depth and projection passes. Each projection
//! technique carries its own parameter struct inside
//! [`TechniqueParameters`].

use glam::{Mat4, Vec2, Vec4};
use smallvec::SmallVec;

use crate::renderer::settings::{DeviceCapabilities, DeviceFeatures, ShadowSettings};
use crate::renderer::shadow::record::ShadowRecord;
use crate::renderer::shadow::technique::{
    BranchingPcfQuality, ProjectionTechnique, uses_branching_pcf, uses_vsm,
};
use crate::scene::light::{Light, LightShadowMode};
use crate::scene::view::SceneView;

/// Keeps reconstructed far-plane depth finite.
pub const Z_PRECISION: f32 = 0.001;

/// Extra depth bias making branching PCF line up with uniform PCF.
pub const BRANCHING_PCF_DEPTH_BIAS: f32 = 0.001;

const FOUR_SAMPLE_OFFSETS: [Vec2; 4] = [
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
    Vec2::new(-0.5, 0.5),
    Vec2::new(0.5, 0.5),
];

const SIXTEEN_SAMPLE_OFFSETS: [Vec2; 16] = [
    Vec2::new(-1.5, -1.5),
    Vec2::new(-0.5, -1.5),
    Vec2::new(0.5, -1.5),
    Vec2::new(1.5, -1.5),
    Vec2::new(-1.5, -0.5),
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
    Vec2::new(1.5, -0.5),
    Vec2::new(-1.5, 0.5),
    Vec2::new(-0.5, 0.5),
    Vec2::new(0.5, 0.5),
    Vec2::new(1.5, 0.5),
    Vec2::new(-1.5, 1.5),
    Vec2::new(-0.5, 1.5),
    Vec2::new(0.5, 1.5),
    Vec2::new(1.5, 1.5),
];

// ============================================================================
// Depth Pass
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthShaderParameters {
    /// Rasterization transform.
    pub projection_matrix: Mat4,
    /// Transform producing the stored depth.
    pub depth_matrix: Mat4,
    pub inv_max_subject_depth: f32,
    pub depth_bias: f32,
}

impl DepthShaderParameters {
    #[must_use]
    pub fn new(record: &ShadowRecord, depth_bias: f32) -> Self {
        Self {
            projection_matrix: record.subject_matrix,
            depth_matrix: record.subject_and_receiver_matrix,
            inv_max_subject_depth: inv_max_subject_depth(record),
            depth_bias,
        }
    }
}

/// Scale normalizing stored shadow depth. Flat subjects are floored to
/// `f32::EPSILON` depth.
#[inline]
#[must_use]
pub fn inv_max_subject_depth(record: &ShadowRecord) -> f32 {
    1.0 / record.max_subject_depth.max(f32::EPSILON)
}

/// Depth bias applied when rendering `light`'s shadow depths.
///
/// VSM relies on a statistical bias only. Branching PCF adds a small
/// constant on top of the global bias.
#[must_use]
pub fn shadow_depth_bias(light: &Light, settings: &ShadowSettings) -> f32 {
    if uses_vsm(light, settings) {
        0.0
    } else if uses_branching_pcf(light, settings) {
        settings.shadow_depth_bias + BRANCHING_PCF_DEPTH_BIAS
    } else {
        settings.shadow_depth_bias
    }
}

// ============================================================================
// Projection Pass
// ============================================================================

/// Which shadow depth surface is sampled, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthSampler {
    /// Depth texture with linear filtering of comparison results.
    HardwarePcf,
    /// Depth texture, nearest filtering.
    DepthTexture,
    /// Depth texture, four texels per fetch.
    Fetch4,
    /// Color-encoded depth, nearest filtering.
    ColorDepth,
}

#[must_use]
pub fn depth_sampler(technique: ProjectionTechnique, caps: &DeviceCapabilities) -> DepthSampler {
    if technique.uses_hardware_pcf() {
        DepthSampler::HardwarePcf
    } else if caps.supports(DeviceFeatures::DEPTH_TEXTURES) {
        DepthSampler::DepthTexture
    } else if technique.uses_fetch4() {
        DepthSampler::Fetch4
    } else {
        DepthSampler::ColorDepth
    }
}

/// Uniform PCF tap offsets in shadow texture space, two taps per `Vec4`.
///
/// The grid is rotated by 45° and scaled so the kernel spans
/// `filter_radius` texels of a `buffer_resolution` texture.
#[must_use]
pub fn sample_offsets(
    sample_count: usize,
    filter_radius: f32,
    buffer_resolution: u32,
) -> SmallVec<[Vec4; 8]> {
    let grid: &[Vec2] = match sample_count {
        4 => &FOUR_SAMPLE_OFFSETS,
        16 => &SIXTEEN_SAMPLE_OFFSETS,
        _ => return SmallVec::new(),
    };

    let (sin, cos) = (0.25 * std::f32::consts::PI).sin_cos();
    let texel_radius = filter_radius / 2.0 / buffer_resolution as f32;
    let rotate = |p: Vec2| {
        Vec2::new(p.x * cos + p.y * sin, p.x * -sin + p.y * cos) * texel_radius
    };

    grid.chunks_exact(2)
        .map(|pair| {
            let a = rotate(pair[0]);
            let b = rotate(pair[1]);
            Vec4::new(a.x, a.y, b.x, b.y)
        })
        .collect()
}

/// Maps screen position (scaled by scene depth) to shadow atlas UV and
/// normalized shadow depth.
///
/// The input is `(ndc.x * d, ndc.y * d, d, 1)` for a pixel of scene depth
/// `d`; the output is homogeneous.
#[must_use]
pub fn screen_to_shadow(
    record: &ShadowRecord,
    view: &SceneView,
    settings: &ShadowSettings,
    caps: &DeviceCapabilities,
) -> Mat4 {
    let inv_buffer_resolution = 1.0 / settings.shadow_buffer_resolution as f32;
    let fraction = 0.5 * record.resolution as f32 * inv_buffer_resolution;
    let border = settings.shadow_border as f32 + caps.pixel_center_offset;

    // Scene depth is clip w, i.e. `z_axis.w` times view space z.
    let projection = &view.projection_matrix;
    let depth_to_clip_z = if projection.z_axis.w.abs() > f32::EPSILON {
        projection.z_axis.z / projection.z_axis.w
    } else {
        projection.z_axis.z
    };
    let screen_to_clip = Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, depth_to_clip_z, 1.0),
        Vec4::new(0.0, 0.0, projection.w_axis.z, 0.0),
    );

    let clip_to_atlas = Mat4::from_cols(
        Vec4::new(fraction, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -fraction, 0.0, 0.0),
        Vec4::new(0.0, 0.0, inv_max_subject_depth(record), 0.0),
        Vec4::new(
            (record.atlas_x as f32 + border) * inv_buffer_resolution + fraction,
            (record.atlas_y as f32 + border) * inv_buffer_resolution + fraction,
            0.0,
            1.0,
        ),
    );

    clip_to_atlas
        * record.subject_and_receiver_matrix
        * view.view_projection_matrix.inverse()
        * screen_to_clip
}

/// Maps screen position (scaled by scene depth) back to world space.
#[must_use]
pub fn screen_to_world(view: &SceneView) -> Mat4 {
    let z = 1.0 - Z_PRECISION;
    view.view_projection_matrix.inverse()
        * Mat4::from_cols(
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, z, 1.0),
            Vec4::new(0.0, 0.0, -view.near_plane * z, 0.0),
        )
}

/// Color of shadowed pixels for a modulated shadow, faded toward white.
#[must_use]
pub fn mod_shadow_color(light: &Light, fade_alpha: f32) -> Vec4 {
    Vec4::ONE.lerp(light.mod_shadow_color, fade_alpha)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcfParameters {
    pub depth_sampler: DepthSampler,
    pub sample_offsets: SmallVec<[Vec4; 8]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VsmParameters {
    /// Blur radius of the variance filter in texture space.
    pub texel_radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchingPcfParameters {
    pub quality: BranchingPcfQuality,
    pub depth_sampler: DepthSampler,
    pub texel_radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TechniqueParameters {
    Pcf(PcfParameters),
    Vsm(VsmParameters),
    BranchingPcf(BranchingPcfParameters),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModShadowParameters {
    pub shadow_modulate_color: Vec4,
    pub screen_to_world: Mat4,
}

/// Everything the projection shaders consume for one shadow in one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParameters {
    pub screen_to_shadow: Mat4,
    pub shadow_buffer_size: Vec2,
    pub technique: TechniqueParameters,
    /// Present for modulated lights only.
    pub modulated: Option<ModShadowParameters>,
}

impl ProjectionParameters {
    #[must_use]
    pub fn new(
        technique: ProjectionTechnique,
        record: &ShadowRecord,
        light: &Light,
        view: &SceneView,
        settings: &ShadowSettings,
        caps: &DeviceCapabilities,
    ) -> Self {
        let buffer_resolution = settings.shadow_buffer_resolution;
        let texel_radius = settings.shadow_filter_radius / 2.0 / buffer_resolution as f32;

        let technique_params = match technique {
            ProjectionTechnique::Vsm => TechniqueParameters::Vsm(VsmParameters { texel_radius }),
            ProjectionTechnique::BranchingPcf(quality) => {
                TechniqueParameters::BranchingPcf(BranchingPcfParameters {
                    quality,
                    depth_sampler: depth_sampler(technique, caps),
                    texel_radius,
                })
            }
            _ => TechniqueParameters::Pcf(PcfParameters {
                depth_sampler: depth_sampler(technique, caps),
                sample_offsets: sample_offsets(
                    technique.sample_count(),
                    settings.shadow_filter_radius,
                    buffer_resolution,
                ),
            }),
        };

        let modulated = (light.shadow_mode == LightShadowMode::Modulate).then(|| {
            ModShadowParameters {
                shadow_modulate_color: mod_shadow_color(light, record.fade_alpha),
                screen_to_world: screen_to_world(view),
            }
        });

        Self {
            screen_to_shadow: screen_to_shadow(record, view, settings, caps),
            shadow_buffer_size: Vec2::splat(buffer_resolution as f32),
            technique: technique_params,
            modulated,
        }
    }
}
