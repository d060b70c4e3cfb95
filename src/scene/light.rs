use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::renderer::settings::ShadowSettings;
use crate::renderer::shadow::frustum::ProjectedShadowInitializer;
use crate::scene::bounds::BoxSphereBounds;
use crate::scene::view::SceneView;

/// Near plane of point and spot light shadow frusta.
pub const NEAR_LIGHT_W: f32 = 0.1;

/// How a light's shadow is composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LightShadowMode {
    /// Shadow attenuates the light's own contribution via the attenuation buffer.
    #[default]
    Normal,
    /// Shadow darkens scene color directly.
    Modulate,
}

/// Filtering technique requested by a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowProjectionTechnique {
    /// Follow the global VSM / branching PCF switches.
    #[default]
    Default,
    Pcf,
    Vsm,
    BpcfLow,
    BpcfMedium,
    BpcfHigh,
}

impl ShadowProjectionTechnique {
    #[inline]
    #[must_use]
    pub fn is_branching_pcf(self) -> bool {
        matches!(self, Self::BpcfLow | Self::BpcfMedium | Self::BpcfHigh)
    }
}

/// Filter quality tier. Ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ShadowFilterQuality {
    #[default]
    Low,
    Medium,
    High,
}

impl ShadowFilterQuality {
    /// Applies a signed tier offset, saturating at both ends.
    #[must_use]
    pub fn biased(self, bias: i32) -> Self {
        match (self as i32).saturating_add(bias) {
            i32::MIN..=0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point {
        radius: f32,
    },
    Spot {
        radius: f32,
        /// Half angle of the outer cone in radians.
        outer_cone: f32,
    },
}

/// A light source as seen by the shadow subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    /// World position (point and spot lights).
    pub position: Vec3,
    /// Direction light travels (directional and spot lights).
    pub direction: Vec3,

    pub cast_dynamic_shadows: bool,
    pub shadow_mode: LightShadowMode,
    pub shadow_projection_technique: ShadowProjectionTechnique,
    pub shadow_filter_quality: ShadowFilterQuality,

    /// Overrides [`ShadowSettings::min_shadow_resolution`] when non-zero.
    pub min_shadow_resolution: u32,
    /// Overrides [`ShadowSettings::max_shadow_resolution`] when non-zero.
    pub max_shadow_resolution: u32,

    /// Seconds a shadow takes to fade after its subject stops rendering.
    /// Values at or below `1e-4` disable time based fading.
    pub shadow_fadeout_time: f32,
    pub shadow_fadeout_exponent: f32,

    /// Color of fully shadowed regions for modulated shadows.
    pub mod_shadow_color: Vec4,
}

impl Light {
    fn with_kind(kind: LightKind, position: Vec3, direction: Vec3) -> Self {
        Self {
            kind,
            position,
            direction,
            cast_dynamic_shadows: true,
            shadow_mode: LightShadowMode::Normal,
            shadow_projection_technique: ShadowProjectionTechnique::Default,
            shadow_filter_quality: ShadowFilterQuality::Low,
            min_shadow_resolution: 0,
            max_shadow_resolution: 0,
            shadow_fadeout_time: 0.0,
            shadow_fadeout_exponent: 3.0,
            mod_shadow_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    #[must_use]
    pub fn new_directional(direction: Vec3) -> Self {
        Self::with_kind(LightKind::Directional, Vec3::ZERO, direction)
    }

    #[must_use]
    pub fn new_point(position: Vec3, radius: f32) -> Self {
        Self::with_kind(LightKind::Point { radius }, position, Vec3::NEG_Z)
    }

    #[must_use]
    pub fn new_spot(position: Vec3, direction: Vec3, radius: f32, outer_cone: f32) -> Self {
        Self::with_kind(LightKind::Spot { radius, outer_cone }, position, direction)
    }

    #[inline]
    #[must_use]
    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional)
    }

    /// Influence radius, `None` for directional lights.
    #[must_use]
    pub fn radius(&self) -> Option<f32> {
        match self.kind {
            LightKind::Directional => None,
            LightKind::Point { radius } | LightKind::Spot { radius, .. } => Some(radius),
        }
    }

    /// `(min, max)` shadow resolution after applying per-light overrides.
    #[must_use]
    pub fn resolution_range(&self, settings: &ShadowSettings) -> (u32, u32) {
        let min = if self.min_shadow_resolution > 0 {
            self.min_shadow_resolution
        } else {
            settings.min_shadow_resolution
        };
        let max = if self.max_shadow_resolution > 0 {
            self.max_shadow_resolution
        } else {
            settings.max_shadow_resolution
        };
        (min, max)
    }

    /// Whether the light can contribute to anything inside the view frustum.
    #[must_use]
    pub fn affects_view(&self, view: &SceneView) -> bool {
        match self.radius() {
            None => true,
            Some(radius) => view.frustum().intersects_sphere(self.position, radius),
        }
    }

    /// Light space setup for a projected shadow of `bounds`.
    ///
    /// Returns `None` when the light cannot shadow the subject: the light is
    /// inside the subject sphere, the subject lies outside the light's
    /// influence or cone, or the subject has no extent.
    #[must_use]
    pub fn projected_shadow_initializer(
        &self,
        bounds: &BoxSphereBounds,
        settings: &ShadowSettings,
    ) -> Option<ProjectedShadowInitializer> {
        let subject_radius = bounds.sphere_radius;
        if subject_radius.is_nan() || subject_radius <= 0.0 {
            return None;
        }

        match self.kind {
            LightKind::Directional => {
                let direction = self.direction.try_normalize()?;
                let world_to_light = Mat4::from_scale(Vec3::new(
                    1.0,
                    1.0 / subject_radius,
                    1.0 / subject_radius,
                )) * Mat4::from_quat(Quat::from_rotation_arc(direction, Vec3::X))
                    * Mat4::from_translation(-bounds.origin);

                Some(ProjectedShadowInitializer {
                    world_to_light,
                    face_direction: Vec3::X,
                    w_axis: Vec4::new(0.0, 0.0, 0.0, 1.0),
                    min_light_w: -settings.world_half_extent,
                    max_light_w: settings.world_half_extent,
                    is_directional: true,
                })
            }
            LightKind::Point { radius } | LightKind::Spot { radius, .. } => {
                let to_subject = bounds.origin - self.position;
                let distance = to_subject.length();

                if distance <= subject_radius || distance - subject_radius > radius {
                    return None;
                }

                let axis = to_subject / distance;
                let half_angle = (subject_radius / distance).asin();

                if let LightKind::Spot { outer_cone, .. } = self.kind {
                    let cone_axis = self.direction.try_normalize()?;
                    let angle = axis.dot(cone_axis).clamp(-1.0, 1.0).acos();
                    if angle - half_angle > outer_cone {
                        return None;
                    }
                }

                let scale = 1.0 / half_angle.tan();
                let world_to_light = Mat4::from_scale(Vec3::new(1.0, scale, scale))
                    * Mat4::from_quat(Quat::from_rotation_arc(axis, Vec3::X))
                    * Mat4::from_translation(-self.position);

                Some(ProjectedShadowInitializer {
                    world_to_light,
                    face_direction: Vec3::X,
                    w_axis: Vec4::new(0.0, 0.0, 1.0, 0.0),
                    min_light_w: NEAR_LIGHT_W,
                    max_light_w: radius,
                    is_directional: false,
                })
            }
        }
    }
}
