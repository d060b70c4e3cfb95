//! Shadow Renderer
//!
//! Drives the per-light atlas loop:
//!
//! 1. gather the light's records visible in some view for the depth
//!    priority group, largest first
//! 2. pack as many unrendered records as fit into a fresh atlas layout
//! 3. render their depths, filter variance when needed
//! 4. project every packed record in every view
//! 5. mark them rendered and repeat until all are done or nothing fits
//!
//! Records stay rendered for the rest of the frame, so a record visible in
//! several depth priority groups is drawn by whichever group comes first.

use glam::{Vec2, Vec3};

use crate::errors::Result;
use crate::renderer::command::{CommandContext, Rect, RenderTarget};
use crate::renderer::settings::{DeviceCapabilities, DeviceFeatures, ShadowSettings};
use crate::renderer::shadow::atlas::TextureLayout;
use crate::renderer::shadow::depth_pass::{render_shadow_depths, render_shadow_variance};
use crate::renderer::shadow::params::shadow_depth_bias;
use crate::renderer::shadow::projection_pass::render_projection;
use crate::renderer::shadow::record::{FrameShadows, ShadowId, ShadowRecord};
use crate::renderer::shadow::technique::{ProjectionTechnique, select_projection_technique};
use crate::scene::LightKey;
use crate::scene::light::{Light, LightShadowMode};
use crate::scene::primitive::DepthPriorityGroup;
use crate::scene::scene::Scene;
use crate::scene::view::SceneView;

/// Debug outline of one main shadow's receiver volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowFrustumWireframe {
    pub light: LightKey,
    pub lines: [(Vec3, Vec3); 12],
}

/// Renders projected shadows into the light attenuation buffer or, for
/// modulated lights, directly into scene color.
#[derive(Debug, Clone)]
pub struct ShadowRenderer {
    settings: ShadowSettings,
    caps: DeviceCapabilities,
    wireframes: Vec<ShadowFrustumWireframe>,
}

impl ShadowRenderer {
    /// Creates a renderer after validating `settings`.
    pub fn new(settings: ShadowSettings, caps: DeviceCapabilities) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            caps,
            wireframes: Vec::new(),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ShadowSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    #[must_use]
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.caps
    }

    /// Main shadow frustum outlines collected this frame. Only filled when
    /// [`ShadowSettings::show_shadow_frusta`] is set.
    #[must_use]
    pub fn wireframes(&self) -> &[ShadowFrustumWireframe] {
        &self.wireframes
    }

    pub fn begin_frame(&mut self) {
        self.wireframes.clear();
    }

    /// Whether `light` has any shadow visible in some view for `dpg`.
    #[must_use]
    pub fn check_for_projected_shadows(
        &self,
        frame: &FrameShadows,
        scene: &Scene,
        views: &[SceneView],
        light: LightKey,
        dpg: DepthPriorityGroup,
    ) -> bool {
        frame
            .records_for_light(light)
            .any(|(id, record)| is_visible_in_dpg(frame, scene, views, id, record, dpg))
    }

    /// Renders all of `light`'s shadows for `dpg`.
    ///
    /// Returns whether the light attenuation buffer (or scene color, for
    /// modulated lights) was written.
    pub fn render_projected_shadows(
        &mut self,
        cmd: &mut CommandContext,
        frame: &mut FrameShadows,
        scene: &Scene,
        views: &[SceneView],
        light_key: LightKey,
        dpg: DepthPriorityGroup,
    ) -> bool {
        let Some(light) = scene.light(light_key) else {
            return false;
        };

        let mut shadows: Vec<(ShadowId, u32)> = frame
            .records_for_light(light_key)
            .filter(|&(id, record)| is_visible_in_dpg(frame, scene, views, id, record, dpg))
            .map(|(id, record)| (id, record.resolution))
            .collect();
        if shadows.is_empty() {
            return false;
        }
        shadows.sort_by(|a, b| b.1.cmp(&a.1));

        let technique = select_projection_technique(light, &self.settings, &self.caps);
        let depth_bias = shadow_depth_bias(light, &self.settings);
        let buffer = self.settings.shadow_buffer_resolution;

        cmd.push_debug_group(format!("Projected Shadows ({dpg:?})"));

        let mut written = false;
        let mut pass = 0;
        loop {
            let pending = shadows
                .iter()
                .filter(|(id, _)| frame.record(*id).is_some_and(|r| !r.is_rendered))
                .count();
            if pending == 0 {
                break;
            }
            if pass >= self.settings.max_atlas_passes {
                log::debug!("{pending} shadows left unrendered after {pass} atlas passes");
                break;
            }

            let mut layout = TextureLayout::new(1, 1, buffer, buffer);
            let mut allocated = Vec::with_capacity(pending);
            for &(id, _) in &shadows {
                let Some(record) = frame.record_mut(id) else {
                    continue;
                };
                if record.is_rendered {
                    continue;
                }
                let tile = self.settings.tile_size(record.resolution);
                if let Some((x, y)) = layout.add_element(tile, tile) {
                    record.atlas_x = x;
                    record.atlas_y = y;
                    record.is_allocated = true;
                    allocated.push(id);
                }
            }

            if allocated.is_empty() {
                log::debug!("{pending} shadows do not fit the {buffer}x{buffer} shadow atlas");
                break;
            }
            log::trace!("Atlas pass {pass}: {} shadows", allocated.len());

            render_shadow_depths(
                cmd,
                frame,
                &allocated,
                scene,
                views,
                dpg,
                depth_bias,
                &self.settings,
                &self.caps,
            );
            if technique.is_vsm() {
                render_shadow_variance(cmd, frame, &allocated, &self.settings);
            }

            self.render_projections(cmd, frame, &allocated, scene, views, light, technique, dpg);
            written = true;

            for &id in &allocated {
                if let Some(record) = frame.record_mut(id) {
                    record.is_allocated = false;
                    record.is_rendered = true;
                    record.rendered_in_pass = Some(pass);
                }
                if self.settings.show_shadow_frusta {
                    // Only main shadows are outlined.
                    if let Some(record) = frame.record(id).filter(|r| !r.is_pre_shadow) {
                        self.wireframes.push(ShadowFrustumWireframe {
                            light: light_key,
                            lines: record.frustum_wireframe(),
                        });
                    }
                }
            }
            pass += 1;
        }

        cmd.pop_debug_group();
        written
    }

    fn render_projections(
        &self,
        cmd: &mut CommandContext,
        frame: &FrameShadows,
        allocated: &[ShadowId],
        scene: &Scene,
        views: &[SceneView],
        light: &Light,
        technique: ProjectionTechnique,
        dpg: DepthPriorityGroup,
    ) {
        cmd.push_debug_group("Shadow Projection");

        let modulated = light.shadow_mode == LightShadowMode::Modulate;
        let target = if modulated {
            RenderTarget::SceneColor
        } else {
            RenderTarget::LightAttenuation
        };
        // Without blending, overlapping shadows must see each other.
        let resolve_after_each =
            modulated && !self.caps.supports(DeviceFeatures::FP_BLENDING);

        cmd.set_render_target(target);

        for view in views {
            let viewport = Rect::new(view.origin.x, view.origin.y, view.size.x, view.size.y);
            cmd.set_viewport(viewport);
            cmd.set_view_projection(view.view_projection_matrix);
            cmd.set_scissor_rect(light_scissor_rect(light, view));

            for record in allocated.iter().filter_map(|&id| frame.record(id)) {
                let drawn = render_projection(
                    cmd,
                    record,
                    technique,
                    scene,
                    view,
                    light,
                    dpg,
                    &self.settings,
                    &self.caps,
                );
                if drawn && resolve_after_each {
                    cmd.resolve_scene_color();
                }
            }

            cmd.set_scissor_rect(None);
        }

        cmd.pop_debug_group();
    }
}

fn is_visible_in_dpg(
    frame: &FrameShadows,
    scene: &Scene,
    views: &[SceneView],
    id: ShadowId,
    record: &ShadowRecord,
    dpg: DepthPriorityGroup,
) -> bool {
    let Some(subject) = scene.primitive(record.subject) else {
        return false;
    };
    views.iter().enumerate().any(|(index, view)| {
        frame.is_visible(index, id) && view.relevance(record.subject, subject).has_dpg(dpg)
    })
}

/// Screen rectangle bounding `light`'s influence sphere in `view`.
///
/// `None` (no scissoring) for directional lights and for spheres that reach
/// behind the camera.
#[must_use]
pub fn light_scissor_rect(light: &Light, view: &SceneView) -> Option<Rect> {
    let radius = light.radius()?;

    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    for corner in 0..8u32 {
        let sign = Vec3::new(
            if corner & 1 == 0 { -1.0 } else { 1.0 },
            if corner & 2 == 0 { -1.0 } else { 1.0 },
            if corner & 4 == 0 { -1.0 } else { 1.0 },
        );
        let clip = view.view_projection_matrix * (light.position + sign * radius).extend(1.0);
        if clip.w <= view.near_plane {
            return None;
        }
        let ndc = Vec2::new(clip.x, clip.y) / clip.w;
        min = min.min(ndc);
        max = max.max(ndc);
    }

    let size = view.size.as_vec2();
    let to_pixels = |x: f32, y: f32| {
        Vec2::new(
            ((x + 1.0) * 0.5 * size.x).clamp(0.0, size.x),
            ((1.0 - y) * 0.5 * size.y).clamp(0.0, size.y),
        )
    };
    let top_left = to_pixels(min.x, max.y);
    let bottom_right = to_pixels(max.x, min.y);

    let x = top_left.x.floor() as u32;
    let y = top_left.y.floor() as u32;
    Some(Rect::new(
        view.origin.x + x,
        view.origin.y + y,
        (bottom_right.x.ceil() as u32).saturating_sub(x),
        (bottom_right.y.ceil() as u32).saturating_sub(y),
    ))
}
