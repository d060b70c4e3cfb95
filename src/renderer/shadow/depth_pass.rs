//! Shadow Depth Pass
//!
//! Renders the casters of every allocated record into its atlas tile, then
//! resolves the touched part of the depth atlas. Variance shadow maps get an
//! extra filtering step per tile afterwards.

use glam::Vec4;

use crate::renderer::command::{
    BoundShaderStateKey, ClearValues, CommandContext, DepthState, MeshRef, RasterizerState,
    Rect, RenderTarget, ShaderRef, VertexLayout,
};
use crate::renderer::settings::{DeviceCapabilities, ShadowSettings};
use crate::renderer::shadow::params::DepthShaderParameters;
use crate::renderer::shadow::record::{FrameShadows, ShadowId, ShadowRecord};
use crate::resources::material::VertexFactoryType;
use crate::scene::primitive::DepthPriorityGroup;
use crate::scene::scene::Scene;
use crate::scene::view::SceneView;
use crate::scene::MaterialKey;

/// Atlas rectangle of a record's tile, border included.
#[must_use]
pub fn tile_rect(record: &ShadowRecord, settings: &ShadowSettings) -> Rect {
    let size = settings.tile_size(record.resolution);
    Rect::new(record.atlas_x, record.atlas_y, size, size)
}

/// Atlas rectangle a record's casters rasterize into, border excluded.
#[must_use]
pub fn inner_tile_rect(record: &ShadowRecord, settings: &ShadowSettings) -> Rect {
    let border = settings.shadow_border;
    Rect::new(
        record.atlas_x + border,
        record.atlas_y + border,
        record.resolution,
        record.resolution,
    )
}

/// Renders the depths of all `allocated` records and resolves the atlas.
pub fn render_shadow_depths(
    cmd: &mut CommandContext,
    frame: &FrameShadows,
    allocated: &[ShadowId],
    scene: &Scene,
    views: &[SceneView],
    dpg: DepthPriorityGroup,
    depth_bias: f32,
    settings: &ShadowSettings,
    caps: &DeviceCapabilities,
) {
    cmd.push_debug_group("Shadow Depths");
    cmd.set_render_target(RenderTarget::ShadowDepth);

    let mut extent: Option<(u32, u32)> = None;
    for record in allocated.iter().filter_map(|&id| frame.record(id)) {
        render_depth(cmd, record, scene, views, dpg, depth_bias, settings, caps);

        let tile = tile_rect(record, settings);
        extent = Some(match extent {
            None => (tile.right(), tile.bottom()),
            Some((x, y)) => (x.max(tile.right()), y.max(tile.bottom())),
        });
    }

    let buffer = settings.shadow_buffer_resolution;
    let resolve = match (dpg, extent) {
        // Foreground shadows may sample outside their tiles.
        (DepthPriorityGroup::Foreground, _) => Rect::new(0, 0, buffer, buffer),
        (_, Some((x, y))) => Rect::new(0, 0, x, y),
        (_, None) => Rect::default(),
    };
    cmd.resolve_shadow_depth(resolve);
    cmd.pop_debug_group();
}

/// Blurs the variance moments of every allocated tile.
pub fn render_shadow_variance(
    cmd: &mut CommandContext,
    frame: &FrameShadows,
    allocated: &[ShadowId],
    settings: &ShadowSettings,
) {
    cmd.push_debug_group("Shadow Variance");
    cmd.set_render_target(RenderTarget::ShadowVariance);

    let texel_radius =
        settings.shadow_filter_radius / 2.0 / settings.shadow_buffer_resolution as f32;
    for record in allocated.iter().filter_map(|&id| frame.record(id)) {
        cmd.filter_shadow_variance(tile_rect(record, settings), texel_radius);
    }
    cmd.pop_debug_group();
}

/// Renders one record's casters into its tile.
pub fn render_depth(
    cmd: &mut CommandContext,
    record: &ShadowRecord,
    scene: &Scene,
    views: &[SceneView],
    dpg: DepthPriorityGroup,
    depth_bias: f32,
    settings: &ShadowSettings,
    caps: &DeviceCapabilities,
) {
    cmd.set_viewport(tile_rect(record, settings));
    if caps.samples_depth_directly() {
        cmd.clear(ClearValues {
            depth: Some(1.0),
            ..ClearValues::default()
        });
    } else {
        cmd.clear(ClearValues {
            color: Some(Vec4::ONE),
            depth: Some(1.0),
            stencil: None,
        });
    }
    cmd.set_viewport(inner_tile_rect(record, settings));

    cmd.set_blend_state(None);
    cmd.set_depth_state(DepthState::WRITE_LESS_EQUAL);
    cmd.set_rasterizer_state(RasterizerState::solid(Some(wgpu::Face::Back)));

    // Any view that renders the subject in this group will do.
    let has_view = scene.primitive(record.subject).is_some_and(|subject| {
        views
            .iter()
            .any(|view| view.relevance(record.subject, subject).has_dpg(dpg))
    });
    debug_assert!(has_view, "no view renders shadow subject in {dpg:?}");
    if !has_view {
        log::error!(
            "No view renders shadow subject {:?} in {dpg:?}; skipping its depths",
            record.subject
        );
        return;
    }

    let params = DepthShaderParameters::new(record, depth_bias);

    for batch in record.subject_static_draw_list.batches() {
        if !bind_depth_shaders(cmd, scene, batch.key.material, batch.key.vertex_factory, true) {
            continue;
        }
        cmd.set_depth_shader_parameters(params);
        for mesh in &batch.meshes {
            let Some(primitive) = scene.primitive(mesh.primitive) else {
                continue;
            };
            cmd.draw_mesh(
                mesh.primitive,
                MeshRef::Static(mesh.mesh_index),
                primitive.local_to_world,
            );
        }
    }

    for &key in &record.subject_primitives {
        let Some(primitive) = scene.primitive(key) else {
            continue;
        };
        for (index, element) in primitive.dynamic_elements.iter().enumerate() {
            if !element.cast_shadow {
                continue;
            }
            let material = scene.shadow_depth_material(element.material);
            if !bind_depth_shaders(cmd, scene, material, element.vertex_factory, true) {
                continue;
            }
            cmd.set_depth_shader_parameters(params);
            cmd.draw_mesh(key, MeshRef::Dynamic(index), element.local_to_world);
        }
    }
}

/// Binds the depth shaders `material` compiled for `vertex_factory`.
/// Returns `false` (and reports) when the permutation is missing.
pub(crate) fn bind_depth_shaders(
    cmd: &mut CommandContext,
    scene: &Scene,
    material: MaterialKey,
    vertex_factory: VertexFactoryType,
    with_pixel_shader: bool,
) -> bool {
    let shaders = scene
        .material(material)
        .and_then(|m| m.shader_map().mesh_shader_map(vertex_factory));
    debug_assert!(shaders.is_some(), "missing depth shaders for {vertex_factory:?}");
    let Some(shaders) = shaders else {
        log::error!("Material {material:?} has no depth shaders for {vertex_factory:?}");
        return false;
    };

    cmd.set_bound_shader_state(BoundShaderStateKey {
        vertex_layout: VertexLayout::Mesh(vertex_factory),
        vertex_shader: ShaderRef::Material(shaders.depth_vertex_shader),
        pixel_shader: with_pixel_shader.then_some(ShaderRef::Material(shaders.depth_pixel_shader)),
    });
    true
}
