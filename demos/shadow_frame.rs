//! Runs a few frames of projected shadows over a small scene and logs what
//! each frame schedules and records.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example shadow_frame
//! ```

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, UVec2, Vec3};
use penumbra::renderer::command::{CommandContext, RenderCommand};
use penumbra::renderer::settings::{DeviceCapabilities, ShadowSettings};
use penumbra::renderer::shadow::{ShadowRenderer, build_frame_shadows};
use penumbra::resources::VertexFactoryType;
use penumbra::scene::{
    BoxSphereBounds, DepthPriorityGroup, DynamicShadowType, Light, MeshElement, Primitive, Scene,
    SceneView, StaticMesh,
};

const FRAMES: u32 = 4;

fn build_scene() -> anyhow::Result<Scene> {
    let mut scene = Scene::new();
    let skin = scene.add_material("Skin", false);
    let foliage = scene.add_material("Foliage", true);

    let sun = scene.add_light(Light::new_directional(Vec3::new(-0.3, -1.0, -0.2)));
    let mut lamp = Light::new_point(Vec3::new(0.0, 8.0, 0.0), 40.0);
    lamp.shadow_fadeout_time = 1.0;
    let lamp = scene.add_light(lamp);

    // A row of characters.
    for i in 0..6 {
        let center = Vec3::new(i as f32 * 4.0 - 10.0, 1.0, 0.0);
        let character = scene.add_primitive(
            Primitive::new(BoxSphereBounds::from_sphere(center, 1.0)).with_dynamic_element(
                MeshElement {
                    vertex_factory: VertexFactoryType::GpuSkin,
                    material: skin,
                    cast_shadow: true,
                    local_to_world: Mat4::from_translation(center),
                },
            ),
        );
        scene.add_dynamic_interaction(sun, character, DynamicShadowType::Projected)?;
        scene.add_dynamic_interaction(lamp, character, DynamicShadowType::Projected)?;
    }

    // Trees overhead, casting onto the characters through preshadows.
    for i in 0..3 {
        let center = Vec3::new(i as f32 * 8.0 - 8.0, 12.0, 0.0);
        let tree = scene.add_primitive(
            Primitive::new(BoxSphereBounds::from_sphere(center, 3.0)).with_static_mesh(
                StaticMesh {
                    vertex_factory: VertexFactoryType::Local,
                    material: foliage,
                    cast_shadow: true,
                },
            ),
        );
        scene.add_static_interaction(sun, tree)?;
    }

    Ok(scene)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let scene = build_scene()?;
    let settings = ShadowSettings {
        max_shadow_resolution: 1024,
        ..Default::default()
    };
    let mut renderer = ShadowRenderer::new(settings.clone(), DeviceCapabilities::default())?;
    let mut cmd = CommandContext::new();

    let mut view = SceneView::new(
        UVec2::new(1920, 1080),
        Mat4::look_at_rh(Vec3::new(0.0, 4.0, 18.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
        Mat4::perspective_rh(FRAC_PI_2, 1920.0 / 1080.0, 0.5, 1000.0),
        0.5,
    );
    for (key, _) in &scene.primitives {
        view.set_primitive_visible(key, true);
    }

    for frame_index in 0..FRAMES {
        view.world_time = frame_index as f32 / 30.0;
        cmd.begin_frame();
        renderer.begin_frame();

        let views = std::slice::from_ref(&view);
        let mut frame = build_frame_shadows(&scene, views, &settings);
        log::info!("Frame {frame_index}: {} shadows scheduled", frame.len());

        for (light, _) in &scene.lights {
            for dpg in [DepthPriorityGroup::World, DepthPriorityGroup::Foreground] {
                if !renderer.check_for_projected_shadows(&frame, &scene, views, light, dpg) {
                    continue;
                }
                renderer.render_projected_shadows(&mut cmd, &mut frame, &scene, views, light, dpg);
            }
        }

        let passes = frame
            .records()
            .iter()
            .filter_map(|(_, r)| r.rendered_in_pass)
            .max()
            .map_or(0, |p| p + 1);
        let draws = cmd
            .commands()
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawMesh { .. } | RenderCommand::DrawFrustum(_)))
            .count();
        log::info!(
            "Frame {frame_index}: {} commands, {draws} draws, up to {passes} atlas passes, {} shader states",
            cmd.commands().len(),
            cmd.bound_shader_states().len()
        );
    }

    Ok(())
}
