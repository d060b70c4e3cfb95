//! Shadow Scheduling
//!
//! Decides, once per frame, which projected shadows exist and how large
//! they are. The output [`FrameShadows`] is read-only input for the atlas
//! loop in [`ShadowRenderer`](super::ShadowRenderer).
//!
//! # Per Light
//!
//! Only lights that cast dynamic shadows and touch at least one view are
//! considered. Each of their dynamic interactions of type
//! [`DynamicShadowType::Projected`] whose primitive heads a shadow group
//! yields up to two records:
//!
//! - a **main shadow** cast by the group onto the world behind it
//! - a **preshadow** cast by the world in front of the group onto the group,
//!   only when the group's primitive is itself visible
//!
//! Static interactions are tested against every preshadow of the light and
//! become its casters when they overlap its subject frustum.

use smallvec::SmallVec;

use crate::renderer::settings::ShadowSettings;
use crate::renderer::shadow::record::{
    FrameShadows, ShadowArena, ShadowId, ShadowRecord, ShadowVisibilityMap,
};
use crate::scene::bounds::{BoxSphereBounds, Sphere};
use crate::scene::light::Light;
use crate::scene::primitive::Primitive;
use crate::scene::scene::{DynamicShadowType, Scene};
use crate::scene::view::SceneView;
use crate::scene::{LightKey, PrimitiveKey};

/// Fade values at or below this are not worth rendering.
const MIN_FADE_ALPHA: f32 = 1.0e-6;

/// Fadeout times at or below this disable time based fading.
const MIN_FADEOUT_TIME: f32 = 1.0e-4;

/// Creates every projected shadow of the frame and the per-view visibility
/// of each.
///
/// Records without any caster are dropped before visibility is computed,
/// so every returned record has subject content.
#[must_use]
pub fn build_frame_shadows(
    scene: &Scene,
    views: &[SceneView],
    settings: &ShadowSettings,
) -> FrameShadows {
    let mut arena = ShadowArena::default();

    for (light_key, light) in &scene.lights {
        if !light.cast_dynamic_shadows {
            continue;
        }
        if !views.iter().any(|view| light.affects_view(view)) {
            continue;
        }
        let Some(interactions) = scene.interactions(light_key) else {
            continue;
        };

        let mut preshadows: SmallVec<[ShadowId; 8]> = SmallVec::new();

        for interaction in &interactions.dynamic {
            if interaction.shadow_type != DynamicShadowType::Projected {
                continue;
            }
            let Some(primitive) = scene.primitive(interaction.primitive) else {
                continue;
            };
            // Grouped primitives are shadowed through their parent.
            if primitive.shadow_parent.is_some() {
                continue;
            }

            create_projected_shadow(
                &mut arena,
                &mut preshadows,
                scene,
                views,
                settings,
                light_key,
                light,
                interaction.primitive,
                primitive,
            );
        }

        for &preshadow in &preshadows {
            let Some(record) = arena.get_mut(preshadow) else {
                continue;
            };
            for &static_key in &interactions.static_primitives {
                let Some(primitive) = scene.primitive(static_key) else {
                    continue;
                };
                if record
                    .subject_frustum
                    .intersects_box(primitive.bounds.origin, primitive.bounds.box_extent)
                {
                    record.add_subject_primitive(scene, static_key);
                }
            }
        }
    }

    let before = arena.len();
    arena.retain(ShadowRecord::has_subject_prims);
    if arena.len() < before {
        log::trace!("Dropped {} shadows without casters", before - arena.len());
    }

    let visibility = views
        .iter()
        .map(|view| {
            let mut map = ShadowVisibilityMap::default();
            for (id, record) in arena.iter() {
                let visible = scene
                    .primitive(record.subject)
                    .is_some_and(|subject| is_shadow_visible(view, record, subject));
                map.set(id, visible);
            }
            map
        })
        .collect();

    let frame = FrameShadows::from_parts(arena, visibility);
    log::debug!(
        "Scheduled {} projected shadows for {} views",
        frame.len(),
        frame.view_count()
    );
    frame
}

fn is_shadow_visible(view: &SceneView, record: &ShadowRecord, subject: &Primitive) -> bool {
    let relevance = view.relevance(record.subject, subject);
    let relevant = relevance.is_relevant() || relevance.shadow_relevance;
    let occluded = !view.ignore_occlusion_queries
        && view.is_shadow_occluded(record.subject, record.light);
    record.has_subject_prims() && relevant && !occluded
}

fn create_projected_shadow(
    arena: &mut ShadowArena,
    preshadows: &mut SmallVec<[ShadowId; 8]>,
    scene: &Scene,
    views: &[SceneView],
    settings: &ShadowSettings,
    light_key: LightKey,
    light: &Light,
    subject_key: PrimitiveKey,
    subject: &Primitive,
) {
    let mut visible_this_frame = false;
    let mut potentially_visible_next_frame = false;
    let mut subject_visible = false;

    for view in views {
        let relevance = view.relevance(subject_key, subject);
        let relevant = relevance.is_relevant() || relevance.shadow_relevance;
        let occluded =
            !view.ignore_occlusion_queries && view.is_shadow_occluded(subject_key, light_key);

        visible_this_frame |= relevant && !occluded;
        potentially_visible_next_frame |= relevant;
        subject_visible |= view.is_primitive_visible(subject_key);
    }

    if !visible_this_frame && !potentially_visible_next_frame {
        return;
    }

    let bounds = group_bounds(scene, subject);

    let Some(initializer) = light.projected_shadow_initializer(&bounds, settings) else {
        log::trace!("Light cannot shadow primitive {subject_key:?}");
        return;
    };
    let transforms = initializer.calc_transforms(bounds.sphere());

    let (min_resolution, max_resolution) = light.resolution_range(settings);
    let borders = settings.shadow_border.saturating_mul(2);
    let max_tile = settings.shadow_buffer_resolution.saturating_sub(borders);
    let lower = min_resolution.min(max_tile);
    let upper = max_resolution.saturating_sub(borders).min(max_tile);

    let sphere = bounds.sphere();
    let resolution = views
        .iter()
        .map(|view| {
            let desired = (screen_radius(view, &sphere) * settings.resolution_scale) as u32;
            // The minimum wins when the border eats into the maximum.
            desired.min(upper).max(lower)
        })
        .max()
        .unwrap_or(lower);

    let fade_alpha = fade_alpha(
        light,
        settings,
        views,
        subject,
        resolution,
        min_resolution,
        max_resolution,
    );
    if fade_alpha <= MIN_FADE_ALPHA {
        log::trace!("Shadow of {subject_key:?} faded out (alpha {fade_alpha})");
        return;
    }

    let mut main = ShadowRecord::new(light_key, subject_key, &transforms, resolution, fade_alpha, false);
    let mut preshadow = subject_visible.then(|| {
        ShadowRecord::new(
            light_key,
            subject_key,
            &transforms,
            (resolution / 2).max(lower),
            fade_alpha,
            true,
        )
    });

    for &key in subject
        .shadow_children
        .iter()
        .chain(std::iter::once(&subject_key))
    {
        main.add_subject_primitive(scene, key);
        if let Some(preshadow) = preshadow.as_mut() {
            preshadow.add_receiver_primitive(key);
        }
    }

    arena.push(main);
    if let Some(preshadow) = preshadow {
        preshadows.push(arena.push(preshadow));
    }
}

/// Bounds of a shadow group: the parent plus all of its shadow children.
fn group_bounds(scene: &Scene, parent: &Primitive) -> BoxSphereBounds {
    parent
        .shadow_children
        .iter()
        .filter_map(|&child| scene.primitive(child))
        .fold(parent.bounds, |bounds, child| bounds.union(&child.bounds))
}

/// Projected radius of `sphere` in pixels.
fn screen_radius(view: &SceneView, sphere: &Sphere) -> f32 {
    let clip = view.view_projection_matrix * sphere.center.extend(1.0);
    let projection = &view.projection_matrix;
    let half_size = view.size.as_vec2() / 2.0;

    (half_size.x * projection.x_axis.x).max(half_size.y * projection.y_axis.y) * sphere.radius
        / clip.w.max(1.0)
}

/// Combined resolution and time fade of a shadow.
fn fade_alpha(
    light: &Light,
    settings: &ShadowSettings,
    views: &[SceneView],
    subject: &Primitive,
    resolution: u32,
    min_resolution: u32,
    max_resolution: u32,
) -> f32 {
    let fadeout_time = light.shadow_fadeout_time;
    let time_fade = if fadeout_time > MIN_FADEOUT_TIME {
        let elapsed = views.iter().fold(fadeout_time, |elapsed, view| {
            elapsed.min(view.world_time - subject.last_render_time)
        });
        (1.0 - (elapsed / fadeout_time).clamp(0.0, 1.0)).powf(light.shadow_fadeout_exponent)
    } else {
        1.0
    };

    let resolution_fraction = resolution.saturating_sub(min_resolution) as f32
        / max_resolution.saturating_sub(min_resolution).max(1) as f32;

    resolution_fraction.powf(settings.resolution_fade_exponent) * time_fade
}
