//! Shadow Frustum Tests
//!
//! Tests for:
//! - Light shadow initializers (directional, point, spot) and their rejections
//! - Subject / pre-subject / post-subject projection ranges
//! - Determinism of the frustum computation
//! - Receiver frustum vertices and wireframe

use glam::{Vec3, Vec4};

use penumbra::renderer::settings::ShadowSettings;
use penumbra::renderer::shadow::frustum::{FRUSTUM_INDICES, FrustumTransforms, cube_vertex_index};
use penumbra::renderer::shadow::record::ShadowRecord;
use penumbra::scene::bounds::BoxSphereBounds;
use penumbra::scene::light::Light;
use penumbra::scene::{LightKey, PrimitiveKey};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn project(m: &glam::Mat4, p: Vec3) -> Vec3 {
    let clip = *m * p.extend(1.0);
    clip.truncate() / clip.w
}

fn sphere_samples(center: Vec3, radius: f32) -> Vec<Vec3> {
    let mut points = vec![center];
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        points.push(center + axis * radius);
        points.push(center - axis * radius);
    }
    points
}

fn directional_transforms(center: Vec3, radius: f32) -> FrustumTransforms {
    let settings = ShadowSettings::default();
    let light = Light::new_directional(Vec3::new(0.0, -1.0, 0.0));
    let bounds = BoxSphereBounds::from_sphere(center, radius);
    light
        .projected_shadow_initializer(&bounds, &settings)
        .expect("directional lights always shadow")
        .calc_transforms(bounds.sphere())
}

fn point_transforms(center: Vec3, radius: f32) -> FrustumTransforms {
    let settings = ShadowSettings::default();
    let light = Light::new_point(Vec3::ZERO, 100.0);
    let bounds = BoxSphereBounds::from_sphere(center, radius);
    light
        .projected_shadow_initializer(&bounds, &settings)
        .expect("subject inside light radius")
        .calc_transforms(bounds.sphere())
}

// ============================================================================
// Initializers
// ============================================================================

#[test]
fn directional_initializer_is_parallel() {
    let settings = ShadowSettings::default();
    let light = Light::new_directional(Vec3::new(0.3, -1.0, 0.2));
    let bounds = BoxSphereBounds::from_sphere(Vec3::new(5.0, 0.0, 5.0), 3.0);

    let init = light.projected_shadow_initializer(&bounds, &settings).unwrap();
    assert!(init.is_directional);
    assert_eq!(init.w_axis, Vec4::W);
    assert!(approx(init.min_light_w, -settings.world_half_extent));
    assert!(approx(init.max_light_w, settings.world_half_extent));
}

#[test]
fn zero_radius_subject_has_no_initializer() {
    let settings = ShadowSettings::default();
    let light = Light::new_directional(Vec3::NEG_Y);
    let bounds = BoxSphereBounds::from_sphere(Vec3::ZERO, 0.0);
    assert!(light.projected_shadow_initializer(&bounds, &settings).is_none());
}

#[test]
fn point_light_inside_subject_has_no_initializer() {
    let settings = ShadowSettings::default();
    let light = Light::new_point(Vec3::new(1.0, 0.0, 0.0), 100.0);
    let bounds = BoxSphereBounds::from_sphere(Vec3::ZERO, 5.0);
    assert!(light.projected_shadow_initializer(&bounds, &settings).is_none());
}

#[test]
fn point_light_out_of_range_has_no_initializer() {
    let settings = ShadowSettings::default();
    let light = Light::new_point(Vec3::ZERO, 100.0);
    let bounds = BoxSphereBounds::from_sphere(Vec3::new(200.0, 0.0, 0.0), 5.0);
    assert!(light.projected_shadow_initializer(&bounds, &settings).is_none());
}

#[test]
fn spot_light_rejects_subjects_outside_cone() {
    let settings = ShadowSettings::default();
    let light = Light::new_spot(Vec3::ZERO, Vec3::X, 100.0, 0.3);

    let inside = BoxSphereBounds::from_sphere(Vec3::new(20.0, 0.0, 0.0), 1.0);
    let outside = BoxSphereBounds::from_sphere(Vec3::new(0.0, 20.0, 0.0), 1.0);

    assert!(light.projected_shadow_initializer(&inside, &settings).is_some());
    assert!(light.projected_shadow_initializer(&outside, &settings).is_none());
}

#[test]
fn point_initializer_is_perspective() {
    let settings = ShadowSettings::default();
    let light = Light::new_point(Vec3::ZERO, 100.0);
    let bounds = BoxSphereBounds::from_sphere(Vec3::new(20.0, 0.0, 0.0), 2.0);

    let init = light.projected_shadow_initializer(&bounds, &settings).unwrap();
    assert!(!init.is_directional);
    assert_eq!(init.w_axis, Vec4::new(0.0, 0.0, 1.0, 0.0));
    assert!(approx(init.max_light_w, 100.0));
}

// ============================================================================
// Projection Ranges
// ============================================================================

#[test]
fn directional_subject_matrix_bounds_subject() {
    let center = Vec3::new(10.0, 5.0, 3.0);
    let transforms = directional_transforms(center, 4.0);

    for p in sphere_samples(center, 4.0) {
        let ndc = project(&transforms.subject_matrix, p);
        assert!(ndc.x.abs() <= 1.0 + EPSILON, "x out of range: {ndc:?}");
        assert!(ndc.y.abs() <= 1.0 + EPSILON, "y out of range: {ndc:?}");
        assert!(ndc.z >= -EPSILON && ndc.z <= 1.0 + EPSILON, "z out of range: {ndc:?}");
    }

    let ndc = project(&transforms.subject_matrix, center);
    assert!(approx(ndc.x, 0.0) && approx(ndc.y, 0.0));
    assert!(approx(ndc.z, 0.5));
}

#[test]
fn directional_max_subject_depth_is_unit() {
    let transforms = directional_transforms(Vec3::new(-3.0, 2.0, 8.0), 6.0);
    assert!(approx(transforms.max_subject_depth, 1.0));
    assert!(transforms.is_directional);
}

#[test]
fn point_subject_matrix_spans_near_to_far_surface() {
    let center = Vec3::new(20.0, 0.0, 0.0);
    let transforms = point_transforms(center, 2.0);

    let near = project(&transforms.subject_matrix, Vec3::new(18.0, 0.0, 0.0));
    let far = project(&transforms.subject_matrix, Vec3::new(22.0, 0.0, 0.0));
    assert!(approx(near.z, 0.0), "near surface depth {}", near.z);
    assert!(approx(far.z, 1.0), "far surface depth {}", far.z);

    for p in sphere_samples(center, 2.0) {
        let ndc = project(&transforms.subject_matrix, p);
        assert!(ndc.x.abs() <= 1.0 + EPSILON);
        assert!(ndc.y.abs() <= 1.0 + EPSILON);
    }
}

#[test]
fn post_subject_matrix_reaches_past_subject() {
    let transforms = point_transforms(Vec3::new(20.0, 0.0, 0.0), 2.0);
    let behind = Vec3::new(50.0, 0.0, 0.0);

    let receiver = project(&transforms.post_subject_matrix, behind);
    assert!(receiver.z > 0.0 && receiver.z < 1.0);

    let subject = project(&transforms.subject_matrix, behind);
    assert!(subject.z > 1.0);
}

#[test]
fn pre_subject_matrix_reaches_toward_light() {
    let center = Vec3::ZERO;
    let transforms = directional_transforms(center, 10.0);
    // Light travels down, so casters in front of the subject sit above it.
    let above = Vec3::new(0.0, 100.0, 0.0);

    let pre = project(&transforms.pre_subject_matrix, above);
    assert!(pre.z >= 0.0 && pre.z < 1.0);

    let subject = project(&transforms.subject_matrix, above);
    assert!(subject.z < 0.0);
}

#[test]
fn frustum_computation_is_deterministic() {
    let a = point_transforms(Vec3::new(12.5, -3.0, 7.25), 1.5);
    let b = point_transforms(Vec3::new(12.5, -3.0, 7.25), 1.5);
    assert_eq!(a, b);

    let c = directional_transforms(Vec3::new(1.0, 2.0, 3.0), 0.5);
    let d = directional_transforms(Vec3::new(1.0, 2.0, 3.0), 0.5);
    assert_eq!(c, d);
}

// ============================================================================
// Frustum Geometry
// ============================================================================

#[test]
fn receiver_vertices_map_to_clip_corners() {
    let transforms = point_transforms(Vec3::new(20.0, 0.0, 0.0), 2.0);
    let record = ShadowRecord::new(
        LightKey::default(),
        PrimitiveKey::default(),
        &transforms,
        256,
        1.0,
        false,
    );

    let vertices = record.frustum_vertices();
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                let ndc = project(&record.receiver_matrix, vertices[cube_vertex_index(x, y, z)]);
                let expected = Vec3::new(
                    if x == 1 { -1.0 } else { 1.0 },
                    if y == 1 { -1.0 } else { 1.0 },
                    if z == 1 { 0.0 } else { 1.0 },
                );
                assert!(
                    (ndc - expected).abs().max_element() < 1e-3,
                    "corner ({x},{y},{z}): expected {expected:?}, got {ndc:?}"
                );
            }
        }
    }
}

#[test]
fn wireframe_edges_connect_frustum_vertices() {
    let transforms = point_transforms(Vec3::new(0.0, 0.0, 30.0), 3.0);
    let record = ShadowRecord::new(
        LightKey::default(),
        PrimitiveKey::default(),
        &transforms,
        128,
        1.0,
        true,
    );

    let vertices = record.frustum_vertices();
    for (a, b) in record.frustum_wireframe() {
        assert!(vertices.contains(&a));
        assert!(vertices.contains(&b));
        assert_ne!(a, b);
    }
}

#[test]
fn frustum_indices_reference_all_eight_vertices() {
    let mut used = [false; 8];
    for &index in &FRUSTUM_INDICES {
        used[index as usize] = true;
    }
    assert!(used.iter().all(|&u| u));
}

#[test]
fn preshadow_rasterizes_with_pre_subject_matrix() {
    let transforms = directional_transforms(Vec3::ZERO, 5.0);
    let main = ShadowRecord::new(
        LightKey::default(),
        PrimitiveKey::default(),
        &transforms,
        256,
        1.0,
        false,
    );
    let pre = ShadowRecord::new(
        LightKey::default(),
        PrimitiveKey::default(),
        &transforms,
        128,
        1.0,
        true,
    );

    assert_eq!(main.subject_matrix, transforms.subject_matrix);
    assert_eq!(main.receiver_matrix, transforms.post_subject_matrix);
    assert_eq!(pre.subject_matrix, transforms.pre_subject_matrix);
    assert_eq!(pre.receiver_matrix, transforms.subject_matrix);
    assert_eq!(pre.subject_and_receiver_matrix, transforms.subject_matrix);
}
