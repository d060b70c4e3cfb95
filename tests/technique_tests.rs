//! Projection Technique Tests
//!
//! Tests for:
//! - Technique selection from light, global settings and device capabilities
//! - Depth bias per technique
//! - PCF tap offsets and depth sampler choice
//! - Projection parameters (screen to shadow mapping, modulated color)

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, UVec2, Vec3, Vec4};

use penumbra::renderer::settings::{DeviceCapabilities, DeviceFeatures, ShaderModel, ShadowSettings};
use penumbra::renderer::shadow::params::{
    BRANCHING_PCF_DEPTH_BIAS, DepthSampler, DepthShaderParameters, depth_sampler,
    inv_max_subject_depth, mod_shadow_color, sample_offsets, screen_to_shadow, shadow_depth_bias,
};
use penumbra::renderer::shadow::{
    BranchingPcfQuality, ProjectionParameters, ProjectionTechnique, ShadowRecord,
    TechniqueParameters, select_projection_technique,
};
use penumbra::scene::{
    BoxSphereBounds, Light, LightKey, LightShadowMode, PrimitiveKey, SceneView,
    ShadowFilterQuality, ShadowProjectionTechnique,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn light(technique: ShadowProjectionTechnique, quality: ShadowFilterQuality) -> Light {
    let mut light = Light::new_directional(Vec3::NEG_Y);
    light.shadow_projection_technique = technique;
    light.shadow_filter_quality = quality;
    light
}

fn caps(features: DeviceFeatures) -> DeviceCapabilities {
    DeviceCapabilities {
        features,
        ..Default::default()
    }
}

fn select(light: &Light, settings: &ShadowSettings, caps: &DeviceCapabilities) -> ProjectionTechnique {
    select_projection_technique(light, settings, caps)
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn low_quality_uses_four_samples() {
    let settings = ShadowSettings::default();
    let low = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::Low);

    assert_eq!(
        select(&low, &settings, &DeviceCapabilities::default()),
        ProjectionTechnique::FourSampleHwPcf
    );
    assert_eq!(
        select(&low, &settings, &caps(DeviceFeatures::DEPTH_TEXTURES)),
        ProjectionTechnique::FourSampleManualPcf
    );
}

#[test]
fn higher_quality_uses_sixteen_samples_by_device_preference() {
    let settings = ShadowSettings::default();
    let medium = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::Medium);

    assert_eq!(
        select(&medium, &settings, &DeviceCapabilities::default()),
        ProjectionTechnique::SixteenSampleHwPcf
    );
    assert_eq!(
        select(&medium, &settings, &caps(DeviceFeatures::FETCH4)),
        ProjectionTechnique::SixteenSampleFetch4
    );
    assert_eq!(
        select(&medium, &settings, &caps(DeviceFeatures::empty())),
        ProjectionTechnique::SixteenSampleManualPcf
    );
}

#[test]
fn shader_model_2_is_limited_to_four_samples() {
    let settings = ShadowSettings {
        enable_vsm_shadows: true,
        ..Default::default()
    };
    let high = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::High);
    let sm2 = DeviceCapabilities {
        shader_model: ShaderModel::Sm2,
        ..Default::default()
    };
    assert_eq!(select(&high, &settings, &sm2), ProjectionTechnique::FourSampleHwPcf);
}

#[test]
fn vsm_is_requested_per_light_or_globally() {
    let caps = DeviceCapabilities::default();
    let settings = ShadowSettings::default();
    let global = ShadowSettings {
        enable_vsm_shadows: true,
        ..Default::default()
    };

    let vsm = light(ShadowProjectionTechnique::Vsm, ShadowFilterQuality::Medium);
    let default = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::Medium);
    let pcf = light(ShadowProjectionTechnique::Pcf, ShadowFilterQuality::Medium);

    assert_eq!(select(&vsm, &settings, &caps), ProjectionTechnique::Vsm);
    assert_eq!(select(&default, &global, &caps), ProjectionTechnique::Vsm);
    assert_eq!(select(&pcf, &global, &caps), ProjectionTechnique::SixteenSampleHwPcf);
}

#[test]
fn low_quality_overrides_vsm_request() {
    let vsm = light(ShadowProjectionTechnique::Vsm, ShadowFilterQuality::Low);
    assert_eq!(
        select(&vsm, &ShadowSettings::default(), &DeviceCapabilities::default()),
        ProjectionTechnique::FourSampleHwPcf
    );
}

#[test]
fn branching_pcf_tiers() {
    let caps = DeviceCapabilities::default();
    let settings = ShadowSettings::default();
    let global = ShadowSettings {
        enable_branching_pcf_shadows: true,
        ..Default::default()
    };

    let explicit = light(ShadowProjectionTechnique::BpcfLow, ShadowFilterQuality::High);
    assert_eq!(
        select(&explicit, &settings, &caps),
        ProjectionTechnique::BranchingPcf(BranchingPcfQuality::Low)
    );

    let high = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::High);
    let medium = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::Medium);
    assert_eq!(
        select(&high, &global, &caps),
        ProjectionTechnique::BranchingPcf(BranchingPcfQuality::High)
    );
    assert_eq!(
        select(&medium, &global, &caps),
        ProjectionTechnique::BranchingPcf(BranchingPcfQuality::Medium)
    );
}

#[test]
fn vsm_wins_over_branching_pcf() {
    let settings = ShadowSettings {
        enable_vsm_shadows: true,
        enable_branching_pcf_shadows: true,
        ..Default::default()
    };
    let default = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::High);
    assert_eq!(
        select(&default, &settings, &DeviceCapabilities::default()),
        ProjectionTechnique::Vsm
    );
}

#[test]
fn filter_quality_bias_shifts_tier() {
    let caps = DeviceCapabilities::default();
    let low = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::Low);
    let high = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::High);

    let raise = ShadowSettings {
        filter_quality_bias: 1,
        ..Default::default()
    };
    let lower = ShadowSettings {
        filter_quality_bias: -5,
        ..Default::default()
    };
    assert_eq!(select(&low, &raise, &caps), ProjectionTechnique::SixteenSampleHwPcf);
    assert_eq!(select(&high, &lower, &caps), ProjectionTechnique::FourSampleHwPcf);

    assert_eq!(ShadowFilterQuality::Medium.biased(i32::MAX), ShadowFilterQuality::High);
    assert_eq!(ShadowFilterQuality::Medium.biased(i32::MIN), ShadowFilterQuality::Low);
}

#[test]
fn technique_sample_counts() {
    assert_eq!(ProjectionTechnique::FourSampleManualPcf.sample_count(), 4);
    assert_eq!(ProjectionTechnique::SixteenSampleFetch4.sample_count(), 16);
    assert_eq!(ProjectionTechnique::Vsm.sample_count(), 0);
    assert_eq!(
        ProjectionTechnique::BranchingPcf(BranchingPcfQuality::High).sample_count(),
        0
    );
}

// ============================================================================
// Depth Bias & Sampling
// ============================================================================

#[test]
fn depth_bias_depends_on_technique() {
    let settings = ShadowSettings::default();
    let base = settings.shadow_depth_bias;

    let vsm = light(ShadowProjectionTechnique::Vsm, ShadowFilterQuality::Medium);
    let bpcf = light(ShadowProjectionTechnique::BpcfHigh, ShadowFilterQuality::Medium);
    let pcf = light(ShadowProjectionTechnique::Pcf, ShadowFilterQuality::Medium);

    assert_eq!(shadow_depth_bias(&vsm, &settings), 0.0);
    assert!(approx(shadow_depth_bias(&bpcf, &settings), base + BRANCHING_PCF_DEPTH_BIAS));
    assert!(approx(shadow_depth_bias(&pcf, &settings), base));
}

#[test]
fn sample_offsets_pack_two_taps_per_vector() {
    assert_eq!(sample_offsets(4, 2.0, 2048).len(), 2);
    assert_eq!(sample_offsets(16, 2.0, 2048).len(), 8);
    assert!(sample_offsets(0, 2.0, 2048).is_empty());
}

#[test]
fn sample_offsets_are_rotated_and_scaled() {
    let texel_radius = 2.0 / 2.0 / 2048.0;
    let offsets = sample_offsets(4, 2.0, 2048);

    // (-0.5, -0.5) rotated by 45° lies on the negative x axis.
    assert!(approx(offsets[0].x, -std::f32::consts::FRAC_1_SQRT_2 * texel_radius));
    assert!(approx(offsets[0].y, 0.0));

    // Rotation preserves distance from the kernel center.
    for v in sample_offsets(16, 2.0, 2048) {
        for (x, y) in [(v.x, v.y), (v.z, v.w)] {
            let r = (x * x + y * y).sqrt() / texel_radius;
            assert!(r > 0.7 && r < 2.2, "tap radius {r}");
        }
    }
}

#[test]
fn depth_sampler_follows_technique_and_device() {
    let default = DeviceCapabilities::default();
    assert_eq!(
        depth_sampler(ProjectionTechnique::SixteenSampleHwPcf, &default),
        DepthSampler::HardwarePcf
    );
    assert_eq!(
        depth_sampler(ProjectionTechnique::SixteenSampleManualPcf, &caps(DeviceFeatures::DEPTH_TEXTURES)),
        DepthSampler::DepthTexture
    );
    assert_eq!(
        depth_sampler(ProjectionTechnique::SixteenSampleFetch4, &caps(DeviceFeatures::FETCH4)),
        DepthSampler::Fetch4
    );
    assert_eq!(
        depth_sampler(ProjectionTechnique::FourSampleManualPcf, &caps(DeviceFeatures::empty())),
        DepthSampler::ColorDepth
    );
}

// ============================================================================
// Projection Parameters
// ============================================================================

fn view() -> SceneView {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(FRAC_PI_2, 1.0, 1.0, 1000.0);
    SceneView::new(UVec2::splat(1024), view, projection, 1.0)
}

fn record(resolution: u32, fade_alpha: f32) -> ShadowRecord {
    let settings = ShadowSettings::default();
    let bounds = BoxSphereBounds::from_sphere(Vec3::ZERO, 10.0);
    let transforms = Light::new_directional(Vec3::NEG_Y)
        .projected_shadow_initializer(&bounds, &settings)
        .unwrap()
        .calc_transforms(bounds.sphere());
    ShadowRecord::new(
        LightKey::default(),
        PrimitiveKey::default(),
        &transforms,
        resolution,
        fade_alpha,
        false,
    )
}

#[test]
fn screen_to_shadow_lands_subject_center_in_tile_center() {
    let settings = ShadowSettings::default();
    let caps = DeviceCapabilities::default();
    let view = view();
    let mut record = record(400, 1.0);
    record.atlas_x = 100;
    record.atlas_y = 300;

    let clip = view.view_projection_matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
    let screen = Vec4::new(clip.x, clip.y, clip.w, 1.0);
    let shadow = screen_to_shadow(&record, &view, &settings, &caps) * screen;
    let shadow = shadow / shadow.w;

    let buffer = settings.shadow_buffer_resolution as f32;
    let border = settings.shadow_border as f32;
    assert!((shadow.x - (100.0 + border + 200.0) / buffer).abs() < 1e-3, "u {}", shadow.x);
    assert!((shadow.y - (300.0 + border + 200.0) / buffer).abs() < 1e-3, "v {}", shadow.y);
    assert!((shadow.z - 0.5).abs() < 1e-3, "depth {}", shadow.z);
}

#[test]
fn screen_to_shadow_spans_both_tile_axes() {
    let settings = ShadowSettings::default();
    let caps = DeviceCapabilities::default();
    let view = view();
    let record = record(512, 1.0);

    let to_shadow = |p: Vec3| {
        let clip = view.view_projection_matrix * p.extend(1.0);
        let s = screen_to_shadow(&record, &view, &settings, &caps)
            * Vec4::new(clip.x, clip.y, clip.w, 1.0);
        s / s.w
    };
    let center = to_shadow(Vec3::ZERO);
    let toward_z = to_shadow(Vec3::new(0.0, 0.0, 5.0));
    let toward_x = to_shadow(Vec3::new(5.0, 0.0, 0.0));

    // The light looks down, so world x and z map to independent tile axes.
    let du = (toward_x - center).truncate().truncate();
    let dv = (toward_z - center).truncate().truncate();
    assert!(du.length() > 1e-3 && dv.length() > 1e-3);
    assert!(du.perp_dot(dv).abs() > 1e-6);
}

#[test]
fn flat_subject_depth_stays_finite() {
    let settings = ShadowSettings::default();
    let caps = DeviceCapabilities::default();
    let mut record = record(256, 1.0);
    assert!(approx(inv_max_subject_depth(&record), 1.0 / record.max_subject_depth));

    record.max_subject_depth = 0.0;
    let depth = DepthShaderParameters::new(&record, 0.0);
    assert!(depth.inv_max_subject_depth.is_finite());
    assert_eq!(depth.inv_max_subject_depth, 1.0 / f32::EPSILON);

    let to_shadow = screen_to_shadow(&record, &view(), &settings, &caps);
    assert!(to_shadow.is_finite());
}

#[test]
fn pcf_parameters_carry_sample_offsets() {
    let settings = ShadowSettings::default();
    let caps = DeviceCapabilities::default();
    let light = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::Medium);
    let params = ProjectionParameters::new(
        ProjectionTechnique::SixteenSampleHwPcf,
        &record(256, 1.0),
        &light,
        &view(),
        &settings,
        &caps,
    );

    match &params.technique {
        TechniqueParameters::Pcf(pcf) => {
            assert_eq!(pcf.depth_sampler, DepthSampler::HardwarePcf);
            assert_eq!(pcf.sample_offsets.len(), 8);
        }
        other => panic!("expected PCF parameters, got {other:?}"),
    }
    assert_eq!(params.shadow_buffer_size, glam::Vec2::splat(2048.0));
    assert!(params.modulated.is_none());
}

#[test]
fn vsm_and_branching_parameters() {
    let settings = ShadowSettings::default();
    let caps = DeviceCapabilities::default();
    let light = light(ShadowProjectionTechnique::Default, ShadowFilterQuality::High);
    let record = record(256, 1.0);
    let view = view();
    let texel_radius = settings.shadow_filter_radius / 2.0 / 2048.0;

    let vsm = ProjectionParameters::new(ProjectionTechnique::Vsm, &record, &light, &view, &settings, &caps);
    assert!(matches!(vsm.technique, TechniqueParameters::Vsm(p) if approx(p.texel_radius, texel_radius)));

    let bpcf = ProjectionParameters::new(
        ProjectionTechnique::BranchingPcf(BranchingPcfQuality::Medium),
        &record,
        &light,
        &view,
        &settings,
        &caps,
    );
    match bpcf.technique {
        TechniqueParameters::BranchingPcf(p) => {
            assert_eq!(p.quality, BranchingPcfQuality::Medium);
            assert_eq!(p.depth_sampler, DepthSampler::DepthTexture);
        }
        other => panic!("expected branching PCF parameters, got {other:?}"),
    }
}

#[test]
fn modulated_color_fades_toward_white() {
    let mut light = Light::new_directional(Vec3::NEG_Y);
    light.mod_shadow_color = Vec4::new(0.0, 0.2, 0.4, 1.0);

    let full = mod_shadow_color(&light, 1.0);
    assert!((full - light.mod_shadow_color).abs().max_element() < EPSILON);
    assert_eq!(mod_shadow_color(&light, 0.0), Vec4::ONE);
    let half = mod_shadow_color(&light, 0.5);
    assert!(approx(half.x, 0.5) && approx(half.y, 0.6) && approx(half.z, 0.7));

    light.shadow_mode = LightShadowMode::Modulate;
    let params = ProjectionParameters::new(
        ProjectionTechnique::FourSampleHwPcf,
        &record(128, 0.5),
        &light,
        &view(),
        &ShadowSettings::default(),
        &DeviceCapabilities::default(),
    );
    let modulated = params.modulated.expect("modulated light");
    assert!((modulated.shadow_modulate_color - half).abs().max_element() < EPSILON);
}
