//! Shadow Projection Pass
//!
//! Projects one record's depth tile onto the scene as seen from one view.
//!
//! # Stencil Masking
//!
//! The projection only touches pixels the mask marks:
//!
//! - **main shadows** count z-fails of the receiver frustum box: front faces
//!   increment, back faces decrement, leaving a non-zero value for pixels
//!   whose scene depth lies inside the box
//! - **preshadows** write `1` wherever a receiver (the subject group) is
//!   drawn, so the world in front of the subject only darkens the subject
//!
//! The projection itself passes where the stencil is non-zero and, when the
//! stencil clear optimization is on, writes zero back so the next shadow
//! starts from a clean mask.

use crate::renderer::command::{
    BoundShaderStateKey, ClearValues, CommandContext, DepthState, GlobalShader, MeshRef,
    RasterizerState, ShaderRef, StencilTest, VertexLayout,
};
use crate::renderer::settings::{DeviceCapabilities, DeviceFeatures, ShadowSettings};
use crate::renderer::shadow::depth_pass::bind_depth_shaders;
use crate::renderer::shadow::params::ProjectionParameters;
use crate::renderer::shadow::record::ShadowRecord;
use crate::renderer::shadow::technique::ProjectionTechnique;
use crate::scene::light::{Light, LightShadowMode};
use crate::scene::primitive::DepthPriorityGroup;
use crate::scene::scene::Scene;
use crate::scene::view::SceneView;

const STENCIL_MASK: u32 = 0xff;

/// Blend state for the projection of `light`. `None` is opaque.
#[must_use]
pub fn projection_blend_state(
    light: &Light,
    caps: &DeviceCapabilities,
) -> Option<wgpu::BlendState> {
    let modulate_color = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Dst,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    };

    match light.shadow_mode {
        // Scene color keeps its alpha.
        LightShadowMode::Modulate if caps.supports(DeviceFeatures::FP_BLENDING) => {
            Some(wgpu::BlendState {
                color: modulate_color,
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            })
        }
        // Multiplied in the shader against a resolved copy of scene color.
        LightShadowMode::Modulate => None,
        LightShadowMode::Normal => Some(wgpu::BlendState {
            color: modulate_color,
            alpha: wgpu::BlendComponent::REPLACE,
        }),
    }
}

/// Shader combination projecting shadows with `technique`.
#[must_use]
pub fn projection_shader_key(technique: ProjectionTechnique, modulated: bool) -> BoundShaderStateKey {
    let vertex_shader = if modulated {
        GlobalShader::ModShadowProjectionVertex
    } else {
        GlobalShader::ShadowProjectionVertex
    };
    BoundShaderStateKey {
        vertex_layout: VertexLayout::ShadowFrustum,
        vertex_shader: ShaderRef::Global(vertex_shader),
        pixel_shader: Some(ShaderRef::Global(GlobalShader::ShadowProjectionPixel {
            technique,
            modulated,
        })),
    }
}

/// Vertex-only shader combination drawing the main shadow stencil mask.
#[must_use]
pub fn mask_shader_key() -> BoundShaderStateKey {
    BoundShaderStateKey {
        vertex_layout: VertexLayout::ShadowFrustum,
        vertex_shader: ShaderRef::Global(GlobalShader::ShadowProjectionVertex),
        pixel_shader: None,
    }
}

/// Stencil state writing `1` wherever a preshadow receiver is drawn.
#[must_use]
pub fn preshadow_mask_stencil() -> StencilTest {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Replace,
    };
    StencilTest {
        state: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: STENCIL_MASK,
            write_mask: STENCIL_MASK,
        },
        reference: 1,
    }
}

/// Two-sided z-fail counting of the receiver frustum box.
#[must_use]
pub fn frustum_mask_stencil() -> StencilTest {
    let face = |depth_fail_op| wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op,
        pass_op: wgpu::StencilOperation::Keep,
    };
    StencilTest {
        state: wgpu::StencilState {
            front: face(wgpu::StencilOperation::IncrementWrap),
            back: face(wgpu::StencilOperation::DecrementWrap),
            read_mask: STENCIL_MASK,
            write_mask: STENCIL_MASK,
        },
        reference: 0,
    }
}

/// Passes where the mask is non-zero, optionally zeroing it again.
#[must_use]
pub fn projection_stencil(clear_on_pass: bool) -> StencilTest {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::NotEqual,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: if clear_on_pass {
            wgpu::StencilOperation::Replace
        } else {
            wgpu::StencilOperation::Keep
        },
    };
    StencilTest {
        state: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: STENCIL_MASK,
            write_mask: STENCIL_MASK,
        },
        reference: 0,
    }
}

fn cull_face(caps: &DeviceCapabilities) -> wgpu::Face {
    if caps.inverted_cull {
        wgpu::Face::Front
    } else {
        wgpu::Face::Back
    }
}

/// Projects `record` onto `view`. Returns whether anything was drawn.
///
/// Records whose subject is not shadow relevant in this view, or not
/// rendered in `dpg`, are skipped.
pub fn render_projection(
    cmd: &mut CommandContext,
    record: &ShadowRecord,
    technique: ProjectionTechnique,
    scene: &Scene,
    view: &SceneView,
    light: &Light,
    dpg: DepthPriorityGroup,
    settings: &ShadowSettings,
    caps: &DeviceCapabilities,
) -> bool {
    let Some(subject) = scene.primitive(record.subject) else {
        return false;
    };
    let relevance = view.relevance(record.subject, subject);
    if !relevance.shadow_relevance || !relevance.has_dpg(dpg) {
        return false;
    }

    let hi_stencil = settings.use_hi_stencil && caps.supports(DeviceFeatures::HI_STENCIL);
    let vertices = record.frustum_vertices();

    // Mask
    cmd.set_depth_state(DepthState::TEST_LESS_EQUAL);
    cmd.set_color_writes(wgpu::ColorWrites::empty());
    if hi_stencil {
        cmd.begin_hi_stencil_record();
    }

    if record.is_pre_shadow {
        cmd.set_stencil_state(preshadow_mask_stencil());
        cmd.set_rasterizer_state(RasterizerState::solid(Some(cull_face(caps))));
        for &key in &record.receiver_primitives {
            let Some(receiver) = scene.primitive(key) else {
                continue;
            };
            for (index, element) in receiver.dynamic_elements.iter().enumerate() {
                let material = scene.shadow_depth_material(element.material);
                if bind_depth_shaders(cmd, scene, material, element.vertex_factory, false) {
                    cmd.draw_mesh(key, MeshRef::Dynamic(index), element.local_to_world);
                }
            }
        }
    } else {
        cmd.set_rasterizer_state(RasterizerState::solid(None));
        cmd.set_stencil_state(frustum_mask_stencil());
        cmd.set_bound_shader_state(mask_shader_key());
        cmd.draw_frustum(vertices);
    }

    // Projection
    cmd.set_depth_state(DepthState::ALWAYS);
    cmd.set_color_writes(wgpu::ColorWrites::ALL);
    cmd.set_rasterizer_state(RasterizerState::solid(Some(cull_face(caps))));
    cmd.set_stencil_state(projection_stencil(settings.optimize_stencil_clear));
    if hi_stencil {
        cmd.begin_hi_stencil_playback();
    }

    let modulated = light.shadow_mode == LightShadowMode::Modulate;
    cmd.set_blend_state(projection_blend_state(light, caps));
    cmd.set_bound_shader_state(projection_shader_key(technique, modulated));
    cmd.set_projection_parameters(ProjectionParameters::new(
        technique, record, light, view, settings, caps,
    ));
    cmd.draw_frustum(vertices);

    if hi_stencil {
        cmd.end_hi_stencil();
    }
    cmd.set_stencil_state(StencilTest::disabled());
    if !settings.optimize_stencil_clear {
        cmd.clear(ClearValues {
            stencil: Some(0),
            ..ClearValues::default()
        });
    }
    true
}
