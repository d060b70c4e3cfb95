//! Render Command Recording
//!
//! The shadow passes never talk to a device directly. They record
//! [`RenderCommand`]s into a [`CommandContext`], which a backend replays in
//! submission order. State values reuse `wgpu`'s plain state types so a
//! wgpu backend can build pipelines from them without translation.
//!
//! Like a tracked render pass, the context remembers the current value of
//! every state setter and drops calls that would not change anything.
//! Switching render targets starts a new pass and forgets all state.

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::renderer::shadow::params::{DepthShaderParameters, ProjectionParameters};
use crate::renderer::shadow::technique::ProjectionTechnique;
use crate::resources::material::{ShaderId, VertexFactoryType};
use crate::scene::PrimitiveKey;

// ============================================================================
// State Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    ShadowDepth,
    ShadowVariance,
    SceneColor,
    LightAttenuation,
}

/// Pixel rectangle used for viewports, scissors and resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub write_enabled: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthState {
    pub const WRITE_LESS_EQUAL: Self = Self {
        write_enabled: true,
        compare: wgpu::CompareFunction::LessEqual,
    };
    pub const TEST_LESS_EQUAL: Self = Self {
        write_enabled: false,
        compare: wgpu::CompareFunction::LessEqual,
    };
    pub const ALWAYS: Self = Self {
        write_enabled: false,
        compare: wgpu::CompareFunction::Always,
    };
}

/// Stencil state plus its reference value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StencilTest {
    pub state: wgpu::StencilState,
    pub reference: u32,
}

impl StencilTest {
    /// Stencil testing and writes off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerState {
    pub polygon_mode: wgpu::PolygonMode,
    pub cull_mode: Option<wgpu::Face>,
}

impl RasterizerState {
    #[must_use]
    pub const fn solid(cull_mode: Option<wgpu::Face>) -> Self {
        Self {
            polygon_mode: wgpu::PolygonMode::Fill,
            cull_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearValues {
    pub color: Option<Vec4>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
}

// ============================================================================
// Bound Shader States
// ============================================================================

/// Engine-global shaders used by the projection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalShader {
    ShadowProjectionVertex,
    ModShadowProjectionVertex,
    ShadowProjectionPixel {
        technique: ProjectionTechnique,
        modulated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderRef {
    Material(ShaderId),
    Global(GlobalShader),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    Mesh(VertexFactoryType),
    /// Bare `Vec3` positions of a frustum box.
    ShadowFrustum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundShaderStateKey {
    pub vertex_layout: VertexLayout,
    pub vertex_shader: ShaderRef,
    pub pixel_shader: Option<ShaderRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundShaderStateId(u32);

/// Bound shader states created so far. Lives across frames.
#[derive(Debug, Clone, Default)]
pub struct BoundShaderStateCache {
    states: FxHashMap<BoundShaderStateKey, BoundShaderStateId>,
}

impl BoundShaderStateCache {
    /// Returns the id for `key` and whether it was created by this call.
    pub fn get_or_create(&mut self, key: BoundShaderStateKey) -> (BoundShaderStateId, bool) {
        let next = BoundShaderStateId(self.states.len() as u32);
        let mut created = false;
        let id = *self.states.entry(key).or_insert_with(|| {
            created = true;
            next
        });
        (id, created)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Which mesh of a primitive a draw refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRef {
    Static(usize),
    Dynamic(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    PushDebugGroup(String),
    PopDebugGroup,

    SetRenderTarget(RenderTarget),
    SetViewport(Rect),
    SetScissorRect(Option<Rect>),
    Clear(ClearValues),

    /// `None` is opaque (blending off).
    SetBlendState(Option<wgpu::BlendState>),
    SetDepthState(DepthState),
    SetStencilState(StencilTest),
    SetRasterizerState(RasterizerState),
    SetColorWrites(wgpu::ColorWrites),

    BeginHiStencilRecord,
    BeginHiStencilPlayback,
    EndHiStencil,

    CreateBoundShaderState {
        id: BoundShaderStateId,
        key: BoundShaderStateKey,
    },
    SetBoundShaderState(BoundShaderStateId),
    SetDepthShaderParameters(DepthShaderParameters),
    /// View transform used by projection pass draws.
    SetViewProjection(Mat4),
    SetProjectionParameters(Box<ProjectionParameters>),

    DrawMesh {
        primitive: PrimitiveKey,
        mesh: MeshRef,
        local_to_world: Mat4,
    },
    /// Indexed draw of a frustum box with
    /// [`FRUSTUM_INDICES`](crate::renderer::shadow::frustum::FRUSTUM_INDICES).
    DrawFrustum([Vec3; 8]),

    ResolveShadowDepth(Rect),
    FilterShadowVariance {
        rect: Rect,
        texel_radius: f32,
    },
    ResolveSceneColor,
}

// ============================================================================
// Context
// ============================================================================

#[derive(Debug, Default)]
struct TrackedState {
    viewport: Option<Rect>,
    scissor: Option<Option<Rect>>,
    blend: Option<Option<wgpu::BlendState>>,
    depth: Option<DepthState>,
    stencil: Option<StencilTest>,
    rasterizer: Option<RasterizerState>,
    color_writes: Option<wgpu::ColorWrites>,
    bound_shader_state: Option<BoundShaderStateId>,
}

/// Records commands for one frame, skipping redundant state changes.
#[derive(Debug, Default)]
pub struct CommandContext {
    commands: Vec<RenderCommand>,
    render_target: Option<RenderTarget>,
    state: TrackedState,
    bound_shader_states: BoundShaderStateCache,
}

impl CommandContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops recorded commands and tracked state. Bound shader states
    /// created in earlier frames stay cached.
    pub fn begin_frame(&mut self) {
        self.commands.clear();
        self.render_target = None;
        self.state = TrackedState::default();
    }

    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    #[must_use]
    pub fn bound_shader_states(&self) -> &BoundShaderStateCache {
        &self.bound_shader_states
    }

    pub fn push_debug_group(&mut self, label: impl Into<String>) {
        self.commands.push(RenderCommand::PushDebugGroup(label.into()));
    }

    pub fn pop_debug_group(&mut self) {
        self.commands.push(RenderCommand::PopDebugGroup);
    }

    pub fn set_render_target(&mut self, target: RenderTarget) {
        if self.render_target != Some(target) {
            self.commands.push(RenderCommand::SetRenderTarget(target));
            self.render_target = Some(target);
            self.state = TrackedState::default();
        }
    }

    pub fn set_viewport(&mut self, rect: Rect) {
        if self.state.viewport != Some(rect) {
            self.commands.push(RenderCommand::SetViewport(rect));
            self.state.viewport = Some(rect);
        }
    }

    pub fn set_scissor_rect(&mut self, rect: Option<Rect>) {
        if self.state.scissor != Some(rect) {
            self.commands.push(RenderCommand::SetScissorRect(rect));
            self.state.scissor = Some(rect);
        }
    }

    pub fn clear(&mut self, values: ClearValues) {
        self.commands.push(RenderCommand::Clear(values));
    }

    pub fn set_blend_state(&mut self, blend: Option<wgpu::BlendState>) {
        if self.state.blend != Some(blend) {
            self.commands.push(RenderCommand::SetBlendState(blend));
            self.state.blend = Some(blend);
        }
    }

    pub fn set_depth_state(&mut self, depth: DepthState) {
        if self.state.depth != Some(depth) {
            self.commands.push(RenderCommand::SetDepthState(depth));
            self.state.depth = Some(depth);
        }
    }

    pub fn set_stencil_state(&mut self, stencil: StencilTest) {
        if self.state.stencil.as_ref() != Some(&stencil) {
            self.commands.push(RenderCommand::SetStencilState(stencil.clone()));
            self.state.stencil = Some(stencil);
        }
    }

    pub fn set_rasterizer_state(&mut self, rasterizer: RasterizerState) {
        if self.state.rasterizer != Some(rasterizer) {
            self.commands.push(RenderCommand::SetRasterizerState(rasterizer));
            self.state.rasterizer = Some(rasterizer);
        }
    }

    pub fn set_color_writes(&mut self, writes: wgpu::ColorWrites) {
        if self.state.color_writes != Some(writes) {
            self.commands.push(RenderCommand::SetColorWrites(writes));
            self.state.color_writes = Some(writes);
        }
    }

    pub fn begin_hi_stencil_record(&mut self) {
        self.commands.push(RenderCommand::BeginHiStencilRecord);
    }

    pub fn begin_hi_stencil_playback(&mut self) {
        self.commands.push(RenderCommand::BeginHiStencilPlayback);
    }

    pub fn end_hi_stencil(&mut self) {
        self.commands.push(RenderCommand::EndHiStencil);
    }

    /// Binds the shader combination `key`, creating it on first use.
    pub fn set_bound_shader_state(&mut self, key: BoundShaderStateKey) -> BoundShaderStateId {
        let (id, created) = self.bound_shader_states.get_or_create(key);
        if created {
            self.commands
                .push(RenderCommand::CreateBoundShaderState { id, key });
        }
        if self.state.bound_shader_state != Some(id) {
            self.commands.push(RenderCommand::SetBoundShaderState(id));
            self.state.bound_shader_state = Some(id);
        }
        id
    }

    pub fn set_depth_shader_parameters(&mut self, params: DepthShaderParameters) {
        self.commands
            .push(RenderCommand::SetDepthShaderParameters(params));
    }

    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.commands
            .push(RenderCommand::SetViewProjection(view_projection));
    }

    pub fn set_projection_parameters(&mut self, params: ProjectionParameters) {
        self.commands
            .push(RenderCommand::SetProjectionParameters(Box::new(params)));
    }

    pub fn draw_mesh(&mut self, primitive: PrimitiveKey, mesh: MeshRef, local_to_world: Mat4) {
        self.commands.push(RenderCommand::DrawMesh {
            primitive,
            mesh,
            local_to_world,
        });
    }

    pub fn draw_frustum(&mut self, vertices: [Vec3; 8]) {
        self.commands.push(RenderCommand::DrawFrustum(vertices));
    }

    pub fn resolve_shadow_depth(&mut self, rect: Rect) {
        self.commands.push(RenderCommand::ResolveShadowDepth(rect));
    }

    pub fn filter_shadow_variance(&mut self, rect: Rect, texel_radius: f32) {
        self.commands
            .push(RenderCommand::FilterShadowVariance { rect, texel_radius });
    }

    pub fn resolve_scene_color(&mut self) {
        self.commands.push(RenderCommand::ResolveSceneColor);
    }
}
