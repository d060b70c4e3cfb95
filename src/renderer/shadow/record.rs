//! Shadow Records
//!
//! A [`ShadowRecord`] is one projected shadow (main shadow or preshadow) for
//! the current frame. Records live in a frame-scoped [`ShadowArena`] and are
//! addressed by [`ShadowId`]; nothing holds a record across frames.

use glam::{Mat4, Vec3};

use crate::renderer::shadow::draw_list::{DrawListKey, StaticDrawList, StaticMeshRef};
use crate::renderer::shadow::frustum::{FRUSTUM_EDGES, FrustumTransforms, frustum_vertices};
use crate::scene::frustum::ConvexVolume;
use crate::scene::scene::Scene;
use crate::scene::{LightKey, PrimitiveKey};

/// Index of a record inside the frame's [`ShadowArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShadowId(u32);

impl ShadowId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct ShadowRecord {
    pub light: LightKey,
    pub subject: PrimitiveKey,

    /// Projection used to rasterize casters into the depth tile.
    pub subject_matrix: Mat4,
    /// Projection used to compute stored and compared depth.
    pub subject_and_receiver_matrix: Mat4,
    /// Projection bounding the receivers of this shadow.
    pub receiver_matrix: Mat4,
    pub inv_receiver_matrix: Mat4,
    pub subject_frustum: ConvexVolume,
    pub receiver_frustum: ConvexVolume,
    pub max_subject_depth: f32,

    /// Tile edge in texels, border excluded.
    pub resolution: u32,
    pub fade_alpha: f32,

    pub is_pre_shadow: bool,
    pub is_directional_light: bool,

    pub atlas_x: u32,
    pub atlas_y: u32,
    pub is_allocated: bool,
    pub is_rendered: bool,
    /// Atlas pass in which the record was rendered.
    pub rendered_in_pass: Option<u32>,

    pub subject_primitives: Vec<PrimitiveKey>,
    pub subject_static_draw_list: StaticDrawList,
    pub receiver_primitives: Vec<PrimitiveKey>,
}

impl ShadowRecord {
    /// Builds a record from the frustum transforms of its subject.
    ///
    /// A main shadow rasterizes with the subject projection and receives
    /// through the post-subject projection. A preshadow rasterizes with the
    /// pre-subject projection and receives on the subject itself.
    #[must_use]
    pub fn new(
        light: LightKey,
        subject: PrimitiveKey,
        transforms: &FrustumTransforms,
        resolution: u32,
        fade_alpha: f32,
        is_pre_shadow: bool,
    ) -> Self {
        let (subject_matrix, receiver_matrix) = if is_pre_shadow {
            (transforms.pre_subject_matrix, transforms.subject_matrix)
        } else {
            (transforms.subject_matrix, transforms.post_subject_matrix)
        };

        Self {
            light,
            subject,
            subject_matrix,
            subject_and_receiver_matrix: transforms.subject_matrix,
            receiver_matrix,
            inv_receiver_matrix: receiver_matrix.inverse(),
            subject_frustum: ConvexVolume::from_matrix(subject_matrix),
            receiver_frustum: ConvexVolume::from_matrix(receiver_matrix),
            max_subject_depth: transforms.max_subject_depth,
            resolution,
            fade_alpha,
            is_pre_shadow,
            is_directional_light: transforms.is_directional,
            atlas_x: 0,
            atlas_y: 0,
            is_allocated: false,
            is_rendered: false,
            rendered_in_pass: None,
            subject_primitives: Vec::new(),
            subject_static_draw_list: StaticDrawList::default(),
            receiver_primitives: Vec::new(),
        }
    }

    /// Adds a caster.
    ///
    /// Primitives with static meshes contribute their shadow-casting meshes
    /// to the static draw list, batched by shadow depth material. Everything
    /// else is drawn through its dynamic elements.
    pub fn add_subject_primitive(&mut self, scene: &Scene, key: PrimitiveKey) {
        let Some(primitive) = scene.primitive(key) else {
            return;
        };

        if primitive.static_meshes.is_empty() {
            self.subject_primitives.push(key);
            return;
        }

        for (mesh_index, mesh) in primitive.static_meshes.iter().enumerate() {
            if !mesh.cast_shadow {
                continue;
            }
            let draw_key = DrawListKey {
                vertex_factory: mesh.vertex_factory,
                material: scene.shadow_depth_material(mesh.material),
            };
            self.subject_static_draw_list.add_mesh(
                draw_key,
                StaticMeshRef {
                    primitive: key,
                    mesh_index,
                },
            );
        }
    }

    pub fn add_receiver_primitive(&mut self, key: PrimitiveKey) {
        self.receiver_primitives.push(key);
    }

    #[must_use]
    pub fn has_subject_prims(&self) -> bool {
        !self.subject_primitives.is_empty() || self.subject_static_draw_list.num_meshes() > 0
    }

    /// World space corners of the receiver volume.
    #[must_use]
    pub fn frustum_vertices(&self) -> [Vec3; 8] {
        frustum_vertices(&self.inv_receiver_matrix)
    }

    /// Line segments outlining the receiver volume, for debug drawing.
    #[must_use]
    pub fn frustum_wireframe(&self) -> [(Vec3, Vec3); 12] {
        let v = self.frustum_vertices();
        FRUSTUM_EDGES.map(|(a, b)| (v[a], v[b]))
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Frame-scoped storage for shadow records.
#[derive(Debug, Clone, Default)]
pub struct ShadowArena {
    records: Vec<ShadowRecord>,
}

impl ShadowArena {
    pub fn push(&mut self, record: ShadowRecord) -> ShadowId {
        let id = ShadowId(self.records.len() as u32);
        self.records.push(record);
        id
    }

    #[must_use]
    pub fn get(&self, id: ShadowId) -> Option<&ShadowRecord> {
        self.records.get(id.index())
    }

    pub fn get_mut(&mut self, id: ShadowId) -> Option<&mut ShadowRecord> {
        self.records.get_mut(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShadowId, &ShadowRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (ShadowId(i as u32), r))
    }

    /// Drops records failing `keep`. Ids of surviving records are
    /// reassigned, so ids taken earlier are invalidated.
    pub(crate) fn retain(&mut self, keep: impl FnMut(&ShadowRecord) -> bool) {
        self.records.retain(keep);
    }
}

// ============================================================================
// Frame Output
// ============================================================================

/// One visibility bit per shadow record, for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowVisibilityMap {
    words: Vec<u64>,
}

impl ShadowVisibilityMap {
    const WORD_BITS: usize = u64::BITS as usize;

    #[inline]
    fn locate(id: ShadowId) -> (usize, u64) {
        let index = id.index();
        (index / Self::WORD_BITS, 1 << (index % Self::WORD_BITS))
    }

    #[must_use]
    pub fn is_visible(&self, id: ShadowId) -> bool {
        let (word, mask) = Self::locate(id);
        self.words.get(word).is_some_and(|&w| w & mask != 0)
    }

    pub fn set(&mut self, id: ShadowId, visible: bool) {
        let (word, mask) = Self::locate(id);
        if word >= self.words.len() {
            if !visible {
                return;
            }
            self.words.resize(word + 1, 0);
        }
        if visible {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    #[must_use]
    pub fn count_visible(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// All shadows of one frame plus their per-view visibility.
#[derive(Debug, Clone, Default)]
pub struct FrameShadows {
    arena: ShadowArena,
    visibility: Vec<ShadowVisibilityMap>,
}

impl FrameShadows {
    #[must_use]
    pub fn new(view_count: usize) -> Self {
        Self {
            arena: ShadowArena::default(),
            visibility: vec![ShadowVisibilityMap::default(); view_count],
        }
    }

    pub(crate) fn from_parts(arena: ShadowArena, visibility: Vec<ShadowVisibilityMap>) -> Self {
        Self { arena, visibility }
    }

    /// Adds a record that no view sees yet.
    pub fn add_record(&mut self, record: ShadowRecord) -> ShadowId {
        self.arena.push(record)
    }

    #[must_use]
    pub fn records(&self) -> &ShadowArena {
        &self.arena
    }

    #[must_use]
    pub fn record(&self, id: ShadowId) -> Option<&ShadowRecord> {
        self.arena.get(id)
    }

    pub fn record_mut(&mut self, id: ShadowId) -> Option<&mut ShadowRecord> {
        self.arena.get_mut(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[must_use]
    pub fn view_count(&self) -> usize {
        self.visibility.len()
    }

    #[must_use]
    pub fn visibility(&self, view_index: usize) -> Option<&ShadowVisibilityMap> {
        self.visibility.get(view_index)
    }

    pub fn set_visible(&mut self, view_index: usize, id: ShadowId, visible: bool) {
        if let Some(map) = self.visibility.get_mut(view_index) {
            map.set(id, visible);
        }
    }

    #[must_use]
    pub fn is_visible(&self, view_index: usize, id: ShadowId) -> bool {
        self.visibility
            .get(view_index)
            .is_some_and(|map| map.is_visible(id))
    }

    /// Records of `light`, in creation order.
    pub fn records_for_light(&self, light: LightKey) -> impl Iterator<Item = (ShadowId, &ShadowRecord)> {
        self.arena.iter().filter(move |(_, r)| r.light == light)
    }
}
