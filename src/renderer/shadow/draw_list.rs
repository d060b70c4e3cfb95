use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::resources::material::VertexFactoryType;
use crate::scene::{MaterialKey, PrimitiveKey};

/// Batch key: meshes sharing it share one bound shader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawListKey {
    pub vertex_factory: VertexFactoryType,
    /// Shadow depth material (already substituted).
    pub material: MaterialKey,
}

/// A static mesh of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticMeshRef {
    pub primitive: PrimitiveKey,
    pub mesh_index: usize,
}

#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub key: DrawListKey,
    pub meshes: SmallVec<[StaticMeshRef; 4]>,
}

/// Static meshes grouped by [`DrawListKey`], batches in first-insert order.
#[derive(Debug, Clone, Default)]
pub struct StaticDrawList {
    batches: Vec<DrawBatch>,
    lookup: FxHashMap<DrawListKey, usize>,
}

impl StaticDrawList {
    pub fn add_mesh(&mut self, key: DrawListKey, mesh: StaticMeshRef) {
        let index = *self.lookup.entry(key).or_insert_with(|| {
            self.batches.push(DrawBatch {
                key,
                meshes: SmallVec::new(),
            });
            self.batches.len() - 1
        });
        self.batches[index].meshes.push(mesh);
    }

    #[must_use]
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    #[must_use]
    pub fn num_meshes(&self) -> usize {
        self.batches.iter().map(|b| b.meshes.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
