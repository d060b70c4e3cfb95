pub mod material;

pub use material::{Material, MaterialShaderMap, MeshShaderMap, ShaderId, VertexFactoryType};
