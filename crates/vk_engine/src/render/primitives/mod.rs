//! Backend-agnostic geometry and per-draw data

pub mod mesh;

pub use mesh::{Mesh, MeshPushConstants, Vertex};
