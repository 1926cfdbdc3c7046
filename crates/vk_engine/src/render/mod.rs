//! Rendering: backend-agnostic frame driver and geometry, plus the Vulkan backend

pub mod frame;
pub mod primitives;
pub mod vulkan;

pub use frame::{FrameBackend, FrameDriver, FrameStage, FrameTarget};
pub use primitives::{Mesh, MeshPushConstants, Vertex};
