//! Vulkan resource management: allocation, deferred destruction, uploads,
//! uniforms and descriptors

pub mod allocator;
pub mod deletion_queue;
pub mod descriptor_set;
pub mod global_uniforms;
pub mod texture;
pub mod uniforms;
pub mod upload;

pub use allocator::{AllocatedBuffer, AllocatedImage, MemoryLocation, ResourceAllocator, StagingBuffer};
pub use deletion_queue::DeletionQueue;
pub use descriptor_set::{DescriptorPool, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use global_uniforms::GlobalUniforms;
pub use texture::Texture;
pub use uniforms::{
    pad_uniform_buffer_size, CameraData, ObjectData, SceneData, UniformKind, UniformLayout,
};
pub use upload::{submit_and_wait, upload_mesh, GpuMesh, ImmediateQueue, UploadContext};
