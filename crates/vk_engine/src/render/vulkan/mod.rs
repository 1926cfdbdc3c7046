//! Vulkan backend
//!
//! - `initialization`: window, instance, device, queues
//! - `resources`: allocator, deletion queue, uploads, uniforms, descriptors
//! - `rendering`: commands, shaders, pipelines, materials, render pass
//! - `state`: swapchain, frame ring, synchronization
//! - `renderer`: ties the above into the per-frame stages

pub mod initialization;
pub mod renderer;
pub mod rendering;
pub mod resources;
pub mod state;

pub use initialization::{VulkanContext, VulkanError, VulkanResult, Window, WindowError};
pub use renderer::{SceneFrame, VulkanRenderer};
