//! Swapchain, frame ring and synchronization

pub mod frame_ring;
pub mod swapchain;
pub mod sync;

pub use frame_ring::{current_frame_index, FrameContext, FrameRing};
pub use swapchain::Swapchain;
pub use sync::{create_fence, create_semaphore, wait_and_reset_fence, wait_for_fence};
