//! Fence and semaphore helpers
//!
//! Fences give the CPU a completion signal per frame slot; semaphores order
//! acquire, render and present on the GPU. Both are created through these
//! helpers so their destruction is registered with the deletion queue.

use ash::vk;
use ash::Device;

use crate::render::vulkan::initialization::{VulkanError, VulkanResult};
use crate::render::vulkan::resources::DeletionQueue;

/// Create a fence, optionally already signaled
pub fn create_fence(device: &Device, signaled: bool, deletion: &mut DeletionQueue) -> VulkanResult<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    let create_info = vk::FenceCreateInfo::builder().flags(flags);
    let fence = unsafe { device.create_fence(&create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_fence(fence, None) });
    Ok(fence)
}

/// Create a binary semaphore
pub fn create_semaphore(device: &Device, deletion: &mut DeletionQueue) -> VulkanResult<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::builder();
    let semaphore = unsafe { device.create_semaphore(&create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_semaphore(semaphore, None) });
    Ok(semaphore)
}

/// Block until `fence` signals, bounded by `timeout_ns`
///
/// Expiry is reported as [`VulkanError::Timeout`]; callers treat it as a
/// GPU hang.
pub fn wait_for_fence(device: &Device, fence: vk::Fence, timeout_ns: u64, what: &'static str) -> VulkanResult<()> {
    match unsafe { device.wait_for_fences(&[fence], true, timeout_ns) } {
        Ok(()) => Ok(()),
        Err(vk::Result::TIMEOUT) => {
            log::error!("Fence wait for {} exceeded {} ns", what, timeout_ns);
            Err(VulkanError::Timeout { what })
        }
        Err(e) => Err(VulkanError::Api(e)),
    }
}

/// Wait on `fence` and return it to the unsignaled state
pub fn wait_and_reset_fence(
    device: &Device,
    fence: vk::Fence,
    timeout_ns: u64,
    what: &'static str,
) -> VulkanResult<()> {
    wait_for_fence(device, fence, timeout_ns, what)?;
    unsafe { device.reset_fences(&[fence])? };
    Ok(())
}
