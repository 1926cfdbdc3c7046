//! Per-frame resources for frames in flight
//!
//! Frame `n` always uses slot `n % N`. Slot resources are only touched after
//! that slot's render fence has signaled, so the CPU never overwrites commands
//! or uniforms the GPU is still reading.

use ash::{vk, Device};

use super::sync::{create_fence, create_semaphore};
use crate::render::vulkan::initialization::{VulkanError, VulkanResult};
use crate::render::vulkan::rendering::commands::{allocate_primary, create_command_pool};
use crate::render::vulkan::resources::DeletionQueue;

/// Slot index for a frame number
pub fn current_frame_index(frame_number: u64, frame_overlap: usize) -> usize {
    (frame_number % frame_overlap as u64) as usize
}

/// Command and synchronization objects owned by one slot
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Pool the slot's command buffer is reset through
    pub command_pool: vk::CommandPool,
    /// Primary command buffer re-recorded every time the slot comes around
    pub command_buffer: vk::CommandBuffer,
    /// Signaled when the swapchain image is ready to render into
    pub present_semaphore: vk::Semaphore,
    /// Signaled when rendering finishes, waited on by present
    pub render_semaphore: vk::Semaphore,
    /// Signaled when the slot's submission completes
    pub render_fence: vk::Fence,
}

impl FrameContext {
    /// Create one slot; the fence starts signaled so the first wait passes
    pub fn new(device: &Device, queue_family_index: u32, deletion: &mut DeletionQueue) -> VulkanResult<Self> {
        let command_pool = create_command_pool(
            device,
            queue_family_index,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            deletion,
        )?;
        let command_buffer = allocate_primary(device, command_pool)?;

        Ok(Self {
            command_pool,
            command_buffer,
            present_semaphore: create_semaphore(device, deletion)?,
            render_semaphore: create_semaphore(device, deletion)?,
            render_fence: create_fence(device, true, deletion)?,
        })
    }

    /// Create `count` slots
    pub fn create_ring(
        device: &Device,
        queue_family_index: u32,
        count: usize,
        deletion: &mut DeletionQueue,
    ) -> VulkanResult<FrameRing<FrameContext>> {
        let slots = (0..count)
            .map(|_| Self::new(device, queue_family_index, deletion))
            .collect::<VulkanResult<Vec<_>>>()?;
        FrameRing::new(slots)
    }
}

/// Fixed ring of per-frame slots indexed by frame number
#[derive(Debug)]
pub struct FrameRing<T> {
    slots: Vec<T>,
}

impl<T> FrameRing<T> {
    /// Wrap the slots; an empty list is rejected
    pub fn new(slots: Vec<T>) -> VulkanResult<Self> {
        if slots.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "frame ring needs at least one slot".to_string(),
            });
        }
        Ok(Self { slots })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false for a constructed ring
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot index for `frame_number`
    pub fn index_for(&self, frame_number: u64) -> usize {
        current_frame_index(frame_number, self.slots.len())
    }

    /// Slot used by `frame_number`
    pub fn current(&self, frame_number: u64) -> &T {
        &self.slots[self.index_for(frame_number)]
    }

    /// Mutable slot used by `frame_number`
    pub fn current_mut(&mut self, frame_number: u64) -> &mut T {
        let index = self.index_for(frame_number);
        &mut self.slots[index]
    }

    /// Slot by index
    pub fn slot(&self, index: usize) -> Option<&T> {
        self.slots.get(index)
    }

    /// All slots in index order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_alternates() {
        let indices: Vec<usize> = (0..6).map(|f| current_frame_index(f, 2)).collect();
        assert_eq!(indices, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_ring_current() {
        let mut ring = FrameRing::new(vec!["a", "b", "c"]).unwrap();
        assert_eq!(*ring.current(0), "a");
        assert_eq!(*ring.current(4), "b");
        *ring.current_mut(5) = "z";
        assert_eq!(ring.slot(2), Some(&"z"));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_consecutive_frames_use_different_slots() {
        let ring = FrameRing::new(vec![0u8, 1]).unwrap();
        for frame in 0..100u64 {
            assert_ne!(ring.index_for(frame), ring.index_for(frame + 1));
            assert_eq!(ring.index_for(frame), ring.index_for(frame + 2));
        }
    }

    #[test]
    fn test_empty_ring_rejected() {
        assert!(FrameRing::<u8>::new(Vec::new()).is_err());
    }

    #[test]
    fn test_large_frame_number() {
        assert_eq!(current_frame_index(u64::MAX, 2), 1);
    }
}
