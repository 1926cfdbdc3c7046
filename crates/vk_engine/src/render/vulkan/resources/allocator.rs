//! GPU memory allocation for buffers and images
//!
//! [`ResourceAllocator`] wraps a `vk_mem::Allocator`. Allocations live in slot
//! maps owned by the allocator; callers hold copyable handles. Every buffer
//! and image registers its destroy closure with the [`DeletionQueue`] at
//! creation, so callers never free anything themselves. Transient staging
//! buffers are the exception: [`StagingBuffer`] releases its memory on drop.
//!
//! CPU access is scoped. [`ResourceAllocator::with_mapped`] maps, runs the
//! closure, and unmaps; a second mapping of the same buffer while one is live
//! is rejected.

use std::cell::RefCell;
use std::rc::Rc;

use ash::vk;
use slotmap::{new_key_type, SlotMap};
use vk_mem::Alloc;

use super::deletion_queue::DeletionQueue;
use crate::render::vulkan::initialization::{VulkanError, VulkanResult};

new_key_type! {
    /// Handle to a buffer allocation
    pub struct BufferKey;
    /// Handle to an image allocation
    pub struct ImageKey;
}

/// Where an allocation should live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLocation {
    /// Device-local, not host visible
    GpuOnly,
    /// Host visible and coherent, written by the CPU and read by the GPU
    CpuToGpu,
}

impl MemoryLocation {
    fn allocation_info(self) -> vk_mem::AllocationCreateInfo {
        match self {
            Self::GpuOnly => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferDevice,
                ..Default::default()
            },
            Self::CpuToGpu => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::Auto,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
                required_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
                    | vk::MemoryPropertyFlags::HOST_COHERENT,
                ..Default::default()
            },
        }
    }
}

/// Copyable handle to a buffer owned by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedBuffer {
    key: BufferKey,
    /// Native buffer handle
    pub buffer: vk::Buffer,
    /// Requested size in bytes
    pub size: u64,
}

/// Copyable handle to an image owned by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedImage {
    key: ImageKey,
    /// Native image handle
    pub image: vk::Image,
    /// Image format
    pub format: vk::Format,
    /// Image extent
    pub extent: vk::Extent3D,
}

/// Tracks whether an allocation is currently mapped
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MapState {
    mapped: bool,
}

impl MapState {
    pub(crate) fn acquire(&mut self) -> VulkanResult<()> {
        if self.mapped {
            return Err(VulkanError::InvalidOperation {
                reason: "allocation is already mapped by another scope".to_string(),
            });
        }
        self.mapped = true;
        Ok(())
    }

    pub(crate) fn release(&mut self) {
        self.mapped = false;
    }

    pub(crate) const fn is_mapped(self) -> bool {
        self.mapped
    }
}

struct BufferSlot {
    buffer: vk::Buffer,
    allocation: vk_mem::Allocation,
    size: u64,
    map_state: MapState,
}

struct ImageSlot {
    image: vk::Image,
    allocation: vk_mem::Allocation,
}

struct AllocatorShared {
    buffers: RefCell<SlotMap<BufferKey, BufferSlot>>,
    images: RefCell<SlotMap<ImageKey, ImageSlot>>,
    vma: vk_mem::Allocator,
}

impl AllocatorShared {
    fn destroy_buffer(&self, key: BufferKey) {
        let removed = self.buffers.borrow_mut().remove(key);
        match removed {
            Some(mut slot) => {
                if slot.map_state.is_mapped() {
                    log::warn!("Destroying buffer {:?} while mapped", slot.buffer);
                    unsafe { self.vma.unmap_memory(&mut slot.allocation) };
                }
                unsafe { self.vma.destroy_buffer(slot.buffer, &mut slot.allocation) };
            }
            None => log::warn!("Buffer {:?} destroyed twice", key),
        }
    }

    fn destroy_image(&self, key: ImageKey) {
        let removed = self.images.borrow_mut().remove(key);
        match removed {
            Some(mut slot) => unsafe { self.vma.destroy_image(slot.image, &mut slot.allocation) },
            None => log::warn!("Image {:?} destroyed twice", key),
        }
    }
}

impl Drop for AllocatorShared {
    fn drop(&mut self) {
        let buffers = self.buffers.get_mut();
        let images = self.images.get_mut();
        if !buffers.is_empty() || !images.is_empty() {
            log::warn!(
                "Allocator dropped with {} buffers and {} images still alive",
                buffers.len(),
                images.len()
            );
        }
        for (_, mut slot) in buffers.drain() {
            unsafe { self.vma.destroy_buffer(slot.buffer, &mut slot.allocation) };
        }
        for (_, mut slot) in images.drain() {
            unsafe { self.vma.destroy_image(slot.image, &mut slot.allocation) };
        }
    }
}

/// Buffer and image allocator with deletion-queue registration
///
/// Cloning is cheap; clones share the same underlying allocator. The
/// `vk_mem::Allocator` is destroyed when the last clone and the last pending
/// deletion entry are gone, which must happen before the device is destroyed.
#[derive(Clone)]
pub struct ResourceAllocator {
    shared: Rc<AllocatorShared>,
}

impl ResourceAllocator {
    /// Create the allocator for a device
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
    ) -> VulkanResult<Self> {
        let vma = vk_mem::Allocator::new(vk_mem::AllocatorCreateInfo::new(
            instance,
            device,
            physical_device,
        ))?;

        Ok(Self {
            shared: Rc::new(AllocatorShared {
                buffers: RefCell::new(SlotMap::with_key()),
                images: RefCell::new(SlotMap::with_key()),
                vma,
            }),
        })
    }

    /// Create a buffer and register its destruction
    pub fn create_buffer(
        &self,
        deletion: &mut DeletionQueue,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> VulkanResult<AllocatedBuffer> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let (buffer, allocation) = unsafe {
            self.shared
                .vma
                .create_buffer(&buffer_info, &location.allocation_info())
        }
        .map_err(|e| {
            log::error!("Buffer allocation of {} bytes failed: {:?}", size, e);
            VulkanError::Api(e)
        })?;

        let key = self.shared.buffers.borrow_mut().insert(BufferSlot {
            buffer,
            allocation,
            size,
            map_state: MapState::default(),
        });

        let shared = Rc::clone(&self.shared);
        deletion.push(move || shared.destroy_buffer(key));

        log::debug!("Created buffer {:?} ({} bytes, {:?})", buffer, size, usage);
        Ok(AllocatedBuffer { key, buffer, size })
    }

    /// Create an image and register its destruction
    pub fn create_image(
        &self,
        deletion: &mut DeletionQueue,
        image_info: &vk::ImageCreateInfo,
        location: MemoryLocation,
    ) -> VulkanResult<AllocatedImage> {
        let (image, allocation) = unsafe {
            self.shared
                .vma
                .create_image(image_info, &location.allocation_info())
        }
        .map_err(|e| {
            log::error!("Image allocation failed: {:?}", e);
            VulkanError::Api(e)
        })?;

        let key = self
            .shared
            .images
            .borrow_mut()
            .insert(ImageSlot { image, allocation });

        let shared = Rc::clone(&self.shared);
        deletion.push(move || shared.destroy_image(key));

        Ok(AllocatedImage {
            key,
            image,
            format: image_info.format,
            extent: image_info.extent,
        })
    }

    /// Create a host-visible transfer source filled with `bytes`
    ///
    /// Released when the returned value is dropped, not through the deletion
    /// queue. Keep it alive until the copy that reads it has completed.
    pub fn create_staging_buffer(&self, bytes: &[u8]) -> VulkanResult<StagingBuffer> {
        let size = bytes.len() as u64;
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size.max(1))
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let (buffer, allocation) = unsafe {
            self.shared
                .vma
                .create_buffer(&buffer_info, &MemoryLocation::CpuToGpu.allocation_info())
        }?;

        let mut staging = StagingBuffer {
            shared: Rc::clone(&self.shared),
            buffer,
            allocation: Some(allocation),
            size,
        };
        staging.fill(bytes)?;
        Ok(staging)
    }

    /// Map a buffer, hand its bytes to `f`, then unmap
    pub fn with_mapped<R>(
        &self,
        buffer: &AllocatedBuffer,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> VulkanResult<R> {
        let (ptr, size) = {
            let mut buffers = self.shared.buffers.borrow_mut();
            let slot = buffers
                .get_mut(buffer.key)
                .ok_or_else(|| VulkanError::ResourceNotFound {
                    name: format!("buffer {:?}", buffer.buffer),
                })?;
            slot.map_state.acquire()?;
            match unsafe { self.shared.vma.map_memory(&mut slot.allocation) } {
                Ok(ptr) => (ptr, slot.size),
                Err(e) => {
                    slot.map_state.release();
                    return Err(VulkanError::Api(e));
                }
            }
        };

        let bytes = unsafe { std::slice::from_raw_parts_mut(ptr, size as usize) };
        let result = f(bytes);

        let mut buffers = self.shared.buffers.borrow_mut();
        if let Some(slot) = buffers.get_mut(buffer.key) {
            unsafe { self.shared.vma.unmap_memory(&mut slot.allocation) };
            slot.map_state.release();
        }
        Ok(result)
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.shared.buffers.borrow().len()
    }

    /// Number of live images
    pub fn live_images(&self) -> usize {
        self.shared.images.borrow().len()
    }
}

/// Scope-owned upload source buffer
pub struct StagingBuffer {
    shared: Rc<AllocatorShared>,
    buffer: vk::Buffer,
    allocation: Option<vk_mem::Allocation>,
    size: u64,
}

impl StagingBuffer {
    /// Native buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size of the staged data in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    fn fill(&mut self, bytes: &[u8]) -> VulkanResult<()> {
        let Some(allocation) = self.allocation.as_mut() else {
            return Err(VulkanError::InvalidOperation {
                reason: "staging buffer already released".to_string(),
            });
        };
        unsafe {
            let ptr = self.shared.vma.map_memory(allocation)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            self.shared.vma.unmap_memory(allocation);
        }
        Ok(())
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if let Some(mut allocation) = self.allocation.take() {
            unsafe { self.shared.vma.destroy_buffer(self.buffer, &mut allocation) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_state_rejects_overlapping_scopes() {
        let mut state = MapState::default();
        assert!(state.acquire().is_ok());
        assert!(state.is_mapped());
        assert!(matches!(
            state.acquire(),
            Err(VulkanError::InvalidOperation { .. })
        ));
        state.release();
        assert!(!state.is_mapped());
        assert!(state.acquire().is_ok());
    }

    #[test]
    fn test_memory_location_host_flags() {
        let info = MemoryLocation::CpuToGpu.allocation_info();
        assert!(info
            .required_flags
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
        let info = MemoryLocation::GpuOnly.allocation_info();
        assert!(info.required_flags.is_empty());
    }
}
