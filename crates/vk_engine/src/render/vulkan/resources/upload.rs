//! Immediate-submit upload channel
//!
//! One command pool, one command buffer and one fence reserved for
//! synchronous transfers. Each [`UploadContext::immediate_submit`] records,
//! submits, blocks until the fence signals, then resets the fence and the
//! pool. Nothing here interleaves with the frame ring's submissions.
//!
//! The sequence itself lives in [`submit_and_wait`], written against the
//! [`ImmediateQueue`] operations so it can run without a device.

use ash::{vk, Device};

use super::allocator::{AllocatedBuffer, MemoryLocation, ResourceAllocator};
use super::deletion_queue::DeletionQueue;
use crate::render::primitives::Mesh;
use crate::render::vulkan::initialization::VulkanResult;
use crate::render::vulkan::rendering::commands::{allocate_primary, create_command_pool};
use crate::render::vulkan::state::sync::{create_fence, wait_for_fence};

/// Upper bound on a single upload, in nanoseconds
pub const UPLOAD_TIMEOUT_NS: u64 = 9_999_999_999;

/// Operations behind one synchronous submission
pub trait ImmediateQueue {
    /// Begin a one-time-submit recording and return the command buffer
    fn begin(&self) -> VulkanResult<vk::CommandBuffer>;
    /// End the recording
    fn end(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()>;
    /// Submit the buffer, signaling the upload fence
    fn submit(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()>;
    /// Wait on the upload fence; expiry is [`VulkanError::Timeout`]
    ///
    /// [`VulkanError::Timeout`]: crate::render::vulkan::initialization::VulkanError::Timeout
    fn wait(&self, timeout_ns: u64) -> VulkanResult<()>;
    /// Return the upload fence to unsignaled
    fn reset_fence(&self) -> VulkanResult<()>;
    /// Recycle the command pool
    fn reset_pool(&self) -> VulkanResult<()>;
}

/// Begin, record, end, submit, wait, then reset the fence and the pool
///
/// Any failure stops the sequence; after a timed-out wait nothing is reset.
pub fn submit_and_wait<Q, F>(queue: &Q, timeout_ns: u64, record: F) -> VulkanResult<()>
where
    Q: ImmediateQueue + ?Sized,
    F: FnOnce(vk::CommandBuffer),
{
    let command_buffer = queue.begin()?;
    record(command_buffer);
    queue.end(command_buffer)?;
    queue.submit(command_buffer)?;
    queue.wait(timeout_ns)?;
    queue.reset_fence()?;
    queue.reset_pool()
}

/// Dedicated objects for synchronous GPU work
pub struct UploadContext {
    device: Device,
    queue: vk::Queue,
    upload_fence: vk::Fence,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl UploadContext {
    /// Create the upload pool, buffer and fence
    pub fn new(
        device: &Device,
        queue: vk::Queue,
        queue_family_index: u32,
        deletion: &mut DeletionQueue,
    ) -> VulkanResult<Self> {
        let upload_fence = create_fence(device, false, deletion)?;
        let command_pool =
            create_command_pool(device, queue_family_index, vk::CommandPoolCreateFlags::empty(), deletion)?;
        let command_buffer = allocate_primary(device, command_pool)?;

        Ok(Self {
            device: device.clone(),
            queue,
            upload_fence,
            command_pool,
            command_buffer,
        })
    }

    /// Record with `record`, submit, and block until the GPU is done
    pub fn immediate_submit<F>(&self, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        submit_and_wait(self, UPLOAD_TIMEOUT_NS, |cmd| record(&self.device, cmd))
    }

    /// Copy `bytes` into a new device-local buffer through a staging buffer
    pub fn upload_buffer(
        &self,
        allocator: &ResourceAllocator,
        deletion: &mut DeletionQueue,
        bytes: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<AllocatedBuffer> {
        let size = bytes.len() as u64;
        let staging = allocator.create_staging_buffer(bytes)?;
        let target = allocator.create_buffer(
            deletion,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        )?;

        self.immediate_submit(|device, cmd| {
            let copy = vk::BufferCopy::builder().size(size).build();
            unsafe { device.cmd_copy_buffer(cmd, staging.handle(), target.buffer, &[copy]) };
        })?;

        Ok(target)
    }
}

impl ImmediateQueue for UploadContext {
    fn begin(&self) -> VulkanResult<vk::CommandBuffer> {
        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(self.command_buffer, &begin_info)? };
        Ok(self.command_buffer)
    }

    fn end(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        unsafe { self.device.end_command_buffer(command_buffer)? };
        Ok(())
    }

    fn submit(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();
        unsafe {
            self.device
                .queue_submit(self.queue, &[submit_info], self.upload_fence)?;
        }
        Ok(())
    }

    fn wait(&self, timeout_ns: u64) -> VulkanResult<()> {
        wait_for_fence(&self.device, self.upload_fence, timeout_ns, "upload")
    }

    fn reset_fence(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.upload_fence])? };
        Ok(())
    }

    fn reset_pool(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())?;
        }
        Ok(())
    }
}

/// Mesh resident in a device-local vertex buffer
#[derive(Debug, Clone, Copy)]
pub struct GpuMesh {
    /// Vertex buffer
    pub vertex_buffer: AllocatedBuffer,
    /// Number of vertices to draw
    pub vertex_count: u32,
}

/// Upload a mesh's vertices into a device-local vertex buffer
pub fn upload_mesh(
    upload: &UploadContext,
    allocator: &ResourceAllocator,
    deletion: &mut DeletionQueue,
    mesh: &Mesh,
) -> VulkanResult<GpuMesh> {
    let vertex_buffer = upload.upload_buffer(
        allocator,
        deletion,
        mesh.as_bytes(),
        vk::BufferUsageFlags::VERTEX_BUFFER,
    )?;

    Ok(GpuMesh {
        vertex_buffer,
        vertex_count: mesh.vertex_count(),
    })
}

/// Record an image layout transition for a single-mip color image
pub fn cmd_transition_image(
    device: &Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, dst_access, src_stage, dst_stage) = transition_masks(old_layout, new_layout);

    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build();

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// Subresource range covering the single color mip and layer
pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Access masks and stages for the upload layout transitions
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> (vk::AccessFlags, vk::AccessFlags, vk::PipelineStageFlags, vk::PipelineStageFlags) {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        _ => (
            vk::AccessFlags::MEMORY_WRITE,
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_dst_transition_masks() {
        let (src, dst, src_stage, dst_stage) =
            transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert!(src.is_empty());
        assert_eq!(dst, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn test_shader_read_transition_masks() {
        let (src, dst, _, dst_stage) = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
        assert_eq!(src, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(dst, vk::AccessFlags::SHADER_READ);
        assert_eq!(dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }
}
