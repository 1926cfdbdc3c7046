//! Command pool and command buffer recording
//!
//! Pools are created through [`create_command_pool`] so their destruction
//! goes through the deletion queue. [`CommandRecorder`] tracks the recording
//! state of one command buffer; [`ActiveRenderPass`] ends its render pass
//! when dropped.

use ash::{vk, Device};

use crate::render::vulkan::initialization::{VulkanError, VulkanResult};
use crate::render::vulkan::resources::DeletionQueue;

/// Create a command pool and register its destruction
pub fn create_command_pool(
    device: &Device,
    queue_family_index: u32,
    flags: vk::CommandPoolCreateFlags,
    deletion: &mut DeletionQueue,
) -> VulkanResult<vk::CommandPool> {
    let pool_create_info = vk::CommandPoolCreateInfo::builder()
        .flags(flags)
        .queue_family_index(queue_family_index);

    let command_pool = unsafe { device.create_command_pool(&pool_create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_command_pool(command_pool, None) });
    Ok(command_pool)
}

/// Allocate one primary command buffer from a pool
pub fn allocate_primary(device: &Device, command_pool: vk::CommandPool) -> VulkanResult<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let buffers = unsafe { device.allocate_command_buffers(&alloc_info)? };
    buffers.into_iter().next().ok_or_else(|| VulkanError::InvalidOperation {
        reason: "command buffer allocation returned nothing".to_string(),
    })
}

/// Recording state for one command buffer
pub struct CommandRecorder<'d> {
    device: &'d Device,
    command_buffer: vk::CommandBuffer,
    recording: bool,
}

impl<'d> CommandRecorder<'d> {
    /// Wrap a command buffer; nothing is recorded until [`Self::begin`]
    pub fn new(device: &'d Device, command_buffer: vk::CommandBuffer) -> Self {
        Self {
            device,
            command_buffer,
            recording: false,
        }
    }

    /// Reset the command buffer and begin a one-time-submit recording
    pub fn reset_and_begin(&mut self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())?;
        }
        self.begin()
    }

    /// Begin a one-time-submit recording
    pub fn begin(&mut self) -> VulkanResult<()> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe { self.device.begin_command_buffer(self.command_buffer, &begin_info)? };

        self.recording = true;
        Ok(())
    }

    /// Begin a render pass; it ends when the returned guard drops
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_, 'd>> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// End the recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        unsafe { self.device.end_command_buffer(self.command_buffer)? };

        self.recording = false;
        Ok(self.command_buffer)
    }
}

/// Render pass scope; `cmd_end_render_pass` runs on drop
pub struct ActiveRenderPass<'r, 'd> {
    recorder: &'r mut CommandRecorder<'d>,
}

impl ActiveRenderPass<'_, '_> {
    /// Bind a graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder.device.cmd_bind_pipeline(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Bind descriptor sets starting at `first_set`
    pub fn bind_descriptor_sets(
        &mut self,
        layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[vk::DescriptorSet],
        dynamic_offsets: &[u32],
    ) {
        unsafe {
            self.recorder.device.cmd_bind_descriptor_sets(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                first_set,
                sets,
                dynamic_offsets,
            );
        }
    }

    /// Bind a vertex buffer at binding 0
    pub fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_vertex_buffers(self.recorder.command_buffer, 0, &[buffer], &[0]);
        }
    }

    /// Push constants to shaders
    pub fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stage_flags: vk::ShaderStageFlags,
        data: &[u8],
    ) {
        unsafe {
            self.recorder.device.cmd_push_constants(
                self.recorder.command_buffer,
                layout,
                stage_flags,
                0,
                data,
            );
        }
    }

    /// Non-indexed draw
    pub fn draw(&mut self, vertex_count: u32, first_instance: u32) {
        unsafe {
            self.recorder
                .device
                .cmd_draw(self.recorder.command_buffer, vertex_count, 1, 0, first_instance);
        }
    }
}

impl Drop for ActiveRenderPass<'_, '_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder
                .device
                .cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
