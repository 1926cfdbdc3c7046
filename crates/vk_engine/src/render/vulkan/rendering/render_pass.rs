//! Forward render pass with a color and a depth attachment, plus framebuffers

use ash::{vk, Device};

use crate::render::vulkan::initialization::VulkanResult;
use crate::render::vulkan::resources::texture::create_image_view;
use crate::render::vulkan::resources::{AllocatedImage, DeletionQueue, MemoryLocation, ResourceAllocator};

/// Depth attachment format
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Create the forward pass: color cleared and presented, depth cleared
pub fn create_forward_pass(
    device: &Device,
    color_format: vk::Format,
    deletion: &mut DeletionQueue,
) -> VulkanResult<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build();

    let depth_attachment = vk::AttachmentDescription::builder()
        .format(DEPTH_FORMAT)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .build();

    let attachments = [color_attachment, depth_attachment];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpasses = [vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)
        .build()];

    // Wait for the acquired image before writing color or depth
    let dependencies = [vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
        .build()];

    let create_info = vk::RenderPassCreateInfo::builder()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = unsafe { device.create_render_pass(&create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_render_pass(render_pass, None) });

    log::debug!("Created forward render pass for {:?}", color_format);
    Ok(render_pass)
}

/// Depth image and its view
#[derive(Debug, Clone, Copy)]
pub struct DepthTarget {
    /// Depth image
    pub image: AllocatedImage,
    /// Depth view used by every framebuffer
    pub view: vk::ImageView,
}

impl DepthTarget {
    /// Allocate a device-local depth image covering `extent`
    pub fn new(
        device: &Device,
        allocator: &ResourceAllocator,
        deletion: &mut DeletionQueue,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .build();

        let image = allocator.create_image(deletion, &image_info, MemoryLocation::GpuOnly)?;
        let view = create_image_view(device, image.image, DEPTH_FORMAT, vk::ImageAspectFlags::DEPTH, deletion)?;

        Ok(Self { image, view })
    }
}

/// One framebuffer per swapchain image view, sharing the depth view
pub fn create_framebuffers(
    device: &Device,
    render_pass: vk::RenderPass,
    image_views: &[vk::ImageView],
    depth_view: vk::ImageView,
    extent: vk::Extent2D,
    deletion: &mut DeletionQueue,
) -> VulkanResult<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(image_views.len());

    for &view in image_views {
        let attachments = [view, depth_view];
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.create_framebuffer(&create_info, None)? };

        let device = device.clone();
        deletion.push(move || unsafe { device.destroy_framebuffer(framebuffer, None) });
        framebuffers.push(framebuffer);
    }

    Ok(framebuffers)
}
