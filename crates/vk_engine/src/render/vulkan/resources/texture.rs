//! Vulkan texture upload
//!
//! Pixels go through a staging buffer and the upload channel: the image is
//! moved to TRANSFER_DST_OPTIMAL, filled with a buffer-to-image copy, then
//! moved to SHADER_READ_ONLY_OPTIMAL. The image and its view are destroyed
//! through the deletion queue.

use ash::{vk, Device};

use super::allocator::{AllocatedImage, MemoryLocation, ResourceAllocator};
use super::deletion_queue::DeletionQueue;
use super::upload::{cmd_transition_image, color_subresource_range, UploadContext};
use crate::assets::ImageData;
use crate::render::vulkan::initialization::VulkanResult;

/// Sampled texture image and its view
#[derive(Debug, Clone, Copy)]
pub struct Texture {
    /// Backing image
    pub image: AllocatedImage,
    /// View used for descriptor writes
    pub image_view: vk::ImageView,
}

impl Texture {
    /// Upload RGBA8 pixels into a new sampled image
    pub fn upload(
        device: &Device,
        upload: &UploadContext,
        allocator: &ResourceAllocator,
        deletion: &mut DeletionQueue,
        image_data: &ImageData,
    ) -> VulkanResult<Self> {
        let format = vk::Format::R8G8B8A8_SRGB;
        let extent = vk::Extent3D {
            width: image_data.width,
            height: image_data.height,
            depth: 1,
        };

        let staging = allocator.create_staging_buffer(&image_data.data)?;

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .build();
        let image = allocator.create_image(deletion, &image_info, MemoryLocation::GpuOnly)?;

        upload.immediate_submit(|device, cmd| {
            cmd_transition_image(
                device,
                cmd,
                image.image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );

            let region = vk::BufferImageCopy::builder()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(extent)
                .build();

            unsafe {
                device.cmd_copy_buffer_to_image(
                    cmd,
                    staging.handle(),
                    image.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            cmd_transition_image(
                device,
                cmd,
                image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        })?;

        let image_view = create_image_view(
            device,
            image.image,
            format,
            vk::ImageAspectFlags::COLOR,
            deletion,
        )?;

        log::info!(
            "Uploaded texture {}x{} ({} bytes)",
            image_data.width,
            image_data.height,
            image_data.size_bytes()
        );
        Ok(Self { image, image_view })
    }
}

/// Create a 2D image view and register its destruction
pub fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
    deletion: &mut DeletionQueue,
) -> VulkanResult<vk::ImageView> {
    let subresource_range = vk::ImageSubresourceRange {
        aspect_mask,
        ..color_subresource_range()
    };
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(subresource_range);

    let view = unsafe { device.create_image_view(&create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_image_view(view, None) });
    Ok(view)
}

/// Create a sampler with the given filter and register its destruction
pub fn create_sampler(device: &Device, filter: vk::Filter, deletion: &mut DeletionQueue) -> VulkanResult<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::builder()
        .mag_filter(filter)
        .min_filter(filter)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT);

    let sampler = unsafe { device.create_sampler(&create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_sampler(sampler, None) });
    Ok(sampler)
}
