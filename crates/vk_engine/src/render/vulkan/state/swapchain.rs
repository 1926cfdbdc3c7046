//! Swapchain creation
//!
//! The swapchain is created once at the window size and never recreated; an
//! out-of-date swapchain is reported as an error by the frame loop.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

use crate::render::vulkan::initialization::{VulkanError, VulkanResult};
use crate::render::vulkan::resources::texture::create_image_view;
use crate::render::vulkan::resources::DeletionQueue;

/// Swapchain handle with its images and views
pub struct Swapchain {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a FIFO swapchain and register its destruction
    pub fn new(
        device: &Device,
        loader: &SwapchainLoader,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        window_extent: vk::Extent2D,
        deletion: &mut DeletionQueue,
    ) -> VulkanResult<Self> {
        let capabilities =
            unsafe { surface_loader.get_physical_device_surface_capabilities(physical_device, surface)? };
        let formats = unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface)? };

        let format = choose_surface_format(&formats)
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?;
        let extent = choose_extent(&capabilities, window_extent);
        let image_count = choose_image_count(&capabilities);

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe { loader.create_swapchain(&create_info, None)? };
        {
            let loader = loader.clone();
            deletion.push(move || unsafe { loader.destroy_swapchain(swapchain, None) });
        }

        let images = unsafe { loader.get_swapchain_images(swapchain)? };
        let image_views = images
            .iter()
            .map(|&image| create_image_view(device, image, format.format, vk::ImageAspectFlags::COLOR, deletion))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Created swapchain: {} images, {}x{}, {:?}",
            images.len(),
            extent.width,
            extent.height,
            format.format
        );

        Ok(Self {
            swapchain,
            images,
            image_views,
            format,
            extent,
        })
    }

    /// Swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Chosen surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// One view per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// Prefer B8G8R8A8_SRGB with sRGB non-linear color space, else the first format
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// Use the surface's extent when fixed, otherwise clamp the window size
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: window_extent
            .width
            .clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: window_extent
            .height
            .clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn test_prefers_srgb_format() {
        let formats = [format(vk::Format::R8G8B8A8_UNORM), format(vk::Format::B8G8R8A8_SRGB)];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [format(vk::Format::R8G8B8A8_UNORM)];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::R8G8B8A8_UNORM);
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn test_extent_clamped_when_undefined() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 1024, height: 768 },
            ..Default::default()
        };
        let extent = choose_extent(&capabilities, vk::Extent2D { width: 1700, height: 900 });
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn test_extent_uses_current() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 800, height: 600 },
            ..Default::default()
        };
        let extent = choose_extent(&capabilities, vk::Extent2D { width: 1700, height: 900 });
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_image_count() {
        let unbounded = vk::SurfaceCapabilitiesKHR { min_image_count: 2, max_image_count: 0, ..Default::default() };
        assert_eq!(choose_image_count(&unbounded), 3);
        let capped = vk::SurfaceCapabilitiesKHR { min_image_count: 2, max_image_count: 2, ..Default::default() };
        assert_eq!(choose_image_count(&capped), 2);
    }
}
