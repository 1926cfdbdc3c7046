//! SPIR-V shader module loading
//!
//! Modules are transient: they are loaded for one pipeline build and released
//! immediately afterwards, so they are not registered with the deletion queue.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ash::{vk, Device};

use crate::render::vulkan::initialization::{VulkanError, VulkanResult};

/// Source of transient shader modules
pub trait ShaderModuleSource {
    /// Load the named shader into a module
    fn load_module(&self, name: &str) -> VulkanResult<vk::ShaderModule>;

    /// Destroy a module previously returned by [`Self::load_module`]
    fn release_module(&self, module: vk::ShaderModule);
}

/// Create a shader module from SPIR-V bytes
pub fn create_shader_module(device: &Device, bytes: &[u8]) -> VulkanResult<vk::ShaderModule> {
    log::debug!("[SHADER] Creating shader module from {} bytes", bytes.len());

    let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| {
        log::error!("[SHADER] Invalid SPIR-V: {}", e);
        VulkanError::InvalidOperation {
            reason: format!("invalid SPIR-V: {}", e),
        }
    })?;

    let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
    let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(|e| {
        log::error!("[SHADER] vkCreateShaderModule failed: {:?}", e);
        VulkanError::Api(e)
    })?;

    Ok(module)
}

/// Loads compiled shaders from a directory
pub struct ShaderLibrary {
    device: Device,
    directory: PathBuf,
}

impl ShaderLibrary {
    /// Create a library rooted at `directory`
    pub fn new(device: &Device, directory: impl AsRef<Path>) -> Self {
        Self {
            device: device.clone(),
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

impl ShaderModuleSource for ShaderLibrary {
    fn load_module(&self, name: &str) -> VulkanResult<vk::ShaderModule> {
        let path = self.directory.join(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            log::warn!("[SHADER] Failed to read {:?}: {}", path, e);
            VulkanError::ResourceNotFound {
                name: path.display().to_string(),
            }
        })?;
        let module = create_shader_module(&self.device, &bytes)?;
        log::debug!("[SHADER] Loaded {:?}", path);
        Ok(module)
    }

    fn release_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) };
    }
}
