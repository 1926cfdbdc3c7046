//! GPU side of the descriptor/uniform layer
//!
//! Owns one buffer per [`UniformKind`], the global and texture set layouts,
//! the descriptor pool, and the global sets (one per frame slot or one shared,
//! depending on [`DescriptorMode`]).

use ash::{vk, Device};

use super::allocator::{AllocatedBuffer, MemoryLocation, ResourceAllocator};
use super::deletion_queue::DeletionQueue;
use super::descriptor_set::{DescriptorPool, DescriptorSetLayoutBuilder, DescriptorSetWriter};
use super::uniforms::{UniformKind, UniformLayout};
use crate::core::config::DescriptorMode;
use crate::render::vulkan::initialization::VulkanResult;

/// Sets the descriptor pool must hold: the global sets plus one per texture
pub const fn pool_capacity(layout: &UniformLayout, mode: DescriptorMode, texture_count: usize) -> u32 {
    (layout.set_count(mode) + texture_count) as u32
}

/// Uniform buffers, layouts and global descriptor sets
pub struct GlobalUniforms {
    layout: UniformLayout,
    mode: DescriptorMode,
    buffers: [AllocatedBuffer; 3],
    global_set_layout: vk::DescriptorSetLayout,
    texture_set_layout: vk::DescriptorSetLayout,
    pool: DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
}

impl GlobalUniforms {
    /// Create buffers, layouts and sets, and point every set at its regions
    ///
    /// The pool also reserves `texture_count` texture sets for
    /// [`Self::allocate_texture_set`].
    pub fn new(
        device: &Device,
        allocator: &ResourceAllocator,
        deletion: &mut DeletionQueue,
        layout: UniformLayout,
        mode: DescriptorMode,
        texture_count: usize,
    ) -> VulkanResult<Self> {
        let [camera, scene, object] = UniformKind::ALL.map(|kind| {
            allocator.create_buffer(
                deletion,
                layout.buffer_size(kind),
                kind.buffer_usage(),
                MemoryLocation::CpuToGpu,
            )
        });
        let buffers = [camera?, scene?, object?];

        let global_set_layout = UniformKind::ALL
            .iter()
            .fold(DescriptorSetLayoutBuilder::new(), |builder, &kind| {
                builder.add_binding(kind.binding(), kind.descriptor_type(mode), stage_flags(kind))
            })
            .build(device, deletion)?;

        let texture_set_layout = DescriptorSetLayoutBuilder::new()
            .add_combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
            .build(device, deletion)?;

        let set_count = layout.set_count(mode);
        let pool = DescriptorPool::new(device, pool_capacity(&layout, mode, texture_count), deletion)?;
        let sets = pool.allocate(&vec![global_set_layout; set_count])?;

        let mut writer = DescriptorSetWriter::new();
        for (set_index, &set) in sets.iter().enumerate() {
            for kind in UniformKind::ALL {
                let (offset, range) = layout.descriptor_range(mode, kind, set_index);
                writer = writer.write_buffer(
                    set,
                    kind.binding(),
                    kind.descriptor_type(mode),
                    buffers[kind.binding() as usize].buffer,
                    offset,
                    range,
                );
            }
        }
        writer.update(device);

        log::info!(
            "Global uniforms: {:?} mode, {} set(s), strides camera={} scene={} object={}",
            mode,
            set_count,
            layout.stride(UniformKind::Camera),
            layout.stride(UniformKind::Scene),
            layout.stride(UniformKind::Object)
        );

        Ok(Self {
            layout,
            mode,
            buffers,
            global_set_layout,
            texture_set_layout,
            pool,
            sets,
        })
    }

    /// Region layout
    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Layout of set 0
    pub fn global_set_layout(&self) -> vk::DescriptorSetLayout {
        self.global_set_layout
    }

    /// Layout of the texture set (set 1)
    pub fn texture_set_layout(&self) -> vk::DescriptorSetLayout {
        self.texture_set_layout
    }

    /// Backing buffer for a kind
    pub fn buffer(&self, kind: UniformKind) -> &AllocatedBuffer {
        &self.buffers[kind.binding() as usize]
    }

    /// Global set to bind for `slot`
    pub fn set_for_slot(&self, slot: usize) -> vk::DescriptorSet {
        self.sets[self.layout.set_index(self.mode, slot)]
    }

    /// Dynamic offsets to bind with [`Self::set_for_slot`]
    pub fn dynamic_offsets(&self, slot: usize) -> Vec<u32> {
        self.layout.dynamic_offsets(self.mode, slot)
    }

    /// Map the kind's buffer, write `bytes` into `slot`'s region, unmap
    pub fn write_slot(
        &self,
        allocator: &ResourceAllocator,
        kind: UniformKind,
        slot: usize,
        bytes: &[u8],
    ) -> VulkanResult<()> {
        allocator.with_mapped(self.buffer(kind), |mapped| {
            self.layout.write_region(mapped, kind, slot, bytes)
        })?
    }

    /// Allocate and fill a texture set for a material
    pub fn allocate_texture_set(
        &self,
        device: &Device,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> VulkanResult<vk::DescriptorSet> {
        let set = self.pool.allocate_one(self.texture_set_layout)?;
        DescriptorSetWriter::new()
            .write_image(set, 0, image_view, sampler)
            .update(device);
        Ok(set)
    }
}

fn stage_flags(kind: UniformKind) -> vk::ShaderStageFlags {
    match kind {
        UniformKind::Camera | UniformKind::Object => vk::ShaderStageFlags::VERTEX,
        UniformKind::Scene => vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_capacity_grows_with_textures() {
        let layout = UniformLayout::new(256, 64, 2, 1000);
        assert_eq!(pool_capacity(&layout, DescriptorMode::PerFrame, 0), 2);
        assert_eq!(pool_capacity(&layout, DescriptorMode::PerFrame, 40), 42);
        assert_eq!(pool_capacity(&layout, DescriptorMode::Shared, 40), 41);
    }
}
