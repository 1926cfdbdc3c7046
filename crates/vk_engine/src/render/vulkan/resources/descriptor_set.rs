//! Descriptor set layouts, pools and set updates
//!
//! Layouts and pools are destroyed through the deletion queue; sets are
//! freed with their pool.

use ash::{vk, Device};

use super::deletion_queue::DeletionQueue;
use crate::render::vulkan::initialization::{VulkanError, VulkanResult};

/// Descriptor set layout builder
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-descriptor binding of any type
    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add_binding(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    /// Bindings collected so far
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Create the layout and register its destruction
    pub fn build(self, device: &Device, deletion: &mut DeletionQueue) -> VulkanResult<vk::DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None)? };

        let device = device.clone();
        deletion.push(move || unsafe { device.destroy_descriptor_set_layout(layout, None) });
        Ok(layout)
    }
}

/// Descriptor pool sized for the engine's global and texture sets
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Create a pool for `max_sets` sets and register its destruction
    pub fn new(device: &Device, max_sets: u32, deletion: &mut DeletionQueue) -> VulkanResult<Self> {
        let pool_sizes = [
            (vk::DescriptorType::UNIFORM_BUFFER, 10),
            (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, 10),
            (vk::DescriptorType::STORAGE_BUFFER, 10),
            (vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, 10),
            (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 10),
        ]
        .map(|(ty, per_set)| {
            vk::DescriptorPoolSize::builder()
                .ty(ty)
                .descriptor_count(max_sets * per_set)
                .build()
        });

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None)? };

        let destroy_device = device.clone();
        deletion.push(move || unsafe { destroy_device.destroy_descriptor_pool(pool, None) });

        Ok(Self {
            pool,
            device: device.clone(),
        })
    }

    /// Allocate one set per layout
    pub fn allocate(&self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { Ok(self.device.allocate_descriptor_sets(&alloc_info)?) }
    }

    /// Allocate a single set
    pub fn allocate_one(&self, layout: vk::DescriptorSetLayout) -> VulkanResult<vk::DescriptorSet> {
        self.allocate(&[layout])?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "descriptor set allocation returned nothing".to_string(),
            })
    }
}

enum PendingInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

struct PendingWrite {
    set: vk::DescriptorSet,
    binding: u32,
    descriptor_type: vk::DescriptorType,
    info: PendingInfo,
}

/// Batches descriptor writes and applies them in one update call
///
/// Infos are stored by value and the `vk::WriteDescriptorSet` pointers are
/// only formed in [`Self::update`], so they never dangle.
#[derive(Default)]
pub struct DescriptorSetWriter {
    pending: Vec<PendingWrite>,
}

impl DescriptorSetWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a buffer range to a binding
    pub fn write_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Self {
        self.pending.push(PendingWrite {
            set,
            binding,
            descriptor_type,
            info: PendingInfo::Buffer(vk::DescriptorBufferInfo { buffer, offset, range }),
        });
        self
    }

    /// Write a combined image sampler to a binding
    pub fn write_image(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Self {
        self.pending.push(PendingWrite {
            set,
            binding,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            info: PendingInfo::Image(vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }),
        });
        self
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no writes are queued
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every queued write
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .pending
            .iter()
            .map(|pending| {
                let builder = vk::WriteDescriptorSet::builder()
                    .dst_set(pending.set)
                    .dst_binding(pending.binding)
                    .dst_array_element(0)
                    .descriptor_type(pending.descriptor_type);
                match &pending.info {
                    PendingInfo::Buffer(info) => builder.buffer_info(std::slice::from_ref(info)).build(),
                    PendingInfo::Image(info) => builder.image_info(std::slice::from_ref(info)).build(),
                }
            })
            .collect();

        unsafe { device.update_descriptor_sets(&writes, &[]) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_builder_collects_bindings() {
        let builder = DescriptorSetLayoutBuilder::new()
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
            .add_binding(
                1,
                vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            )
            .add_combined_image_sampler(2, vk::ShaderStageFlags::FRAGMENT);

        let bindings = builder.bindings();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC);
        assert_eq!(bindings[2].binding, 2);
        assert!(bindings.iter().all(|b| b.descriptor_count == 1));
    }

    #[test]
    fn test_writer_queues_writes() {
        let writer = DescriptorSetWriter::new()
            .write_buffer(
                vk::DescriptorSet::null(),
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::Buffer::null(),
                0,
                64,
            )
            .write_image(vk::DescriptorSet::null(), 0, vk::ImageView::null(), vk::Sampler::null());
        assert_eq!(writer.len(), 2);
        assert!(!writer.is_empty());
    }
}
