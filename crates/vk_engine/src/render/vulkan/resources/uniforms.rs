//! Per-frame uniform data and its placement in shared buffers
//!
//! Camera, scene and object data each live in one buffer per kind, with one
//! region per frame slot. Region offsets come from [`UniformLayout::offset`],
//! which pads every stride to the device's offset alignment so that a write
//! for one slot never touches bytes another slot's descriptor can read.

use std::ops::Range;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::core::config::DescriptorMode;
use crate::render::vulkan::initialization::{VulkanError, VulkanResult};

/// Round `size` up to the next multiple of `alignment`
///
/// Returns `size` unchanged when `alignment` is zero.
pub const fn pad_uniform_buffer_size(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        size
    } else {
        (size + alignment - 1) / alignment * alignment
    }
}

/// Camera matrices
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraData {
    /// World to view
    pub view: [[f32; 4]; 4],
    /// View to clip
    pub proj: [[f32; 4]; 4],
    /// `proj * view`
    pub viewproj: [[f32; 4]; 4],
}

/// Scene-wide lighting and fog parameters
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneData {
    /// Fog color, w is the exponent
    pub fog_color: [f32; 4],
    /// x for min, y for max, zw unused
    pub fog_distances: [f32; 4],
    /// Ambient light color
    pub ambient_color: [f32; 4],
    /// Sun direction, w for intensity
    pub sunlight_direction: [f32; 4],
    /// Sun color
    pub sunlight_color: [f32; 4],
}

/// Per-object transform, one entry per render object
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectData {
    /// Model matrix
    pub model: [[f32; 4]; 4],
}

/// Uniform region kinds, in descriptor binding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Camera uniform buffer, binding 0
    Camera,
    /// Scene uniform buffer, binding 1
    Scene,
    /// Object storage buffer, binding 2
    Object,
}

impl UniformKind {
    /// All kinds in binding order
    pub const ALL: [Self; 3] = [Self::Camera, Self::Scene, Self::Object];

    /// Descriptor binding index
    pub const fn binding(self) -> u32 {
        match self {
            Self::Camera => 0,
            Self::Scene => 1,
            Self::Object => 2,
        }
    }

    /// Descriptor type for this kind under `mode`
    pub const fn descriptor_type(self, mode: DescriptorMode) -> vk::DescriptorType {
        match (self, mode) {
            (Self::Camera, DescriptorMode::PerFrame) => vk::DescriptorType::UNIFORM_BUFFER,
            (Self::Camera | Self::Scene, _) => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            (Self::Object, DescriptorMode::PerFrame) => vk::DescriptorType::STORAGE_BUFFER,
            (Self::Object, DescriptorMode::Shared) => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        }
    }

    /// Whether the offset for this kind is supplied at bind time
    pub const fn is_dynamic(self, mode: DescriptorMode) -> bool {
        !matches!(
            (self, mode),
            (Self::Camera | Self::Object, DescriptorMode::PerFrame)
        )
    }

    /// Buffer usage for the backing buffer
    pub const fn buffer_usage(self) -> vk::BufferUsageFlags {
        match self {
            Self::Camera | Self::Scene => vk::BufferUsageFlags::UNIFORM_BUFFER,
            Self::Object => vk::BufferUsageFlags::STORAGE_BUFFER,
        }
    }
}

/// Byte layout of the per-slot uniform regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLayout {
    /// `minUniformBufferOffsetAlignment`
    pub min_uniform_alignment: u64,
    /// `minStorageBufferOffsetAlignment`
    pub min_storage_alignment: u64,
    /// Number of frame slots
    pub frame_overlap: usize,
    /// Object entries per slot
    pub max_objects: usize,
}

impl UniformLayout {
    /// Create a layout from device limits and ring size
    pub const fn new(
        min_uniform_alignment: u64,
        min_storage_alignment: u64,
        frame_overlap: usize,
        max_objects: usize,
    ) -> Self {
        Self {
            min_uniform_alignment,
            min_storage_alignment,
            frame_overlap,
            max_objects,
        }
    }

    /// Unpadded size of one slot's data
    pub const fn element_size(&self, kind: UniformKind) -> u64 {
        match kind {
            UniformKind::Camera => std::mem::size_of::<CameraData>() as u64,
            UniformKind::Scene => std::mem::size_of::<SceneData>() as u64,
            UniformKind::Object => (std::mem::size_of::<ObjectData>() * self.max_objects) as u64,
        }
    }

    /// Offset alignment the device requires for this kind
    pub const fn alignment(&self, kind: UniformKind) -> u64 {
        match kind {
            UniformKind::Camera | UniformKind::Scene => self.min_uniform_alignment,
            UniformKind::Object => self.min_storage_alignment,
        }
    }

    /// Distance between consecutive slot regions
    pub const fn stride(&self, kind: UniformKind) -> u64 {
        pad_uniform_buffer_size(self.element_size(kind), self.alignment(kind))
    }

    /// Byte offset of `slot`'s region
    pub const fn offset(&self, kind: UniformKind, slot: usize) -> u64 {
        self.stride(kind) * slot as u64
    }

    /// Byte range of `slot`'s region, unpadded
    pub fn region(&self, kind: UniformKind, slot: usize) -> VulkanResult<Range<usize>> {
        if slot >= self.frame_overlap {
            return Err(VulkanError::InvalidOperation {
                reason: format!("frame slot {} out of range for {} slots", slot, self.frame_overlap),
            });
        }
        let start = self.offset(kind, slot) as usize;
        Ok(start..start + self.element_size(kind) as usize)
    }

    /// Total size of the buffer backing `kind`
    pub const fn buffer_size(&self, kind: UniformKind) -> u64 {
        self.stride(kind) * self.frame_overlap as u64
    }

    /// Copy `bytes` into `slot`'s region of a mapped buffer
    pub fn write_region(
        &self,
        mapped: &mut [u8],
        kind: UniformKind,
        slot: usize,
        bytes: &[u8],
    ) -> VulkanResult<()> {
        let region = self.region(kind, slot)?;
        if bytes.len() > region.len() {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} bytes exceed the {:?} region of {}", bytes.len(), kind, region.len()),
            });
        }
        let end = region.start + bytes.len();
        let target = mapped
            .get_mut(region.start..end)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("{:?} region {:?} outside mapped range", kind, region),
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Borrow `slot`'s region of a mapped buffer
    pub fn read_region<'a>(&self, mapped: &'a [u8], kind: UniformKind, slot: usize) -> VulkanResult<&'a [u8]> {
        let region = self.region(kind, slot)?;
        mapped
            .get(region.clone())
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("{:?} region {:?} outside mapped range", kind, region),
            })
    }

    /// Offset and range written into the descriptor for `kind`
    ///
    /// Dynamic bindings point at the start of the buffer; the slot offset is
    /// added at bind time.
    pub const fn descriptor_range(&self, mode: DescriptorMode, kind: UniformKind, slot: usize) -> (u64, u64) {
        let offset = if kind.is_dynamic(mode) {
            0
        } else {
            self.offset(kind, slot)
        };
        (offset, self.element_size(kind))
    }

    /// Dynamic offsets to bind for `slot`, in binding order
    pub fn dynamic_offsets(&self, mode: DescriptorMode, slot: usize) -> Vec<u32> {
        UniformKind::ALL
            .iter()
            .filter(|kind| kind.is_dynamic(mode))
            .map(|&kind| u32::try_from(self.offset(kind, slot)).unwrap_or(u32::MAX))
            .collect()
    }

    /// Number of global descriptor sets needed
    pub const fn set_count(&self, mode: DescriptorMode) -> usize {
        match mode {
            DescriptorMode::PerFrame => self.frame_overlap,
            DescriptorMode::Shared => 1,
        }
    }

    /// Which global set `slot` binds
    pub const fn set_index(&self, mode: DescriptorMode, slot: usize) -> usize {
        match mode {
            DescriptorMode::PerFrame => slot,
            DescriptorMode::Shared => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(seed: f32) -> CameraData {
        let mut data = CameraData::zeroed();
        for (i, v) in data.viewproj.iter_mut().flatten().enumerate() {
            *v = seed + i as f32;
        }
        data.view[0][0] = seed;
        data
    }

    #[test]
    fn test_pad_is_smallest_multiple() {
        for alignment in [1u64, 4, 16, 64, 256] {
            for size in 0u64..600 {
                let padded = pad_uniform_buffer_size(size, alignment);
                assert_eq!(padded % alignment, 0);
                assert!(padded >= size);
                assert!(padded < size + alignment);
            }
        }
    }

    #[test]
    fn test_pad_zero_alignment_is_identity() {
        for size in [0u64, 1, 80, 192, 1000] {
            assert_eq!(pad_uniform_buffer_size(size, 0), size);
        }
    }

    #[test]
    fn test_pad_is_idempotent() {
        for alignment in [0u64, 1, 3, 64, 256] {
            for size in 0u64..300 {
                let once = pad_uniform_buffer_size(size, alignment);
                assert_eq!(pad_uniform_buffer_size(once, alignment), once);
            }
        }
    }

    #[test]
    fn test_struct_sizes() {
        assert_eq!(std::mem::size_of::<CameraData>(), 192);
        assert_eq!(std::mem::size_of::<SceneData>(), 80);
        assert_eq!(std::mem::size_of::<ObjectData>(), 64);
    }

    #[test]
    fn test_offsets_use_padded_stride() {
        let layout = UniformLayout::new(256, 64, 2, 10);
        assert_eq!(layout.stride(UniformKind::Camera), 256);
        assert_eq!(layout.offset(UniformKind::Camera, 1), 256);
        assert_eq!(layout.offset(UniformKind::Scene, 1), 256);
        assert_eq!(layout.stride(UniformKind::Object), 640);
        assert_eq!(layout.buffer_size(UniformKind::Camera), 512);
    }

    #[test]
    fn test_camera_round_trip_per_slot() {
        let layout = UniformLayout::new(256, 64, 2, 1);
        let mut mapped = vec![0u8; layout.buffer_size(UniformKind::Camera) as usize];

        let first = camera(1.0);
        let second = camera(100.0);
        layout
            .write_region(&mut mapped, UniformKind::Camera, 0, bytemuck::bytes_of(&first))
            .unwrap();
        layout
            .write_region(&mut mapped, UniformKind::Camera, 1, bytemuck::bytes_of(&second))
            .unwrap();

        let read0 = layout.read_region(&mapped, UniformKind::Camera, 0).unwrap();
        let read1 = layout.read_region(&mapped, UniformKind::Camera, 1).unwrap();
        assert_eq!(read0, bytemuck::bytes_of(&first));
        assert_eq!(read1, bytemuck::bytes_of(&second));
    }

    #[test]
    fn test_writing_slot_zero_preserves_slot_one() {
        for alignment in [0u64, 16, 64, 256] {
            let layout = UniformLayout::new(alignment, alignment, 2, 1);
            let mut mapped = vec![0u8; layout.buffer_size(UniformKind::Camera) as usize];

            let kept = camera(7.0);
            layout
                .write_region(&mut mapped, UniformKind::Camera, 1, bytemuck::bytes_of(&kept))
                .unwrap();
            layout
                .write_region(&mut mapped, UniformKind::Camera, 0, &[0xAB; 192])
                .unwrap();

            let read1 = layout.read_region(&mapped, UniformKind::Camera, 1).unwrap();
            assert_eq!(read1, bytemuck::bytes_of(&kept));
        }
    }

    #[test]
    fn test_out_of_range_slot_is_rejected() {
        let layout = UniformLayout::new(256, 64, 2, 1);
        let mut mapped = vec![0u8; layout.buffer_size(UniformKind::Scene) as usize];
        assert!(layout
            .write_region(&mut mapped, UniformKind::Scene, 2, &[0; 80])
            .is_err());
        assert!(layout.read_region(&mapped, UniformKind::Scene, 5).is_err());
    }

    #[test]
    fn test_oversized_write_is_rejected() {
        let layout = UniformLayout::new(256, 64, 2, 1);
        let mut mapped = vec![0u8; layout.buffer_size(UniformKind::Scene) as usize];
        assert!(layout
            .write_region(&mut mapped, UniformKind::Scene, 0, &[0; 81])
            .is_err());
    }

    #[test]
    fn test_per_frame_dynamic_offsets() {
        let layout = UniformLayout::new(256, 64, 2, 4);
        assert_eq!(layout.dynamic_offsets(DescriptorMode::PerFrame, 0), vec![0]);
        assert_eq!(layout.dynamic_offsets(DescriptorMode::PerFrame, 1), vec![256]);
        assert_eq!(layout.descriptor_range(DescriptorMode::PerFrame, UniformKind::Camera, 1), (256, 192));
        assert_eq!(layout.descriptor_range(DescriptorMode::PerFrame, UniformKind::Scene, 1), (0, 80));
        assert_eq!(layout.descriptor_range(DescriptorMode::PerFrame, UniformKind::Object, 1), (256, 256));
        assert_eq!(layout.set_count(DescriptorMode::PerFrame), 2);
        assert_eq!(layout.set_index(DescriptorMode::PerFrame, 1), 1);
    }

    #[test]
    fn test_shared_dynamic_offsets() {
        let layout = UniformLayout::new(256, 64, 2, 4);
        assert_eq!(layout.dynamic_offsets(DescriptorMode::Shared, 0), vec![0, 0, 0]);
        assert_eq!(layout.dynamic_offsets(DescriptorMode::Shared, 1), vec![256, 256, 256]);
        assert_eq!(layout.set_count(DescriptorMode::Shared), 1);
        assert_eq!(layout.set_index(DescriptorMode::Shared, 1), 0);
        for kind in UniformKind::ALL {
            assert!(kind.is_dynamic(DescriptorMode::Shared));
            assert_eq!(layout.descriptor_range(DescriptorMode::Shared, kind, 1).0, 0);
        }
    }

    #[test]
    fn test_dynamic_offsets_respect_alignment() {
        let layout = UniformLayout::new(256, 64, 3, 1);
        for slot in 0..3 {
            for offset in layout.dynamic_offsets(DescriptorMode::Shared, slot) {
                assert_eq!(u64::from(offset) % 64, 0);
            }
            let scene = layout.dynamic_offsets(DescriptorMode::PerFrame, slot)[0];
            assert_eq!(u64::from(scene) % 256, 0);
        }
    }
}
