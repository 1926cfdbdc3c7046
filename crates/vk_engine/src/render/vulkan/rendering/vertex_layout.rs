//! Vulkan vertex input description for the engine [`Vertex`]

use std::mem::{offset_of, size_of};

use ash::vk;

use crate::render::primitives::Vertex;

/// Owned vertex input state, turned into create info at pipeline build time
#[derive(Debug, Clone, Default)]
pub struct VertexInputDescription {
    /// Buffer bindings
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    /// Attributes
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexInputDescription {
    /// No vertex buffers; positions come from the shader
    pub fn empty() -> Self {
        Self::default()
    }

    /// One interleaved binding: position, normal, color, uv at locations 0-3
    pub fn for_vertex() -> Self {
        let attribute = |location: u32, format: vk::Format, offset: usize| vk::VertexInputAttributeDescription {
            location,
            binding: 0,
            format,
            offset: offset as u32,
        };

        Self {
            bindings: vec![vk::VertexInputBindingDescription {
                binding: 0,
                stride: size_of::<Vertex>() as u32,
                input_rate: vk::VertexInputRate::VERTEX,
            }],
            attributes: vec![
                attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
                attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
                attribute(2, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, color)),
                attribute(3, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_description_offsets() {
        let description = VertexInputDescription::for_vertex();
        assert_eq!(description.bindings[0].stride, 44);
        let offsets: Vec<u32> = description.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36]);
        assert_eq!(description.attributes[3].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn test_empty_description() {
        let description = VertexInputDescription::empty();
        assert!(description.bindings.is_empty());
        assert!(description.attributes.is_empty());
    }
}
