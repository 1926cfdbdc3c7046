//! Mesh representation for 3D models
//!
//! Pure CPU-side geometry. The Vulkan vertex input layout for [`Vertex`]
//! lives in the backend's `vertex_layout` module.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{to_gpu_matrix, Mat4};

/// Vertex with position, normal, color and texture coordinate
///
/// `#[repr(C)]` keeps the field order and offsets stable for GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Vertex color
    pub color: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl Vertex {
    /// Vertex with position and color, zero normal and uv
    pub const fn colored(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            normal: [0.0; 3],
            color,
            uv: [0.0; 2],
        }
    }
}

/// Ordered triangle list; immutable once uploaded
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertices, three per triangle
    pub vertices: Vec<Vertex>,
}

impl Mesh {
    /// Create a mesh from a vertex list
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    /// Single green triangle used when no mesh file is configured
    pub fn triangle() -> Self {
        let green = [0.0, 1.0, 0.0];
        Self::new(vec![
            Vertex::colored([1.0, 1.0, 0.0], green),
            Vertex::colored([-1.0, 1.0, 0.0], green),
            Vertex::colored([0.0, -1.0, 0.0], green),
        ])
    }

    /// Number of vertices to draw
    pub fn vertex_count(&self) -> u32 {
        u32::try_from(self.vertices.len()).unwrap_or(u32::MAX)
    }

    /// Vertex data as raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Size of the vertex data in bytes
    pub fn byte_size(&self) -> u64 {
        self.as_bytes().len() as u64
    }
}

/// Per-draw push constant block: a free vec4 plus the model matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshPushConstants {
    /// Spare data slot
    pub data: [f32; 4],
    /// Column-major model matrix
    pub render_matrix: [[f32; 4]; 4],
}

impl MeshPushConstants {
    /// Push constants carrying a model matrix
    pub fn from_matrix(render_matrix: [[f32; 4]; 4]) -> Self {
        Self {
            data: [0.0; 4],
            render_matrix,
        }
    }

    /// Push constants for a draw: the object's model matrix, nothing else
    pub fn for_model(model: &Mat4) -> Self {
        Self::from_matrix(to_gpu_matrix(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};

    #[test]
    fn test_vertex_layout_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
        assert_eq!(std::mem::offset_of!(Vertex, color), 24);
        assert_eq!(std::mem::offset_of!(Vertex, uv), 36);
    }

    #[test]
    fn test_push_constant_size() {
        assert_eq!(std::mem::size_of::<MeshPushConstants>(), 80);
    }

    #[test]
    fn test_push_constants_carry_model_matrix() {
        let model = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros(), 2.0).to_matrix();
        let constants = MeshPushConstants::for_model(&model);
        assert_eq!(constants.render_matrix, to_gpu_matrix(&model));
        // translation sits in the last column
        assert_eq!(constants.render_matrix[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(constants.data, [0.0; 4]);
    }

    #[test]
    fn test_triangle_bytes() {
        let mesh = Mesh::triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.byte_size(), 3 * 44);
    }
}
