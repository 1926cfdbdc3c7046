//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the conversions the renderer needs to hand
//! matrices to shaders.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform from position, euler rotation (radians) and uniform scale
    pub fn new(position: Vec3, euler: Vec3, scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_euler_angles(euler.x, euler.y, euler.z),
            scale: Vec3::new(scale, scale, scale),
        }
    }

    /// Model matrix: translate * rotate * scale
    pub fn to_matrix(&self) -> Mat4 {
        let translation = Mat4::new_translation(&self.position);
        let rotation = self.rotation.to_homogeneous();
        let scale = Mat4::new_nonuniform_scaling(&self.scale);
        translation * rotation * scale
    }
}

/// Column-major array layout expected by GLSL `mat4`
pub fn to_gpu_matrix(matrix: &Mat4) -> [[f32; 4]; 4] {
    (*matrix).into()
}

/// Right-handed perspective projection with the Y axis flipped for Vulkan clip space
pub fn vulkan_perspective(aspect: f32, fovy: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::new_perspective(aspect, fovy, near, far);
    proj[(1, 1)] *= -1.0;
    proj
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_matrix_translation() {
        let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros(), 2.0);
        let m = transform.to_matrix();
        assert_relative_eq!(m[(0, 3)], 1.0);
        assert_relative_eq!(m[(1, 3)], 2.0);
        assert_relative_eq!(m[(2, 3)], 3.0);
        assert_relative_eq!(m[(0, 0)], 2.0);
    }

    #[test]
    fn test_gpu_matrix_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(4.0, 5.0, 6.0));
        let cols = to_gpu_matrix(&m);
        assert_relative_eq!(cols[3][0], 4.0);
        assert_relative_eq!(cols[3][1], 5.0);
        assert_relative_eq!(cols[3][2], 6.0);
        assert_relative_eq!(cols[3][3], 1.0);
    }

    #[test]
    fn test_vulkan_perspective_flips_y() {
        let gl = Mat4::new_perspective(1.5, 1.2, 0.1, 200.0);
        let vk = vulkan_perspective(1.5, 1.2, 0.1, 200.0);
        assert_relative_eq!(vk[(1, 1)], -gl[(1, 1)]);
        assert_relative_eq!(vk[(0, 0)], gl[(0, 0)]);
    }
}
