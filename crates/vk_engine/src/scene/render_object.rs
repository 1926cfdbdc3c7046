//! Drawable scene entries

use crate::core::config::ObjectDesc;
use crate::foundation::math::{Mat4, Transform, Vec3};

/// A mesh drawn with a material at a transform
///
/// Mesh and material are referenced by name and resolved against the
/// registries when recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderObject {
    /// Object name
    pub name: String,
    /// Mesh name in the mesh registry
    pub mesh: String,
    /// Material name in the material registry
    pub material: String,
    /// World placement
    pub transform: Transform,
}

impl RenderObject {
    /// Model matrix from the transform
    pub fn model_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }
}

impl From<&ObjectDesc> for RenderObject {
    fn from(desc: &ObjectDesc) -> Self {
        Self {
            name: desc.name.clone(),
            mesh: desc.mesh.clone(),
            material: desc.material.clone(),
            transform: Transform::new(Vec3::from(desc.position), Vec3::from(desc.rotation), desc.scale),
        }
    }
}
