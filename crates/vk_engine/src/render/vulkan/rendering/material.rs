//! Named material and mesh registries
//!
//! Both are slot maps behind a name index. Re-registering a name replaces the
//! value in place, so keys handed out earlier stay valid.

use std::collections::HashMap;

use ash::vk;
use slotmap::{new_key_type, Key, SlotMap};

use crate::render::vulkan::resources::GpuMesh;

new_key_type! {
    /// Handle to a registered material
    pub struct MaterialKey;
    /// Handle to a registered mesh
    pub struct MeshKey;
}

/// Pipeline and layout pair used to draw an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    /// Graphics pipeline; null when the build failed
    pub pipeline: vk::Pipeline,
    /// Layout the pipeline was built against
    pub pipeline_layout: vk::PipelineLayout,
    /// Set 1 for textured materials
    pub texture_set: Option<vk::DescriptorSet>,
}

impl Material {
    /// Untextured material
    pub fn new(pipeline: vk::Pipeline, pipeline_layout: vk::PipelineLayout) -> Self {
        Self {
            pipeline,
            pipeline_layout,
            texture_set: None,
        }
    }

    /// A material whose pipeline failed to build cannot be drawn
    pub fn is_drawable(&self) -> bool {
        self.pipeline != vk::Pipeline::null()
    }
}

/// Name-indexed slot map
#[derive(Debug)]
pub struct Registry<K: Key, V> {
    values: SlotMap<K, V>,
    names: HashMap<String, K>,
}

impl<K: Key, V> Registry<K, V> {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            values: SlotMap::with_key(),
            names: HashMap::new(),
        }
    }

    /// Insert or replace the value stored under `name`
    pub fn insert(&mut self, name: &str, value: V) -> K {
        if let Some(&key) = self.names.get(name) {
            if let Some(slot) = self.values.get_mut(key) {
                *slot = value;
                return key;
            }
        }
        let key = self.values.insert(value);
        self.names.insert(name.to_string(), key);
        key
    }

    /// Entry by name
    pub fn get(&self, name: &str) -> Option<&V> {
        self.names.get(name).and_then(|&key| self.values.get(key))
    }

    /// Mutable entry by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        let key = *self.names.get(name)?;
        self.values.get_mut(key)
    }

    /// Stable key for a name
    pub fn key_of(&self, name: &str) -> Option<K> {
        self.names.get(name).copied()
    }

    /// Entry by key
    pub fn by_key(&self, key: K) -> Option<&V> {
        self.values.get(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Key, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Materials by name
pub type MaterialRegistry = Registry<MaterialKey, Material>;
/// Uploaded meshes by name
pub type MeshRegistry = Registry<MeshKey, GpuMesh>;

impl Registry<MaterialKey, Material> {
    /// Register a material under `name`, replacing any existing one
    pub fn create_material(
        &mut self,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        name: &str,
    ) -> MaterialKey {
        if pipeline == vk::Pipeline::null() {
            log::warn!("Material '{}' registered with a null pipeline", name);
        }
        self.insert(name, Material::new(pipeline, pipeline_layout))
    }

    /// Material by name
    pub fn get_material(&self, name: &str) -> Option<&Material> {
        self.get(name)
    }

    /// Material by key
    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.by_key(key)
    }

    /// Attach a texture descriptor set; false if the material does not exist
    pub fn set_texture(&mut self, name: &str, set: vk::DescriptorSet) -> bool {
        match self.get_mut(name) {
            Some(material) => {
                material.texture_set = Some(set);
                true
            }
            None => false,
        }
    }
}

impl Registry<MeshKey, GpuMesh> {
    /// Mesh by name
    pub fn get_mesh(&self, name: &str) -> Option<&GpuMesh> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_create_and_get_material() {
        let mut registry = MaterialRegistry::new();
        let pipeline = vk::Pipeline::from_raw(7);
        let layout = vk::PipelineLayout::from_raw(8);
        registry.create_material(pipeline, layout, "defaultmesh");

        let material = registry.get_material("defaultmesh").unwrap();
        assert_eq!(material.pipeline, pipeline);
        assert_eq!(material.pipeline_layout, layout);
        assert!(material.texture_set.is_none());
        assert!(registry.get_material("missing").is_none());
    }

    #[test]
    fn test_overwrite_keeps_key() {
        let mut registry = MaterialRegistry::new();
        let first = registry.create_material(vk::Pipeline::from_raw(1), vk::PipelineLayout::from_raw(1), "red");
        let second = registry.create_material(vk::Pipeline::from_raw(2), vk::PipelineLayout::from_raw(2), "red");

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.material(first).unwrap().pipeline, vk::Pipeline::from_raw(2));
    }

    #[test]
    fn test_set_texture() {
        let mut registry = MaterialRegistry::new();
        registry.create_material(vk::Pipeline::from_raw(3), vk::PipelineLayout::from_raw(4), "textured");
        let set = vk::DescriptorSet::from_raw(9);

        assert!(registry.set_texture("textured", set));
        assert!(!registry.set_texture("missing", set));
        assert_eq!(registry.get_material("textured").unwrap().texture_set, Some(set));
    }

    #[test]
    fn test_null_pipeline_not_drawable() {
        let mut registry = MaterialRegistry::new();
        registry.create_material(vk::Pipeline::null(), vk::PipelineLayout::from_raw(1), "broken");
        assert!(!registry.get_material("broken").unwrap().is_drawable());
    }

    #[test]
    fn test_generic_registry() {
        let mut registry: Registry<MeshKey, u32> = Registry::new();
        let key = registry.insert("monkey", 3);
        assert_eq!(registry.key_of("monkey"), Some(key));
        assert_eq!(registry.get("monkey"), Some(&3));
        assert!(registry.get("triangle").is_none());
    }
}
