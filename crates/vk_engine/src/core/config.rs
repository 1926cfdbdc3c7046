//! # Unified Configuration System
//!
//! Configuration for the renderer, the engine shell and the scene. The scene
//! section is the declarative binding table: shader files, the flat
//! vertex/fragment stage list, the pipelines built from those pairs, the
//! materials that name a pipeline, and the render objects that name a mesh
//! and a material.
//!
//! All structures load from TOML or RON through the [`Config`] trait.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// How per-frame uniform data is exposed to shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DescriptorMode {
    /// One descriptor set per frame slot; only the scene binding is dynamic
    #[default]
    PerFrame,
    /// One descriptor set shared by every slot; all bindings are dynamic
    Shared,
}

/// Which render objects the frame driver records each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DrawMode {
    /// Only the object picked with the number keys
    #[default]
    Selected,
    /// Every object in the scene
    All,
}

/// # Renderer Configuration
///
/// Vulkan backend settings: instance metadata, window extent, frame overlap
/// and synchronization timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Number of frame slots in flight
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers (debug builds only)
    pub enable_validation: bool,
    /// Upper bound for any fence wait, in nanoseconds
    pub fence_timeout_ns: u64,
    /// Descriptor set arrangement for the global uniforms
    pub descriptor_mode: DescriptorMode,
    /// Which objects are drawn per frame
    pub draw_mode: DrawMode,
    /// Capacity of the per-frame object storage region
    pub max_objects: usize,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            window_width: 1700,
            window_height: 900,
            max_frames_in_flight: 2,
            enable_validation: cfg!(debug_assertions),
            fence_timeout_ns: 1_000_000_000,
            descriptor_mode: DescriptorMode::PerFrame,
            draw_mode: DrawMode::Selected,
            max_objects: 1000,
        }
    }

    /// Set window extent
    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    /// Set the descriptor arrangement
    pub fn with_descriptor_mode(mut self, mode: DescriptorMode) -> Self {
        self.descriptor_mode = mode;
        self
    }

    /// Set the draw mode
    pub fn with_draw_mode(mut self, mode: DrawMode) -> Self {
        self.draw_mode = mode;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if self.window_width == 0 || self.window_height == 0 {
            return Err("Window extent must be non-zero".to_string());
        }

        if self.max_frames_in_flight == 0 {
            return Err("Max frames in flight must be at least 1".to_string());
        }

        if self.max_frames_in_flight > 8 {
            return Err("Max frames in flight should not exceed 8".to_string());
        }

        if self.fence_timeout_ns == 0 {
            return Err("Fence timeout must be non-zero".to_string());
        }

        if self.max_objects == 0 {
            return Err("Object capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Vulkan Engine")
    }
}

/// # Engine Configuration
///
/// Engine shell behavior: logging and debug toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor layout a pipeline is built against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineLayoutKind {
    /// Push constants only
    PushConstants,
    /// Push constants plus the global uniform set
    Mesh,
    /// Push constants, global uniform set and a texture set
    Textured,
}

/// One pipeline, built from the shader pair at the same position in the stage list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDesc {
    /// Name materials refer to
    pub name: String,
    /// Descriptor/push-constant layout
    pub layout: PipelineLayoutKind,
    /// Whether the pipeline reads the engine vertex format
    pub vertex_input: bool,
}

/// Named material bound to a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Material name
    pub name: String,
    /// Pipeline name from [`SceneConfig::pipelines`]
    pub pipeline: String,
    /// Optional texture name from [`SceneConfig::textures`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

/// Mesh source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshDesc {
    /// Mesh name
    pub name: String,
    /// OBJ path relative to the asset directory; `None` selects the built-in triangle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Texture source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureDesc {
    /// Texture name
    pub name: String,
    /// Image path relative to the asset directory
    pub path: String,
}

/// Render object placement and bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDesc {
    /// Object name
    pub name: String,
    /// Mesh name
    pub mesh: String,
    /// Material name
    pub material: String,
    /// World position
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler rotation in radians
    #[serde(default)]
    pub rotation: [f32; 3],
    /// Uniform scale
    #[serde(default = "default_scale")]
    pub scale: f32,
}

const fn default_scale() -> f32 {
    1.0
}

/// # Scene Configuration
///
/// Declarative description of everything the renderer loads at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory containing compiled SPIR-V files
    pub shader_dir: String,
    /// Directory meshes and textures are resolved against
    pub asset_dir: String,
    /// Shader file names
    pub shaders: Vec<String>,
    /// Flat list of shader indices, read as (vertex, fragment) pairs
    pub pipeline_stages: Vec<usize>,
    /// Pipelines, one per stage pair
    pub pipelines: Vec<PipelineDesc>,
    /// Materials
    pub materials: Vec<MaterialDesc>,
    /// Meshes
    pub meshes: Vec<MeshDesc>,
    /// Textures
    pub textures: Vec<TextureDesc>,
    /// Render objects, selectable with keys 1-9 in order
    pub objects: Vec<ObjectDesc>,
}

impl SceneConfig {
    /// Validate cross references between the tables
    pub fn validate(&self) -> Result<(), String> {
        if self.pipeline_stages.len() % 2 != 0 {
            return Err(format!(
                "Pipeline stage list must hold vertex/fragment pairs, got {} entries",
                self.pipeline_stages.len()
            ));
        }

        if let Some(index) = self.pipeline_stages.iter().find(|&&i| i >= self.shaders.len()) {
            return Err(format!("Shader index {} out of range", index));
        }

        if self.pipelines.len() != self.pipeline_stages.len() / 2 {
            return Err(format!(
                "{} pipelines declared for {} stage pairs",
                self.pipelines.len(),
                self.pipeline_stages.len() / 2
            ));
        }

        for material in &self.materials {
            if !self.pipelines.iter().any(|p| p.name == material.pipeline) {
                return Err(format!(
                    "Material {} references unknown pipeline {}",
                    material.name, material.pipeline
                ));
            }
            if let Some(texture) = &material.texture {
                if !self.textures.iter().any(|t| &t.name == texture) {
                    return Err(format!(
                        "Material {} references unknown texture {}",
                        material.name, texture
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolve an asset path against the asset directory
    pub fn asset_path(&self, file: &str) -> String {
        format!("{}/{}", self.asset_dir.trim_end_matches('/'), file)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        let pipeline = |name: &str, layout, vertex_input| PipelineDesc {
            name: name.to_string(),
            layout,
            vertex_input,
        };
        let material = |name: &str, pipeline: &str, texture: Option<&str>| MaterialDesc {
            name: name.to_string(),
            pipeline: pipeline.to_string(),
            texture: texture.map(str::to_string),
        };
        let object = |name: &str, mesh: &str, material: &str, scale: f32| ObjectDesc {
            name: name.to_string(),
            mesh: mesh.to_string(),
            material: material.to_string(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale,
        };

        Self {
            shader_dir: "target/shaders".to_string(),
            asset_dir: "resources".to_string(),
            shaders: vec![
                "triangle.vert.spv".to_string(),
                "triangle.frag.spv".to_string(),
                "colored_triangle.vert.spv".to_string(),
                "colored_triangle.frag.spv".to_string(),
                "tri_mesh.vert.spv".to_string(),
                "default_lit.frag.spv".to_string(),
                "textured_lit.frag.spv".to_string(),
            ],
            pipeline_stages: vec![0, 1, 2, 3, 4, 5, 4, 6],
            pipelines: vec![
                pipeline("triangle", PipelineLayoutKind::PushConstants, false),
                pipeline("colored_triangle", PipelineLayoutKind::PushConstants, false),
                pipeline("mesh", PipelineLayoutKind::Mesh, true),
                pipeline("textured_mesh", PipelineLayoutKind::Textured, true),
            ],
            materials: vec![
                material("red", "triangle", None),
                material("colored", "colored_triangle", None),
                material("defaultmesh", "mesh", None),
                material("texturedmesh", "textured_mesh", Some("empire_diffuse")),
            ],
            meshes: vec![
                MeshDesc { name: "triangle".to_string(), path: None },
                MeshDesc {
                    name: "monkey".to_string(),
                    path: Some("models/monkey_smooth.obj".to_string()),
                },
                MeshDesc {
                    name: "empire".to_string(),
                    path: Some("models/lost_empire.obj".to_string()),
                },
            ],
            textures: vec![TextureDesc {
                name: "empire_diffuse".to_string(),
                path: "textures/lost_empire-RGBA.png".to_string(),
            }],
            objects: vec![
                object("red_triangle", "triangle", "red", 1.0),
                object("colored_triangle", "triangle", "colored", 1.0),
                object("triangle_mesh", "triangle", "defaultmesh", 1.0),
                object("monkey", "monkey", "defaultmesh", 1.0),
                object("empire", "empire", "texturedmesh", 1.0),
            ],
        }
    }
}

/// # Application Configuration
///
/// Root configuration loaded by applications.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine shell settings
    pub engine: EngineConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Scene tables
    pub scene: SceneConfig,
}

impl ApplicationConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate().map_err(ConfigError::Invalid)?;
        self.scene.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}
