//! # Core Engine Module
//!
//! Shared configuration types consumed by the engine, the renderer and the
//! scene loader.

pub mod config;

pub use config::{
    ApplicationConfig, Config, ConfigError, DescriptorMode, DrawMode, EngineConfig,
    MaterialDesc, MeshDesc, ObjectDesc, PipelineDesc, PipelineLayoutKind, RendererConfig,
    SceneConfig, TextureDesc,
};
