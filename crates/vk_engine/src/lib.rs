//! # vk_engine
//!
//! A double-buffered Vulkan renderer.
//!
//! Frames alternate over a ring of per-frame command buffers, semaphores and
//! fences. Buffers and images come from a `vk_mem` allocator and register
//! their destruction with a LIFO deletion queue. Uniform data for each frame
//! slot lives in padded regions of shared buffers. Pipelines are built from
//! vertex/fragment shader pairs and bound to objects through named materials.
//!
//! ```rust,no_run
//! use vk_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let config = ApplicationConfig::load_or_default("scene.toml")?;
//!     Engine::new(&config)?.run()
//! }
//! ```

#![warn(clippy::all)]

pub mod assets;
pub mod config;
pub mod core;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, DescriptorMode, DrawMode, RendererConfig, SceneConfig},
        config::Config,
        foundation::{logging, math::{Mat4, Transform, Vec3}},
        render::{FrameBackend, FrameDriver, FrameTarget},
        scene::Scene,
        Engine, EngineError,
    };
}
