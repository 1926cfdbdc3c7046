//! Command recording, shaders, pipelines and materials

pub mod commands;
pub mod material;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod vertex_layout;

pub use commands::{ActiveRenderPass, CommandRecorder};
pub use material::{Material, MaterialKey, MaterialRegistry, MeshKey, MeshRegistry, Registry};
pub use pipeline::{PipelineBuilder, PipelineFactory, ShaderStage, StagePair};
pub use render_pass::DepthTarget;
pub use shader::{ShaderLibrary, ShaderModuleSource};
pub use vertex_layout::VertexInputDescription;
