//! Graphics pipeline construction
//!
//! [`PipelineBuilder`] holds the fixed-function state as owned data and turns
//! it into a `VkGraphicsPipelineCreateInfo` only inside [`PipelineBuilder::build`].
//! Creation goes through the [`PipelineFactory`] seam so the stage validation
//! and the shader-pair walk can run without a device.
//!
//! A failed build yields `vk::Pipeline::null()` rather than an error. Null
//! pipelines are never registered for deletion.

use std::mem::size_of;

use ash::{vk, Device};

use super::shader::ShaderModuleSource;
use super::vertex_layout::VertexInputDescription;
use crate::core::config::PipelineLayoutKind;
use crate::render::primitives::MeshPushConstants;
use crate::render::vulkan::initialization::VulkanResult;
use crate::render::vulkan::resources::DeletionQueue;

const SHADER_ENTRY: &std::ffi::CStr = c"main";

/// Creates and destroys graphics pipelines
pub trait PipelineFactory: Clone + 'static {
    /// Create one graphics pipeline
    fn create_graphics_pipeline(&self, create_info: &vk::GraphicsPipelineCreateInfo) -> Result<vk::Pipeline, vk::Result>;

    /// Destroy a pipeline created by this factory
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);
}

impl PipelineFactory for Device {
    fn create_graphics_pipeline(&self, create_info: &vk::GraphicsPipelineCreateInfo) -> Result<vk::Pipeline, vk::Result> {
        let pipelines = unsafe {
            self.create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(create_info), None)
        }
        .map_err(|(_, e)| e)?;
        pipelines.into_iter().next().ok_or(vk::Result::ERROR_UNKNOWN)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { Device::destroy_pipeline(self, pipeline, None) };
    }
}

/// One programmable stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStage {
    /// Stage flag, vertex or fragment
    pub stage: vk::ShaderStageFlags,
    /// Module handle
    pub module: vk::ShaderModule,
}

/// Check that the stages form a drawable program
pub fn validate_stages(stages: &[ShaderStage]) -> Result<(), String> {
    let count = |flag: vk::ShaderStageFlags| stages.iter().filter(|s| s.stage == flag).count();

    if count(vk::ShaderStageFlags::VERTEX) != 1 {
        return Err(format!(
            "expected exactly one vertex stage, found {}",
            count(vk::ShaderStageFlags::VERTEX)
        ));
    }
    if count(vk::ShaderStageFlags::FRAGMENT) > 1 {
        return Err("more than one fragment stage".to_string());
    }
    if let Some(other) = stages
        .iter()
        .find(|s| s.stage != vk::ShaderStageFlags::VERTEX && s.stage != vk::ShaderStageFlags::FRAGMENT)
    {
        return Err(format!("unsupported stage {:?}", other.stage));
    }
    if stages.iter().any(|s| s.module == vk::ShaderModule::null()) {
        return Err("null shader module".to_string());
    }
    Ok(())
}

/// Fixed-function and programmable state for one graphics pipeline
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// Shader stages, validated at build time
    pub shader_stages: Vec<ShaderStage>,
    /// Vertex bindings and attributes
    pub vertex_input: VertexInputDescription,
    /// Primitive topology
    pub topology: vk::PrimitiveTopology,
    /// Static viewport
    pub viewport: vk::Viewport,
    /// Static scissor
    pub scissor: vk::Rect2D,
    /// Fill mode
    pub polygon_mode: vk::PolygonMode,
    /// Face culling
    pub cull_mode: vk::CullModeFlags,
    /// Enable the depth test
    pub depth_test: bool,
    /// Enable depth writes
    pub depth_write: bool,
    /// Depth comparison
    pub depth_compare: vk::CompareOp,
    /// Color channels written by the single attachment
    pub color_write_mask: vk::ColorComponentFlags,
    /// Layout shared with the draw-time binds
    pub pipeline_layout: vk::PipelineLayout,
}

impl PipelineBuilder {
    /// Filled triangles, no culling, depth tested, covering `extent`
    pub fn new(extent: vk::Extent2D, pipeline_layout: vk::PipelineLayout) -> Self {
        Self {
            shader_stages: Vec::new(),
            vertex_input: VertexInputDescription::empty(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            viewport: vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            scissor: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            depth_test: true,
            depth_write: true,
            depth_compare: vk::CompareOp::LESS_OR_EQUAL,
            color_write_mask: vk::ColorComponentFlags::RGBA,
            pipeline_layout,
        }
    }

    /// Set the vertex input description
    pub fn with_vertex_input(mut self, vertex_input: VertexInputDescription) -> Self {
        self.vertex_input = vertex_input;
        self
    }

    /// Set the shader stages
    pub fn with_stages(mut self, stages: Vec<ShaderStage>) -> Self {
        self.shader_stages = stages;
        self
    }

    /// Build the pipeline, or a null handle if the stages are invalid or the API call fails
    pub fn build<F: PipelineFactory>(&self, factory: &F, render_pass: vk::RenderPass) -> vk::Pipeline {
        if let Err(reason) = validate_stages(&self.shader_stages) {
            log::error!("Refusing to build pipeline: {}", reason);
            return vk::Pipeline::null();
        }

        let stage_infos: Vec<vk::PipelineShaderStageCreateInfo> = self
            .shader_stages
            .iter()
            .map(|s| {
                vk::PipelineShaderStageCreateInfo::builder()
                    .stage(s.stage)
                    .module(s.module)
                    .name(SHADER_ENTRY)
                    .build()
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&self.vertex_input.bindings)
            .vertex_attribute_descriptions(&self.vertex_input.attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.topology)
            .primitive_restart_enable(false);

        let viewports = [self.viewport];
        let scissors = [self.scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.polygon_mode)
            .line_width(1.0)
            .cull_mode(self.cull_mode)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false)
            .min_sample_shading(1.0);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(self.depth_test)
            .depth_write_enable(self.depth_write)
            .depth_compare_op(if self.depth_test {
                self.depth_compare
            } else {
                vk::CompareOp::ALWAYS
            })
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(self.color_write_mask)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&blend_attachments);

        let create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stage_infos)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .layout(self.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        match factory.create_graphics_pipeline(&create_info) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                log::error!("Failed to create graphics pipeline: {:?}", e);
                vk::Pipeline::null()
            }
        }
    }

    /// Build and register the pipeline for deletion when it is not null
    pub fn build_registered<F: PipelineFactory>(
        &self,
        factory: &F,
        render_pass: vk::RenderPass,
        deletion: &mut DeletionQueue,
    ) -> vk::Pipeline {
        let pipeline = self.build(factory, render_pass);
        if pipeline != vk::Pipeline::null() {
            let factory = factory.clone();
            deletion.push(move || factory.destroy_pipeline(pipeline));
        }
        pipeline
    }
}

/// A vertex and fragment shader index pair from the stage list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePair {
    /// Index of the vertex shader
    pub vertex: usize,
    /// Index of the fragment shader
    pub fragment: usize,
}

/// Group the flat stage list into (vertex, fragment) pairs
///
/// Entries alternate vertex, fragment. The result has one entry per complete
/// pair, so position `i` always lines up with the `i`-th pipeline; a pair with
/// an index outside `shader_count` is `None`. A trailing unpaired entry is
/// dropped. Both cases log a warning.
pub fn pair_shader_stages(stages: &[usize], shader_count: usize) -> Vec<Option<StagePair>> {
    if stages.len() % 2 != 0 {
        log::warn!("Shader stage list has an unpaired trailing entry, ignoring it");
    }

    stages
        .chunks_exact(2)
        .map(|pair| {
            let (vertex, fragment) = (pair[0], pair[1]);
            if vertex >= shader_count || fragment >= shader_count {
                log::warn!(
                    "Shader pair ({}, {}) is out of range for {} shaders",
                    vertex,
                    fragment,
                    shader_count
                );
                return None;
            }
            Some(StagePair { vertex, fragment })
        })
        .collect()
}

/// Walk the stage pairs and build one pipeline per pair
///
/// Each pair's modules are loaded, used for one build and released straight
/// away. A missing pair or a shader that fails to load yields a null pipeline
/// at that position. `configure` supplies the builder for pair `i` without
/// stages.
pub fn build_shader_pair_pipelines<S, F>(
    source: &S,
    factory: &F,
    shaders: &[String],
    pairs: &[Option<StagePair>],
    render_pass: vk::RenderPass,
    deletion: &mut DeletionQueue,
    mut configure: impl FnMut(usize) -> PipelineBuilder,
) -> Vec<vk::Pipeline>
where
    S: ShaderModuleSource,
    F: PipelineFactory,
{
    let mut pipelines = Vec::with_capacity(pairs.len());

    for (index, pair) in pairs.iter().enumerate() {
        let Some(pair) = pair else {
            pipelines.push(vk::Pipeline::null());
            continue;
        };
        let vertex = match source.load_module(&shaders[pair.vertex]) {
            Ok(module) => module,
            Err(e) => {
                log::warn!("Error when building the vertex shader {}: {}", shaders[pair.vertex], e);
                pipelines.push(vk::Pipeline::null());
                continue;
            }
        };
        let fragment = match source.load_module(&shaders[pair.fragment]) {
            Ok(module) => module,
            Err(e) => {
                log::warn!("Error when building the fragment shader {}: {}", shaders[pair.fragment], e);
                source.release_module(vertex);
                pipelines.push(vk::Pipeline::null());
                continue;
            }
        };

        let builder = configure(index).with_stages(vec![
            ShaderStage {
                stage: vk::ShaderStageFlags::VERTEX,
                module: vertex,
            },
            ShaderStage {
                stage: vk::ShaderStageFlags::FRAGMENT,
                module: fragment,
            },
        ]);
        let pipeline = builder.build_registered(factory, render_pass, deletion);

        source.release_module(vertex);
        source.release_module(fragment);

        if pipeline == vk::Pipeline::null() {
            log::warn!("Pipeline {} ({} + {}) is null", index, shaders[pair.vertex], shaders[pair.fragment]);
        } else {
            log::info!("Built pipeline {} from {} + {}", index, shaders[pair.vertex], shaders[pair.fragment]);
        }
        pipelines.push(pipeline);
    }

    pipelines
}

/// Push constant range carrying [`MeshPushConstants`] to the vertex stage
pub fn mesh_push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX,
        offset: 0,
        size: size_of::<MeshPushConstants>() as u32,
    }
}

/// Descriptor set layouts used by a pipeline layout kind
pub fn set_layouts_for(
    kind: PipelineLayoutKind,
    global: vk::DescriptorSetLayout,
    texture: vk::DescriptorSetLayout,
) -> Vec<vk::DescriptorSetLayout> {
    match kind {
        PipelineLayoutKind::PushConstants => Vec::new(),
        PipelineLayoutKind::Mesh => vec![global],
        PipelineLayoutKind::Textured => vec![global, texture],
    }
}

/// Create a pipeline layout and register its destruction
pub fn create_pipeline_layout(
    device: &Device,
    set_layouts: &[vk::DescriptorSetLayout],
    push_constants: &[vk::PushConstantRange],
    deletion: &mut DeletionQueue,
) -> VulkanResult<vk::PipelineLayout> {
    let create_info = vk::PipelineLayoutCreateInfo::builder()
        .set_layouts(set_layouts)
        .push_constant_ranges(push_constants);

    let layout = unsafe { device.create_pipeline_layout(&create_info, None)? };

    let device = device.clone();
    deletion.push(move || unsafe { device.destroy_pipeline_layout(layout, None) });

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn module(raw: u64) -> vk::ShaderModule {
        vk::ShaderModule::from_raw(raw)
    }

    #[test]
    fn test_validate_vertex_and_fragment() {
        let stages = [
            ShaderStage { stage: vk::ShaderStageFlags::VERTEX, module: module(1) },
            ShaderStage { stage: vk::ShaderStageFlags::FRAGMENT, module: module(2) },
        ];
        assert!(validate_stages(&stages).is_ok());
        assert!(validate_stages(&stages[..1]).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_combinations() {
        let fragment_only = [ShaderStage { stage: vk::ShaderStageFlags::FRAGMENT, module: module(2) }];
        assert!(validate_stages(&fragment_only).is_err());

        let two_vertex = [
            ShaderStage { stage: vk::ShaderStageFlags::VERTEX, module: module(1) },
            ShaderStage { stage: vk::ShaderStageFlags::VERTEX, module: module(2) },
        ];
        assert!(validate_stages(&two_vertex).is_err());

        let null_module = [ShaderStage { stage: vk::ShaderStageFlags::VERTEX, module: vk::ShaderModule::null() }];
        assert!(validate_stages(&null_module).is_err());

        let geometry = [
            ShaderStage { stage: vk::ShaderStageFlags::VERTEX, module: module(1) },
            ShaderStage { stage: vk::ShaderStageFlags::GEOMETRY, module: module(3) },
        ];
        assert!(validate_stages(&geometry).is_err());
    }

    #[test]
    fn test_pair_shader_stages() {
        let pairs = pair_shader_stages(&[0, 1, 2, 3, 4, 5, 4, 6], 7);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3], Some(StagePair { vertex: 4, fragment: 6 }));
    }

    #[test]
    fn test_pair_shader_stages_keeps_positions() {
        let pairs = pair_shader_stages(&[0, 1, 2, 9, 4, 5, 2], 6);
        assert_eq!(
            pairs,
            vec![
                Some(StagePair { vertex: 0, fragment: 1 }),
                None,
                Some(StagePair { vertex: 4, fragment: 5 }),
            ]
        );
    }

    #[test]
    fn test_set_layouts_for_kinds() {
        let global = vk::DescriptorSetLayout::from_raw(10);
        let texture = vk::DescriptorSetLayout::from_raw(11);
        assert!(set_layouts_for(PipelineLayoutKind::PushConstants, global, texture).is_empty());
        assert_eq!(set_layouts_for(PipelineLayoutKind::Mesh, global, texture), vec![global]);
        assert_eq!(set_layouts_for(PipelineLayoutKind::Textured, global, texture), vec![global, texture]);
    }

    #[test]
    fn test_push_constant_range_size() {
        assert_eq!(mesh_push_constant_range().size, 80);
    }
}
