//! Pipeline building and material registration through mock factories

use std::cell::RefCell;
use std::rc::Rc;

use ash::vk::{self, Handle};
use vk_engine::render::vulkan::initialization::{VulkanError, VulkanResult};
use vk_engine::render::vulkan::rendering::pipeline::{
    build_shader_pair_pipelines, pair_shader_stages, PipelineBuilder, PipelineFactory, ShaderStage,
};
use vk_engine::render::vulkan::rendering::{MaterialRegistry, ShaderModuleSource};
use vk_engine::render::vulkan::resources::DeletionQueue;

#[derive(Default)]
struct FactoryLog {
    created: Vec<u32>,
    destroyed: Vec<vk::Pipeline>,
    next: u64,
    reject: bool,
}

#[derive(Clone, Default)]
struct MockFactory(Rc<RefCell<FactoryLog>>);

impl PipelineFactory for MockFactory {
    fn create_graphics_pipeline(&self, create_info: &vk::GraphicsPipelineCreateInfo) -> Result<vk::Pipeline, vk::Result> {
        let mut log = self.0.borrow_mut();
        if log.reject {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        log.created.push(create_info.stage_count);
        log.next += 1;
        Ok(vk::Pipeline::from_raw(100 + log.next))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.0.borrow_mut().destroyed.push(pipeline);
    }
}

#[derive(Default)]
struct MockShaders {
    missing: Vec<&'static str>,
    loaded: RefCell<Vec<String>>,
    released: RefCell<Vec<vk::ShaderModule>>,
}

impl ShaderModuleSource for MockShaders {
    fn load_module(&self, name: &str) -> VulkanResult<vk::ShaderModule> {
        if self.missing.contains(&name) {
            return Err(VulkanError::ResourceNotFound { name: name.to_string() });
        }
        let mut loaded = self.loaded.borrow_mut();
        loaded.push(name.to_string());
        Ok(vk::ShaderModule::from_raw(loaded.len() as u64))
    }

    fn release_module(&self, module: vk::ShaderModule) {
        self.released.borrow_mut().push(module);
    }
}

fn builder() -> PipelineBuilder {
    PipelineBuilder::new(
        vk::Extent2D { width: 800, height: 600 },
        vk::PipelineLayout::from_raw(1),
    )
}

fn stage(flag: vk::ShaderStageFlags, raw: u64) -> ShaderStage {
    ShaderStage {
        stage: flag,
        module: vk::ShaderModule::from_raw(raw),
    }
}

fn shader_names() -> Vec<String> {
    ["a.vert", "a.frag", "b.vert", "b.frag"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_invalid_stage_combination_gives_null_and_no_deletion_entry() {
    let factory = MockFactory::default();
    let mut deletion = DeletionQueue::new();

    let pipeline = builder()
        .with_stages(vec![stage(vk::ShaderStageFlags::FRAGMENT, 1)])
        .build_registered(&factory, vk::RenderPass::from_raw(1), &mut deletion);

    assert_eq!(pipeline, vk::Pipeline::null());
    assert!(deletion.is_empty());
    assert!(factory.0.borrow().created.is_empty());
}

#[test]
fn test_api_rejection_gives_null() {
    let factory = MockFactory::default();
    factory.0.borrow_mut().reject = true;
    let mut deletion = DeletionQueue::new();

    let pipeline = builder()
        .with_stages(vec![
            stage(vk::ShaderStageFlags::VERTEX, 1),
            stage(vk::ShaderStageFlags::FRAGMENT, 2),
        ])
        .build_registered(&factory, vk::RenderPass::from_raw(1), &mut deletion);

    assert_eq!(pipeline, vk::Pipeline::null());
    assert!(deletion.is_empty());
}

#[test]
fn test_valid_pipeline_registers_and_flushes() {
    let factory = MockFactory::default();
    let mut deletion = DeletionQueue::new();

    let pipeline = builder()
        .with_stages(vec![
            stage(vk::ShaderStageFlags::VERTEX, 1),
            stage(vk::ShaderStageFlags::FRAGMENT, 2),
        ])
        .build_registered(&factory, vk::RenderPass::from_raw(1), &mut deletion);

    assert_ne!(pipeline, vk::Pipeline::null());
    assert_eq!(deletion.len(), 1);
    assert_eq!(factory.0.borrow().created, vec![2]);

    deletion.flush();
    assert_eq!(factory.0.borrow().destroyed, vec![pipeline]);
}

#[test]
fn test_shader_pairs_build_and_release_modules() {
    let factory = MockFactory::default();
    let shaders = MockShaders::default();
    let mut deletion = DeletionQueue::new();
    let names = shader_names();
    let pairs = pair_shader_stages(&[0, 1, 2, 3], names.len());

    let pipelines = build_shader_pair_pipelines(
        &shaders,
        &factory,
        &names,
        &pairs,
        vk::RenderPass::from_raw(1),
        &mut deletion,
        |_| builder(),
    );

    assert_eq!(pipelines.len(), 2);
    assert!(pipelines.iter().all(|p| *p != vk::Pipeline::null()));
    assert_eq!(deletion.len(), 2);
    assert_eq!(*shaders.loaded.borrow(), names);
    assert_eq!(shaders.released.borrow().len(), 4);
    deletion.flush();
}

#[test]
fn test_missing_shader_yields_null_for_that_pair_only() {
    let factory = MockFactory::default();
    let shaders = MockShaders {
        missing: vec!["b.frag"],
        ..Default::default()
    };
    let mut deletion = DeletionQueue::new();
    let names = shader_names();
    let pairs = pair_shader_stages(&[0, 1, 2, 3], names.len());

    let pipelines = build_shader_pair_pipelines(
        &shaders,
        &factory,
        &names,
        &pairs,
        vk::RenderPass::from_raw(1),
        &mut deletion,
        |_| builder(),
    );

    assert_ne!(pipelines[0], vk::Pipeline::null());
    assert_eq!(pipelines[1], vk::Pipeline::null());
    assert_eq!(deletion.len(), 1);
    // every loaded module is released, including the orphaned vertex stage
    assert_eq!(shaders.loaded.borrow().len(), shaders.released.borrow().len());
    deletion.flush();
}

#[test]
fn test_materials_from_built_pipelines() {
    let factory = MockFactory::default();
    let shaders = MockShaders::default();
    let mut deletion = DeletionQueue::new();
    let names = shader_names();
    let pairs = pair_shader_stages(&[0, 1, 2, 3], names.len());
    let pipelines = build_shader_pair_pipelines(
        &shaders,
        &factory,
        &names,
        &pairs,
        vk::RenderPass::from_raw(1),
        &mut deletion,
        |_| builder(),
    );

    let layout = vk::PipelineLayout::from_raw(1);
    let mut materials = MaterialRegistry::new();
    materials.create_material(pipelines[0], layout, "red");
    materials.create_material(pipelines[1], layout, "colored");

    let red = materials.get_material("red").unwrap();
    assert_eq!(red.pipeline, pipelines[0]);
    assert_eq!(red.pipeline_layout, layout);
    assert!(materials.get_material("unknown").is_none());
    deletion.flush();
}

#[test]
fn test_out_of_range_pair_keeps_later_pipelines_in_place() {
    let factory = MockFactory::default();
    let shaders = MockShaders::default();
    let mut deletion = DeletionQueue::new();
    let names: Vec<String> = ["a.vert", "a.frag", "b.vert", "b.frag", "c.vert", "c.frag"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let pairs = pair_shader_stages(&[0, 1, 2, 9, 4, 5], names.len());
    let mut configured = Vec::new();

    let pipelines = build_shader_pair_pipelines(
        &shaders,
        &factory,
        &names,
        &pairs,
        vk::RenderPass::from_raw(1),
        &mut deletion,
        |index| {
            configured.push(index);
            builder()
        },
    );

    assert_eq!(pipelines.len(), 3);
    assert_ne!(pipelines[0], vk::Pipeline::null());
    assert_eq!(pipelines[1], vk::Pipeline::null());
    assert_ne!(pipelines[2], vk::Pipeline::null());
    // the third pipeline is configured from the third config entry
    assert_eq!(configured, vec![0, 2]);
    assert_eq!(*shaders.loaded.borrow(), vec!["a.vert", "a.frag", "c.vert", "c.frag"]);
    assert_eq!(deletion.len(), 2);
    deletion.flush();
}
