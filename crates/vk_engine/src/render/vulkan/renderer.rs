//! Vulkan renderer
//!
//! Owns every GPU object the viewer uses and drives them through the frame
//! stages. Construction runs in dependency order: context, allocator,
//! swapchain, render pass, frame ring, upload channel, uniforms, pipelines,
//! materials, meshes, textures. Everything created along the way registers its
//! destruction with one [`DeletionQueue`], which [`VulkanRenderer::cleanup`]
//! flushes once after every in-flight frame has completed.
//!
//! Per-frame work is exposed through [`SceneFrame`], a [`FrameBackend`] that
//! borrows the renderer together with the scene being drawn.

use std::collections::{HashMap, HashSet};

use ash::{vk, Device};

use crate::assets::{load_obj, ImageData};
use crate::core::config::{DrawMode, PipelineLayoutKind, RendererConfig, SceneConfig};
use crate::foundation::math::to_gpu_matrix;
use crate::render::frame::{ambient_color, clear_color, FrameBackend, FrameTarget};
use crate::render::primitives::{Mesh, MeshPushConstants};
use crate::render::vulkan::initialization::{VulkanContext, VulkanError, VulkanResult, Window};
use crate::render::vulkan::rendering::commands::CommandRecorder;
use crate::render::vulkan::rendering::pipeline::{
    build_shader_pair_pipelines, create_pipeline_layout, mesh_push_constant_range, pair_shader_stages,
    set_layouts_for, PipelineBuilder,
};
use crate::render::vulkan::rendering::render_pass::{create_forward_pass, create_framebuffers, DepthTarget};
use crate::render::vulkan::rendering::{MaterialRegistry, MeshRegistry, ShaderLibrary, VertexInputDescription};
use crate::render::vulkan::resources::texture::create_sampler;
use crate::render::vulkan::resources::{
    upload_mesh, CameraData, DeletionQueue, GlobalUniforms, ObjectData, ResourceAllocator, SceneData, Texture,
    UniformKind, UniformLayout, UploadContext,
};
use crate::render::vulkan::state::{wait_and_reset_fence, wait_for_fence, FrameContext, FrameRing, Swapchain};
use crate::scene::Scene;

/// Vulkan renderer and all GPU state
///
/// Fields drop in declaration order; `cleanup` runs first from `Drop`, so the
/// context is destroyed after every resource created from it.
pub struct VulkanRenderer {
    config: RendererConfig,
    frames: FrameRing<FrameContext>,
    swapchain: Swapchain,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    uniforms: GlobalUniforms,
    materials: MaterialRegistry,
    meshes: MeshRegistry,
    layout_kinds: HashMap<vk::PipelineLayout, PipelineLayoutKind>,
    warned: HashSet<String>,
    deletion: DeletionQueue,
    allocator: Option<ResourceAllocator>,
    cleaned_up: bool,
    context: VulkanContext,
}

impl VulkanRenderer {
    /// Initialize the renderer for `window` and load the scene's GPU resources
    pub fn new(window: &mut Window, config: &RendererConfig, scene: &SceneConfig) -> VulkanResult<Self> {
        log::info!(
            "Initializing renderer: {} frames in flight, {:?} descriptors, draw {:?}",
            config.max_frames_in_flight,
            config.descriptor_mode,
            config.draw_mode
        );

        let context = VulkanContext::new(window, &config.application_name, config.enable_validation)?;
        let allocator = ResourceAllocator::new(
            context.instance(),
            context.raw_device(),
            context.physical_device.device,
        )?;
        let mut deletion = DeletionQueue::new();
        let device = context.raw_device().clone();

        let (width, height) = window.get_framebuffer_size();
        let swapchain = Swapchain::new(
            &device,
            context.swapchain_loader(),
            context.physical_device.device,
            context.surface,
            &context.surface_loader,
            vk::Extent2D { width, height },
            &mut deletion,
        )?;
        let extent = swapchain.extent();

        let render_pass = create_forward_pass(&device, swapchain.format().format, &mut deletion)?;
        let depth = DepthTarget::new(&device, &allocator, &mut deletion, extent)?;
        let framebuffers = create_framebuffers(
            &device,
            render_pass,
            swapchain.image_views(),
            depth.view,
            extent,
            &mut deletion,
        )?;

        let frames = FrameContext::create_ring(
            &device,
            context.graphics_queue_family(),
            config.max_frames_in_flight,
            &mut deletion,
        )?;

        let upload = UploadContext::new(
            &device,
            context.graphics_queue(),
            context.graphics_queue_family(),
            &mut deletion,
        )?;

        let layout = UniformLayout::new(
            context.physical_device.min_uniform_alignment(),
            context.physical_device.min_storage_alignment(),
            config.max_frames_in_flight,
            config.max_objects,
        );
        let uniforms = GlobalUniforms::new(
            &device,
            &allocator,
            &mut deletion,
            layout,
            config.descriptor_mode,
            scene.textures.len(),
        )?;

        let sampler = create_sampler(&device, vk::Filter::NEAREST, &mut deletion)?;

        let mut layouts = HashMap::new();
        let mut layout_kinds = HashMap::new();
        for kind in [
            PipelineLayoutKind::PushConstants,
            PipelineLayoutKind::Mesh,
            PipelineLayoutKind::Textured,
        ] {
            let set_layouts = set_layouts_for(kind, uniforms.global_set_layout(), uniforms.texture_set_layout());
            let pipeline_layout =
                create_pipeline_layout(&device, &set_layouts, &[mesh_push_constant_range()], &mut deletion)?;
            layouts.insert(kind, pipeline_layout);
            layout_kinds.insert(pipeline_layout, kind);
        }

        let shader_files: Vec<String> = scene.shaders.clone();
        let pairs = pair_shader_stages(&scene.pipeline_stages, shader_files.len());
        let library = ShaderLibrary::new(&device, &scene.shader_dir);
        let pipelines = build_shader_pair_pipelines(
            &library,
            &device,
            &shader_files,
            &pairs,
            render_pass,
            &mut deletion,
            |index| {
                let (kind, vertex_input) = scene
                    .pipelines
                    .get(index)
                    .map(|desc| (desc.layout, desc.vertex_input))
                    .unwrap_or((PipelineLayoutKind::PushConstants, false));
                let vertex_input = if vertex_input {
                    VertexInputDescription::for_vertex()
                } else {
                    VertexInputDescription::empty()
                };
                PipelineBuilder::new(extent, layouts[&kind]).with_vertex_input(vertex_input)
            },
        );

        let mut materials = MaterialRegistry::new();
        for material in &scene.materials {
            let Some(index) = scene.pipelines.iter().position(|p| p.name == material.pipeline) else {
                log::warn!("Material {} names unknown pipeline {}", material.name, material.pipeline);
                continue;
            };
            let pipeline = pipelines.get(index).copied().unwrap_or_else(vk::Pipeline::null);
            let pipeline_layout = layouts[&scene.pipelines[index].layout];
            materials.create_material(pipeline, pipeline_layout, &material.name);
        }

        let mut meshes = MeshRegistry::new();
        for desc in &scene.meshes {
            let mesh = match &desc.path {
                None => Mesh::triangle(),
                Some(path) => match load_obj(scene.asset_path(path)) {
                    Ok(vertices) => Mesh::new(vertices),
                    Err(e) => {
                        log::warn!("Skipping mesh {}: {}", desc.name, e);
                        continue;
                    }
                },
            };
            let gpu_mesh = upload_mesh(&upload, &allocator, &mut deletion, &mesh)?;
            log::info!("Uploaded mesh {} ({} vertices)", desc.name, gpu_mesh.vertex_count);
            meshes.insert(&desc.name, gpu_mesh);
        }

        let mut texture_sets = HashMap::new();
        for desc in &scene.textures {
            let image = match ImageData::from_file(scene.asset_path(&desc.path)) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Skipping texture {}: {}", desc.name, e);
                    continue;
                }
            };
            let texture = Texture::upload(&device, &upload, &allocator, &mut deletion, &image)?;
            match uniforms.allocate_texture_set(&device, texture.image_view, sampler) {
                Ok(set) => {
                    texture_sets.insert(desc.name.clone(), set);
                }
                Err(e) => log::warn!("Skipping texture {}: no descriptor set ({})", desc.name, e),
            }
        }
        for material in &scene.materials {
            if let Some(texture) = &material.texture {
                match texture_sets.get(texture) {
                    Some(&set) => {
                        materials.set_texture(&material.name, set);
                    }
                    None => log::warn!("Material {} has no texture {}", material.name, texture),
                }
            }
        }

        log::info!(
            "Renderer ready: {} swapchain images, {} materials, {} meshes, {} deletion entries",
            swapchain.image_count(),
            materials.len(),
            meshes.len(),
            deletion.len()
        );

        Ok(Self {
            config: config.clone(),
            frames,
            swapchain,
            render_pass,
            framebuffers,
            uniforms,
            materials,
            meshes,
            layout_kinds,
            warned: HashSet::new(),
            deletion,
            allocator: Some(allocator),
            cleaned_up: false,
            context,
        })
    }

    /// Settings the renderer was built with
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Materials by name
    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// Uploaded meshes by name
    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }

    /// Pair the renderer with the scene for one call to the frame driver
    pub fn bind_scene<'a>(&'a mut self, scene: &'a Scene) -> SceneFrame<'a> {
        SceneFrame { renderer: self, scene }
    }

    fn device(&self) -> &Device {
        self.context.raw_device()
    }

    fn allocator(&self) -> VulkanResult<&ResourceAllocator> {
        self.allocator.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "renderer already cleaned up".to_string(),
        })
    }

    fn frame(&self, slot: usize) -> VulkanResult<FrameContext> {
        self.frames.slot(slot).copied().ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("frame slot {} out of range", slot),
        })
    }

    fn warn_once(&mut self, key: String, message: impl FnOnce() -> String) {
        if self.warned.insert(key) {
            log::warn!("{}", message());
        }
    }

    fn write_uniforms(&self, scene: &Scene, target: &FrameTarget) -> VulkanResult<()> {
        let extent = self.swapchain.extent();
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let view = scene.camera.view();
        let proj = scene.camera.projection(aspect);

        let camera = CameraData {
            view: to_gpu_matrix(&view),
            proj: to_gpu_matrix(&proj),
            viewproj: to_gpu_matrix(&(proj * view)),
        };
        let scene_data = SceneData {
            fog_color: [0.0; 4],
            fog_distances: [0.0; 4],
            ambient_color: ambient_color(target.frame_number),
            sunlight_direction: [0.0, -1.0, 0.0, 1.0],
            sunlight_color: [1.0; 4],
        };
        let objects: Vec<ObjectData> = scene
            .objects()
            .iter()
            .take(self.config.max_objects)
            .map(|object| ObjectData {
                model: to_gpu_matrix(&object.model_matrix()),
            })
            .collect();

        let allocator = self.allocator()?;
        self.uniforms
            .write_slot(allocator, UniformKind::Camera, target.slot, bytemuck::bytes_of(&camera))?;
        self.uniforms
            .write_slot(allocator, UniformKind::Scene, target.slot, bytemuck::bytes_of(&scene_data))?;
        self.uniforms
            .write_slot(allocator, UniformKind::Object, target.slot, bytemuck::cast_slice(&objects))?;
        Ok(())
    }

    /// Resolve each drawn object to its draw parameters, warning once per miss
    fn collect_draws(&mut self, scene: &Scene, mode: DrawMode) -> Vec<DrawCall> {
        let mut draws = Vec::new();

        for (index, object) in scene.drawn_objects(mode) {
            if index >= self.config.max_objects {
                self.warn_once(format!("capacity:{}", object.name), || {
                    format!("Render object {} exceeds the object buffer capacity", object.name)
                });
                continue;
            }
            let Some(mesh) = self.meshes.get_mesh(&object.mesh).copied() else {
                self.warn_once(format!("mesh:{}", object.mesh), || {
                    format!("Render object {} uses missing mesh {}", object.name, object.mesh)
                });
                continue;
            };
            let Some(material) = self.materials.get_material(&object.material).copied() else {
                self.warn_once(format!("material:{}", object.material), || {
                    format!("Render object {} uses missing material {}", object.name, object.material)
                });
                continue;
            };
            if !material.is_drawable() {
                self.warn_once(format!("pipeline:{}", object.material), || {
                    format!("Material {} has no pipeline, skipping {}", object.material, object.name)
                });
                continue;
            }

            let kind = self
                .layout_kinds
                .get(&material.pipeline_layout)
                .copied()
                .unwrap_or(PipelineLayoutKind::PushConstants);
            if kind == PipelineLayoutKind::Textured && material.texture_set.is_none() {
                self.warn_once(format!("texture:{}", object.material), || {
                    format!("Material {} has no texture bound, skipping {}", object.material, object.name)
                });
                continue;
            }

            draws.push(DrawCall {
                object_index: index as u32,
                model: object.model_matrix(),
                kind,
                pipeline: material.pipeline,
                pipeline_layout: material.pipeline_layout,
                texture_set: material.texture_set,
                vertex_buffer: mesh.vertex_buffer.buffer,
                vertex_count: mesh.vertex_count,
            });
        }

        draws
    }

    fn record(&mut self, scene: &Scene, target: &FrameTarget) -> VulkanResult<()> {
        let frame = self.frame(target.slot)?;
        let framebuffer = *self
            .framebuffers
            .get(target.image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no framebuffer for swapchain image {}", target.image_index),
            })?;

        self.write_uniforms(scene, target)?;
        let draws = self.collect_draws(scene, self.config.draw_mode);

        let extent = self.swapchain.extent();
        let global_set = self.uniforms.set_for_slot(target.slot);
        let dynamic_offsets = self.uniforms.dynamic_offsets(target.slot);

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color(target.frame_number),
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        let device = self.device();
        let mut recorder = CommandRecorder::new(device, frame.command_buffer);
        recorder.reset_and_begin()?;
        {
            let mut pass = recorder.begin_render_pass(self.render_pass, framebuffer, render_area, &clear_values)?;
            for draw in &draws {
                pass.bind_pipeline(draw.pipeline);
                if draw.kind != PipelineLayoutKind::PushConstants {
                    pass.bind_descriptor_sets(draw.pipeline_layout, 0, &[global_set], &dynamic_offsets);
                }
                if let (PipelineLayoutKind::Textured, Some(texture_set)) = (draw.kind, draw.texture_set) {
                    pass.bind_descriptor_sets(draw.pipeline_layout, 1, &[texture_set], &[]);
                }
                pass.bind_vertex_buffer(draw.vertex_buffer);

                let constants = MeshPushConstants::for_model(&draw.model);
                pass.push_constants(
                    draw.pipeline_layout,
                    vk::ShaderStageFlags::VERTEX,
                    bytemuck::bytes_of(&constants),
                );
                pass.draw(draw.vertex_count, draw.object_index);
            }
        }
        recorder.end()?;
        Ok(())
    }

    fn submit(&self, target: &FrameTarget) -> VulkanResult<()> {
        let frame = self.frame(target.slot)?;

        let wait_semaphores = [frame.present_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_semaphore];
        let command_buffers = [frame.command_buffer];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.device()
                .queue_submit(self.context.graphics_queue(), &[submit_info], frame.render_fence)?;
        }
        Ok(())
    }

    fn present(&self, target: &FrameTarget) -> VulkanResult<()> {
        let frame = self.frame(target.slot)?;

        let wait_semaphores = [frame.render_semaphore];
        let swapchains = [self.swapchain.handle()];
        let image_indices = [target.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let suboptimal = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)?
        };
        if suboptimal {
            log::debug!("Swapchain suboptimal at frame {}", target.frame_number);
        }
        Ok(())
    }

    /// Wait for the GPU, flush the deletion queue and release the allocator
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        log::info!("Cleaning up renderer ({} deletion entries)", self.deletion.len());

        for frame in self.frames.iter() {
            if let Err(e) = wait_for_fence(self.device(), frame.render_fence, self.config.fence_timeout_ns, "shutdown") {
                log::error!("Frame fence did not signal during shutdown: {}", e);
            }
        }
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait idle failed during shutdown: {}", e);
        }

        self.deletion.flush();
        if let Some(allocator) = self.allocator.take() {
            let (buffers, images) = (allocator.live_buffers(), allocator.live_images());
            if buffers > 0 || images > 0 {
                log::warn!("{} buffers and {} images outlived the deletion queue", buffers, images);
            }
        }
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Resolved parameters for one draw
#[derive(Debug, Clone, Copy)]
struct DrawCall {
    object_index: u32,
    model: crate::foundation::math::Mat4,
    kind: PipelineLayoutKind,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
    texture_set: Option<vk::DescriptorSet>,
    vertex_buffer: vk::Buffer,
    vertex_count: u32,
}

/// Renderer and scene borrowed together for one frame
pub struct SceneFrame<'a> {
    renderer: &'a mut VulkanRenderer,
    scene: &'a Scene,
}

impl FrameBackend for SceneFrame<'_> {
    fn wait_for_fence(&mut self, slot: usize) -> VulkanResult<()> {
        let frame = self.renderer.frame(slot)?;
        wait_and_reset_fence(
            self.renderer.device(),
            frame.render_fence,
            self.renderer.config.fence_timeout_ns,
            "render fence",
        )
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<u32> {
        let frame = self.renderer.frame(slot)?;
        let result = unsafe {
            self.renderer.context.swapchain_loader().acquire_next_image(
                self.renderer.swapchain.handle(),
                self.renderer.config.fence_timeout_ns,
                frame.present_semaphore,
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    log::debug!("Acquired image {} from a suboptimal swapchain", image_index);
                }
                Ok(image_index)
            }
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => Err(VulkanError::Timeout {
                what: "swapchain image",
            }),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn record_frame(&mut self, target: &FrameTarget) -> VulkanResult<()> {
        self.renderer.record(self.scene, target)
    }

    fn submit_frame(&mut self, target: &FrameTarget) -> VulkanResult<()> {
        self.renderer.submit(target)
    }

    fn present_frame(&mut self, target: &FrameTarget) -> VulkanResult<()> {
        self.renderer.present(target)
    }
}
