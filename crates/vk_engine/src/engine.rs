//! Engine main loop

use thiserror::Error;

use crate::core::config::ApplicationConfig;
use crate::core::ConfigError;
use crate::input::{InputState, KeyCode};
use crate::render::vulkan::{VulkanError, VulkanRenderer, Window, WindowError};
use crate::render::FrameDriver;
use crate::scene::Scene;

/// Errors that stop the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Window, renderer, scene and input driven by one loop
///
/// The renderer is declared before the window so it drops first; the surface
/// must be destroyed while the window still exists.
pub struct Engine {
    driver: FrameDriver,
    renderer: VulkanRenderer,
    scene: Scene,
    input: InputState,
    window: Window,
}

impl Engine {
    /// Create the window and renderer and load the scene
    pub fn new(config: &ApplicationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        let renderer_config = &config.renderer;
        let mut window = Window::new(
            &renderer_config.application_name,
            renderer_config.window_width,
            renderer_config.window_height,
        )?;
        let renderer = VulkanRenderer::new(&mut window, renderer_config, &config.scene)?;
        let scene = Scene::from_config(&config.scene);

        Ok(Self {
            driver: FrameDriver::new(renderer_config.max_frames_in_flight),
            renderer,
            scene,
            input: InputState::new(),
            window,
        })
    }

    /// Scene being viewed
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Frames completed so far
    pub fn frame_number(&self) -> u64 {
        self.driver.frame_number()
    }

    /// Run until the window closes or Escape is pressed, then tear down
    pub fn run(mut self) -> Result<(), EngineError> {
        log::info!("Entering main loop");

        while !self.window.should_close() {
            self.window.poll_events();
            for event in self.window.flush_events() {
                match event {
                    glfw::WindowEvent::Key(key, _, glfw::Action::Press | glfw::Action::Repeat, _) => {
                        if let Some(code) = KeyCode::from_glfw(key) {
                            self.input.handle_key(code);
                        }
                    }
                    glfw::WindowEvent::Close => self.window.set_should_close(true),
                    _ => {}
                }
            }
            if self.input.quit_requested() {
                self.window.set_should_close(true);
                break;
            }

            let pending = self.input.take();
            self.scene.apply_input(&pending);

            let mut frame = self.renderer.bind_scene(&self.scene);
            self.driver.draw(&mut frame)?;
        }

        log::info!("Main loop finished after {} frames", self.driver.frame_number());
        self.renderer.cleanup();
        Ok(())
    }
}
