//! Scene viewer
//!
//! Usage: `viewer [scene.toml|scene.ron]`
//!
//! Keys: 1-9 or Space select an object, arrows move the camera, A/D yaw,
//! W/S pitch, X swaps the arrow plane, R resets the camera, Escape quits.

use std::process::ExitCode;

use vk_engine::config::ConfigError;
use vk_engine::prelude::*;

const DEFAULT_SCENE: &str = "resources/scene.toml";

fn load_config(path: &str) -> Result<(ApplicationConfig, bool), ConfigError> {
    match ApplicationConfig::load_from_file(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok((ApplicationConfig::default(), false))
        }
        Err(e) => Err(e),
    }
}

fn main() -> ExitCode {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SCENE.to_string());

    let (config, found) = match load_config(&path) {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init_with_level("info");
            log::error!("Failed to load {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_level(&config.engine.log_level);
    if found {
        log::info!("Loaded scene configuration from {}", path);
    } else {
        log::warn!("Config file {} not found, using defaults", path);
    }
    if config.engine.debug_mode {
        log::debug!("{:#?}", config);
    }

    match Engine::new(&config).and_then(Engine::run) {
        Ok(()) => {
            log::info!("Viewer exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}
