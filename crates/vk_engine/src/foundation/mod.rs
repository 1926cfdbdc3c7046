//! Foundation module - Core utilities and types
//!
//! Math aliases shared by the scene and the renderer, plus the logging
//! entry points used by applications.

pub mod logging;
pub mod math;
