//! Frame driver state machine
//!
//! Each call to [`FrameDriver::draw`] walks one frame through
//! `WaitFence -> Acquire -> Record -> Submit -> Present` against a
//! [`FrameBackend`]. The frame counter only advances when all five stages
//! succeed; the first failing stage aborts the frame and its error is returned.

use std::fmt;

use crate::render::vulkan::initialization::{VulkanError, VulkanResult};
use crate::render::vulkan::state::current_frame_index;

/// Stages of one frame, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    /// Wait on and reset the slot's render fence
    WaitFence,
    /// Acquire the next swapchain image
    Acquire,
    /// Record the slot's command buffer
    Record,
    /// Submit to the graphics queue
    Submit,
    /// Queue the image for presentation
    Present,
}

impl FrameStage {
    /// Stages in execution order
    pub const ORDER: [Self; 5] = [Self::WaitFence, Self::Acquire, Self::Record, Self::Submit, Self::Present];
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitFence => "wait-fence",
            Self::Acquire => "acquire",
            Self::Record => "record",
            Self::Submit => "submit",
            Self::Present => "present",
        };
        f.write_str(name)
    }
}

/// The slot and swapchain image a frame renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTarget {
    /// Frame ring slot, `frame_number % frame_overlap`
    pub slot: usize,
    /// Acquired swapchain image
    pub image_index: u32,
    /// Frame counter value for this frame
    pub frame_number: u64,
}

/// GPU operations the frame driver sequences
pub trait FrameBackend {
    /// Block until `slot`'s previous submission has completed, then reset its fence
    fn wait_for_fence(&mut self, slot: usize) -> VulkanResult<()>;

    /// Acquire the next swapchain image, signaling `slot`'s image-available semaphore
    fn acquire_image(&mut self, slot: usize) -> VulkanResult<u32>;

    /// Record the frame's command buffer
    fn record_frame(&mut self, target: &FrameTarget) -> VulkanResult<()>;

    /// Submit the command buffer, signaling render-complete and the slot fence
    fn submit_frame(&mut self, target: &FrameTarget) -> VulkanResult<()>;

    /// Queue the image for presentation after render-complete
    fn present_frame(&mut self, target: &FrameTarget) -> VulkanResult<()>;
}

/// Frame counter and ring size
#[derive(Debug, Clone)]
pub struct FrameDriver {
    frame_number: u64,
    frame_overlap: usize,
}

impl FrameDriver {
    /// Driver for `frame_overlap` slots, at least one
    pub fn new(frame_overlap: usize) -> Self {
        Self {
            frame_number: 0,
            frame_overlap: frame_overlap.max(1),
        }
    }

    /// Frames completed so far
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Number of slots
    pub fn frame_overlap(&self) -> usize {
        self.frame_overlap
    }

    /// Slot the next frame will use
    pub fn current_slot(&self) -> usize {
        current_frame_index(self.frame_number, self.frame_overlap)
    }

    /// Run one frame through every stage
    pub fn draw<B: FrameBackend + ?Sized>(&mut self, backend: &mut B) -> VulkanResult<FrameTarget> {
        let slot = self.current_slot();
        let frame_number = self.frame_number;

        let fail = |stage| stage_failure(stage, frame_number, slot);

        backend.wait_for_fence(slot).map_err(fail(FrameStage::WaitFence))?;
        let image_index = backend.acquire_image(slot).map_err(fail(FrameStage::Acquire))?;

        let target = FrameTarget {
            slot,
            image_index,
            frame_number,
        };

        backend.record_frame(&target).map_err(fail(FrameStage::Record))?;
        backend.submit_frame(&target).map_err(fail(FrameStage::Submit))?;
        backend.present_frame(&target).map_err(fail(FrameStage::Present))?;

        self.frame_number += 1;
        Ok(target)
    }
}

fn stage_failure(stage: FrameStage, frame_number: u64, slot: usize) -> impl FnOnce(VulkanError) -> VulkanError {
    move |e| {
        log::error!("Frame {} (slot {}) failed during {}: {}", frame_number, slot, stage, e);
        e
    }
}

/// Clear color flashing blue over a 120-frame period
pub fn clear_color(frame_number: u64) -> [f32; 4] {
    let flash = (frame_number as f32 / 120.0).sin().abs();
    [0.0, 0.0, flash, 1.0]
}

/// Ambient color cycling between red and blue
pub fn ambient_color(frame_number: u64) -> [f32; 4] {
    let phase = frame_number as f32 / 120.0;
    [phase.sin(), 0.0, phase.cos(), 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clear_color_starts_black() {
        assert_eq!(clear_color(0), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_clear_color_bounded() {
        for frame in (0..2000).step_by(7) {
            let color = clear_color(frame);
            assert!((0.0..=1.0).contains(&color[2]));
            assert_eq!(color[3], 1.0);
        }
    }

    #[test]
    fn test_ambient_color() {
        let color = ambient_color(0);
        assert_relative_eq!(color[0], 0.0);
        assert_relative_eq!(color[2], 1.0);

        let quarter = ambient_color((std::f32::consts::FRAC_PI_2 * 120.0).round() as u64);
        assert_relative_eq!(quarter[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(FrameStage::WaitFence.to_string(), "wait-fence");
        assert_eq!(FrameStage::ORDER.len(), 5);
    }

    #[test]
    fn test_driver_starts_at_slot_zero() {
        let driver = FrameDriver::new(2);
        assert_eq!(driver.frame_number(), 0);
        assert_eq!(driver.current_slot(), 0);
        assert_eq!(FrameDriver::new(0).frame_overlap(), 1);
    }
}
