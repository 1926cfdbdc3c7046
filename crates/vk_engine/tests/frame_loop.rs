//! Frame driver sequencing against a recording backend

use ash::vk;
use vk_engine::render::vulkan::initialization::{VulkanError, VulkanResult};
use vk_engine::render::{FrameBackend, FrameDriver, FrameStage, FrameTarget};

/// Records every stage call; optionally fails one stage once
#[derive(Default)]
struct RecordingBackend {
    calls: Vec<(FrameStage, usize)>,
    fail_at: Option<FrameStage>,
    next_image: u32,
}

impl RecordingBackend {
    fn check(&mut self, stage: FrameStage, slot: usize) -> VulkanResult<()> {
        self.calls.push((stage, slot));
        if self.fail_at == Some(stage) {
            self.fail_at = None;
            return Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST));
        }
        Ok(())
    }

    fn stages(&self) -> Vec<FrameStage> {
        self.calls.iter().map(|(stage, _)| *stage).collect()
    }
}

impl FrameBackend for RecordingBackend {
    fn wait_for_fence(&mut self, slot: usize) -> VulkanResult<()> {
        self.check(FrameStage::WaitFence, slot)
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<u32> {
        self.check(FrameStage::Acquire, slot)?;
        let image = self.next_image;
        self.next_image = (self.next_image + 1) % 3;
        Ok(image)
    }

    fn record_frame(&mut self, target: &FrameTarget) -> VulkanResult<()> {
        self.check(FrameStage::Record, target.slot)
    }

    fn submit_frame(&mut self, target: &FrameTarget) -> VulkanResult<()> {
        self.check(FrameStage::Submit, target.slot)
    }

    fn present_frame(&mut self, target: &FrameTarget) -> VulkanResult<()> {
        self.check(FrameStage::Present, target.slot)
    }
}

#[test]
fn test_five_draws_cycle_two_slots() {
    let mut driver = FrameDriver::new(2);
    let mut backend = RecordingBackend::default();

    let mut slots = Vec::new();
    for expected_frame in 0..5u64 {
        assert_eq!(driver.frame_number(), expected_frame);
        let target = driver.draw(&mut backend).unwrap();
        assert_eq!(target.frame_number, expected_frame);
        assert_eq!(driver.frame_number(), expected_frame + 1);
        slots.push(target.slot);
    }

    assert_eq!(slots, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_stages_run_in_order() {
    let mut driver = FrameDriver::new(2);
    let mut backend = RecordingBackend::default();
    driver.draw(&mut backend).unwrap();
    driver.draw(&mut backend).unwrap();

    let expected: Vec<FrameStage> = FrameStage::ORDER.iter().chain(FrameStage::ORDER.iter()).copied().collect();
    assert_eq!(backend.stages(), expected);
    assert!(backend.calls[..5].iter().all(|(_, slot)| *slot == 0));
    assert!(backend.calls[5..].iter().all(|(_, slot)| *slot == 1));
}

#[test]
fn test_fence_waited_before_record_for_every_frame() {
    let mut driver = FrameDriver::new(2);
    let mut backend = RecordingBackend::default();
    for _ in 0..4 {
        driver.draw(&mut backend).unwrap();
    }

    for (index, (stage, slot)) in backend.calls.iter().enumerate() {
        if *stage == FrameStage::Record {
            let waited = backend.calls[..index]
                .iter()
                .rev()
                .find(|(s, _)| *s == FrameStage::WaitFence)
                .unwrap();
            assert_eq!(waited.1, *slot);
        }
    }
}

#[test]
fn test_failure_stops_frame_and_counter() {
    let mut driver = FrameDriver::new(2);
    let mut backend = RecordingBackend {
        fail_at: Some(FrameStage::Acquire),
        ..Default::default()
    };

    let result = driver.draw(&mut backend);
    assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))));
    assert_eq!(driver.frame_number(), 0);
    assert_eq!(backend.stages(), vec![FrameStage::WaitFence, FrameStage::Acquire]);

    let target = driver.draw(&mut backend).unwrap();
    assert_eq!(target.frame_number, 0);
    assert_eq!(target.slot, 0);
}

#[test]
fn test_submit_failure_skips_present() {
    let mut driver = FrameDriver::new(2);
    let mut backend = RecordingBackend {
        fail_at: Some(FrameStage::Submit),
        ..Default::default()
    };

    assert!(driver.draw(&mut backend).is_err());
    assert!(!backend.stages().contains(&FrameStage::Present));
}

#[test]
fn test_image_index_passed_through() {
    let mut driver = FrameDriver::new(2);
    let mut backend = RecordingBackend::default();
    let images: Vec<u32> = (0..4).map(|_| driver.draw(&mut backend).unwrap().image_index).collect();
    assert_eq!(images, vec![0, 1, 2, 0]);
}

#[test]
fn test_three_slot_ring() {
    let mut driver = FrameDriver::new(3);
    let mut backend = RecordingBackend::default();
    let slots: Vec<usize> = (0..6).map(|_| driver.draw(&mut backend).unwrap().slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2]);
}
