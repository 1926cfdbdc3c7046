//! Immediate-submit sequencing against a recording queue

use std::cell::{Cell, RefCell};

use ash::vk::{self, Handle};
use vk_engine::render::vulkan::initialization::{VulkanError, VulkanResult};
use vk_engine::render::vulkan::resources::upload::UPLOAD_TIMEOUT_NS;
use vk_engine::render::vulkan::resources::{submit_and_wait, ImmediateQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Begin,
    Record,
    End,
    Submit,
    Wait(u64),
    ResetFence,
    ResetPool,
}

/// Logs every operation; the fence either signals or never does
#[derive(Default)]
struct RecordingQueue {
    ops: RefCell<Vec<Op>>,
    fence_hangs: bool,
    submit_fails: bool,
    signaled: Cell<bool>,
}

impl RecordingQueue {
    fn command_buffer() -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(42)
    }

    fn push(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }
}

impl ImmediateQueue for RecordingQueue {
    fn begin(&self) -> VulkanResult<vk::CommandBuffer> {
        self.push(Op::Begin);
        Ok(Self::command_buffer())
    }

    fn end(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        assert_eq!(command_buffer, Self::command_buffer());
        self.push(Op::End);
        Ok(())
    }

    fn submit(&self, _command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        self.push(Op::Submit);
        if self.submit_fails {
            return Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST));
        }
        if !self.fence_hangs {
            self.signaled.set(true);
        }
        Ok(())
    }

    fn wait(&self, timeout_ns: u64) -> VulkanResult<()> {
        self.push(Op::Wait(timeout_ns));
        if self.signaled.get() {
            Ok(())
        } else {
            Err(VulkanError::Timeout { what: "upload" })
        }
    }

    fn reset_fence(&self) -> VulkanResult<()> {
        self.push(Op::ResetFence);
        self.signaled.set(false);
        Ok(())
    }

    fn reset_pool(&self) -> VulkanResult<()> {
        self.push(Op::ResetPool);
        Ok(())
    }
}

#[test]
fn test_submit_runs_every_step_in_order() {
    let queue = RecordingQueue::default();

    submit_and_wait(&queue, UPLOAD_TIMEOUT_NS, |cmd| {
        assert_eq!(cmd, RecordingQueue::command_buffer());
        queue.push(Op::Record);
    })
    .unwrap();

    assert_eq!(
        queue.ops(),
        vec![
            Op::Begin,
            Op::Record,
            Op::End,
            Op::Submit,
            Op::Wait(UPLOAD_TIMEOUT_NS),
            Op::ResetFence,
            Op::ResetPool,
        ]
    );
    assert!(!queue.signaled.get());
}

#[test]
fn test_fence_timeout_is_reported_and_nothing_is_reset() {
    let queue = RecordingQueue {
        fence_hangs: true,
        ..Default::default()
    };

    let result = submit_and_wait(&queue, 1_000, |_| queue.push(Op::Record));

    assert!(matches!(result, Err(VulkanError::Timeout { what: "upload" })));
    let ops = queue.ops();
    assert_eq!(ops.last(), Some(&Op::Wait(1_000)));
    assert!(!ops.contains(&Op::ResetFence));
    assert!(!ops.contains(&Op::ResetPool));
}

#[test]
fn test_submit_failure_skips_wait() {
    let queue = RecordingQueue {
        submit_fails: true,
        ..Default::default()
    };

    let result = submit_and_wait(&queue, UPLOAD_TIMEOUT_NS, |_| {});

    assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))));
    assert_eq!(queue.ops(), vec![Op::Begin, Op::End, Op::Submit]);
}

#[test]
fn test_channel_is_reusable_after_a_submit() {
    let queue = RecordingQueue::default();

    submit_and_wait(&queue, UPLOAD_TIMEOUT_NS, |_| {}).unwrap();
    submit_and_wait(&queue, UPLOAD_TIMEOUT_NS, |_| {}).unwrap();

    let resets = queue.ops().iter().filter(|op| **op == Op::ResetFence).count();
    assert_eq!(resets, 2);
}
