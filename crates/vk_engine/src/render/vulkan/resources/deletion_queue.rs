//! Deferred destruction of GPU objects
//!
//! Every Vulkan object the renderer creates registers a closure here at
//! creation time. The queue is flushed once, after all frame fences have
//! signaled and the device is idle, and runs the closures newest-first so
//! dependents are destroyed before the objects they were built from.

/// LIFO registry of cleanup closures
#[derive(Default)]
pub struct DeletionQueue {
    deletors: Vec<Box<dyn FnOnce()>>,
}

impl DeletionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup closure
    pub fn push<F>(&mut self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        self.deletors.push(Box::new(cleanup));
    }

    /// Run every registered closure in reverse registration order, then clear
    pub fn flush(&mut self) {
        let count = self.deletors.len();
        while let Some(deletor) = self.deletors.pop() {
            deletor();
        }
        if count > 0 {
            log::debug!("Deletion queue flushed {} entries", count);
        }
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.deletors.len()
    }

    /// Whether no entries are pending
    pub fn is_empty(&self) -> bool {
        self.deletors.is_empty()
    }
}

impl Drop for DeletionQueue {
    fn drop(&mut self) {
        if !self.deletors.is_empty() {
            log::warn!(
                "Deletion queue dropped with {} pending entries, flushing",
                self.deletors.len()
            );
            self.flush();
        }
    }
}

impl std::fmt::Debug for DeletionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionQueue")
            .field("pending", &self.deletors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_flush_runs_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = DeletionQueue::new();

        for i in 0..5 {
            let log = Rc::clone(&log);
            queue.push(move || log.borrow_mut().push(i));
        }
        assert_eq!(queue.len(), 5);

        queue.flush();
        assert_eq!(*log.borrow(), vec![4, 3, 2, 1, 0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_each_entry_runs_exactly_once() {
        let count = Rc::new(RefCell::new(0));
        let mut queue = DeletionQueue::new();

        for _ in 0..3 {
            let count = Rc::clone(&count);
            queue.push(move || *count.borrow_mut() += 1);
        }

        queue.flush();
        queue.flush();
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn test_drop_flushes_pending_entries() {
        let ran = Rc::new(RefCell::new(false));
        {
            let mut queue = DeletionQueue::new();
            let ran = Rc::clone(&ran);
            queue.push(move || *ran.borrow_mut() = true);
        }
        assert!(*ran.borrow());
    }

    #[test]
    fn test_flush_empty_queue() {
        let mut queue = DeletionQueue::new();
        queue.flush();
        assert!(queue.is_empty());
    }
}
