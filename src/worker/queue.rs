//! FIFO task queue and handle generation: the queue lock domain.
//!
//! Everything here is guarded by a single mutex in the pool, together with
//! the condition variable workers wait on. The same lock also covers the
//! pool-growth bookkeeping (idle and live worker counts) and the shutdown
//! flag, so submission and the worker loop see one consistent state.

use std::collections::VecDeque;

use crate::core::{CompressionTask, TaskHandle};

pub(crate) struct TaskQueue {
    fifo: VecDeque<CompressionTask>,
    next_handle: TaskHandle,
    /// Workers currently blocked on the condition variable
    pub idle_workers: usize,
    /// Workers spawned and not yet exited
    pub worker_count: usize,
    /// Once set, workers exit instead of dequeuing further tasks
    pub shutting_down: bool,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            fifo: VecDeque::new(),
            next_handle: TaskHandle::first(),
            idle_workers: 0,
            worker_count: 0,
            shutting_down: false,
        }
    }

    /// Issues the next handle. The generator lives under the queue lock,
    /// but reservation is separate from [`enqueue`](Self::enqueue) so the
    /// handle can be registered as live before any worker can see the task.
    pub fn reserve_handle(&mut self) -> TaskHandle {
        let handle = self.next_handle;
        self.next_handle = handle.next();
        handle
    }

    /// Appends a task to the back of the FIFO.
    pub fn enqueue(&mut self, task: CompressionTask) {
        self.fifo.push_back(task);
    }

    /// Removes the front task, strictly in submission order.
    pub fn dequeue(&mut self) -> Option<CompressionTask> {
        self.fifo.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fifo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompressionParams, SinkKind};
    use image::DynamicImage;

    fn task(queue: &mut TaskQueue) -> TaskHandle {
        let handle = queue.reserve_handle();
        queue.enqueue(CompressionTask {
            handle,
            image: DynamicImage::new_rgb8(1, 1),
            params: CompressionParams::default(),
            sink: SinkKind::Bytes,
        });
        handle
    }

    #[test]
    fn handles_are_distinct_and_strictly_increasing() {
        let mut queue = TaskQueue::new();
        let handles: Vec<_> = (0..8).map(|_| task(&mut queue)).collect();

        for pair in handles.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(!handles.contains(&TaskHandle::INVALID));
    }

    #[test]
    fn dequeue_is_fifo() {
        let mut queue = TaskQueue::new();
        let first = task(&mut queue);
        let second = task(&mut queue);
        let third = task(&mut queue);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue().unwrap().handle, first);
        assert_eq!(queue.dequeue().unwrap().handle, second);
        assert_eq!(queue.dequeue().unwrap().handle, third);
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
    }
}
