//! Lazily grown worker pool and the public compression facade.
//!
//! Two independent lock domains: the task queue (with its condition
//! variable) and the result store. No thread ever holds both at once, and
//! the transform itself runs with no lock held, so submission and polling
//! are never blocked behind compression work.

use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::core::{CompressedOutput, CompressionParams, CompressionTask, SinkKind, TaskHandle};
use crate::processing;
use crate::utils::{CodecError, CompressorError, CompressorResult};
use crate::worker::queue::TaskQueue;
use crate::worker::results::ResultStore;

/// Fallback worker cap when host parallelism cannot be queried.
const DEFAULT_WORKERS: usize = 4;

struct Shared {
    queue: Mutex<TaskQueue>,
    available: Condvar,
    store: Mutex<ResultStore>,
    max_workers: usize,
}

/// Handle-based asynchronous compression engine.
///
/// Jobs run on background threads that are spawned on demand, capped at a
/// configured maximum. Submission returns a [`TaskHandle`] used for all
/// later queries; results wait in the store until fetched or cancelled.
///
/// Construct one instance per pool and pass it by reference; independent
/// engines do not share any state.
pub struct Compressor {
    shared: Arc<Shared>,
    /// Join handles for every spawned worker, drained once by `shutdown`.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Compressor {
    /// Engine capped at the host's available parallelism.
    pub fn new() -> Self {
        let max = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(DEFAULT_WORKERS);
        Self::with_max_workers(max)
    }

    /// Engine with an explicit worker cap (minimum 1).
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(TaskQueue::new()),
                available: Condvar::new(),
                store: Mutex::new(ResultStore::new()),
                max_workers: max_workers.max(1),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Submits a compression job producing encoded bytes.
    pub fn submit(
        &self,
        image: DynamicImage,
        params: CompressionParams,
    ) -> CompressorResult<TaskHandle> {
        self.submit_with_sink(image, params, SinkKind::Bytes)
    }

    /// Queues a compression job and returns its handle.
    ///
    /// The task owns `image` and a snapshot of `params`. A new worker is
    /// started when none is idle and the pool has headroom; the queue
    /// itself is unbounded and never rejects a task. Fails only once
    /// [`shutdown`](Self::shutdown) has begun.
    pub fn submit_with_sink(
        &self,
        image: DynamicImage,
        params: CompressionParams,
        sink: SinkKind,
    ) -> CompressorResult<TaskHandle> {
        let handle = {
            let mut queue = self.lock_queue();
            if queue.shutting_down {
                return Err(CompressorError::ShutDown);
            }
            queue.reserve_handle()
        };

        // The handle must be registered as live before any worker can see
        // the task, or a fast completion could race the registration.
        self.lock_store().register(handle);

        let spawn_worker = {
            let mut queue = self.lock_queue();
            if queue.shutting_down {
                drop(queue);
                self.lock_store().unregister(handle);
                return Err(CompressorError::ShutDown);
            }
            queue.enqueue(CompressionTask {
                handle,
                image,
                params,
                sink,
            });
            let spawn = queue.idle_workers == 0 && queue.worker_count < self.shared.max_workers;
            if spawn {
                queue.worker_count += 1;
            }
            spawn
        };

        if spawn_worker {
            self.spawn_worker();
        }
        self.shared.available.notify_one();
        debug!(handle = %handle, format = %params.format, "task queued");
        Ok(handle)
    }

    /// True while a finished entry for `handle` awaits retrieval.
    ///
    /// Pure read; the entry stays in the store until `fetch` or `cancel`.
    pub fn poll(&self, handle: TaskHandle) -> bool {
        self.lock_store().contains(handle)
    }

    /// One-time retrieval of a finished task's outcome.
    ///
    /// `None` means the handle is unknown, not finished yet, or already
    /// consumed; `Some(Err(_))` is a task whose transform failed.
    pub fn fetch(&self, handle: TaskHandle) -> Option<Result<CompressedOutput, CodecError>> {
        self.lock_store().take(handle)
    }

    /// Cancels `handle`.
    ///
    /// A finished entry is erased immediately; a still queued or running
    /// task has its result discarded at completion time. Unknown handles
    /// are a no-op. CPU already committed to the task is not reclaimed: a
    /// cancelled-but-queued task still runs its transform, only the storage
    /// of its result is skipped.
    pub fn cancel(&self, handle: TaskHandle) {
        self.lock_store().cancel(handle);
    }

    /// Number of live worker threads; never exceeds the configured cap.
    pub fn worker_count(&self) -> usize {
        self.lock_queue().worker_count
    }

    /// Workers currently blocked waiting for a task.
    pub fn idle_workers(&self) -> usize {
        self.lock_queue().idle_workers
    }

    /// Tasks submitted but not yet dequeued by a worker.
    pub fn queued_tasks(&self) -> usize {
        self.lock_queue().len()
    }

    /// The configured maximum pool size.
    pub fn max_workers(&self) -> usize {
        self.shared.max_workers
    }

    /// Signals every worker to exit and joins them.
    ///
    /// Idle workers exit at the wait point; a worker mid-task finishes its
    /// current task first. Tasks still queued are abandoned without error,
    /// and later submissions fail with [`CompressorError::ShutDown`]. Safe
    /// to call more than once; also runs on drop.
    pub fn shutdown(&self) {
        {
            let mut queue = self.lock_queue();
            queue.shutting_down = true;
        }
        self.shared.available.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        if !workers.is_empty() {
            info!(workers = workers.len(), "shutting down worker pool");
        }
        for worker in workers {
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }

    fn spawn_worker(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("compress-worker".into())
            .spawn(move || worker_loop(shared));

        match spawned {
            Ok(join_handle) => {
                self.workers
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(join_handle);
            }
            Err(err) => {
                // Existing workers (if any) will still drain the queue.
                warn!(error = %err, "failed to spawn worker thread");
                self.lock_queue().worker_count -= 1;
            }
        }
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, TaskQueue> {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, ResultStore> {
        self.shared.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Compressor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The worker loop: wait for a task, run the transform outside any lock,
/// reconcile the outcome against pending cancellations, repeat.
fn worker_loop(shared: Arc<Shared>) {
    debug!("worker started");
    let mut queue = shared.queue.lock().unwrap_or_else(|e| e.into_inner());
    loop {
        while queue.is_empty() && !queue.shutting_down {
            queue.idle_workers += 1;
            queue = shared
                .available
                .wait(queue)
                .unwrap_or_else(|e| e.into_inner());
            queue.idle_workers -= 1;
        }
        if queue.shutting_down {
            queue.worker_count -= 1;
            break;
        }
        let Some(task) = queue.dequeue() else {
            continue;
        };
        drop(queue);

        let handle = task.handle;
        let outcome = processing::compress(task.image, &task.params, task.sink);
        if let Err(err) = &outcome {
            debug!(handle = %handle, error = %err, "task failed");
        }

        let stored = shared
            .store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .complete(handle, outcome);
        if !stored {
            debug!(handle = %handle, "finished task discarded by cancellation");
        }

        queue = shared.queue.lock().unwrap_or_else(|e| e.into_inner());
    }
    debug!("worker exiting");
}
