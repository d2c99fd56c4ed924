//! Single-consumer dispatch queue for deferred in-order work
//!
//! One lazily-started worker thread drains a FIFO of nullary closures in
//! strict submission order. `finish` blocks until the queue is empty and
//! the worker is idle; `dump` discards pending work while letting the
//! in-flight closure complete. Dropping the queue drains it first.
//!
//! # Example
//! ```
//! use stabq_core::DispatchQueue;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! let queue = DispatchQueue::new();
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..4 {
//!     let counter = Arc::clone(&counter);
//!     queue.dispatch(move || { counter.fetch_add(1, Ordering::SeqCst); });
//! }
//! queue.finish().unwrap();
//! assert_eq!(counter.load(Ordering::SeqCst), 4);
//! assert!(queue.is_finished());
//! ```

use crate::error::{QuantumError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    jobs: VecDeque<Job>,
    quit: bool,
    idle: bool,
    worker: Option<ThreadId>,
}

struct Shared {
    state: Mutex<QueueState>,
    work_cv: Condvar,
    done_cv: Condvar,
}

/// A FIFO of closures executed by exactly one worker thread
pub struct DispatchQueue {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchQueue {
    /// Create an empty queue; the worker starts on the first `dispatch`
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    quit: false,
                    idle: true,
                    worker: None,
                }),
                work_cv: Condvar::new(),
                done_cv: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Append an operation; returns immediately
    pub fn dispatch(&self, op: impl FnOnce() + Send + 'static) {
        let mut state = self.shared.state.lock();
        state.jobs.push_back(Box::new(op));
        if state.worker.is_none() {
            let shared = Arc::clone(&self.shared);
            let handle = thread::spawn(move || worker_loop(shared));
            state.worker = Some(handle.thread().id());
            *self.handle.lock() = Some(handle);
        }
        drop(state);
        self.shared.work_cv.notify_one();
    }

    /// Block until the queue is empty and the worker is idle
    ///
    /// # Errors
    /// Returns `QueueMisuse` when called from inside a dispatched
    /// operation, where blocking would deadlock the worker on itself.
    pub fn finish(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.worker == Some(thread::current().id()) {
            return Err(QuantumError::QueueMisuse);
        }
        while !(state.jobs.is_empty() && state.idle) {
            self.shared.done_cv.wait(&mut state);
        }
        Ok(())
    }

    /// Discard all pending operations; the running one still completes
    pub fn dump(&self) {
        let mut state = self.shared.state.lock();
        state.jobs.clear();
        drop(state);
        self.shared.done_cv.notify_all();
    }

    /// Non-blocking probe: true iff the queue is empty and the worker idle
    pub fn is_finished(&self) -> bool {
        let state = self.shared.state.lock();
        state.jobs.is_empty() && state.idle
    }
}

fn worker_loop(shared: Arc<Shared>) {
    let mut state = shared.state.lock();
    loop {
        while state.jobs.is_empty() && !state.quit {
            state.idle = true;
            shared.done_cv.notify_all();
            shared.work_cv.wait(&mut state);
        }
        let Some(job) = state.jobs.pop_front() else {
            break;
        };
        state.idle = false;
        drop(state);
        job();
        state = shared.state.lock();
    }
    state.idle = true;
    drop(state);
    shared.done_cv.notify_all();
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DispatchQueue")
            .field("pending", &state.jobs.len())
            .field("idle", &state.idle)
            .finish()
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.quit = true;
        }
        self.shared.work_cv.notify_all();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}
