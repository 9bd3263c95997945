//! The single execution context on which completions are delivered.
//!
//! # Design
//! A `MainContext` owns one named thread draining a FIFO queue of jobs.
//! Whatever thread finishes a network operation, the completion is queued
//! here, so callers observe results on one thread only. The thread exits when
//! the last `MainContext` clone is dropped and the queue is empty.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use tracing::{error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the completion thread. Cheap to clone.
#[derive(Clone)]
pub struct MainContext {
    inner: Arc<Inner>,
}

struct Inner {
    sender: mpsc::Sender<Job>,
    thread: ThreadId,
    name: String,
}

impl MainContext {
    /// Start a new context on a thread called `name`.
    pub fn spawn(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            while let Ok(job) = receiver.recv() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("completion panicked on main context");
                }
            }
        })?;
        Ok(Self {
            inner: Arc::new(Inner {
                sender,
                thread: handle.thread().id(),
                name,
            }),
        })
    }

    /// Queue `job` to run on the context thread.
    ///
    /// Returns `false` if the context thread is gone; the job is dropped.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.inner.sender.send(Box::new(job)) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    context = %self.inner.name,
                    "main context has shut down; dropping completion"
                );
                false
            }
        }
    }

    /// Whether the calling thread is this context's thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread
    }
}

impl std::fmt::Debug for MainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainContext")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}
