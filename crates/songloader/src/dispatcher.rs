//! The single thread on which catalog publication runs
//!
//! Worker and background threads never call subscribers directly; they
//! schedule a job here and the dispatcher runs jobs one at a time, in the
//! order they were scheduled.

use crossbeam::channel::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

pub struct Dispatcher {
    sender: Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = channel::unbounded();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(receiver))?;

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue `job` to run on the dispatcher thread. Returns false when the
    /// dispatcher has already shut down; the job is dropped.
    pub fn schedule<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.send(Message::Run(Box::new(job))).is_err() {
            tracing::warn!("Dispatcher is shut down, dropping job");
            return false;
        }
        true
    }

    /// Run every job queued so far, then stop the thread and wait for it.
    pub fn shutdown(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };
        let _ = self.sender.send(Message::Shutdown);
        if handle.thread().id() == thread::current().id() {
            // Shutdown requested from a job; the loop exits once it returns
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Dispatcher thread panicked");
        }
    }

    /// Whether the caller is running on the dispatcher thread
    pub fn is_current_thread(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(receiver: Receiver<Message>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("Dispatched job panicked");
                }
            }
            Message::Shutdown => break,
        }
    }
}
