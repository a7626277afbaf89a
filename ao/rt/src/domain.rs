//! Worker domains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::active::ActiveObjectRef;
use crate::mailbox::{Envelope, Mailbox};

/// A mailbox and the worker thread draining it.
///
/// All objects registered with one domain share its worker: their handler
/// and action code is serialized on that thread. Dropping the domain stops
/// the worker (after in-flight dispatch finishes) and joins it.
pub struct Domain {
    mailbox: Arc<dyn Mailbox>,
    worker: Option<JoinHandle<()>>,
    stopped: AtomicBool,
}

impl Domain {
    /// Spawn the worker over `mailbox`.
    pub fn new(mailbox: Arc<dyn Mailbox>) -> Self {
        let queue = Arc::clone(&mailbox);
        let worker = thread::Builder::new()
            .name("ao-domain".into())
            .spawn(move || Self::run(queue))
            .expect("failed to spawn domain worker");
        Self {
            mailbox,
            worker: Some(worker),
            stopped: AtomicBool::new(false),
        }
    }

    fn run(mailbox: Arc<dyn Mailbox>) {
        tracing::debug!("domain worker running");
        loop {
            match mailbox.dequeue() {
                Envelope::Deliver { target, signal } => {
                    tracing::trace!(signal = %signal.id(), "dispatching");
                    target.dispatch(&signal);
                }
                Envelope::Stop => {
                    tracing::debug!("domain worker stopping");
                    return;
                }
            }
        }
    }

    /// The domain's mailbox.
    pub fn mailbox(&self) -> &Arc<dyn Mailbox> {
        &self.mailbox
    }

    /// Bind `object` to this domain's mailbox.
    pub fn register_object(&self, object: &ActiveObjectRef) {
        object.set_mailbox(Arc::clone(&self.mailbox));
    }

    /// Enqueue the stop sentinel. Idempotent. The worker finishes pending
    /// entries ahead of the sentinel and exits; envelopes enqueued after it
    /// are discarded.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.mailbox.enqueue_stop();
        }
    }
}

impl Drop for Domain {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
