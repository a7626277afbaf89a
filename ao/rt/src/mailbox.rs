//! Mailbox variants.
//!
//! A mailbox carries `(target, signal)` envelopes from any producer thread
//! to one consuming worker. Producers take a short-held mutex and post a
//! semaphore; the worker blocks on the semaphore in
//! [`dequeue`](Mailbox::dequeue), the loop's only suspension point.

use core::fmt;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Condvar, Mutex};

use ao_core::Signal;
use thiserror::Error;

use crate::active::ActiveObjectRef;
use crate::sync::Semaphore;

/// One mailbox entry.
pub enum Envelope {
    /// Dispatch `signal` on `target`.
    Deliver {
        /// Object whose `dispatch` runs on the worker.
        target: ActiveObjectRef,
        /// The signal to dispatch.
        signal: Signal,
    },
    /// Terminal sentinel: the worker exits on receipt. Entries still queued
    /// behind it are discarded.
    Stop,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliver { signal, .. } => {
                f.debug_struct("Deliver").field("signal", signal).finish()
            }
            Self::Stop => f.write_str("Stop"),
        }
    }
}

/// Sort key of the priority mailbox; lower values dequeue first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Priority of plain `enqueue_back` envelopes.
    pub const DEFAULT: Priority = Priority(0);
    /// Dequeues before everything else; used for recalled events.
    pub const MIN: Priority = Priority(i32::MIN);
    /// Dequeues after everything else; used for the stop sentinel.
    pub const MAX: Priority = Priority(i32::MAX);
}

/// Mailbox failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MailboxError {
    /// A bounded mailbox is at capacity.
    #[error("mailbox is full")]
    Full,
}

/// FIFO of `(target, signal)` envelopes with a blocking consumer side.
pub trait Mailbox: Send + Sync {
    /// Append an envelope; the common producer path.
    fn enqueue_back(&self, envelope: Envelope) -> Result<(), MailboxError>;

    /// Jump the queue; used to re-dispatch recalled events ahead of entries
    /// that arrived after them.
    fn enqueue_front(&self, envelope: Envelope) -> Result<(), MailboxError>;

    /// Remove and return the next envelope, blocking until one is available.
    fn dequeue(&self) -> Envelope;

    /// Enqueue the terminal sentinel behind the pending entries.
    fn enqueue_stop(&self) {
        let _ = self.enqueue_back(Envelope::Stop);
    }
}

/// Unbounded FIFO mailbox.
pub struct FifoMailbox {
    queue: Mutex<VecDeque<Envelope>>,
    ready: Semaphore,
}

impl FifoMailbox {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Semaphore::new(),
        }
    }
}

impl Default for FifoMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox for FifoMailbox {
    fn enqueue_back(&self, envelope: Envelope) -> Result<(), MailboxError> {
        self.queue
            .lock()
            .expect("mailbox mutex poisoned")
            .push_back(envelope);
        self.ready.post();
        Ok(())
    }

    fn enqueue_front(&self, envelope: Envelope) -> Result<(), MailboxError> {
        self.queue
            .lock()
            .expect("mailbox mutex poisoned")
            .push_front(envelope);
        self.ready.post();
        Ok(())
    }

    fn dequeue(&self) -> Envelope {
        self.ready.wait();
        self.queue
            .lock()
            .expect("mailbox mutex poisoned")
            .pop_front()
            .expect("semaphore count ahead of queue")
    }
}

/// Mailbox with stable integer priorities; lower values dequeue first,
/// envelopes of equal priority stay FIFO.
pub struct PriorityMailbox {
    bands: Mutex<BTreeMap<Priority, VecDeque<Envelope>>>,
    ready: Semaphore,
}

impl PriorityMailbox {
    pub fn new() -> Self {
        Self {
            bands: Mutex::new(BTreeMap::new()),
            ready: Semaphore::new(),
        }
    }

    /// Enqueue with an explicit priority.
    pub fn enqueue(&self, envelope: Envelope, priority: Priority) -> Result<(), MailboxError> {
        self.bands
            .lock()
            .expect("mailbox mutex poisoned")
            .entry(priority)
            .or_default()
            .push_back(envelope);
        self.ready.post();
        Ok(())
    }
}

impl Default for PriorityMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox for PriorityMailbox {
    fn enqueue_back(&self, envelope: Envelope) -> Result<(), MailboxError> {
        self.enqueue(envelope, Priority::DEFAULT)
    }

    /// Front of the minimum band, so repeated front-pushes stack LIFO;
    /// recall relies on this to restore arrival order.
    fn enqueue_front(&self, envelope: Envelope) -> Result<(), MailboxError> {
        self.bands
            .lock()
            .expect("mailbox mutex poisoned")
            .entry(Priority::MIN)
            .or_default()
            .push_front(envelope);
        self.ready.post();
        Ok(())
    }

    fn dequeue(&self) -> Envelope {
        self.ready.wait();
        let mut bands = self.bands.lock().expect("mailbox mutex poisoned");
        let (&priority, _) = bands
            .iter()
            .next()
            .expect("semaphore count ahead of queue");
        let band = bands.get_mut(&priority).expect("band vanished under lock");
        let envelope = band.pop_front().expect("empty band left in map");
        if band.is_empty() {
            bands.remove(&priority);
        }
        envelope
    }

    /// The sentinel sorts behind everything, so pending work drains first.
    fn enqueue_stop(&self) {
        let _ = self.enqueue(Envelope::Stop, Priority::MAX);
    }
}

/// What a bounded mailbox does when it is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject the envelope with [`MailboxError::Full`].
    Fail,
    /// Block the producer until the worker makes room.
    Block,
}

/// Fixed-capacity mailbox holding at most `N` envelopes inline.
pub struct BoundedMailbox<const N: usize> {
    queue: Mutex<heapless::Deque<Envelope, N>>,
    ready: Semaphore,
    space: Condvar,
    policy: OverflowPolicy,
}

impl<const N: usize> BoundedMailbox<N> {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            queue: Mutex::new(heapless::Deque::new()),
            ready: Semaphore::new(),
            space: Condvar::new(),
            policy,
        }
    }

    /// Envelopes currently queued.
    pub fn len(&self) -> usize {
        self.queue.lock().expect("mailbox mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enqueue_with(
        &self,
        mut envelope: Envelope,
        policy: OverflowPolicy,
        front: bool,
    ) -> Result<(), MailboxError> {
        let mut queue = self.queue.lock().expect("mailbox mutex poisoned");
        loop {
            let rejected = if front {
                queue.push_front(envelope)
            } else {
                queue.push_back(envelope)
            };
            match rejected {
                Ok(()) => break,
                Err(returned) => match policy {
                    OverflowPolicy::Fail => {
                        tracing::debug!(capacity = N, "bounded mailbox saturated");
                        return Err(MailboxError::Full);
                    }
                    OverflowPolicy::Block => {
                        envelope = returned;
                        queue = self.space.wait(queue).expect("mailbox mutex poisoned");
                    }
                },
            }
        }
        drop(queue);
        self.ready.post();
        Ok(())
    }
}

impl<const N: usize> Mailbox for BoundedMailbox<N> {
    fn enqueue_back(&self, envelope: Envelope) -> Result<(), MailboxError> {
        self.enqueue_with(envelope, self.policy, false)
    }

    fn enqueue_front(&self, envelope: Envelope) -> Result<(), MailboxError> {
        self.enqueue_with(envelope, self.policy, true)
    }

    fn dequeue(&self) -> Envelope {
        self.ready.wait();
        let envelope = self
            .queue
            .lock()
            .expect("mailbox mutex poisoned")
            .pop_front()
            .expect("semaphore count ahead of queue");
        self.space.notify_one();
        envelope
    }

    /// Always waits for room: losing the sentinel would leave the worker
    /// running forever.
    fn enqueue_stop(&self) {
        let _ = self.enqueue_with(Envelope::Stop, OverflowPolicy::Block, false);
    }
}
