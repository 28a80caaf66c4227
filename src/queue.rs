//! Inbound and outbound message queues shared by a connection and its I/O
//! loop.
//!
//! [`DuplexQueuePair::new`] returns the consumer half and the loop half of two
//! unbounded FIFOs. Neither side ever blocks: enqueueing only allocates, and
//! draining returns whatever is already queued. The outbound sender is
//! cloneable so several producers may share it; every enqueue wakes the loop so
//! it can register write interest without waiting for its readiness timeout.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tracing::trace;

/// Errors returned by queue operations.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The opposite end of the queue has been dropped.
    #[error("message queue closed")]
    Closed,
}

/// Factory for the two halves of a connection's message queues.
///
/// # Examples
///
/// ```
/// use tickwire::queue::DuplexQueuePair;
///
/// let (mut consumer, mut io) = DuplexQueuePair::new();
/// consumer.outbound.enqueue("ping".to_owned()).expect("loop half alive");
/// assert_eq!(io.drain_outbound(), vec!["ping".to_owned()]);
///
/// io.push_inbound("pong".to_owned()).expect("consumer half alive");
/// assert_eq!(consumer.inbound.dequeue_all(), vec!["pong".to_owned()]);
/// ```
pub struct DuplexQueuePair;

impl DuplexQueuePair {
    /// Create connected consumer and loop halves.
    #[expect(
        clippy::new_ret_no_self,
        reason = "the pair only exists as its two halves"
    )]
    #[must_use]
    pub fn new() -> (ConsumerQueues, LoopQueues) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let wake = Arc::new(Notify::new());
        (
            ConsumerQueues {
                inbound: InboundReceiver { rx: inbound_rx },
                outbound: OutboundSender {
                    tx: outbound_tx,
                    wake: Arc::clone(&wake),
                },
            },
            LoopQueues {
                inbound_tx,
                outbound_rx,
                wake,
            },
        )
    }
}

/// Queue ends held by the consumer: it reads inbound and writes outbound.
pub struct ConsumerQueues {
    /// Messages decoded by the I/O loop, oldest first.
    pub inbound: InboundReceiver,
    /// Messages waiting to be framed and written.
    pub outbound: OutboundSender,
}

/// Cloneable producer end of the outbound queue.
#[derive(Clone, Debug)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<String>,
    wake: Arc<Notify>,
}

impl OutboundSender {
    /// Queue `message` for transmission without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once the I/O loop has dropped its end.
    pub fn enqueue(&self, message: String) -> Result<(), QueueError> {
        self.tx.send(message).map_err(|_| QueueError::Closed)?;
        self.wake.notify_one();
        Ok(())
    }

    /// Returns `true` once the loop half has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

/// Consumer end of the inbound queue.
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl InboundReceiver {
    /// Take the oldest queued message, if any.
    pub fn try_dequeue(&mut self) -> Option<String> { self.rx.try_recv().ok() }

    /// Take every queued message, oldest first.
    ///
    /// Messages still buffered after the loop half has gone away are returned
    /// as normal; afterwards the result is empty.
    pub fn dequeue_all(&mut self) -> Vec<String> {
        let mut messages = Vec::with_capacity(self.rx.len());
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Number of messages waiting.
    #[must_use]
    pub fn len(&self) -> usize { self.rx.len() }

    /// Returns `true` when nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.rx.is_empty() }
}

/// Queue ends held by the I/O loop: it writes inbound and reads outbound.
#[derive(Debug)]
pub struct LoopQueues {
    inbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    wake: Arc<Notify>,
}

impl LoopQueues {
    /// Hand a decoded message to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the consumer half was dropped.
    pub fn push_inbound(&self, message: String) -> Result<(), QueueError> {
        self.inbound_tx.send(message).map_err(|_| QueueError::Closed)
    }

    /// Returns `true` if at least one outbound message is waiting.
    #[must_use]
    pub fn has_outbound(&self) -> bool { !self.outbound_rx.is_empty() }

    /// Take the outbound messages queued at the time of the call, in order.
    ///
    /// Messages enqueued while the drain runs are left for the next pass.
    pub fn drain_outbound(&mut self) -> Vec<String> {
        let pending = self.outbound_rx.len();
        let mut messages = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.outbound_rx.try_recv() {
                Ok(message) => messages.push(message),
                Err(_) => break,
            }
        }
        trace!(count = messages.len(), "drained outbound queue");
        messages
    }

    /// Resolve once a producer has enqueued since the last wake-up.
    pub async fn outbound_queued(&self) { self.wake.notified().await; }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1)]
    #[case(5)]
    fn inbound_preserves_order(#[case] count: usize) {
        let (mut consumer, io) = DuplexQueuePair::new();
        for i in 0..count {
            io.push_inbound(format!("m{i}")).expect("consumer alive");
        }
        let expected: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
        assert_eq!(consumer.inbound.dequeue_all(), expected);
    }

    #[test]
    fn dequeue_all_is_empty_when_idle() {
        let (mut consumer, _io) = DuplexQueuePair::new();
        assert!(consumer.inbound.dequeue_all().is_empty());
        assert!(consumer.inbound.dequeue_all().is_empty());
        assert_eq!(consumer.inbound.try_dequeue(), None);
    }

    #[test]
    fn drain_is_bounded_by_length_at_start() {
        let (consumer, mut io) = DuplexQueuePair::new();
        consumer.outbound.enqueue("a".into()).expect("loop alive");
        consumer.outbound.enqueue("b".into()).expect("loop alive");
        assert!(io.has_outbound());
        assert_eq!(io.drain_outbound(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(!io.has_outbound());
        assert!(io.drain_outbound().is_empty());
    }

    #[test]
    fn cloned_senders_share_the_queue() {
        let (consumer, mut io) = DuplexQueuePair::new();
        let second = consumer.outbound.clone();
        consumer.outbound.enqueue("x".into()).expect("loop alive");
        second.enqueue("y".into()).expect("loop alive");
        assert_eq!(io.drain_outbound(), vec!["x".to_owned(), "y".to_owned()]);
    }

    #[test]
    fn buffered_inbound_survives_loop_drop() {
        let (mut consumer, io) = DuplexQueuePair::new();
        io.push_inbound("late".into()).expect("consumer alive");
        drop(io);
        assert!(consumer.outbound.is_closed());
        assert_eq!(
            consumer.outbound.enqueue("lost".into()),
            Err(QueueError::Closed)
        );
        assert_eq!(consumer.inbound.dequeue_all(), vec!["late".to_owned()]);
        assert!(consumer.inbound.dequeue_all().is_empty());
    }

    #[tokio::test]
    async fn enqueue_wakes_the_loop() {
        let (consumer, io) = DuplexQueuePair::new();
        consumer.outbound.enqueue("wake".into()).expect("loop alive");
        tokio::time::timeout(std::time::Duration::from_secs(1), io.outbound_queued())
            .await
            .expect("stored permit resolves immediately");
    }
}
