//! Bounded outbound write queue
//!
//! Single producer (the bus call handler), single consumer (the TTY
//! writer). [`TtyQueue`] is the plain buffer; [`WriteQueue`] is the
//! shared handle that adds the mutex and the wake channel. The mutex is
//! held only for the length/buffer mutation, never across an await.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::trace;

/// Fixed capacity of the outbound queue, in bytes
pub const TTY_QUEUE_CAP: usize = 1024;

/// Fixed-capacity byte buffer for data awaiting serial transmission
#[derive(Debug, Default)]
pub struct TtyQueue {
    buf: Vec<u8>,
}

impl TtyQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(TTY_QUEUE_CAP),
        }
    }

    /// Queued byte count
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append `data` plus a line terminator
    ///
    /// Rejects with no mutation when the message would not fit together
    /// with its terminator. Rejection is the backpressure policy, not an
    /// error.
    pub fn push_line(&mut self, data: &str) -> bool {
        if self.buf.len() + data.len() < TTY_QUEUE_CAP {
            self.buf.extend_from_slice(data.as_bytes());
            self.buf.push(b'\n');
            true
        } else {
            false
        }
    }

    /// Copy of the first `min(len, max)` queued bytes
    pub fn peek_chunk(&self, max: usize) -> Vec<u8> {
        let n = self.buf.len().min(max);
        self.buf[..n].to_vec()
    }

    /// Remove the first `n` bytes after they were written out
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
    }

    /// Drop everything queued
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Shared handle over the queue plus its wake channel
///
/// Cloning is cheap; all clones see the same queue. `enqueue` fires the
/// wake so a parked [`crate::TtyEngine`] re-evaluates write readiness
/// without polling.
#[derive(Clone, Default)]
pub struct WriteQueue {
    inner: Arc<Mutex<TtyQueue>>,
    wake: Arc<Notify>,
}

impl WriteQueue {
    /// Create an empty shared queue
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TtyQueue::new())),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Append `data` plus a line terminator, waking the consumer on
    /// acceptance
    ///
    /// Returns whether the data was accepted; a full queue silently
    /// drops the message.
    pub fn enqueue(&self, data: &str) -> bool {
        let accepted = self.lock().push_line(data);
        if accepted {
            trace!(len = data.len(), "queued line for serial write");
            self.wake.notify_one();
        } else {
            trace!(len = data.len(), "queue full, dropping line");
        }
        accepted
    }

    /// Queued byte count
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the first `min(len, max)` queued bytes
    pub fn peek_chunk(&self, max: usize) -> Vec<u8> {
        self.lock().peek_chunk(max)
    }

    /// Remove the first `n` bytes after a successful write
    pub fn consume(&self, n: usize) {
        self.lock().consume(n);
    }

    /// Drop everything queued
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Wait until `enqueue` signals new data
    pub async fn notified(&self) {
        self.wake.notified().await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TtyQueue> {
        // a poisoned queue mutex means a panic mid-mutation; nothing to
        // salvage, propagate
        self.inner.lock().expect("write queue mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_appends_terminator() {
        let mut q = TtyQueue::new();
        assert!(q.push_line("hello"));
        assert_eq!(q.len(), 6);
        assert_eq!(q.peek_chunk(16), b"hello\n");
    }

    #[test]
    fn test_reject_leaves_queue_unchanged() {
        let mut q = TtyQueue::new();
        let filler = "x".repeat(TTY_QUEUE_CAP - 2);
        assert!(q.push_line(&filler));
        let len_before = q.len();

        assert!(!q.push_line("x"));
        assert_eq!(q.len(), len_before);
    }

    #[test]
    fn test_exact_fit_boundary() {
        let mut q = TtyQueue::new();
        // data + terminator lands exactly at capacity
        let data = "y".repeat(TTY_QUEUE_CAP - 1);
        assert!(q.push_line(&data));
        assert_eq!(q.len(), TTY_QUEUE_CAP);

        // one byte over is rejected
        let mut q = TtyQueue::new();
        let data = "y".repeat(TTY_QUEUE_CAP);
        assert!(!q.push_line(&data));
        assert!(q.is_empty());
    }

    #[test]
    fn test_consume_shifts_remainder_forward() {
        let mut q = TtyQueue::new();
        q.push_line("abcdef");
        q.consume(3);
        assert_eq!(q.peek_chunk(16), b"def\n");
    }

    #[test]
    fn test_peek_respects_chunk_limit() {
        let mut q = TtyQueue::new();
        q.push_line("abcdefgh");
        assert_eq!(q.peek_chunk(4), b"abcd");
        // peeking does not consume
        assert_eq!(q.len(), 9);
    }

    #[tokio::test]
    async fn test_enqueue_fires_wake_exactly_once() {
        let q = WriteQueue::new();
        assert!(q.enqueue("hello"));

        // the stored permit satisfies one waiter immediately
        tokio::time::timeout(std::time::Duration::from_millis(50), q.notified())
            .await
            .expect("wake should have been signalled");

        // and only one
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            q.notified(),
        )
        .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_full_queue_does_not_wake() {
        let q = WriteQueue::new();
        let filler = "x".repeat(TTY_QUEUE_CAP - 2);
        assert!(q.enqueue(&filler));
        q.notified().await; // drain the accepted enqueue's permit

        assert!(!q.enqueue("dropped"));
        let woken = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            q.notified(),
        )
        .await;
        assert!(woken.is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Push(String),
            Consume(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                "[a-z]{0,1200}".prop_map(Op::Push),
                (0usize..1500).prop_map(Op::Consume),
            ]
        }

        proptest! {
            /// Queue length never exceeds capacity and never goes
            /// negative, for any interleaving of pushes and drains.
            #[test]
            fn length_stays_in_bounds(ops in proptest::collection::vec(op(), 0..64)) {
                let mut q = TtyQueue::new();
                for op in ops {
                    match op {
                        Op::Push(data) => {
                            let before = q.len();
                            let accepted = q.push_line(&data);
                            if accepted {
                                prop_assert_eq!(q.len(), before + data.len() + 1);
                            } else {
                                prop_assert_eq!(q.len(), before);
                            }
                        }
                        Op::Consume(n) => {
                            let before = q.len();
                            q.consume(n);
                            prop_assert_eq!(q.len(), before.saturating_sub(n));
                        }
                    }
                    prop_assert!(q.len() <= TTY_QUEUE_CAP);
                }
            }

            /// Drained bytes come out in the order they were pushed.
            #[test]
            fn fifo_order_preserved(lines in proptest::collection::vec("[a-z]{1,40}", 1..10)) {
                let mut q = TtyQueue::new();
                let mut expected = Vec::new();
                for line in &lines {
                    if q.push_line(line) {
                        expected.extend_from_slice(line.as_bytes());
                        expected.push(b'\n');
                    }
                }

                let mut drained = Vec::new();
                while !q.is_empty() {
                    let chunk = q.peek_chunk(7);
                    q.consume(chunk.len());
                    drained.extend_from_slice(&chunk);
                }
                prop_assert_eq!(drained, expected);
            }
        }
    }
}
