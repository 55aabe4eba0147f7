use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::metrics::QueueMetrics;

/// Wait bound for blocking exchange operations.
///
/// Mirrors the millisecond convention of the device API: `0` is non-blocking,
/// a positive value bounds the wait, a negative value waits indefinitely.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::Wait;
///
/// assert_eq!(Wait::from_millis(0), Wait::NonBlocking);
/// assert_eq!(Wait::from_millis(-1), Wait::Forever);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    NonBlocking,
    Bounded(Duration),
    Forever,
}

impl Wait {
    pub fn from_millis(timeout_ms: i32) -> Self {
        match timeout_ms {
            0 => Wait::NonBlocking,
            ms if ms > 0 => Wait::Bounded(Duration::from_millis(ms as u64)),
            _ => Wait::Forever,
        }
    }

    fn deadline(self) -> Option<Instant> {
        match self {
            Wait::Bounded(d) => Some(Instant::now() + d),
            _ => None,
        }
    }
}

/// Result of attempting to queue a value.
///
/// Every non-accepted variant hands the value back, so a failed queue leaves
/// the buffer fully un-accepted, never half-transferred.
#[derive(Debug)]
pub enum QueueOutcome<T> {
    /// The value was accepted.
    Queued,
    /// The deadline elapsed with the queue still full.
    TimedOut(T),
    /// A concurrent flush invalidated the wait; retry if still relevant.
    Flushed(T),
    /// The queue was stopped.
    Stopped(T),
}

impl<T> QueueOutcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, QueueOutcome::Queued)
    }
}

/// Result of attempting to dequeue a value.
#[derive(Debug)]
pub enum DequeueOutcome<T> {
    /// A value was claimed by this caller.
    Ready(T),
    /// The deadline elapsed with nothing available.
    TimedOut,
    /// A concurrent flush invalidated the wait; retry if still relevant.
    Flushed,
    /// The queue was stopped.
    Stopped,
}

impl<T> DequeueOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, DequeueOutcome::Ready(_))
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            DequeueOutcome::Ready(v) => Some(v),
            _ => None,
        }
    }
}

struct State<T> {
    items: VecDeque<T>,
    capacity: usize,
    flush_epoch: u64,
    closed: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    /// Woken when space appears (or on flush/close).
    space: Condvar,
    /// Woken when an item appears (or on flush/close).
    items: Condvar,
    metrics: QueueMetrics,
}

/// Bounded exchange queue with timed blocking push/pop.
///
/// The core buffer-exchange primitive: each queued value is claimed by
/// exactly one dequeuer, a concurrent [`flush`](WaitQueue::flush) wakes
/// blocked waiters with a distinguishable `Flushed` outcome, and
/// [`close`](WaitQueue::close) wakes them with `Stopped`. Waits are
/// cancellable only by these transitions, never by arbitrary interruption.
///
/// Handles are cheap clones sharing one queue.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::{DequeueOutcome, Wait, WaitQueue};
///
/// let queue = WaitQueue::bounded(2);
/// assert!(queue.push(7u32, Wait::NonBlocking).is_queued());
/// match queue.pop(Wait::NonBlocking) {
///     DequeueOutcome::Ready(v) => assert_eq!(v, 7),
///     other => panic!("unexpected outcome {other:?}"),
/// }
/// ```
pub struct WaitQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WaitQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> WaitQueue<T> {
    /// Create an open queue holding at most `capacity` values.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    items: VecDeque::with_capacity(capacity),
                    capacity: capacity.max(1),
                    flush_epoch: 0,
                    closed: false,
                }),
                space: Condvar::new(),
                items: Condvar::new(),
                metrics: QueueMetrics::default(),
            }),
        }
    }

    /// Queue a value, waiting for space up to the given bound.
    pub fn push(&self, value: T, wait: Wait) -> QueueOutcome<T> {
        let deadline = wait.deadline();
        let mut state = self.inner.state.lock();
        let entry_epoch = state.flush_epoch;
        loop {
            if state.closed {
                return QueueOutcome::Stopped(value);
            }
            if state.flush_epoch != entry_epoch {
                self.inner.metrics.flushed();
                return QueueOutcome::Flushed(value);
            }
            if state.items.len() < state.capacity {
                state.items.push_back(value);
                self.inner.metrics.queued();
                drop(state);
                self.inner.items.notify_one();
                return QueueOutcome::Queued;
            }
            match wait {
                Wait::NonBlocking => {
                    self.inner.metrics.timed_out();
                    return QueueOutcome::TimedOut(value);
                }
                Wait::Forever => self.inner.space.wait(&mut state),
                Wait::Bounded(_) => {
                    let until = deadline.expect("bounded wait has a deadline");
                    if self.inner.space.wait_until(&mut state, until).timed_out() {
                        // Final recheck under the reacquired lock.
                        if state.closed {
                            return QueueOutcome::Stopped(value);
                        }
                        if state.flush_epoch != entry_epoch {
                            self.inner.metrics.flushed();
                            return QueueOutcome::Flushed(value);
                        }
                        if state.items.len() < state.capacity {
                            state.items.push_back(value);
                            self.inner.metrics.queued();
                            drop(state);
                            self.inner.items.notify_one();
                            return QueueOutcome::Queued;
                        }
                        self.inner.metrics.timed_out();
                        return QueueOutcome::TimedOut(value);
                    }
                }
            }
        }
    }

    /// Claim a value, waiting up to the given bound.
    pub fn pop(&self, wait: Wait) -> DequeueOutcome<T> {
        let deadline = wait.deadline();
        let mut state = self.inner.state.lock();
        let entry_epoch = state.flush_epoch;
        loop {
            if let Some(value) = state.items.pop_front() {
                self.inner.metrics.delivered();
                drop(state);
                self.inner.space.notify_one();
                return DequeueOutcome::Ready(value);
            }
            if state.closed {
                return DequeueOutcome::Stopped;
            }
            if state.flush_epoch != entry_epoch {
                self.inner.metrics.flushed();
                return DequeueOutcome::Flushed;
            }
            match wait {
                Wait::NonBlocking => {
                    self.inner.metrics.timed_out();
                    return DequeueOutcome::TimedOut;
                }
                Wait::Forever => self.inner.items.wait(&mut state),
                Wait::Bounded(_) => {
                    let until = deadline.expect("bounded wait has a deadline");
                    if self.inner.items.wait_until(&mut state, until).timed_out() {
                        if let Some(value) = state.items.pop_front() {
                            self.inner.metrics.delivered();
                            drop(state);
                            self.inner.space.notify_one();
                            return DequeueOutcome::Ready(value);
                        }
                        if state.closed {
                            return DequeueOutcome::Stopped;
                        }
                        if state.flush_epoch != entry_epoch {
                            self.inner.metrics.flushed();
                            return DequeueOutcome::Flushed;
                        }
                        self.inner.metrics.timed_out();
                        return DequeueOutcome::TimedOut;
                    }
                }
            }
        }
    }

    /// Discard all queued values and wake every blocked waiter with a
    /// `Flushed` outcome. Returns the discarded values so the caller can
    /// recycle them. Flushing an empty queue still wakes waiters.
    pub fn flush(&self) -> Vec<T> {
        let drained: Vec<T> = {
            let mut state = self.inner.state.lock();
            state.flush_epoch += 1;
            state.items.drain(..).collect()
        };
        self.inner.items.notify_all();
        self.inner.space.notify_all();
        drained
    }

    /// Close the queue: discard queued values and wake every waiter with a
    /// `Stopped` outcome. Subsequent pushes and pops observe `Stopped` until
    /// [`reopen`](WaitQueue::reopen).
    pub fn close(&self) -> Vec<T> {
        let drained: Vec<T> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.items.drain(..).collect()
        };
        self.inner.items.notify_all();
        self.inner.space.notify_all();
        drained
    }

    /// Reopen a closed queue, empty, with a fresh capacity.
    pub fn reopen(&self, capacity: usize) {
        let mut state = self.inner.state.lock();
        state.closed = false;
        state.items.clear();
        state.capacity = capacity.max(1);
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Counter snapshot for this queue.
    pub fn metrics(&self) -> QueueMetrics {
        self.inner.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn bounded_pop_times_out_within_slack() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        let start = Instant::now();
        let outcome = queue.pop(Wait::from_millis(100));
        let elapsed = start.elapsed();
        assert!(matches!(outcome, DequeueOutcome::TimedOut));
        assert!(elapsed >= Duration::from_millis(80), "returned too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "returned too late: {elapsed:?}");
    }

    #[test]
    fn non_blocking_pop_returns_immediately() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        let start = Instant::now();
        assert!(matches!(queue.pop(Wait::NonBlocking), DequeueOutcome::TimedOut));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn flush_wakes_blocked_pop_with_flushed() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop(Wait::Forever))
        };
        thread::sleep(Duration::from_millis(50));
        let drained = queue.flush();
        assert!(drained.is_empty());
        let outcome = waiter.join().expect("waiter");
        assert!(matches!(outcome, DequeueOutcome::Flushed));
    }

    #[test]
    fn close_wakes_blocked_pop_with_stopped() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop(Wait::Forever))
        };
        thread::sleep(Duration::from_millis(50));
        queue.close();
        let outcome = waiter.join().expect("waiter");
        assert!(matches!(outcome, DequeueOutcome::Stopped));
    }

    #[test]
    fn flush_returns_rejected_value_to_blocked_push() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        assert!(queue.push(1, Wait::NonBlocking).is_queued());
        let pusher = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(2, Wait::Forever))
        };
        thread::sleep(Duration::from_millis(50));
        let drained = queue.flush();
        assert_eq!(drained, vec![1]);
        match pusher.join().expect("pusher") {
            QueueOutcome::Flushed(v) => assert_eq!(v, 2),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn each_value_is_claimed_by_exactly_one_dequeuer() {
        let queue: WaitQueue<u32> = WaitQueue::bounded(1);
        assert!(queue.push(9, Wait::NonBlocking).is_queued());
        let a = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop(Wait::from_millis(200)))
        };
        let b = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop(Wait::from_millis(200)))
        };
        let outcomes = [a.join().expect("a"), b.join().expect("b")];
        let ready = outcomes.iter().filter(|o| o.is_ready()).count();
        let timed_out = outcomes
            .iter()
            .filter(|o| matches!(o, DequeueOutcome::TimedOut))
            .count();
        assert_eq!(ready, 1);
        assert_eq!(timed_out, 1);
    }

    #[test]
    fn push_blocks_until_space_then_succeeds() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        assert!(queue.push(1, Wait::NonBlocking).is_queued());
        let pusher = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(2, Wait::from_millis(500)))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(queue.pop(Wait::NonBlocking).is_ready());
        assert!(pusher.join().expect("pusher").is_queued());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn reopen_restores_a_closed_queue() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(2);
        queue.push(1, Wait::NonBlocking);
        queue.close();
        assert!(queue.is_closed());
        assert!(matches!(queue.pop(Wait::NonBlocking), DequeueOutcome::Stopped));
        queue.reopen(4);
        assert!(!queue.is_closed());
        assert!(queue.is_empty());
        assert!(queue.push(3, Wait::NonBlocking).is_queued());
    }

    #[test]
    fn waiters_arriving_after_flush_wait_normally() {
        let queue: WaitQueue<u8> = WaitQueue::bounded(1);
        queue.flush();
        // The flush above must not poison the next bounded wait.
        assert!(matches!(
            queue.pop(Wait::from_millis(30)),
            DequeueOutcome::TimedOut
        ));
    }
}
