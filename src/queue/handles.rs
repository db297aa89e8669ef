//! Shared producer and consumer handles over a [`RingBuffer`].
//!
//! The ring itself only offers non-blocking try operations. These handles add the caller-side
//! policies a work queue usually wants on top: spinning then yielding with
//! [`crossbeam_utils::Backoff`] while the ring is full or empty, optionally bounded by a
//! timeout. Handles are cheap to clone; every clone is one more producer or consumer.
use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;

use crate::queue::mpmc::RingBuffer;
use crate::trace::debug;
use crate::{Rejected, RingError};

impl<T, const N: usize> RingBuffer<T, N> {
    /// Allocates a ring behind an `Arc`, ready to hand out producer and consumer handles.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new producer handle.
    pub fn register_producer(self: &Arc<Self>) -> Producer<T, N> {
        Producer {
            ring: Arc::clone(self),
        }
    }

    /// Register a new consumer handle.
    pub fn register_consumer(self: &Arc<Self>) -> Consumer<T, N> {
        Consumer {
            ring: Arc::clone(self),
        }
    }
}

/// Returns `true` once `deadline` has passed. `None` means no deadline.
fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

#[derive(Debug)]
/// A handle for pushing values into a shared ring.
pub struct Producer<T, const N: usize> {
    ring: Arc<RingBuffer<T, N>>,
}

impl<T, const N: usize> Clone for Producer<T, N> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T, const N: usize> Producer<T, N> {
    pub fn ring(&self) -> &Arc<RingBuffer<T, N>> {
        &self.ring
    }

    /// Single attempt; see [`RingBuffer::try_enqueue`].
    pub fn try_send(&self, value: T) -> Result<(), Rejected<T>> {
        self.ring.try_enqueue(value)
    }

    /// Pushes `value`, backing off while the ring is full. Returns only once it is enqueued.
    pub fn send(&self, value: T) {
        let backoff = Backoff::new();
        let mut value = value;
        while let Err(rejected) = self.ring.try_enqueue(value) {
            value = rejected.into_inner();
            backoff.snooze();
        }
    }

    /// Like [`Producer::send`], giving up after `timeout`.
    ///
    /// On expiry the value comes back inside [`Rejected`] with [`RingError::Timeout`].
    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), Rejected<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let backoff = Backoff::new();
        let mut value = value;
        loop {
            match self.ring.try_enqueue(value) {
                Ok(()) => return Ok(()),
                Err(rejected) => value = rejected.into_inner(),
            }
            if expired(deadline) {
                debug!(capacity = N, ?timeout, "send timed out on a full ring");
                return Err(Rejected {
                    value,
                    reason: RingError::Timeout(timeout),
                });
            }
            backoff.snooze();
        }
    }
}

#[derive(Debug)]
/// A handle for taking values out of a shared ring.
pub struct Consumer<T, const N: usize> {
    ring: Arc<RingBuffer<T, N>>,
}

impl<T, const N: usize> Clone for Consumer<T, N> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T, const N: usize> Consumer<T, N> {
    pub fn ring(&self) -> &Arc<RingBuffer<T, N>> {
        &self.ring
    }

    /// Single attempt. Returns [`RingError::Empty`] when nothing is published.
    pub fn try_recv(&self) -> Result<T, RingError> {
        self.ring.try_dequeue().ok_or(RingError::Empty)
    }

    /// Takes the next value, backing off while the ring is empty.
    pub fn recv(&self) -> T {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.ring.try_dequeue() {
                return value;
            }
            backoff.snooze();
        }
    }

    /// Like [`Consumer::recv`], giving up with [`RingError::Timeout`] after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RingError> {
        let deadline = Instant::now().checked_add(timeout);
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.ring.try_dequeue() {
                return Ok(value);
            }
            if expired(deadline) {
                debug!(capacity = N, ?timeout, "recv timed out on an empty ring");
                return Err(RingError::Timeout(timeout));
            }
            backoff.snooze();
        }
    }

    /// Iterates over values until the ring is next observed empty.
    pub fn try_iter(&self) -> TryIter<'_, T, N> {
        TryIter {
            ring: &self.ring,
            exhausted: false,
        }
    }
}

/// Draining iterator returned by [`Consumer::try_iter`]. Ends at the first empty observation,
/// even if producers publish again afterwards.
#[derive(Debug)]
pub struct TryIter<'a, T, const N: usize> {
    ring: &'a RingBuffer<T, N>,
    exhausted: bool,
}

impl<T, const N: usize> Iterator for TryIter<'_, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.exhausted {
            return None;
        }
        let value = self.ring.try_dequeue();
        self.exhausted = value.is_none();
        value
    }
}

impl<T, const N: usize> FusedIterator for TryIter<'_, T, N> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn handles_share_one_ring() {
        let ring = RingBuffer::<u32, 4>::shared();
        let producer = ring.register_producer();
        let consumer = ring.register_consumer();
        let second = producer.clone();

        producer.try_send(1).unwrap();
        second.try_send(2).unwrap();
        assert_eq!(consumer.ring().len(), 2);
        assert!(Arc::ptr_eq(producer.ring(), consumer.ring()));

        assert_eq!(consumer.try_recv(), Ok(1));
        assert_eq!(consumer.clone().try_recv(), Ok(2));
        assert_eq!(consumer.try_recv(), Err(RingError::Empty));
    }

    #[test]
    fn try_send_hands_back_value_when_full() {
        let ring = RingBuffer::<String, 2>::shared();
        let producer = ring.register_producer();
        producer.try_send("a".into()).unwrap();
        producer.try_send("b".into()).unwrap();

        let rejected = producer.try_send("c".into()).unwrap_err();
        assert_eq!(rejected.reason(), RingError::Full);
        assert_eq!(rejected.into_inner(), "c");
    }

    #[test]
    fn send_timeout_on_full_ring() {
        let ring = RingBuffer::<u8, 2>::shared();
        let producer = ring.register_producer();
        producer.send(1);
        producer.send(2);

        let timeout = Duration::from_millis(20);
        let started = Instant::now();
        let rejected = producer.send_timeout(3, timeout).unwrap_err();
        assert!(started.elapsed() >= timeout);
        assert_eq!(rejected.reason(), RingError::Timeout(timeout));
        assert_eq!(rejected.into_inner(), 3);
    }

    #[test]
    fn recv_timeout_on_empty_ring() {
        let ring = RingBuffer::<u8, 2>::shared();
        let consumer = ring.register_consumer();

        let timeout = Duration::from_millis(20);
        let started = Instant::now();
        assert_eq!(
            consumer.recv_timeout(timeout),
            Err(RingError::Timeout(timeout))
        );
        assert!(started.elapsed() >= timeout);
    }

    #[test]
    fn timeouts_succeed_when_room_appears() {
        let ring = RingBuffer::<usize, 2>::shared();
        let producer = ring.register_producer();
        let consumer = ring.register_consumer();
        producer.send(0);
        producer.send(1);

        let drainer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            consumer.recv()
        });

        producer
            .send_timeout(2, Duration::from_secs(5))
            .expect("drainer frees a slot well before the deadline");
        assert_eq!(drainer.join().unwrap(), 0);

        let consumer = ring.register_consumer();
        assert_eq!(consumer.recv_timeout(Duration::MAX), Ok(1));
        assert_eq!(consumer.recv_timeout(Duration::ZERO), Ok(2));
    }

    #[test]
    fn try_iter_drains_in_order() {
        let ring = RingBuffer::<usize, 8>::shared();
        let producer = ring.register_producer();
        for i in 0..6 {
            producer.send(i);
        }
        let drained: Vec<_> = ring.register_consumer().try_iter().collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4, 5]);
        assert!(ring.is_empty());
    }

    #[test]
    fn try_iter_stays_finished_after_empty() {
        let ring = RingBuffer::<usize, 4>::shared();
        let producer = ring.register_producer();
        let consumer = ring.register_consumer();
        producer.send(1);

        let mut iter = consumer.try_iter();
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next(), None);

        // published after the iterator saw the ring empty
        producer.send(2);
        assert_eq!(iter.next(), None);
        assert_eq!(ring.len(), 1);

        // a fresh iterator picks it up
        assert_eq!(consumer.try_iter().collect::<Vec<_>>(), vec![2]);
    }

    /// Work-queue shape: producers push jobs, workers pull until they see a stop marker.
    #[test]
    fn worker_pool_style_shutdown() {
        const PRODUCERS: usize = 4;
        const WORKERS: usize = 4;
        const JOBS_PER_PRODUCER: usize = 2_500;

        let ring = RingBuffer::<Option<usize>, 64>::shared();
        let done = Arc::new(Mutex::new(Vec::new()));

        let workers: Vec<_> = (0..WORKERS)
            .map(|_| {
                let consumer = ring.register_consumer();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut local = Vec::new();
                    while let Some(job) = consumer.recv() {
                        local.push(job);
                    }
                    done.lock().unwrap().extend(local);
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let producer = ring.register_producer();
                thread::spawn(move || {
                    for j in 0..JOBS_PER_PRODUCER {
                        producer.send(Some(p * JOBS_PER_PRODUCER + j));
                    }
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        let stopper = ring.register_producer();
        for _ in 0..WORKERS {
            stopper.send(None);
        }
        for w in workers {
            w.join().unwrap();
        }

        let mut jobs = done.lock().unwrap().clone();
        jobs.sort_unstable();
        assert_eq!(jobs, (0..PRODUCERS * JOBS_PER_PRODUCER).collect::<Vec<_>>());
    }
}
