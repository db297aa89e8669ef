//! Bounded lock-free multi-producer, multi-consumer ring buffer.
//!
//! `RingBuffer` follows Dmitry Vyukov's bounded MPMC queue: every slot carries its own
//! sequence counter, producers race on an enqueue cursor, consumers race on a dequeue cursor,
//! and the only synchronization between a producer and the consumer that receives its value
//! is the release store / acquire load pair on that slot's counter. Both cursors are relaxed
//! hints.
//!
//! Neither operation ever waits on another thread. A full ring rejects the value, an empty
//! ring returns `None`, and the caller decides how to back off (see [`crate::Producer`] and
//! [`crate::Consumer`] for ready-made loops).
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crossbeam_utils::CachePadded;

use crate::queue::cell::Cell;
use crate::trace::{debug, trace};
use crate::Rejected;

/// Fixed-capacity MPMC queue. `N` must be a power of two; any other value fails to compile.
pub struct RingBuffer<T, const N: usize> {
    /// Next position a producer will try to claim
    enqueue: CachePadded<AtomicUsize>,
    /// Next position a consumer will try to claim
    dequeue: CachePadded<AtomicUsize>,
    cells: Box<[CachePadded<Cell<T>>]>,
}

impl<T, const N: usize> RingBuffer<T, N> {
    const POWER_OF_TWO: () = assert!(
        N.is_power_of_two(),
        "RingBuffer capacity must be a non-zero power of two"
    );
    const MASK: usize = N - 1;

    /// Number of slots, fixed for the life of the buffer.
    pub const CAPACITY: usize = N;

    /// Allocates all `N` slots, each stamped with its own index as the starting sequence.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Builds a ring whose cursors begin at `start`, which must be a multiple of `N`.
    /// Lets tests drive the cursors across the `usize` wrap boundary.
    fn starting_at(start: usize) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::POWER_OF_TWO;
        debug_assert_eq!(start & Self::MASK, 0);

        let cells = (0..N)
            .map(|i| CachePadded::new(Cell::new(start.wrapping_add(i))))
            .collect();

        debug!(
            capacity = N,
            cell_bytes = std::mem::size_of::<CachePadded<Cell<T>>>(),
            "ring buffer allocated"
        );

        Self {
            enqueue: CachePadded::new(AtomicUsize::new(start)),
            dequeue: CachePadded::new(AtomicUsize::new(start)),
            cells,
        }
    }

    /// Tries to move `value` into the ring.
    ///
    /// Returns the value inside [`Rejected`] with [`crate::RingError::Full`] when every slot is
    /// occupied. Never spins waiting for a consumer; the loop only repeats when another
    /// producer claimed the slot first.
    pub fn try_enqueue(&self, value: T) -> Result<(), Rejected<T>> {
        let mut pos = self.enqueue.load(Relaxed);
        let cell = loop {
            let cell = &self.cells[pos & Self::MASK];
            let seq = cell.sequence.load(Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                match self.enqueue.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Relaxed,
                    Relaxed,
                ) {
                    Ok(_) => break cell,
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // slot still holds last lap's value
                return Err(Rejected::full(value));
            } else {
                pos = self.enqueue.load(Relaxed);
            }
        };

        // SAFETY: winning the CAS at `pos` while `seq == pos` gives this thread sole access to
        // an empty slot until the store below.
        unsafe { cell.write(value) };
        cell.sequence.store(pos.wrapping_add(1), Release);
        Ok(())
    }

    /// Tries to take the oldest published value at the head of the ring.
    ///
    /// Returns `None` when nothing is published at the dequeue cursor. Never spins waiting for
    /// a producer.
    pub fn try_dequeue(&self) -> Option<T> {
        let mut pos = self.dequeue.load(Relaxed);
        let cell = loop {
            let cell = &self.cells[pos & Self::MASK];
            let seq = cell.sequence.load(Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                match self.dequeue.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Relaxed,
                    Relaxed,
                ) {
                    Ok(_) => break cell,
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue.load(Relaxed);
            }
        };

        // SAFETY: `seq == pos + 1` was observed with acquire ordering, so the producer's write
        // is visible, and the CAS makes this the only consumer of that value.
        let value = unsafe { cell.take() };
        // free the slot for the producer one full lap ahead
        cell.sequence.store(pos.wrapping_add(N), Release);
        Some(value)
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Best-effort count of values in the ring.
    ///
    /// The two cursors are read separately and other threads may move either in between,
    /// so the result is a snapshot that can be stale by the time it returns. It counts slots
    /// claimed by producers that have not published yet. Always within `0..=N`.
    pub fn len(&self) -> usize {
        let dequeue = self.dequeue.load(Relaxed);
        let enqueue = self.enqueue.load(Relaxed);
        let resident = enqueue.wrapping_sub(dequeue) as isize;
        resident.clamp(0, N as isize) as usize
    }

    /// Best-effort, see [`RingBuffer::len`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-effort, see [`RingBuffer::len`].
    pub fn is_full(&self) -> bool {
        self.len() == N
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        RingBuffer::new()
    }
}

impl<T, const N: usize> Drop for RingBuffer<T, N> {
    fn drop(&mut self) {
        let mut drained = 0usize;
        while self.try_dequeue().is_some() {
            drained += 1;
        }
        if drained > 0 {
            trace!(capacity = N, drained, "dropped resident values with ring buffer");
        }
    }
}

impl<T, const N: usize> fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &N)
            .field("len", &self.len())
            .finish()
    }
}
