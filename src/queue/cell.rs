//! Storage cell for a single slot of the ring.
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicUsize;

/// One slot of the ring: a sequence counter and room for a single value.
///
/// The sequence counter encodes both which lap of the ring owns the slot and whether it is
/// waiting for a producer or a consumer:
/// - `i + k * N`: empty, free for the producer holding cursor position `i + k * N`
/// - `i + k * N + 1`: published, ready for the consumer holding that same position
///
/// `value` is only initialized while the counter reads as published.
pub(crate) struct Cell<T> {
    pub(crate) sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Cell<T> {
    pub(crate) const fn new(sequence: usize) -> Self {
        Self {
            sequence: AtomicUsize::new(sequence),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Moves `value` into the slot.
    ///
    /// # Safety
    ///
    /// The caller must have won the enqueue claim for this slot and the slot must be empty.
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.value.get()).write(value);
    }

    /// Moves the value out, leaving the slot logically uninitialized.
    ///
    /// # Safety
    ///
    /// The caller must have won the dequeue claim for this slot, which implies the matching
    /// producer already published into it.
    #[inline]
    pub(crate) unsafe fn take(&self) -> T {
        (*self.value.get()).assume_init_read()
    }
}

// SAFETY: the value is only touched by the single thread that won the cursor claim for it,
// and the hand-off between that producer and consumer goes through the sequence counter.
unsafe impl<T: Send> Send for Cell<T> {}
unsafe impl<T: Send> Sync for Cell<T> {}
