//! Bounded lock-free multi-producer, multi-consumer ring buffer.
//!
//! [`RingBuffer`] hands values between any number of threads through a fixed, power-of-two
//! array of slots. Each slot carries a sequence counter that tells producers and consumers
//! whether it is theirs to use on the current lap, so the only shared write contention is a
//! compare-and-swap on one of two cache-padded cursors.
//!
//! ```
//! use seqring::RingBuffer;
//!
//! let ring = RingBuffer::<u32, 2>::new();
//! assert!(ring.try_enqueue(1).is_ok());
//! assert!(ring.try_enqueue(2).is_ok());
//! assert!(ring.try_enqueue(3).is_err());
//! assert_eq!(ring.try_dequeue(), Some(1));
//! ```
//!
//! A capacity that is not a power of two is rejected when the ring is built:
//!
//! ```compile_fail
//! let ring = seqring::RingBuffer::<u32, 3>::new();
//! ```
pub mod error;
pub mod queue;
mod trace;

pub use error::{Rejected, RingError};
pub use queue::handles::{Consumer, Producer, TryIter};
pub use queue::mpmc::RingBuffer;
pub use trace::init_tracing;
