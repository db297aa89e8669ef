//! Bounded multi-producer, multi-consumer queue.
//!
//! `mpmc` holds the lock-free ring itself, `handles` the shared producer/consumer front ends
//! with backoff and timeouts layered over the ring's try operations.
mod cell;
pub mod handles;
pub mod mpmc;
