//! In-memory sequence containers and blocking queue primitives.
//!
//! The plain containers (`FifoQueue`, `Stack`, `PriorityQueue`) are
//! single-threaded building blocks behind the object-safe [`Queue`] trait.
//! [`BlockingQueue`] adds condvar-guarded blocking pop and cooperative
//! shutdown; [`DelayingQueue`] composes a blocking queue with a timer
//! scheduler for deferred enqueue; [`ExpirationMap`] is a concurrent map
//! with per-entry time-to-live swept by a scheduler ticker.

pub mod blocking;
pub mod delaying;
pub mod expiration;
pub mod priority;
pub mod queue;

pub use blocking::BlockingQueue;
pub use delaying::DelayingQueue;
pub use expiration::ExpirationMap;
pub use priority::PriorityQueue;
pub use queue::{FifoQueue, Queue, Stack};
