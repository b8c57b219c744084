//! Crate `work-queue` — cola de solicitudes pendientes.
//!
//! Define el contrato `PendingQueue` (encolar, espiar, extraer de a uno,
//! quitar) y sus backends: `InMemoryPendingQueue` siempre disponible y
//! `RedisPendingQueue` con la feature `redis`.
//!
//! Ejemplo rápido:
//! ```rust
//! use work_queue::{InMemoryPendingQueue, PendingQueue};
//! let q = InMemoryPendingQueue::new();
//! let id = uuid::Uuid::new_v4();
//! q.enqueue(id).unwrap();
//! assert_eq!(q.dequeue_one().unwrap(), Some(id));
//! ```
pub mod errors;
pub mod memory;
pub mod queue;
#[cfg(feature = "redis")]
pub mod redis_queue;

pub use errors::{QueueError, Result};
pub use memory::InMemoryPendingQueue;
pub use queue::{PendingQueue, DEFAULT_QUEUE_KEY};
#[cfg(feature = "redis")]
pub use redis_queue::RedisPendingQueue;
