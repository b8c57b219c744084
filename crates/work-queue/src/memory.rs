use crate::errors::{QueueError, Result};
use crate::queue::PendingQueue;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Cola de pendientes en memoria.
///
/// Uso pensado para pruebas locales y para el operador sin Redis. No
/// garantiza durabilidad.
#[derive(Debug, Default)]
pub struct InMemoryPendingQueue {
    queue: Mutex<VecDeque<Uuid>>,
}

impl InMemoryPendingQueue {
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<Uuid>>> {
        self.queue
            .lock()
            .map_err(|e| QueueError::Unavailable(format!("lock envenenado: {}", e)))
    }
}

impl PendingQueue for InMemoryPendingQueue {
    fn enqueue(&self, id: Uuid) -> Result<()> {
        self.lock()?.push_back(id);
        Ok(())
    }

    fn peek(&self, limit: usize) -> Result<Vec<Uuid>> {
        Ok(self.lock()?.iter().take(limit).copied().collect())
    }

    fn dequeue_one(&self) -> Result<Option<Uuid>> {
        Ok(self.lock()?.pop_front())
    }

    fn remove(&self, id: Uuid) -> Result<bool> {
        let mut q = self.lock()?;
        match q.iter().position(|x| *x == id) {
            Some(pos) => {
                q.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}
