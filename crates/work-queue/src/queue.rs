use crate::errors::Result;
use uuid::Uuid;

/// Clave histórica de la lista de pendientes.
pub const DEFAULT_QUEUE_KEY: &str = "cola:procesos_pendientes";

/// Cola ordenada de ids de solicitudes pendientes.
///
/// Disciplina de lista: se empuja por un extremo y se extrae por el otro.
/// No deduplica, no tiene prioridad ni timeout de visibilidad, y
/// `dequeue_one` es destructivo (no hay ack ni re-entrega).
pub trait PendingQueue: Send + Sync {
    /// Agrega un id al extremo de entrada.
    fn enqueue(&self, id: Uuid) -> Result<()>;

    /// Hasta `limit` ids sin extraerlos, empezando por el próximo a salir.
    fn peek(&self, limit: usize) -> Result<Vec<Uuid>>;

    /// Extrae atómicamente el próximo id, o `None` si la cola está vacía.
    fn dequeue_one(&self) -> Result<Option<Uuid>>;

    /// Quita una ocurrencia de `id`. Devuelve `false` si no estaba.
    fn remove(&self, id: Uuid) -> Result<bool>;

    fn len(&self) -> Result<usize>;

    /// `true` si el contenido sobrevive a un reinicio del proceso.
    fn is_durable(&self) -> bool {
        false
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Quita todas las ocurrencias de `id` y devuelve cuántas había.
    fn purge(&self, id: Uuid) -> Result<usize> {
        let mut removed = 0;
        while self.remove(id)? {
            removed += 1;
        }
        Ok(removed)
    }

    fn contains(&self, id: Uuid) -> Result<bool> {
        let all = self.peek(self.len()?)?;
        Ok(all.contains(&id))
    }
}
