use crate::config::EngineConfig;
use crate::errors::Result;
use sensor_domain::{DocumentStore, RelationalStore};
use std::sync::Arc;
use work_queue::{InMemoryPendingQueue, PendingQueue};

/// Los tres almacenes que usa el pipeline, construidos una vez y pasados
/// por referencia al servicio, al motor y a los handlers.
#[derive(Clone)]
pub struct StoreContext {
  /// Catálogo, solicitudes, sensores y facturación.
  pub relational: Arc<dyn RelationalStore>,
  /// Mediciones, alertas e historial de ejecución.
  pub documents: Arc<dyn DocumentStore>,
  /// Lista de ids pendientes.
  pub queue: Arc<dyn PendingQueue>,
}

impl StoreContext {
  pub fn new(relational: Arc<dyn RelationalStore>, documents: Arc<dyn DocumentStore>, queue: Arc<dyn PendingQueue>) -> Self {
    Self { relational, documents, queue }
  }
}

/// Cola según la configuración: Redis si hay `queue_url` y la feature
/// `redis` está activa, en memoria en otro caso.
pub fn queue_from_config(config: &EngineConfig) -> Result<Arc<dyn PendingQueue>> {
  match config.queue_url.as_deref() {
    #[cfg(feature = "redis")]
    Some(url) => Ok(Arc::new(work_queue::RedisPendingQueue::connect(url, &config.queue_key)?)),
    #[cfg(not(feature = "redis"))]
    Some(url) => {
      log::warn!("SENSOR_QUEUE_URL={} ignorada: compilado sin la feature redis; se usa la cola en memoria", url);
      Ok(Arc::new(InMemoryPendingQueue::new()))
    }
    None => Ok(Arc::new(InMemoryPendingQueue::new())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn queue_without_url_is_not_durable() {
    let queue = queue_from_config(&EngineConfig::default()).unwrap();
    assert!(!queue.is_durable());
  }

  #[cfg(not(feature = "redis"))]
  #[test]
  fn ignored_queue_url_falls_back_to_volatile_queue() {
    let config = EngineConfig { queue_url: Some("redis://127.0.0.1/".into()), ..EngineConfig::default() };
    let queue = queue_from_config(&config).unwrap();
    assert!(!queue.is_durable());
    assert!(queue.is_empty().unwrap());
  }
}
