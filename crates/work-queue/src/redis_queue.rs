// Archivo: redis_queue.rs
// Propósito: cola de pendientes sobre una lista de Redis. LPUSH para
// encolar, RPOP para extraer, LRANGE para espiar y LREM para cancelar.
use crate::errors::{QueueError, Result};
use crate::queue::PendingQueue;
use r2d2::Pool;
use redis::Commands;
use uuid::Uuid;

pub struct RedisPendingQueue {
  pool: Pool<redis::Client>,
  key: String,
}

impl RedisPendingQueue {
  /// Abre un pool contra `url` (p. ej. `redis://127.0.0.1/`).
  pub fn connect(url: &str, key: &str) -> Result<Self> {
    let client = redis::Client::open(url)?;
    let pool = Pool::builder().max_size(4).build(client)?;
    log::info!("cola de pendientes en redis, clave '{}'", key);
    Ok(Self { pool, key: key.to_string() })
  }

  fn parse(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| QueueError::InvalidEntry(raw.to_string()))
  }
}

impl PendingQueue for RedisPendingQueue {
  fn enqueue(&self, id: Uuid) -> Result<()> {
    let mut conn = self.pool.get()?;
    let _: i64 = conn.lpush(&self.key, id.to_string())?;
    Ok(())
  }

  fn peek(&self, limit: usize) -> Result<Vec<Uuid>> {
    if limit == 0 {
      return Ok(Vec::new());
    }
    let mut conn = self.pool.get()?;
    let end = -(limit as isize);
    let raw: Vec<String> = conn.lrange(&self.key, end, -1)?;
    // El extremo derecho es el próximo en salir.
    raw.iter().rev().map(|s| Self::parse(s)).collect()
  }

  fn dequeue_one(&self) -> Result<Option<Uuid>> {
    let mut conn = self.pool.get()?;
    let raw: Option<String> = conn.rpop(&self.key, None)?;
    raw.as_deref().map(Self::parse).transpose()
  }

  fn remove(&self, id: Uuid) -> Result<bool> {
    let mut conn = self.pool.get()?;
    let removed: i64 = conn.lrem(&self.key, 1, id.to_string())?;
    Ok(removed > 0)
  }

  fn len(&self) -> Result<usize> {
    let mut conn = self.pool.get()?;
    let n: usize = conn.llen(&self.key)?;
    Ok(n)
  }

  fn is_durable(&self) -> bool {
    true
  }
}
