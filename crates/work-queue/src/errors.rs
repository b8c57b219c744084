// Archivo: errors.rs
// Propósito: errores de la cola de pendientes y alias Result<T>.
use thiserror::Error;

/// Errores de la cola de pendientes.
///
/// - `Unavailable`: el backend no respondió (conexión, pool, lock).
/// - `InvalidEntry`: la cola contiene algo que no es un id de solicitud.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
  #[error("Cola no disponible: {0}")]
  Unavailable(String),
  #[error("Entrada inválida en la cola: {0}")]
  InvalidEntry(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for QueueError {
  fn from(e: redis::RedisError) -> Self {
    Self::Unavailable(e.to_string())
  }
}

#[cfg(feature = "redis")]
impl From<r2d2::Error> for QueueError {
  fn from(e: r2d2::Error) -> Self {
    Self::Unavailable(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, QueueError>;
