// errors.rs
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Cuenta corriente no encontrada para el usuario {0}")]
  AccountNotFound(crate::UserId),
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Error de almacenamiento: {0}")]
  StorageError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, DomainError>;
