use sensor_domain::{DomainError, ProcessId, RequestId, RequestState};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use work_queue::QueueError;

/// Clasificación de fallas del pipeline.
///
/// - `User`: el usuario pidió algo imposible; se informa tal cual y no se
///   reintenta.
/// - `TransientInfra`: un almacén no respondió.
/// - `InvariantViolation`: el estado observado contradice el ciclo de vida
///   (solicitud desaparecida, ya reclamada, facturación repetida). Se
///   registra y se abandona el intento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  User,
  TransientInfra,
  InvariantViolation,
}

impl ErrorClass {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorClass::User => "usuario",
      ErrorClass::TransientInfra => "infraestructura",
      ErrorClass::InvariantViolation => "invariante",
    }
  }
}

// Errores del motor de procesos: submission, cancelación, ejecución y
// facturación.
#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("Proceso inexistente o deshabilitado: {0}")]
  UnknownProcess(ProcessId),

  #[error("Solicitud no encontrada")]
  RequestNotFound(RequestId),

  #[error("Solo se pueden cancelar solicitudes pendientes (estado actual: {1})")]
  NotCancellable(RequestId, RequestState),

  /// Se pidió facturar una solicitud que no está en `Completed` o no
  /// pertenece al usuario.
  #[error("Solicitud {0} no facturable: {1}")]
  NotBillable(RequestId, String),

  #[error("La solicitud {0} ya fue facturada")]
  AlreadyBilled(RequestId),

  #[error("No hay solicitudes para facturar")]
  NothingToBill,

  #[error("Un worker terminó con pánico: {0}")]
  WorkerPanicked(String),

  #[error("Configuración inválida: {0}")]
  Config(String),

  #[error("Error de dominio: {0}")]
  Domain(#[from] DomainError),

  #[error("Error de cola: {0}")]
  Queue(#[from] QueueError),
}

impl ProcessError {
  pub fn class(&self) -> ErrorClass {
    match self {
      ProcessError::UnknownProcess(_)
      | ProcessError::RequestNotFound(_)
      | ProcessError::NotCancellable(..)
      | ProcessError::NothingToBill
      | ProcessError::Config(_) => ErrorClass::User,
      ProcessError::NotBillable(..) | ProcessError::AlreadyBilled(_) | ProcessError::WorkerPanicked(_) => {
        ErrorClass::InvariantViolation
      }
      ProcessError::Domain(e) => match e {
        DomainError::StorageError(_) => ErrorClass::TransientInfra,
        DomainError::NotFound(_) | DomainError::AccountNotFound(_) => ErrorClass::User,
        DomainError::ValidationError(_) | DomainError::SerializationError(_) => ErrorClass::InvariantViolation,
      },
      ProcessError::Queue(QueueError::Unavailable(_)) => ErrorClass::TransientInfra,
      ProcessError::Queue(QueueError::InvalidEntry(_)) => ErrorClass::InvariantViolation,
    }
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Falla de un handler. Nunca sale del despachador como error: se
/// convierte en el payload del resultado.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
  #[error("Parámetros inválidos: {0}")]
  MalformedParams(String),

  #[error("{0}")]
  NoMatchingData(String),

  #[error("Proceso inexistente: {0}")]
  UnknownProcess(ProcessId),

  #[error("Error de almacenamiento: {0}")]
  Store(String),
}

impl HandlerError {
  pub fn class(&self) -> ErrorClass {
    match self {
      HandlerError::MalformedParams(_) | HandlerError::NoMatchingData(_) | HandlerError::UnknownProcess(_) => {
        ErrorClass::User
      }
      HandlerError::Store(_) => ErrorClass::TransientInfra,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      HandlerError::MalformedParams(_) => "parametros_invalidos",
      HandlerError::NoMatchingData(_) => "sin_datos",
      HandlerError::UnknownProcess(_) => "proceso_desconocido",
      HandlerError::Store(_) => "almacen",
    }
  }

  /// Payload de error tal como se guarda en el historial.
  pub fn to_payload(&self) -> JsonValue {
    json!({ "error": self.to_string(), "clase": self.class().as_str(), "codigo": self.code() })
  }
}

impl From<DomainError> for HandlerError {
  fn from(e: DomainError) -> Self {
    match e {
      DomainError::StorageError(msg) => HandlerError::Store(msg),
      other => HandlerError::Store(other.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classes_follow_failure_kind() {
    assert_eq!(ProcessError::UnknownProcess(3).class(), ErrorClass::User);
    assert_eq!(ProcessError::Domain(DomainError::StorageError("down".into())).class(), ErrorClass::TransientInfra);
    assert_eq!(ProcessError::AlreadyBilled(uuid::Uuid::nil()).class(), ErrorClass::InvariantViolation);
    assert_eq!(ProcessError::Queue(QueueError::InvalidEntry("x".into())).class(), ErrorClass::InvariantViolation);
  }

  #[test]
  fn handler_error_payload_carries_message_and_class() {
    let p = HandlerError::NoMatchingData("No se encontraron sensores en la zona: Lima".into()).to_payload();
    assert_eq!(p["error"], "No se encontraron sensores en la zona: Lima");
    assert_eq!(p["clase"], "usuario");
    assert_eq!(p["codigo"], "sin_datos");
  }

  #[test]
  fn storage_error_message_is_not_prefixed_twice() {
    let e = HandlerError::from(DomainError::StorageError("blip".into()));
    assert_eq!(e.to_string(), "Error de almacenamiento: blip");
    assert_eq!(e.to_payload()["codigo"], "almacen");
  }
}
