use crate::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Registro de un intento de ejecución (documento `historial_ejecucion`).
///
/// Nunca se actualiza después de insertarse; una re-ejecución de la misma
/// solicitud agrega un registro nuevo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: Uuid,
    pub request_id: RequestId,
    pub executed_at: DateTime<Utc>,
    /// Payload del handler, o un payload de error con la clave `error`.
    pub payload: JsonValue,
    /// Redundante con el payload: verdadero si no contiene marcador de error.
    pub completed: bool,
    /// Verdadero si la solicitud ya estaba en un estado terminal cuando se
    /// ejecutó este intento.
    pub reexecution: bool,
}

impl ExecutionResult {
    pub fn new(request_id: RequestId, payload: JsonValue, reexecution: bool) -> Self {
        let completed = payload.get("error").is_none();
        Self { id: Uuid::new_v4(),
               request_id,
               executed_at: crate::numeric::now_micros(),
               payload,
               completed,
               reexecution }
    }
}
