// request.rs
use crate::errors::DomainError;
use crate::{ProcessId, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Estado del ciclo de vida de una solicitud.
///
/// Sólo avanza: `Pending -> InProgress -> {Completed | Error}`. No existe
/// transición visible de vuelta a `Pending`; la cancelación es un borrado
/// y no un estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "en_proceso")]
    InProgress,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

impl RequestState {
    pub const ALL: [RequestState; 4] =
        [RequestState::Pending, RequestState::InProgress, RequestState::Completed, RequestState::Error];

    /// ¿Se puede pasar de `self` a `to`?
    pub fn can_transition_to(self, to: RequestState) -> bool {
        use RequestState::*;
        matches!((self, to), (Pending, InProgress) | (InProgress, Completed) | (InProgress, Error))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pendiente",
            RequestState::InProgress => "en_proceso",
            RequestState::Completed => "completado",
            RequestState::Error => "error",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestState::ALL.iter()
                         .copied()
                         .find(|st| st.as_str() == s.trim())
                         .ok_or_else(|| DomainError::ValidationError(format!("Estado de solicitud inválido: {}", s)))
    }
}

/// Solicitud de ejecución de un proceso ("solicitud").
///
/// `params` es la bolsa de parámetros tal como la envió el usuario; se
/// persiste sin validar y cada handler la interpreta al ejecutar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    pub process_id: ProcessId,
    pub params: JsonValue,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
}

impl Request {
    /// Construye una solicitud nueva en estado `Pending` con id fresco.
    pub fn new_pending(user_id: UserId, process_id: ProcessId, params: JsonValue) -> Self {
        Self { id: Uuid::new_v4(),
               user_id,
               process_id,
               params,
               state: RequestState::Pending,
               created_at: crate::numeric::now_micros() }
    }
}

#[cfg(test)]
mod tests {
    use super::RequestState::*;
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Error));

        for from in RequestState::ALL {
            assert!(!from.can_transition_to(Pending), "{} -> pendiente", from);
        }
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Error.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Error));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn state_strings_match_storage_format() {
        for st in RequestState::ALL {
            assert_eq!(st.as_str().parse::<RequestState>().unwrap(), st);
        }
        assert_eq!(serde_json::to_value(InProgress).unwrap(), serde_json::json!("en_proceso"));
    }
}
