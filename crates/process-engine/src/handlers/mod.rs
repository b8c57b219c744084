//! Handlers por tipo de proceso.
//!
//! Cada handler recibe los parámetros ya interpretados y el contexto de
//! almacenes, y devuelve el payload de éxito o un `HandlerError`. Ninguno
//! cambia el estado de la solicitud: eso es tarea del motor.
use crate::context::StoreContext;
use crate::errors::HandlerError;
use crate::params::ProcessParams;
use serde::Serialize;
use serde_json::Value as JsonValue;

pub mod average;
pub mod extrema;
pub mod online_query;
pub mod threshold_scan;

pub use average::AverageReportHandler;
pub use extrema::{HumidityExtremaHandler, TemperatureExtremaHandler};
pub use online_query::OnlineQueryHandler;
pub use threshold_scan::ThresholdScanHandler;

pub type HandlerResult = Result<JsonValue, HandlerError>;

pub trait ProcessHandler: Send + Sync {
    /// Nombre corto para logs.
    fn name(&self) -> &str;

    fn execute(&self, ctx: &StoreContext, params: &ProcessParams) -> HandlerResult;
}

pub(crate) fn to_payload<T: Serialize>(report: &T) -> HandlerResult {
    serde_json::to_value(report).map_err(|e| HandlerError::Store(format!("payload no serializable: {}", e)))
}
