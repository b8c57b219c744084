// process.rs
use crate::errors::DomainError;
use crate::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tipos de proceso soportados por el motor de ejecución.
///
/// El conjunto es cerrado: cada variante tiene exactamente un handler y el
/// despacho se hace con un `match` exhaustivo. La representación serializada
/// coincide con la columna `tipo` del catálogo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    #[serde(rename = "informe_max_min")]
    ReportExtrema,
    #[serde(rename = "informe_promedio")]
    ReportAverage,
    #[serde(rename = "informe_humedad_max_min")]
    HumidityExtrema,
    #[serde(rename = "informe_humedad_promedio")]
    HumidityAverage,
    #[serde(rename = "alertas_rango")]
    AlertThresholdScan,
    #[serde(rename = "consulta_online")]
    OnlineQuery,
    #[serde(rename = "proceso_periodico_mensual")]
    PeriodicReport,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 7] = [ProcessKind::ReportExtrema,
                                       ProcessKind::ReportAverage,
                                       ProcessKind::HumidityExtrema,
                                       ProcessKind::HumidityAverage,
                                       ProcessKind::AlertThresholdScan,
                                       ProcessKind::OnlineQuery,
                                       ProcessKind::PeriodicReport];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKind::ReportExtrema => "informe_max_min",
            ProcessKind::ReportAverage => "informe_promedio",
            ProcessKind::HumidityExtrema => "informe_humedad_max_min",
            ProcessKind::HumidityAverage => "informe_humedad_promedio",
            ProcessKind::AlertThresholdScan => "alertas_rango",
            ProcessKind::OnlineQuery => "consulta_online",
            ProcessKind::PeriodicReport => "proceso_periodico_mensual",
        }
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessKind::ALL.iter()
                        .copied()
                        .find(|k| k.as_str() == s.trim())
                        .ok_or_else(|| DomainError::ValidationError(format!("Tipo de proceso desconocido: {}", s)))
    }
}

/// Entrada del catálogo de procesos. Inmutable una vez referenciada por una
/// solicitud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: ProcessId,
    pub name: String,
    pub description: Option<String>,
    pub kind: ProcessKind,
    /// Costo fijo cobrado por cada ejecución completada.
    pub price: f64,
    pub enabled: bool,
}
