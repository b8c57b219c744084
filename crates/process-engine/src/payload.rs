// Payloads de éxito por tipo de proceso. Las claves serializadas son las que
// lee la interfaz de reportes.
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremaReport {
  pub tipo: String,
  #[serde(rename = "temperatura_maxima")]
  pub temperature_max: f64,
  #[serde(rename = "temperatura_minima")]
  pub temperature_min: f64,
  #[serde(rename = "humedad_maxima")]
  pub humidity_max: f64,
  #[serde(rename = "humedad_minima")]
  pub humidity_min: f64,
  #[serde(rename = "total_mediciones")]
  pub total: usize,
  #[serde(rename = "parametros")]
  pub params: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityExtremaReport {
  pub tipo: String,
  #[serde(rename = "humedad_maxima")]
  pub humidity_max: f64,
  #[serde(rename = "humedad_minima")]
  pub humidity_min: f64,
  #[serde(rename = "total_mediciones")]
  pub total: usize,
  #[serde(rename = "parametros")]
  pub params: JsonValue,
}

/// Fila mensual. `temperatura_promedio` falta en el informe de humedad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
  /// `AAAA-MM`.
  #[serde(rename = "periodo")]
  pub period: String,
  #[serde(rename = "temperatura_promedio", skip_serializing_if = "Option::is_none", default)]
  pub temperature_avg: Option<f64>,
  #[serde(rename = "humedad_promedio")]
  pub humidity_avg: f64,
  #[serde(rename = "total_mediciones")]
  pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageReport {
  pub tipo: String,
  #[serde(rename = "datos_mensuales")]
  pub monthly: Vec<MonthlyRow>,
  #[serde(rename = "parametros")]
  pub params: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertScanReport {
  pub tipo: String,
  #[serde(rename = "alertas_generadas")]
  pub alerts_created: usize,
  #[serde(rename = "mediciones_analizadas")]
  pub measurements_scanned: usize,
  #[serde(rename = "parametros")]
  pub params: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
  pub sensor_id: i64,
  #[serde(rename = "sensor_nombre")]
  pub sensor_name: String,
  #[serde(rename = "ciudad")]
  pub city: String,
  #[serde(rename = "pais")]
  pub country: String,
  #[serde(rename = "estado")]
  pub status: String,
  #[serde(rename = "temperatura")]
  pub temperature: f64,
  #[serde(rename = "humedad")]
  pub humidity: f64,
  #[serde(rename = "ultima_actualizacion")]
  pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineQueryReport {
  pub tipo: String,
  #[serde(rename = "zona")]
  pub zone: String,
  #[serde(rename = "total_sensores")]
  pub total_sensors: usize,
  #[serde(rename = "sensores")]
  pub sensors: Vec<SensorReading>,
  #[serde(rename = "parametros")]
  pub params: JsonValue,
}
