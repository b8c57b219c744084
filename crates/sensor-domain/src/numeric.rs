use chrono::{DateTime, SubsecRound, Utc};

/// Hora actual truncada a microsegundos, la resolución de los almacenes.
pub fn now_micros() -> DateTime<Utc> {
  Utc::now().trunc_subsecs(6)
}

/// Redondea a dos decimales, la precisión que usa la interfaz de reportes.
pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}
