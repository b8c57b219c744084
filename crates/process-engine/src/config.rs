// Archivo: config.rs
// Propósito: parámetros del motor leídos desde el entorno (.env incluido).
use crate::errors::{ProcessError, Result};
use std::str::FromStr;

pub use work_queue::DEFAULT_QUEUE_KEY;
pub const DEFAULT_ALERT_SCAN_LIMIT: usize = 100;
pub const DEFAULT_INVOICE_DUE_DAYS: i64 = 30;
/// Diez años.
pub const MAX_INVOICE_DUE_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
  /// Clave de la lista de pendientes en Redis.
  pub queue_key: String,
  /// URL de Redis; `None` usa la cola en memoria.
  pub queue_url: Option<String>,
  /// Tope de mediciones revisadas por un barrido de alertas.
  pub alert_scan_limit: usize,
  /// Días hasta el vencimiento de una factura.
  pub invoice_due_days: i64,
  /// Workers para "ejecutar todos"; 1 es secuencial.
  pub workers: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { queue_key: DEFAULT_QUEUE_KEY.to_string(),
           queue_url: None,
           alert_scan_limit: DEFAULT_ALERT_SCAN_LIMIT,
           invoice_due_days: DEFAULT_INVOICE_DUE_DAYS,
           workers: 1 }
  }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
  match std::env::var(name) {
    Ok(raw) if !raw.trim().is_empty() => {
      raw.trim()
         .parse::<T>()
         .map_err(|_| ProcessError::Config(format!("{}='{}' no es un valor válido", name, raw)))
    }
    _ => Ok(default),
  }
}

impl EngineConfig {
  /// Variables: `SENSOR_QUEUE_URL`, `SENSOR_QUEUE_KEY`,
  /// `SENSOR_ALERT_SCAN_LIMIT`, `SENSOR_INVOICE_DUE_DAYS`, `SENSOR_WORKERS`.
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    let defaults = Self::default();
    let cfg = Self { queue_key: std::env::var("SENSOR_QUEUE_KEY").unwrap_or(defaults.queue_key),
                     queue_url: std::env::var("SENSOR_QUEUE_URL").ok().filter(|s| !s.trim().is_empty()),
                     alert_scan_limit: env_parse("SENSOR_ALERT_SCAN_LIMIT", defaults.alert_scan_limit)?,
                     invoice_due_days: env_parse("SENSOR_INVOICE_DUE_DAYS", defaults.invoice_due_days)?,
                     workers: env_parse("SENSOR_WORKERS", defaults.workers)? };
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<()> {
    if self.workers == 0 {
      return Err(ProcessError::Config("SENSOR_WORKERS debe ser al menos 1".into()));
    }
    if self.alert_scan_limit == 0 {
      return Err(ProcessError::Config("SENSOR_ALERT_SCAN_LIMIT debe ser al menos 1".into()));
    }
    if self.invoice_due_days < 0 {
      return Err(ProcessError::Config("SENSOR_INVOICE_DUE_DAYS no puede ser negativo".into()));
    }
    if self.invoice_due_days > MAX_INVOICE_DUE_DAYS {
      return Err(ProcessError::Config(format!("SENSOR_INVOICE_DUE_DAYS no puede superar {} días", MAX_INVOICE_DUE_DAYS)));
    }
    Ok(())
  }
}
