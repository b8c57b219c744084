// Archivo: params.rs
// Propósito: interpretar la bolsa de parámetros de una solicitud al momento
// de ejecutar. La bolsa se guarda sin validar; cualquier error de formato
// aparece acá como `HandlerError::MalformedParams`.
use crate::errors::HandlerError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sensor_domain::MeasurementFilter;
use serde_json::{Map, Value as JsonValue};

/// Límites por defecto del barrido de alertas: en la práctica sin cota.
pub const DEFAULT_TEMP_MIN: f64 = -999.0;
pub const DEFAULT_TEMP_MAX: f64 = 999.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessParams {
  pub city: Option<String>,
  pub country: Option<String>,
  pub date_from: Option<NaiveDate>,
  pub date_to: Option<NaiveDate>,
  pub temp_min: Option<f64>,
  pub temp_max: Option<f64>,
  pub zone: Option<String>,
  raw: JsonValue,
}

/// Vista del barrido de alertas: filtro (sin país) y rango aceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdView {
  pub filter: MeasurementFilter,
  pub temp_min: f64,
  pub temp_max: f64,
}

fn opt_string(obj: &Map<String, JsonValue>, key: &str) -> Result<Option<String>, HandlerError> {
  match obj.get(key) {
    None | Some(JsonValue::Null) => Ok(None),
    Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
    Some(JsonValue::String(s)) => Ok(Some(s.trim().to_string())),
    Some(other) => Err(HandlerError::MalformedParams(format!("'{}' debe ser texto, se recibió {}", key, other))),
  }
}

fn opt_date(obj: &Map<String, JsonValue>, key: &str) -> Result<Option<NaiveDate>, HandlerError> {
  match opt_string(obj, key)? {
    None => Ok(None),
    Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
      .map(Some)
      .map_err(|_| HandlerError::MalformedParams(format!("'{}' debe tener formato AAAA-MM-DD: {}", key, s))),
  }
}

fn opt_number(obj: &Map<String, JsonValue>, key: &str) -> Result<Option<f64>, HandlerError> {
  match obj.get(key) {
    None | Some(JsonValue::Null) => Ok(None),
    Some(JsonValue::Number(n)) => n.as_f64()
                                   .map(Some)
                                   .ok_or_else(|| HandlerError::MalformedParams(format!("'{}' fuera de rango", key))),
    // La interfaz de consola envía números como texto.
    Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
    Some(JsonValue::String(s)) => s.trim()
                                   .parse::<f64>()
                                   .map(Some)
                                   .map_err(|_| HandlerError::MalformedParams(format!("'{}' debe ser numérico: {}", key, s))),
    Some(other) => Err(HandlerError::MalformedParams(format!("'{}' debe ser numérico, se recibió {}", key, other))),
  }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl ProcessParams {
  /// Interpreta la bolsa. `null` equivale a un objeto vacío; claves
  /// desconocidas se ignoran.
  pub fn from_bag(bag: &JsonValue) -> Result<Self, HandlerError> {
    let empty = Map::new();
    let obj = match bag {
      JsonValue::Null => &empty,
      JsonValue::Object(map) => map,
      other => return Err(HandlerError::MalformedParams(format!("los parámetros deben ser un objeto JSON, se recibió {}", other))),
    };
    let params = Self { city: opt_string(obj, "ciudad")?,
                        country: opt_string(obj, "pais")?,
                        date_from: opt_date(obj, "fecha_inicio")?,
                        date_to: opt_date(obj, "fecha_fin")?,
                        temp_min: opt_number(obj, "temp_min")?,
                        temp_max: opt_number(obj, "temp_max")?,
                        zone: opt_string(obj, "zona")?,
                        raw: if bag.is_null() { JsonValue::Object(Map::new()) } else { bag.clone() } };
    if let (Some(from), Some(to)) = (params.date_from, params.date_to) {
      if from > to {
        return Err(HandlerError::MalformedParams(format!("fecha_inicio ({}) posterior a fecha_fin ({})", from, to)));
      }
    }
    Ok(params)
  }

  /// Bolsa original, para devolverla en el payload como `parametros`.
  pub fn raw(&self) -> &JsonValue {
    &self.raw
  }

  /// Filtro de los informes: ciudad, país y rango de fechas. Los límites son
  /// la medianoche de cada fecha, ambos inclusivos.
  pub fn report_filter(&self) -> MeasurementFilter {
    MeasurementFilter { city: self.city.clone(),
                        country: self.country.clone(),
                        from: self.date_from.map(midnight),
                        to: self.date_to.map(midnight),
                        temperature_outside: None,
                        limit: None }
  }

  /// El barrido de alertas filtra por ciudad y fechas, no por país.
  pub fn threshold_view(&self, scan_limit: usize) -> Result<ThresholdView, HandlerError> {
    let temp_min = self.temp_min.unwrap_or(DEFAULT_TEMP_MIN);
    let temp_max = self.temp_max.unwrap_or(DEFAULT_TEMP_MAX);
    if temp_min > temp_max {
      return Err(HandlerError::MalformedParams(format!("temp_min ({}) mayor que temp_max ({})", temp_min, temp_max)));
    }
    let filter = MeasurementFilter { country: None,
                                     temperature_outside: Some((temp_min, temp_max)),
                                     limit: Some(scan_limit),
                                     ..self.report_filter() };
    Ok(ThresholdView { filter, temp_min, temp_max })
  }

  /// Fragmento de zona de la consulta online; vacío si no se indicó.
  pub fn zone(&self) -> &str {
    self.zone.as_deref().unwrap_or("")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_known_keys_and_ignores_the_rest() {
    let p = ProcessParams::from_bag(&json!({
      "ciudad": " Rosario ", "pais": "", "fecha_inicio": "2024-01-01", "fecha_fin": "2024-01-31",
      "temp_min": "0", "temp_max": 30, "extra": true
    })).unwrap();
    assert_eq!(p.city.as_deref(), Some("Rosario"));
    assert_eq!(p.country, None);
    assert_eq!(p.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(p.temp_min, Some(0.0));
    assert_eq!(p.temp_max, Some(30.0));
    assert_eq!(p.raw()["extra"], true);
  }

  #[test]
  fn null_bag_is_empty() {
    let p = ProcessParams::from_bag(&JsonValue::Null).unwrap();
    assert_eq!(p.report_filter(), MeasurementFilter::default());
    assert_eq!(p.zone(), "");
  }

  #[test]
  fn malformed_values_are_user_errors() {
    for bag in [json!([1, 2]),
                json!({"fecha_inicio": "01/02/2024"}),
                json!({"temp_min": "frio"}),
                json!({"ciudad": 12}),
                json!({"fecha_inicio": "2024-02-01", "fecha_fin": "2024-01-01"})]
    {
      assert!(matches!(ProcessParams::from_bag(&bag), Err(HandlerError::MalformedParams(_))), "{}", bag);
    }
  }

  #[test]
  fn date_bounds_are_midnight() {
    let p = ProcessParams::from_bag(&json!({"fecha_inicio": "2024-03-01", "fecha_fin": "2024-03-02"})).unwrap();
    let f = p.report_filter();
    assert_eq!(f.from, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    assert_eq!(f.to, Some(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()));
  }

  #[test]
  fn threshold_view_drops_country_and_applies_defaults() {
    let p = ProcessParams::from_bag(&json!({"ciudad": "Lima", "pais": "Perú"})).unwrap();
    let v = p.threshold_view(100).unwrap();
    assert_eq!(v.filter.city.as_deref(), Some("Lima"));
    assert_eq!(v.filter.country, None);
    assert_eq!(v.filter.limit, Some(100));
    assert_eq!((v.temp_min, v.temp_max), (-999.0, 999.0));
  }
}
