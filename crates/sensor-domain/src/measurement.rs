// measurement.rs
use crate::SensorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Medición de un sensor (documento `mediciones`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub sensor_id: SensorId,
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    pub fn new(sensor_id: SensorId,
               city: &str,
               country: &str,
               temperature: f64,
               humidity: f64,
               timestamp: DateTime<Utc>)
               -> Self {
        Self { id: Uuid::new_v4(),
               sensor_id,
               city: city.to_string(),
               country: country.to_string(),
               temperature,
               humidity,
               timestamp }
    }
}

/// Filtro de consulta sobre mediciones. Un campo `None` no restringe ese
/// eje.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementFilter {
    pub city: Option<String>,
    pub country: Option<String>,
    /// Límite inferior inclusivo.
    pub from: Option<DateTime<Utc>>,
    /// Límite superior inclusivo.
    pub to: Option<DateTime<Utc>>,
    /// Si está presente, sólo mediciones con temperatura `< min` o `> max`.
    pub temperature_outside: Option<(f64, f64)>,
    pub limit: Option<usize>,
}

impl MeasurementFilter {
    pub fn matches(&self, m: &Measurement) -> bool {
        if let Some(city) = &self.city {
            if &m.city != city {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if &m.country != country {
                return false;
            }
        }
        if let Some(from) = self.from {
            if m.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if m.timestamp > to {
                return false;
            }
        }
        if let Some((min, max)) = self.temperature_outside {
            if !(m.temperature < min || m.temperature > max) {
                return false;
            }
        }
        true
    }
}

/// Sensor del directorio relacional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub city: String,
    pub country: String,
    pub status: String,
}

impl Sensor {
    /// Coincidencia por fragmento de zona en ciudad o país, sin distinguir
    /// mayúsculas.
    pub fn matches_zone(&self, fragment: &str) -> bool {
        let needle = fragment.to_lowercase();
        self.city.to_lowercase().contains(&needle) || self.country.to_lowercase().contains(&needle)
    }
}

/// Alerta (documento `alertas`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: String,
    pub sensor_id: SensorId,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub state: String,
}

impl Alert {
    /// Alerta climática activa para una medición fuera de rango.
    pub fn climate_out_of_range(m: &Measurement) -> Self {
        let place = if m.city.is_empty() { "N/A" } else { m.city.as_str() };
        Self { id: Uuid::new_v4(),
               kind: "climatica".to_string(),
               sensor_id: m.sensor_id,
               timestamp: crate::numeric::now_micros(),
               description: format!("Temperatura fuera de rango ({:?}°C) en {}", m.temperature, place),
               state: "activa".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn m(city: &str, temp: f64, day: u32) -> Measurement {
        Measurement::new(1, city, "Argentina", temp, 50.0, Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(MeasurementFilter::default().matches(&m("Rosario", 10.0, 1)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let f = MeasurementFilter { from: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
                                    to: Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()),
                                    ..Default::default() };
        assert!(!f.matches(&m("Rosario", 10.0, 1)));
        assert!(f.matches(&m("Rosario", 10.0, 2)));
        assert!(f.matches(&m("Rosario", 10.0, 3)));
        assert!(!f.matches(&m("Rosario", 10.0, 4)));
    }

    #[test]
    fn out_of_range_excludes_bounds() {
        let f = MeasurementFilter { temperature_outside: Some((0.0, 30.0)), ..Default::default() };
        assert!(!f.matches(&m("Rosario", 30.0, 1)));
        assert!(!f.matches(&m("Rosario", 0.0, 1)));
        assert!(f.matches(&m("Rosario", 35.0, 1)));
        assert!(f.matches(&m("Rosario", -0.5, 1)));
    }

    #[test]
    fn zone_match_is_case_insensitive_on_city_or_country() {
        let s = Sensor { id: 7,
                         name: "S7".into(),
                         city: "Buenos Aires".into(),
                         country: "Argentina".into(),
                         status: "activo".into() };
        assert!(s.matches_zone("aires"));
        assert!(s.matches_zone("ARGENT"));
        assert!(!s.matches_zone("Lima"));
    }
}
