use super::{to_payload, HandlerResult, ProcessHandler};
use crate::context::StoreContext;
use crate::errors::HandlerError;
use crate::params::ProcessParams;
use crate::payload::{OnlineQueryReport, SensorReading};
use sensor_domain::{round2, ProcessKind};

/// Última medición de cada sensor de una zona (ciudad o país).
pub struct OnlineQueryHandler;

impl ProcessHandler for OnlineQueryHandler {
    fn name(&self) -> &str {
        "consulta_online"
    }

    fn execute(&self, ctx: &StoreContext, params: &ProcessParams) -> HandlerResult {
        let zone = params.zone();
        let sensors = ctx.relational.find_sensors_by_zone(zone)?;
        if sensors.is_empty() {
            return Err(HandlerError::NoMatchingData(format!("No se encontraron sensores en la zona: {}", zone)));
        }
        let mut readings = Vec::with_capacity(sensors.len());
        for s in sensors {
            // Sensores sin mediciones no aparecen en el resultado.
            let Some(last) = ctx.documents.latest_measurement(s.id)? else { continue };
            readings.push(SensorReading { sensor_id: s.id,
                                          sensor_name: s.name,
                                          city: s.city,
                                          country: s.country,
                                          status: s.status,
                                          temperature: round2(last.temperature),
                                          humidity: round2(last.humidity),
                                          last_update: last.timestamp.format("%Y-%m-%d %H:%M:%S").to_string() });
        }
        to_payload(&OnlineQueryReport { tipo: ProcessKind::OnlineQuery.as_str().to_string(),
                                        zone: zone.to_string(),
                                        total_sensors: readings.len(),
                                        sensors: readings,
                                        params: params.raw().clone() })
    }
}
