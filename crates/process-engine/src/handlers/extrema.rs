use super::{to_payload, HandlerResult, ProcessHandler};
use crate::context::StoreContext;
use crate::errors::HandlerError;
use crate::params::ProcessParams;
use crate::payload::{ExtremaReport, HumidityExtremaReport};
use sensor_domain::{round2, ProcessKind};

/// Mínimo y máximo de una serie; `None` si está vacía.
pub fn min_max<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
                          None => Some((v, v)),
                          Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                      })
}

/// Temperatura y humedad máximas y mínimas sobre las mediciones filtradas.
pub struct TemperatureExtremaHandler;

impl ProcessHandler for TemperatureExtremaHandler {
    fn name(&self) -> &str {
        "informe_max_min"
    }

    fn execute(&self, ctx: &StoreContext, params: &ProcessParams) -> HandlerResult {
        let ms = ctx.documents.find_measurements(&params.report_filter())?;
        let (Some((t_min, t_max)), Some((h_min, h_max))) =
            (min_max(ms.iter().map(|m| m.temperature)), min_max(ms.iter().map(|m| m.humidity)))
        else {
            return Err(HandlerError::NoMatchingData("No se encontraron mediciones con los criterios especificados".into()));
        };
        log::debug!("{}: {} mediciones", self.name(), ms.len());
        to_payload(&ExtremaReport { tipo: ProcessKind::ReportExtrema.as_str().to_string(),
                                    temperature_max: round2(t_max),
                                    temperature_min: round2(t_min),
                                    humidity_max: round2(h_max),
                                    humidity_min: round2(h_min),
                                    total: ms.len(),
                                    params: params.raw().clone() })
    }
}

/// Humedad máxima y mínima.
pub struct HumidityExtremaHandler;

impl ProcessHandler for HumidityExtremaHandler {
    fn name(&self) -> &str {
        "informe_humedad_max_min"
    }

    fn execute(&self, ctx: &StoreContext, params: &ProcessParams) -> HandlerResult {
        let ms = ctx.documents.find_measurements(&params.report_filter())?;
        let (h_min, h_max) = min_max(ms.iter().map(|m| m.humidity)).ok_or_else(|| HandlerError::NoMatchingData("No se encontraron mediciones".into()))?;
        to_payload(&HumidityExtremaReport { tipo: ProcessKind::HumidityExtrema.as_str().to_string(),
                                            humidity_max: round2(h_max),
                                            humidity_min: round2(h_min),
                                            total: ms.len(),
                                            params: params.raw().clone() })
    }
}
