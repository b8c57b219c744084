use super::{to_payload, HandlerResult, ProcessHandler};
use crate::context::StoreContext;
use crate::errors::HandlerError;
use crate::params::ProcessParams;
use crate::payload::{AverageReport, MonthlyRow};
use chrono::Datelike;
use sensor_domain::{round2, Measurement, ProcessKind};
use std::collections::BTreeMap;

#[derive(Default)]
struct MonthAcc {
    temperature_sum: f64,
    humidity_sum: f64,
    count: usize,
}

/// Agrupa por año y mes calendario (UTC), en orden ascendente.
pub fn monthly_rows(ms: &[Measurement], include_temperature: bool) -> Vec<MonthlyRow> {
    let mut groups: BTreeMap<(i32, u32), MonthAcc> = BTreeMap::new();
    for m in ms {
        let acc = groups.entry((m.timestamp.year(), m.timestamp.month())).or_default();
        acc.temperature_sum += m.temperature;
        acc.humidity_sum += m.humidity;
        acc.count += 1;
    }
    groups.into_iter()
          .map(|((year, month), acc)| {
              let n = acc.count as f64;
              MonthlyRow { period: format!("{}-{:02}", year, month),
                           temperature_avg: include_temperature.then(|| round2(acc.temperature_sum / n)),
                           humidity_avg: round2(acc.humidity_sum / n),
                           total: acc.count }
          })
          .collect()
}

/// Promedios mensuales. Sirve a `informe_promedio`, a
/// `informe_humedad_promedio` (sin temperatura) y al proceso periódico
/// mensual.
pub struct AverageReportHandler {
    kind: ProcessKind,
}

impl AverageReportHandler {
    pub fn new(kind: ProcessKind) -> Self {
        Self { kind }
    }

    fn include_temperature(&self) -> bool {
        self.kind != ProcessKind::HumidityAverage
    }
}

impl ProcessHandler for AverageReportHandler {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn execute(&self, ctx: &StoreContext, params: &ProcessParams) -> HandlerResult {
        let ms = ctx.documents.find_measurements(&params.report_filter())?;
        if ms.is_empty() {
            return Err(HandlerError::NoMatchingData("No se encontraron mediciones".into()));
        }
        let monthly = monthly_rows(&ms, self.include_temperature());
        log::debug!("{}: {} mediciones en {} periodos", self.name(), ms.len(), monthly.len());
        to_payload(&AverageReport { tipo: self.kind.as_str().to_string(),
                                    monthly,
                                    params: params.raw().clone() })
    }
}
