use super::{to_payload, HandlerResult, ProcessHandler};
use crate::context::StoreContext;
use crate::params::ProcessParams;
use crate::payload::AlertScanReport;
use sensor_domain::Alert;

/// Tipo histórico del payload del barrido.
pub const ALERT_SCAN_PAYLOAD_KIND: &str = "generacion_alertas";

/// Crea una alerta climática por cada medición fuera de `[temp_min,
/// temp_max]`, hasta `scan_limit` mediciones.
pub struct ThresholdScanHandler {
    pub scan_limit: usize,
}

impl ProcessHandler for ThresholdScanHandler {
    fn name(&self) -> &str {
        "alertas_rango"
    }

    fn execute(&self, ctx: &StoreContext, params: &ProcessParams) -> HandlerResult {
        let view = params.threshold_view(self.scan_limit)?;
        let out_of_range = ctx.documents.find_measurements(&view.filter)?;
        let mut created = 0;
        for m in &out_of_range {
            ctx.documents.insert_alert(&Alert::climate_out_of_range(m))?;
            created += 1;
        }
        log::info!("{}: {} alertas creadas (rango {} a {})", self.name(), created, view.temp_min, view.temp_max);
        to_payload(&AlertScanReport { tipo: ALERT_SCAN_PAYLOAD_KIND.to_string(),
                                      alerts_created: created,
                                      measurements_scanned: out_of_range.len(),
                                      params: params.raw().clone() })
    }
}
