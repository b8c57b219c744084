use crate::config::EngineConfig;
use crate::context::StoreContext;
use crate::handlers::{AverageReportHandler, HandlerResult, HumidityExtremaHandler, OnlineQueryHandler, ProcessHandler,
                      TemperatureExtremaHandler, ThresholdScanHandler};
use crate::params::ProcessParams;
use sensor_domain::ProcessKind;
use serde_json::Value as JsonValue;

/// Handler de cada tipo de proceso.
pub fn handler_for(kind: ProcessKind, config: &EngineConfig) -> Box<dyn ProcessHandler> {
  match kind {
    ProcessKind::ReportExtrema => Box::new(TemperatureExtremaHandler),
    ProcessKind::HumidityExtrema => Box::new(HumidityExtremaHandler),
    ProcessKind::ReportAverage | ProcessKind::HumidityAverage | ProcessKind::PeriodicReport => {
      Box::new(AverageReportHandler::new(kind))
    }
    ProcessKind::AlertThresholdScan => Box::new(ThresholdScanHandler { scan_limit: config.alert_scan_limit }),
    ProcessKind::OnlineQuery => Box::new(OnlineQueryHandler),
  }
}

/// Interpreta la bolsa de parámetros y ejecuta el handler del tipo.
pub fn dispatch(kind: ProcessKind, bag: &JsonValue, ctx: &StoreContext, config: &EngineConfig) -> HandlerResult {
  let params = ProcessParams::from_bag(bag)?;
  let handler = handler_for(kind, config);
  log::debug!("despachando {} con {}", handler.name(), bag);
  handler.execute(ctx, &params)
}
