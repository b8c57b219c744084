// Archivo: reconcile.rs
// Propósito: barrido del operador que compara el almacén relacional con la
// cola. Re-encola pendientes huérfanas e informa lo que no puede reparar.
use crate::billing::{bill_completed, BillingRecord};
use crate::config::EngineConfig;
use crate::context::StoreContext;
use crate::errors::{ProcessError, Result};
use sensor_domain::{RequestId, RequestState};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
  /// Solicitudes `Pending` que no estaban en la cola y se encolaron.
  pub requeued: Vec<RequestId>,
  /// Solicitudes `InProgress`. Fuera de un barrido activo indican un
  /// worker que murió a mitad de ejecución.
  pub stale_in_progress: Vec<RequestId>,
  /// Solicitudes `Completed` sin línea de factura.
  pub completed_unbilled: Vec<RequestId>,
}

impl ReconciliationReport {
  pub fn is_clean(&self) -> bool {
    self.requeued.is_empty() && self.stale_in_progress.is_empty() && self.completed_unbilled.is_empty()
  }
}

pub fn reconcile(ctx: &StoreContext) -> Result<ReconciliationReport> {
  let queued: HashSet<RequestId> = ctx.queue.peek(ctx.queue.len()?)?.into_iter().collect();
  let mut report = ReconciliationReport::default();

  for req in ctx.relational.list_requests_by_state(RequestState::Pending)? {
    if !queued.contains(&req.id) {
      ctx.queue.enqueue(req.id)?;
      report.requeued.push(req.id);
    }
  }
  report.stale_in_progress = ctx.relational
                                .list_requests_by_state(RequestState::InProgress)?
                                .into_iter()
                                .map(|r| r.id)
                                .collect();
  for req in ctx.relational.list_requests_by_state(RequestState::Completed)? {
    if ctx.relational.invoice_lines_for_request(req.id)?.is_empty() {
      report.completed_unbilled.push(req.id);
    }
  }

  if report.is_clean() {
    log::info!("reconciliación sin novedades");
  } else {
    log::warn!("reconciliación: {} re-encoladas, {} en proceso, {} sin facturar",
               report.requeued.len(),
               report.stale_in_progress.len(),
               report.completed_unbilled.len());
  }
  Ok(report)
}

/// Reintenta la facturación de cada solicitud completada sin factura. Cada
/// una se factura sola; una falla no detiene las demás.
pub fn retry_unbilled(ctx: &StoreContext, config: &EngineConfig, request_ids: &[RequestId])
                      -> Vec<(RequestId, Result<BillingRecord>)> {
  request_ids.iter()
             .map(|id| {
               let res = match ctx.relational.get_request(*id) {
                 Ok(Some(req)) => bill_completed(ctx, config, req.user_id, &[*id]),
                 Ok(None) => Err(ProcessError::RequestNotFound(*id)),
                 Err(e) => Err(e.into()),
               };
               if let Err(e) = &res {
                 log::warn!("facturación de {} sigue pendiente: {}", id, e);
               }
               (*id, res)
             })
             .collect()
}
