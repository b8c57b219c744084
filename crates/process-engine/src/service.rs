//! Fachada del pipeline para la capa de presentación: catálogo, alta,
//! cancelación, consultas por usuario y las operaciones del operador.
use crate::billing::{bill_completed, BillingRecord};
use crate::config::EngineConfig;
use crate::context::StoreContext;
use crate::engine::{DuplicatePolicy, ExecutionEngine, RunAllSummary, RunOutcome};
use crate::errors::{ProcessError, Result};
use crate::reconcile::{reconcile, retry_unbilled, ReconciliationReport};
use crate::submission::{self, Submitted};
use sensor_domain::{ExecutionResult, ProcessDefinition, ProcessId, Request, RequestId, RequestState, UserId};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Solicitud con el nombre del proceso y su último resultado, si está
/// completada.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestView {
  pub request: Request,
  pub process_name: Option<String>,
  pub result: Option<ExecutionResult>,
}

pub struct ProcessService {
  ctx: StoreContext,
  config: EngineConfig,
  engine: ExecutionEngine,
}

impl ProcessService {
  pub fn new(ctx: StoreContext, config: EngineConfig) -> Self {
    let engine = ExecutionEngine::new(ctx.clone(), config.clone());
    Self { ctx, config, engine }
  }

  pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
    self.engine = self.engine.with_duplicate_policy(policy);
    self
  }

  pub fn context(&self) -> &StoreContext {
    &self.ctx
  }

  pub fn engine(&self) -> &ExecutionEngine {
    &self.engine
  }

  /// Catálogo habilitado, ordenado por nombre.
  pub fn list_available_processes(&self) -> Result<Vec<ProcessDefinition>> {
    Ok(self.ctx.relational.list_processes(true)?)
  }

  pub fn submit(&self, user_id: UserId, process_id: ProcessId, params: JsonValue) -> Result<Submitted> {
    submission::submit(&self.ctx, user_id, process_id, params)
  }

  pub fn cancel(&self, request_id: RequestId, user_id: UserId) -> Result<()> {
    submission::cancel(&self.ctx, request_id, user_id)
  }

  pub fn list_pending_identifiers(&self, limit: usize) -> Result<Vec<RequestId>> {
    submission::list_pending_identifiers(&self.ctx, limit)
  }

  pub fn run_one(&self) -> Result<RunOutcome> {
    self.engine.run_one()
  }

  /// Vacía la cola con `config.workers` hilos.
  pub fn run_all(&self) -> Result<RunAllSummary> {
    self.engine.run_all_parallel(self.config.workers)
  }

  /// Solicitudes del usuario, más recientes primero.
  pub fn list_user_requests(&self, user_id: UserId, state: Option<RequestState>, limit: usize) -> Result<Vec<RequestView>> {
    self.ctx
        .relational
        .list_user_requests(user_id, state, limit)?
        .into_iter()
        .map(|r| self.view(r))
        .collect()
  }

  /// Conteo por estado con los cuatro estados presentes, incluso en cero.
  pub fn count_requests_by_state(&self, user_id: UserId) -> Result<Vec<(RequestState, u64)>> {
    let counts = self.ctx.relational.count_user_requests(user_id)?;
    Ok(RequestState::ALL.iter()
                        .map(|st| {
                          let n = counts.iter().find(|(s, _)| s == st).map(|(_, n)| *n).unwrap_or(0);
                          (*st, n)
                        })
                        .collect())
  }

  pub fn get_request_with_result(&self, request_id: RequestId) -> Result<RequestView> {
    let req = self.ctx
                  .relational
                  .get_request(request_id)?
                  .ok_or(ProcessError::RequestNotFound(request_id))?;
    self.view(req)
  }

  pub fn results_for_request(&self, request_id: RequestId) -> Result<Vec<ExecutionResult>> {
    Ok(self.ctx.documents.results_for_request(request_id)?)
  }

  pub fn bill(&self, user_id: UserId, request_ids: &[RequestId]) -> Result<BillingRecord> {
    bill_completed(&self.ctx, &self.config, user_id, request_ids)
  }

  pub fn reconcile(&self) -> Result<ReconciliationReport> {
    reconcile(&self.ctx)
  }

  /// Reconcilia y reintenta la facturación de lo completado sin factura.
  pub fn reconcile_and_bill(&self) -> Result<(ReconciliationReport, usize)> {
    let report = reconcile(&self.ctx)?;
    let billed = retry_unbilled(&self.ctx, &self.config, &report.completed_unbilled).into_iter()
                                                                                   .filter(|(_, r)| r.is_ok())
                                                                                   .count();
    Ok((report, billed))
  }

  fn view(&self, request: Request) -> Result<RequestView> {
    let process_name = self.ctx.relational.get_process(request.process_id)?.map(|p| p.name);
    let result = if request.state == RequestState::Completed {
      self.ctx.documents.latest_completed_result(request.id)?
    } else {
      None
    };
    Ok(RequestView { request, process_name, result })
  }
}
