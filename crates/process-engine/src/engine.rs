// Archivo: engine.rs
// Propósito: motor de ejecución. Extrae ids de la cola, reclama la
// solicitud con un compare-and-set, despacha el handler, guarda el
// resultado, fija el estado final y dispara la facturación.
use crate::billing::bill_completed;
use crate::config::EngineConfig;
use crate::context::StoreContext;
use crate::dispatch::dispatch;
use crate::errors::{ErrorClass, HandlerError, ProcessError, Result};
use sensor_domain::{ExecutionResult, Request, RequestId, RequestState};
use uuid::Uuid;
use work_queue::QueueError;

/// Qué hacer cuando la cola entrega una solicitud que ya está en estado
/// terminal (entrada duplicada).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
  /// Vuelve a correr el handler y agrega un resultado marcado como
  /// re-ejecución. No cambia el estado ni factura.
  #[default]
  Reexecute,
  /// Descarta la entrada sin ejecutar.
  Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BillingStatus {
  Billed { invoice_id: Uuid, total: f64 },
  /// La solicitud queda `Completed` sin factura.
  Failed(String),
}

/// Resultado de procesar una entrada de la cola.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  NoPendingWork,
  /// La entrada de la cola no era un id válido; se descartó.
  InvalidEntry(String),
  /// El id no tiene solicitud (cancelada entre el alta y la extracción).
  RequestVanished(RequestId),
  /// Otro worker la reclamó antes, o ya estaba terminal y la política es
  /// `Skip`.
  AlreadyClaimed { request_id: RequestId, state: RequestState },
  Completed { request_id: RequestId, process_name: String, billing: BillingStatus },
  /// El handler falló; la solicitud queda en `Error` con el payload de
  /// error guardado.
  Failed { request_id: RequestId, process_name: String, error: String, class: ErrorClass },
  Reexecuted { request_id: RequestId, process_name: String, completed: bool },
  /// Falla de infraestructura después de reclamar; se forzó `Error` si el
  /// almacén lo permitió.
  Abandoned { request_id: RequestId, reason: String },
}

impl RunOutcome {
  /// ¿Se ejecutó un handler?
  pub fn executed(&self) -> bool {
    matches!(self, RunOutcome::Completed { .. } | RunOutcome::Failed { .. } | RunOutcome::Reexecuted { .. })
  }

  pub fn summary(&self) -> String {
    match self {
      RunOutcome::NoPendingWork => "No hay procesos pendientes".to_string(),
      RunOutcome::InvalidEntry(raw) => format!("Entrada inválida descartada de la cola: {}", raw),
      RunOutcome::RequestVanished(id) => format!("Solicitud {} no encontrada; entrada descartada", id),
      RunOutcome::AlreadyClaimed { request_id, state } => {
        format!("Solicitud {} omitida: estado {}", request_id, state)
      }
      RunOutcome::Completed { request_id, process_name, billing } => match billing {
        BillingStatus::Billed { total, .. } => {
          format!("Proceso '{}' completado ({}). Facturado: ${:.2}", process_name, request_id, total)
        }
        BillingStatus::Failed(e) => {
          format!("Proceso '{}' completado ({}). Facturación pendiente: {}", process_name, request_id, e)
        }
      },
      RunOutcome::Failed { request_id, process_name, error, .. } => {
        format!("Proceso '{}' con error ({}): {}", process_name, request_id, error)
      }
      RunOutcome::Reexecuted { request_id, process_name, completed } => {
        let how = if *completed { "sin errores" } else { "con error" };
        format!("Proceso '{}' re-ejecutado {} ({})", process_name, how, request_id)
      }
      RunOutcome::Abandoned { request_id, reason } => format!("Solicitud {} abandonada: {}", request_id, reason),
    }
  }
}

/// Conteos de un barrido.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunAllSummary {
  /// Handlers terminados sin error.
  pub executed_count: usize,
  /// Handlers con error y abandonos por infraestructura.
  pub error_count: usize,
  /// Entradas descartadas sin ejecutar.
  pub abandoned_count: usize,
}

impl RunAllSummary {
  pub fn record(&mut self, outcome: &RunOutcome) {
    match outcome {
      RunOutcome::NoPendingWork => {}
      RunOutcome::Completed { .. } | RunOutcome::Reexecuted { completed: true, .. } => self.executed_count += 1,
      RunOutcome::Failed { .. } | RunOutcome::Reexecuted { completed: false, .. } | RunOutcome::Abandoned { .. } => {
        self.error_count += 1
      }
      RunOutcome::InvalidEntry(_) | RunOutcome::RequestVanished(_) | RunOutcome::AlreadyClaimed { .. } => {
        self.abandoned_count += 1
      }
    }
  }

  fn merge(&mut self, other: RunAllSummary) {
    self.executed_count += other.executed_count;
    self.error_count += other.error_count;
    self.abandoned_count += other.abandoned_count;
  }
}

pub struct ExecutionEngine {
  ctx: StoreContext,
  config: EngineConfig,
  duplicates: DuplicatePolicy,
}

impl ExecutionEngine {
  pub fn new(ctx: StoreContext, config: EngineConfig) -> Self {
    Self { ctx, config, duplicates: DuplicatePolicy::default() }
  }

  pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
    self.duplicates = policy;
    self
  }

  pub fn duplicate_policy(&self) -> DuplicatePolicy {
    self.duplicates
  }

  /// Extrae y procesa una entrada. Los errores de la cola o de la lectura
  /// inicial se propagan; todo lo que ocurre después de reclamar la
  /// solicitud se reporta en el `RunOutcome`.
  pub fn run_one(&self) -> Result<RunOutcome> {
    let id = match self.ctx.queue.dequeue_one() {
      Ok(None) => return Ok(RunOutcome::NoPendingWork),
      Ok(Some(id)) => id,
      Err(QueueError::InvalidEntry(raw)) => {
        log::warn!("entrada inválida en la cola: '{}'", raw);
        return Ok(RunOutcome::InvalidEntry(raw));
      }
      Err(e) => return Err(e.into()),
    };

    let Some(req) = self.ctx.relational.get_request(id)? else {
      log::warn!("solicitud {} no encontrada; se descarta la entrada", id);
      return Ok(RunOutcome::RequestVanished(id));
    };

    match req.state {
      RequestState::Pending => self.claim_and_execute(req),
      RequestState::InProgress => {
        log::warn!("solicitud {} ya está en proceso; se omite", id);
        Ok(RunOutcome::AlreadyClaimed { request_id: id, state: req.state })
      }
      RequestState::Completed | RequestState::Error => match self.duplicates {
        DuplicatePolicy::Skip => {
          log::warn!("solicitud {} ya terminada ({}); entrada duplicada descartada", id, req.state);
          Ok(RunOutcome::AlreadyClaimed { request_id: id, state: req.state })
        }
        DuplicatePolicy::Reexecute => self.reexecute(req),
      },
    }
  }

  /// Procesa entradas hasta vaciar la cola. Un error de la cola o del
  /// almacén corta el barrido.
  pub fn run_all(&self) -> Result<RunAllSummary> {
    let summary = self.drain()?;
    log::info!("barrido terminado: {} ejecutados, {} con error, {} descartados",
               summary.executed_count,
               summary.error_count,
               summary.abandoned_count);
    Ok(summary)
  }

  /// Barrido con `workers` hilos sobre la misma cola. Los duplicados
  /// terminales se descartan siempre.
  pub fn run_all_parallel(&self, workers: usize) -> Result<RunAllSummary> {
    if workers <= 1 {
      return self.run_all();
    }
    let pooled = ExecutionEngine { ctx: self.ctx.clone(), config: self.config.clone(), duplicates: DuplicatePolicy::Skip };

    let results: Vec<std::thread::Result<Result<RunAllSummary>>> = std::thread::scope(|s| {
      let handles: Vec<_> = (0..workers).map(|n| {
                                          let engine = &pooled;
                                          s.spawn(move || {
                                             log::debug!("worker {} iniciado", n);
                                             engine.drain()
                                           })
                                        })
                                        .collect();
      handles.into_iter().map(|h| h.join()).collect()
    });

    let mut total = RunAllSummary::default();
    let mut first_err = None;
    for r in results {
      match r {
        Ok(Ok(part)) => total.merge(part),
        Ok(Err(e)) => {
          log::error!("worker detenido: {}", e);
          first_err.get_or_insert(e);
        }
        Err(panic) => {
          let msg = panic.downcast_ref::<&str>()
                         .map(|s| s.to_string())
                         .or_else(|| panic.downcast_ref::<String>().cloned())
                         .unwrap_or_else(|| "sin mensaje".to_string());
          first_err.get_or_insert(ProcessError::WorkerPanicked(msg));
        }
      }
    }
    match first_err {
      Some(e) => Err(e),
      None => {
        log::info!("barrido con {} workers: {} ejecutados, {} con error, {} descartados",
                   workers,
                   total.executed_count,
                   total.error_count,
                   total.abandoned_count);
        Ok(total)
      }
    }
  }

  fn drain(&self) -> Result<RunAllSummary> {
    let mut summary = RunAllSummary::default();
    loop {
      match self.run_one()? {
        RunOutcome::NoPendingWork => return Ok(summary),
        outcome => {
          log::info!("{}", outcome.summary());
          summary.record(&outcome);
        }
      }
    }
  }

  fn claim_and_execute(&self, req: Request) -> Result<RunOutcome> {
    let id = req.id;
    if !self.ctx.relational.transition_request(id, RequestState::Pending, RequestState::InProgress)? {
      let state = self.ctx.relational.get_request(id)?.map(|r| r.state).unwrap_or(RequestState::InProgress);
      log::warn!("solicitud {} reclamada por otro worker ({})", id, state);
      return Ok(RunOutcome::AlreadyClaimed { request_id: id, state });
    }
    log::info!("solicitud {} en proceso", id);

    let (process_name, outcome) = match self.ctx.relational.get_process(req.process_id) {
      Ok(Some(def)) => {
        let r = dispatch(def.kind, &req.params, &self.ctx, &self.config);
        (def.name, r)
      }
      Ok(None) => (format!("#{}", req.process_id), Err(HandlerError::UnknownProcess(req.process_id))),
      Err(e) => return Ok(self.abandon(id, format!("catálogo no disponible: {}", e))),
    };

    let (payload, failure) = match outcome {
      Ok(p) => (p, None),
      Err(e @ HandlerError::Store(_)) => {
        if let Err(err) = self.ctx.documents.append_result(&ExecutionResult::new(id, e.to_payload(), false)) {
          log::error!("no se pudo guardar el error de la solicitud {}: {}", id, err);
        }
        return Ok(self.abandon(id, e.to_string()));
      }
      Err(e) => (e.to_payload(), Some(e)),
    };

    let result = ExecutionResult::new(id, payload, false);
    if let Err(e) = self.ctx.documents.append_result(&result) {
      return Ok(self.abandon(id, format!("historial no disponible: {}", e)));
    }

    let to = if failure.is_none() { RequestState::Completed } else { RequestState::Error };
    match self.ctx.relational.transition_request(id, RequestState::InProgress, to) {
      Ok(true) => {}
      Ok(false) => {
        log::error!("solicitud {} cambió de estado durante la ejecución", id);
        return Ok(RunOutcome::Abandoned { request_id: id, reason: "estado modificado durante la ejecución".into() });
      }
      Err(e) => return Ok(self.abandon(id, format!("no se pudo fijar el estado {}: {}", to, e))),
    }

    if let Some(e) = failure {
      log::warn!("solicitud {} con error: {}", id, e);
      return Ok(RunOutcome::Failed { request_id: id, process_name, error: e.to_string(), class: e.class() });
    }

    let billing = match bill_completed(&self.ctx, &self.config, req.user_id, &[id]) {
      Ok(rec) => BillingStatus::Billed { invoice_id: rec.invoice.id, total: rec.invoice.total },
      Err(e) => {
        log::error!("solicitud {} completada sin factura: {}", id, e);
        BillingStatus::Failed(e.to_string())
      }
    };
    log::info!("solicitud {} completada", id);
    Ok(RunOutcome::Completed { request_id: id, process_name, billing })
  }

  fn reexecute(&self, req: Request) -> Result<RunOutcome> {
    let id = req.id;
    log::warn!("solicitud {} ya terminada ({}); se re-ejecuta", id, req.state);
    let (process_name, outcome) = match self.ctx.relational.get_process(req.process_id)? {
      Some(def) => {
        let r = dispatch(def.kind, &req.params, &self.ctx, &self.config);
        (def.name, r)
      }
      None => (format!("#{}", req.process_id), Err(HandlerError::UnknownProcess(req.process_id))),
    };
    let payload = outcome.unwrap_or_else(|e| e.to_payload());
    let result = ExecutionResult::new(id, payload, true);
    self.ctx.documents.append_result(&result)?;
    Ok(RunOutcome::Reexecuted { request_id: id, process_name, completed: result.completed })
  }

  /// Fuerza `InProgress -> Error` tras una falla de infraestructura. No se
  /// vuelve a encolar.
  fn abandon(&self, id: RequestId, reason: String) -> RunOutcome {
    log::error!("solicitud {} abandonada: {}", id, reason);
    match self.ctx.relational.transition_request(id, RequestState::InProgress, RequestState::Error) {
      Ok(true) => log::info!("solicitud {} marcada como error", id),
      Ok(false) => log::warn!("solicitud {} ya no estaba en proceso", id),
      Err(e) => log::error!("no se pudo marcar la solicitud {} como error: {}", id, e),
    }
    RunOutcome::Abandoned { request_id: id, reason }
  }
}
