// Archivo: submission.rs
// Propósito: alta y cancelación de solicitudes. El registro se escribe
// antes que la entrada de la cola.
use crate::context::StoreContext;
use crate::errors::{ProcessError, Result};
use sensor_domain::{ProcessId, Request, RequestId, RequestState, UserId};
use serde_json::Value as JsonValue;

/// Resultado de un alta.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
  pub request_id: RequestId,
  pub process_name: String,
  /// Precio del catálogo al momento del alta.
  pub price: f64,
  /// Falso si la cola falló después de guardar la solicitud; la
  /// reconciliación la vuelve a encolar.
  pub queued: bool,
}

impl Submitted {
  pub fn message(&self) -> String {
    format!("Proceso solicitado. Costo: ${:.2}", self.price)
  }
}

/// Crea una solicitud `Pending` y encola su id.
pub fn submit(ctx: &StoreContext, user_id: UserId, process_id: ProcessId, params: JsonValue) -> Result<Submitted> {
  let def = ctx.relational
               .get_process(process_id)?
               .filter(|p| p.enabled)
               .ok_or(ProcessError::UnknownProcess(process_id))?;

  let req = Request::new_pending(user_id, process_id, params);
  ctx.relational.insert_request(&req)?;

  let queued = match ctx.queue.enqueue(req.id) {
    Ok(()) => true,
    Err(e) => {
      log::warn!("solicitud {} guardada sin encolar ({}); queda para la reconciliación", req.id, e);
      false
    }
  };
  log::info!("usuario {} solicitó '{}' ({}), solicitud {}", user_id, def.name, def.kind, req.id);
  Ok(Submitted { request_id: req.id, process_name: def.name, price: def.price, queued })
}

/// Cancela una solicitud propia que sigue `Pending`: borra el registro y
/// todas sus entradas en la cola.
pub fn cancel(ctx: &StoreContext, request_id: RequestId, user_id: UserId) -> Result<()> {
  let req = ctx.relational
               .get_request(request_id)?
               .filter(|r| r.user_id == user_id)
               .ok_or(ProcessError::RequestNotFound(request_id))?;
  if req.state != RequestState::Pending {
    return Err(ProcessError::NotCancellable(request_id, req.state));
  }

  if !ctx.relational.delete_pending_request(request_id)? {
    // Un worker la reclamó entre la lectura y el borrado.
    let now = ctx.relational.get_request(request_id)?.map(|r| r.state).unwrap_or(RequestState::InProgress);
    return Err(ProcessError::NotCancellable(request_id, now));
  }

  match ctx.queue.purge(request_id) {
    Ok(n) => log::info!("solicitud {} cancelada ({} entradas quitadas de la cola)", request_id, n),
    Err(e) => log::warn!("solicitud {} cancelada pero la cola no respondió: {}", request_id, e),
  }
  Ok(())
}

/// Ids en la cola, en el orden en que se van a extraer.
pub fn list_pending_identifiers(ctx: &StoreContext, limit: usize) -> Result<Vec<RequestId>> {
  Ok(ctx.queue.peek(limit)?)
}
