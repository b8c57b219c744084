//! Disparador de facturación: una factura con una línea por solicitud
//! completada y el débito correspondiente en la cuenta del usuario.
use crate::config::EngineConfig;
use crate::context::StoreContext;
use crate::errors::{ProcessError, Result};
use sensor_domain::{Invoice, InvoiceDraft, InvoiceLineDraft, LedgerMovement, RequestId, RequestState, UserId};

/// Factura y movimiento registrados juntos.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingRecord {
  pub invoice: Invoice,
  pub movement: LedgerMovement,
}

/// Factura las solicitudes `Completed` de `user_id` en una sola factura.
///
/// El concepto de cada línea es el nombre del proceso y el importe su
/// precio de catálogo. Falla sin escribir nada si alguna solicitud no es
/// del usuario, no está completada o ya tiene línea de factura.
pub fn bill_completed(ctx: &StoreContext, config: &EngineConfig, user_id: UserId, request_ids: &[RequestId])
                      -> Result<BillingRecord> {
  let mut ids: Vec<RequestId> = Vec::with_capacity(request_ids.len());
  for id in request_ids {
    if !ids.contains(id) {
      ids.push(*id);
    }
  }
  if ids.is_empty() {
    return Err(ProcessError::NothingToBill);
  }

  let mut lines = Vec::with_capacity(ids.len());
  for id in ids {
    let req = ctx.relational
                 .get_request(id)?
                 .ok_or_else(|| ProcessError::NotBillable(id, "no existe".into()))?;
    if req.user_id != user_id {
      return Err(ProcessError::NotBillable(id, format!("pertenece al usuario {}", req.user_id)));
    }
    if req.state != RequestState::Completed {
      return Err(ProcessError::NotBillable(id, format!("estado {}", req.state)));
    }
    if !ctx.relational.invoice_lines_for_request(id)?.is_empty() {
      return Err(ProcessError::AlreadyBilled(id));
    }
    let def = ctx.relational
                 .get_process(req.process_id)?
                 .ok_or_else(|| ProcessError::NotBillable(id, format!("proceso {} sin precio", req.process_id)))?;
    lines.push(InvoiceLineDraft { request_id: id, concept: def.name, amount: def.price });
  }

  let draft = InvoiceDraft { user_id, lines, due_in_days: config.invoice_due_days };
  let (invoice, movement) = ctx.relational.record_invoice(draft)?;
  log::info!("factura {} para usuario {}: total {:.2}, saldo {:.2}",
             invoice.id,
             user_id,
             invoice.total,
             movement.balance_after);
  Ok(BillingRecord { invoice, movement })
}
