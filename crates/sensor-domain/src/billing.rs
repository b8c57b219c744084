// billing.rs
//
// Facturas, líneas de detalle, movimientos y cuentas corrientes. El registro
// atómico de factura + débito vive en `RelationalStore::record_invoice`.
use crate::errors::DomainError;
use crate::numeric::round2;
use crate::{RequestId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceState {
  #[serde(rename = "pendiente")]
  Pending,
  #[serde(rename = "pagada")]
  Paid,
}

impl InvoiceState {
  pub fn as_str(&self) -> &'static str {
    match self {
      InvoiceState::Pending => "pendiente",
      InvoiceState::Paid => "pagada",
    }
  }
}

impl FromStr for InvoiceState {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pendiente" => Ok(InvoiceState::Pending),
      "pagada" => Ok(InvoiceState::Paid),
      other => Err(DomainError::ValidationError(format!("Estado de factura inválido: {}", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
  #[serde(rename = "debito")]
  Debit,
  #[serde(rename = "credito")]
  Credit,
}

impl MovementKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      MovementKind::Debit => "debito",
      MovementKind::Credit => "credito",
    }
  }
}

impl fmt::Display for MovementKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for MovementKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "debito" => Ok(MovementKind::Debit),
      "credito" => Ok(MovementKind::Credit),
      other => Err(DomainError::ValidationError(format!("Tipo de movimiento inválido: {}", other))),
    }
  }
}

/// Cuenta corriente de un usuario. El saldo baja con cada débito.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
  pub user_id: UserId,
  pub balance: f64,
}

/// Línea a facturar, antes de tener factura asignada.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLineDraft {
  pub request_id: RequestId,
  /// Nombre del proceso ejecutado.
  pub concept: String,
  pub amount: f64,
}

/// Factura a registrar: se materializa junto con su débito en una sola
/// operación del almacén.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
  pub user_id: UserId,
  pub lines: Vec<InvoiceLineDraft>,
  pub due_in_days: i64,
}

impl InvoiceDraft {
  pub fn total(&self) -> f64 {
    round2(self.lines.iter().map(|l| l.amount).sum())
  }

  /// Materializa la factura con ids nuevos y fecha de emisión `now`.
  ///
  /// Falla con `ValidationError` si el vencimiento cae fuera del rango de fechas.
  pub fn into_invoice(self, now: DateTime<Utc>) -> crate::errors::Result<Invoice> {
    let due_at = Duration::try_days(self.due_in_days).and_then(|d| now.checked_add_signed(d))
                                                      .ok_or_else(|| {
                                                        DomainError::ValidationError(format!("vencimiento fuera de rango: {} días",
                                                                                             self.due_in_days))
                                                      })?;
    let id = Uuid::new_v4();
    let total = self.total();
    let lines = self.lines
                    .into_iter()
                    .map(|l| InvoiceLine { id: Uuid::new_v4(),
                                           invoice_id: id,
                                           request_id: l.request_id,
                                           concept: l.concept,
                                           amount: round2(l.amount) })
                    .collect();
    Ok(Invoice { id,
                 user_id: self.user_id,
                 issued_at: now,
                 due_at,
                 total,
                 state: InvoiceState::Pending,
                 lines })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub request_id: RequestId,
  pub concept: String,
  pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: Uuid,
  pub user_id: UserId,
  pub issued_at: DateTime<Utc>,
  pub due_at: DateTime<Utc>,
  pub total: f64,
  pub state: InvoiceState,
  pub lines: Vec<InvoiceLine>,
}

/// Movimiento de cuenta corriente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMovement {
  pub id: Uuid,
  pub user_id: UserId,
  pub kind: MovementKind,
  pub amount: f64,
  pub concept: String,
  pub invoice_id: Option<Uuid>,
  pub balance_after: f64,
  pub created_at: DateTime<Utc>,
}

impl LedgerMovement {
  /// Débito por el total de `invoice`, dado el saldo previo de la cuenta.
  pub fn debit_for(invoice: &Invoice, balance_before: f64) -> Self {
    Self { id: Uuid::new_v4(),
           user_id: invoice.user_id,
           kind: MovementKind::Debit,
           amount: invoice.total,
           concept: format!("Factura #{}", invoice.id),
           invoice_id: Some(invoice.id),
           balance_after: round2(balance_before - invoice.total),
           created_at: invoice.issued_at }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn draft_materializes_with_due_date_and_total() {
    let now = Utc::now();
    let draft = InvoiceDraft { user_id: 3,
                               lines: vec![InvoiceLineDraft { request_id: Uuid::new_v4(),
                                                              concept: "Informe promedio".into(),
                                                              amount: 50.0 },
                                           InvoiceLineDraft { request_id: Uuid::new_v4(),
                                                              concept: "Consulta online".into(),
                                                              amount: 12.34 }],
                               due_in_days: 30 };
    let invoice = draft.into_invoice(now).unwrap();
    assert_eq!(invoice.total, 62.34);
    assert_eq!(invoice.state, InvoiceState::Pending);
    assert_eq!(invoice.due_at - invoice.issued_at, Duration::days(30));
    assert!(invoice.lines.iter().all(|l| l.invoice_id == invoice.id));

    let mov = LedgerMovement::debit_for(&invoice, 100.0);
    assert_eq!(mov.kind, MovementKind::Debit);
    assert_eq!(mov.amount, 62.34);
    assert_eq!(mov.balance_after, 37.66);
    assert_eq!(mov.concept, format!("Factura #{}", invoice.id));
  }

  #[test]
  fn out_of_range_due_date_is_rejected() {
    let draft = InvoiceDraft { user_id: 3, lines: vec![], due_in_days: 1_000_000_000 };
    assert!(matches!(draft.into_invoice(Utc::now()), Err(DomainError::ValidationError(_))));
  }
}
