use crate::connection::{from_ts, parse_uuid, to_ts, DbConn, DbPool, PResult, PersistenceError, PooledConn};
use crate::schema;
use crate::schema::cuentas_corrientes::dsl as cuentas_dsl;
use crate::schema::facturas::dsl as facturas_dsl;
use crate::schema::facturas_detalle::dsl as detalle_dsl;
use crate::schema::movimientos_cuenta::dsl as mov_dsl;
use crate::schema::procesos::dsl as procesos_dsl;
use crate::schema::sensores::dsl as sensores_dsl;
use crate::schema::solicitudes::dsl as sol_dsl;
use diesel::prelude::*;
use sensor_domain::{Account, DomainError, Invoice, InvoiceDraft, InvoiceLine, LedgerMovement, ProcessDefinition, ProcessId,
                    ProcessKind, RelationalStore, Request, RequestId, RequestState, Result, Sensor, UserId};
use std::sync::Arc;

/// Repo Diesel que implementa `RelationalStore`.
#[derive(Clone)]
pub struct DieselRelationalStore {
  pool: Arc<DbPool>,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::procesos)]
struct ProcesoRow {
  pub id: i64,
  pub nombre: String,
  pub descripcion: Option<String>,
  pub tipo: String,
  pub costo: f64,
  pub habilitado: bool,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::solicitudes)]
struct SolicitudRow {
  pub id: String,
  pub usuario_id: i64,
  pub proceso_id: i64,
  pub parametros: String,
  pub estado: String,
  pub fecha_solicitud_ts: i64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::sensores)]
struct SensorRow {
  pub id: i64,
  pub nombre: String,
  pub ciudad: String,
  pub pais: String,
  pub estado: String,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::cuentas_corrientes)]
struct CuentaRow {
  pub usuario_id: i64,
  pub saldo: f64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::facturas)]
struct FacturaRow {
  pub id: String,
  pub usuario_id: i64,
  pub fecha_emision_ts: i64,
  pub fecha_vencimiento_ts: i64,
  pub total: f64,
  pub estado: String,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::facturas_detalle)]
struct DetalleRow {
  pub id: String,
  pub factura_id: String,
  pub solicitud_id: String,
  pub concepto: String,
  pub monto: f64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::movimientos_cuenta)]
struct MovimientoRow {
  pub id: String,
  pub usuario_id: i64,
  pub tipo: String,
  pub monto: f64,
  pub concepto: String,
  pub factura_id: Option<String>,
  pub saldo_posterior: f64,
  pub fecha_ts: i64,
}

impl ProcesoRow {
  fn into_domain(self) -> PResult<ProcessDefinition> {
    let kind: ProcessKind = self.tipo.parse()?;
    Ok(ProcessDefinition { id: self.id,
                           name: self.nombre,
                           description: self.descripcion,
                           kind,
                           price: self.costo,
                           enabled: self.habilitado })
  }
}

impl SolicitudRow {
  fn from_domain(r: &Request) -> Self {
    Self { id: r.id.to_string(),
           usuario_id: r.user_id,
           proceso_id: r.process_id,
           parametros: r.params.to_string(),
           estado: r.state.as_str().to_string(),
           fecha_solicitud_ts: to_ts(r.created_at) }
  }

  fn into_domain(self) -> PResult<Request> {
    Ok(Request { id: parse_uuid(&self.id, "solicitudes.id")?,
                 user_id: self.usuario_id,
                 process_id: self.proceso_id,
                 params: serde_json::from_str(&self.parametros).map_err(|e| PersistenceError::Corrupt("solicitudes.parametros", e.to_string()))?,
                 state: self.estado.parse()?,
                 created_at: from_ts(self.fecha_solicitud_ts, "solicitudes.fecha_solicitud_ts")? })
  }
}

impl From<SensorRow> for Sensor {
  fn from(r: SensorRow) -> Self {
    Sensor { id: r.id,
             name: r.nombre,
             city: r.ciudad,
             country: r.pais,
             status: r.estado }
  }
}

impl DetalleRow {
  fn into_domain(self) -> PResult<InvoiceLine> {
    Ok(InvoiceLine { id: parse_uuid(&self.id, "facturas_detalle.id")?,
                     invoice_id: parse_uuid(&self.factura_id, "facturas_detalle.factura_id")?,
                     request_id: parse_uuid(&self.solicitud_id, "facturas_detalle.solicitud_id")?,
                     concept: self.concepto,
                     amount: self.monto })
  }
}

impl MovimientoRow {
  fn from_domain(m: &LedgerMovement) -> Self {
    Self { id: m.id.to_string(),
           usuario_id: m.user_id,
           tipo: m.kind.as_str().to_string(),
           monto: m.amount,
           concepto: m.concept.clone(),
           factura_id: m.invoice_id.map(|i| i.to_string()),
           saldo_posterior: m.balance_after,
           fecha_ts: to_ts(m.created_at) }
  }

  fn into_domain(self) -> PResult<LedgerMovement> {
    let invoice_id = match self.factura_id {
      Some(raw) => Some(parse_uuid(&raw, "movimientos_cuenta.factura_id")?),
      None => None,
    };
    Ok(LedgerMovement { id: parse_uuid(&self.id, "movimientos_cuenta.id")?,
                        user_id: self.usuario_id,
                        kind: self.tipo.parse()?,
                        amount: self.monto,
                        concept: self.concepto,
                        invoice_id,
                        balance_after: self.saldo_posterior,
                        created_at: from_ts(self.fecha_ts, "movimientos_cuenta.fecha_ts")? })
  }
}

fn insert_invoice(conn: &mut DbConn, draft: InvoiceDraft) -> PResult<(Invoice, LedgerMovement)> {
  let user_id = draft.user_id;
  let account = cuentas_dsl::cuentas_corrientes.filter(cuentas_dsl::usuario_id.eq(user_id))
                                               .first::<CuentaRow>(conn)
                                               .optional()?
                                               .ok_or(DomainError::AccountNotFound(user_id))?;
  let invoice = draft.into_invoice(sensor_domain::now_micros())?;
  let movement = LedgerMovement::debit_for(&invoice, account.saldo);
  let id_s = invoice.id.to_string();
  let factura = FacturaRow { id: id_s.clone(),
                             usuario_id: user_id,
                             fecha_emision_ts: to_ts(invoice.issued_at),
                             fecha_vencimiento_ts: to_ts(invoice.due_at),
                             total: invoice.total,
                             estado: invoice.state.as_str().to_string() };
  diesel::insert_into(facturas_dsl::facturas).values(&factura).execute(conn)?;
  let detalles: Vec<DetalleRow> = invoice.lines
                                         .iter()
                                         .map(|l| DetalleRow { id: l.id.to_string(),
                                                               factura_id: id_s.clone(),
                                                               solicitud_id: l.request_id.to_string(),
                                                               concepto: l.concept.clone(),
                                                               monto: l.amount })
                                         .collect();
  for d in &detalles {
    diesel::insert_into(detalle_dsl::facturas_detalle).values(d).execute(conn)?;
  }
  diesel::insert_into(mov_dsl::movimientos_cuenta).values(&MovimientoRow::from_domain(&movement))
                                                 .execute(conn)?;
  diesel::update(cuentas_dsl::cuentas_corrientes.filter(cuentas_dsl::usuario_id.eq(user_id)))
    .set(cuentas_dsl::saldo.eq(movement.balance_after))
    .execute(conn)?;
  Ok((invoice, movement))
}

impl DieselRelationalStore {
  pub fn new(pool: Arc<DbPool>) -> Self {
    Self { pool }
  }

  fn conn(&self) -> PResult<PooledConn> {
    Ok(self.pool.get()?)
  }

  /// Alta o reemplazo de una entrada del catálogo.
  pub fn upsert_process(&self, def: &ProcessDefinition) -> Result<()> {
    let mut conn = self.conn()?;
    let row = ProcesoRow { id: def.id,
                           nombre: def.name.clone(),
                           descripcion: def.description.clone(),
                           tipo: def.kind.as_str().to_string(),
                           costo: def.price,
                           habilitado: def.enabled };
    let updated = diesel::update(procesos_dsl::procesos.filter(procesos_dsl::id.eq(def.id)))
      .set((procesos_dsl::nombre.eq(&row.nombre),
            procesos_dsl::descripcion.eq(&row.descripcion),
            procesos_dsl::tipo.eq(&row.tipo),
            procesos_dsl::costo.eq(row.costo),
            procesos_dsl::habilitado.eq(row.habilitado)))
      .execute(&mut conn)
      .map_err(PersistenceError::from)?;
    if updated == 0 {
      diesel::insert_into(procesos_dsl::procesos).values(&row)
                                                 .execute(&mut conn)
                                                 .map_err(PersistenceError::from)?;
    }
    Ok(())
  }

  pub fn insert_sensor(&self, sensor: &Sensor) -> Result<()> {
    let mut conn = self.conn()?;
    let row = SensorRow { id: sensor.id,
                          nombre: sensor.name.clone(),
                          ciudad: sensor.city.clone(),
                          pais: sensor.country.clone(),
                          estado: sensor.status.clone() };
    diesel::insert_into(sensores_dsl::sensores).values(&row)
                                               .execute(&mut conn)
                                               .map_err(PersistenceError::from)?;
    Ok(())
  }

  pub fn open_account(&self, user_id: UserId, balance: f64) -> Result<()> {
    let mut conn = self.conn()?;
    diesel::insert_into(cuentas_dsl::cuentas_corrientes).values(&CuentaRow { usuario_id: user_id, saldo: balance })
                                                        .execute(&mut conn)
                                                        .map_err(PersistenceError::from)?;
    Ok(())
  }

  fn load_invoice(conn: &mut DbConn, row: FacturaRow) -> PResult<Invoice> {
    let lines = detalle_dsl::facturas_detalle.filter(detalle_dsl::factura_id.eq(&row.id))
                                             .order(detalle_dsl::id.asc())
                                             .load::<DetalleRow>(conn)?
                                             .into_iter()
                                             .map(DetalleRow::into_domain)
                                             .collect::<PResult<Vec<_>>>()?;
    Ok(Invoice { id: parse_uuid(&row.id, "facturas.id")?,
                 user_id: row.usuario_id,
                 issued_at: from_ts(row.fecha_emision_ts, "facturas.fecha_emision_ts")?,
                 due_at: from_ts(row.fecha_vencimiento_ts, "facturas.fecha_vencimiento_ts")?,
                 total: row.total,
                 state: row.estado.parse()?,
                 lines })
  }
}

impl RelationalStore for DieselRelationalStore {
  fn get_process(&self, id: ProcessId) -> Result<Option<ProcessDefinition>> {
    let mut conn = self.conn()?;
    let row = procesos_dsl::procesos.filter(procesos_dsl::id.eq(id))
                                    .first::<ProcesoRow>(&mut conn)
                                    .optional()
                                    .map_err(PersistenceError::from)?;
    Ok(row.map(ProcesoRow::into_domain).transpose()?)
  }

  fn list_processes(&self, only_enabled: bool) -> Result<Vec<ProcessDefinition>> {
    let mut conn = self.conn()?;
    let mut query = procesos_dsl::procesos.into_boxed();
    if only_enabled {
      query = query.filter(procesos_dsl::habilitado.eq(true));
    }
    let rows = query.order((procesos_dsl::nombre.asc(), procesos_dsl::id.asc()))
                    .load::<ProcesoRow>(&mut conn)
                    .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(ProcesoRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }

  fn insert_request(&self, request: &Request) -> Result<()> {
    let mut conn = self.conn()?;
    diesel::insert_into(sol_dsl::solicitudes).values(&SolicitudRow::from_domain(request))
                                             .execute(&mut conn)
                                             .map_err(PersistenceError::from)?;
    Ok(())
  }

  fn get_request(&self, id: RequestId) -> Result<Option<Request>> {
    let mut conn = self.conn()?;
    let row = sol_dsl::solicitudes.filter(sol_dsl::id.eq(id.to_string()))
                                  .first::<SolicitudRow>(&mut conn)
                                  .optional()
                                  .map_err(PersistenceError::from)?;
    Ok(row.map(SolicitudRow::into_domain).transpose()?)
  }

  fn delete_pending_request(&self, id: RequestId) -> Result<bool> {
    let mut conn = self.conn()?;
    let n = diesel::delete(sol_dsl::solicitudes.filter(sol_dsl::id.eq(id.to_string()))
                                               .filter(sol_dsl::estado.eq(RequestState::Pending.as_str())))
      .execute(&mut conn)
      .map_err(PersistenceError::from)?;
    Ok(n == 1)
  }

  fn transition_request(&self, id: RequestId, from: RequestState, to: RequestState) -> Result<bool> {
    if !from.can_transition_to(to) {
      return Err(DomainError::ValidationError(format!("Transición inválida {} -> {}", from, to)));
    }
    let mut conn = self.conn()?;
    // UPDATE ... WHERE estado = from: la fila sólo cambia si nadie la movió
    // antes.
    let n = diesel::update(sol_dsl::solicitudes.filter(sol_dsl::id.eq(id.to_string()))
                                               .filter(sol_dsl::estado.eq(from.as_str())))
      .set(sol_dsl::estado.eq(to.as_str()))
      .execute(&mut conn)
      .map_err(PersistenceError::from)?;
    Ok(n == 1)
  }

  fn list_requests_by_state(&self, state: RequestState) -> Result<Vec<Request>> {
    let mut conn = self.conn()?;
    let rows = sol_dsl::solicitudes.filter(sol_dsl::estado.eq(state.as_str()))
                                   .order(sol_dsl::fecha_solicitud_ts.asc())
                                   .load::<SolicitudRow>(&mut conn)
                                   .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(SolicitudRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }

  fn list_user_requests(&self, user_id: UserId, state: Option<RequestState>, limit: usize) -> Result<Vec<Request>> {
    let mut conn = self.conn()?;
    let mut query = sol_dsl::solicitudes.filter(sol_dsl::usuario_id.eq(user_id)).into_boxed();
    if let Some(st) = state {
      query = query.filter(sol_dsl::estado.eq(st.as_str()));
    }
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = query.order(sol_dsl::fecha_solicitud_ts.desc())
                    .limit(limit)
                    .load::<SolicitudRow>(&mut conn)
                    .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(SolicitudRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }

  fn count_user_requests(&self, user_id: UserId) -> Result<Vec<(RequestState, u64)>> {
    let mut conn = self.conn()?;
    let rows = sol_dsl::solicitudes.filter(sol_dsl::usuario_id.eq(user_id))
                                   .group_by(sol_dsl::estado)
                                   .select((sol_dsl::estado, diesel::dsl::count_star()))
                                   .load::<(String, i64)>(&mut conn)
                                   .map_err(PersistenceError::from)?;
    let mut out = Vec::with_capacity(rows.len());
    for (estado, n) in rows {
      out.push((estado.parse::<RequestState>()?, n.max(0) as u64));
    }
    out.sort_by_key(|(st, _)| RequestState::ALL.iter().position(|s| s == st));
    Ok(out)
  }

  fn find_sensors_by_zone(&self, fragment: &str) -> Result<Vec<Sensor>> {
    let mut conn = self.conn()?;
    // LIKE distingue mayúsculas en Postgres y no entiende acentos en SQLite;
    // el directorio es chico, se filtra en memoria.
    let rows = sensores_dsl::sensores.order(sensores_dsl::id.asc())
                                     .load::<SensorRow>(&mut conn)
                                     .map_err(PersistenceError::from)?;
    Ok(rows.into_iter()
           .map(Sensor::from)
           .filter(|s| s.matches_zone(fragment))
           .collect())
  }

  fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
    let mut conn = self.conn()?;
    let row = cuentas_dsl::cuentas_corrientes.filter(cuentas_dsl::usuario_id.eq(user_id))
                                             .first::<CuentaRow>(&mut conn)
                                             .optional()
                                             .map_err(PersistenceError::from)?;
    Ok(row.map(|r| Account { user_id: r.usuario_id, balance: r.saldo }))
  }

  fn record_invoice(&self, draft: InvoiceDraft) -> Result<(Invoice, LedgerMovement)> {
    let mut conn = self.conn()?;
    let out = conn.transaction::<_, PersistenceError, _>(|c| insert_invoice(c, draft))?;
    log::info!("factura {} registrada para usuario {} por {:.2}", out.0.id, out.0.user_id, out.0.total);
    Ok(out)
  }

  fn list_invoices(&self, user_id: UserId) -> Result<Vec<Invoice>> {
    let mut conn = self.conn()?;
    let rows = facturas_dsl::facturas.filter(facturas_dsl::usuario_id.eq(user_id))
                                     .order(facturas_dsl::fecha_emision_ts.asc())
                                     .load::<FacturaRow>(&mut conn)
                                     .map_err(PersistenceError::from)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      out.push(Self::load_invoice(&mut conn, row)?);
    }
    Ok(out)
  }

  fn invoice_lines_for_request(&self, request_id: RequestId) -> Result<Vec<InvoiceLine>> {
    let mut conn = self.conn()?;
    let rows = detalle_dsl::facturas_detalle.filter(detalle_dsl::solicitud_id.eq(request_id.to_string()))
                                            .load::<DetalleRow>(&mut conn)
                                            .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(DetalleRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }

  fn movements_for_account(&self, user_id: UserId) -> Result<Vec<LedgerMovement>> {
    let mut conn = self.conn()?;
    let rows = mov_dsl::movimientos_cuenta.filter(mov_dsl::usuario_id.eq(user_id))
                                          .order(mov_dsl::fecha_ts.asc())
                                          .load::<MovimientoRow>(&mut conn)
                                          .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(MovimientoRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }
}
