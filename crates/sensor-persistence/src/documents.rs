use crate::connection::{from_ts, parse_uuid, to_ts, DbPool, PResult, PersistenceError, PooledConn};
use crate::schema;
use crate::schema::alertas::dsl as alertas_dsl;
use crate::schema::historial_ejecucion::dsl as hist_dsl;
use crate::schema::mediciones::dsl as med_dsl;
use diesel::prelude::*;
use sensor_domain::{Alert, DocumentStore, ExecutionResult, Measurement, MeasurementFilter, RequestId, Result, SensorId};
use std::sync::Arc;

/// Almacén de documentos sobre tablas Diesel. El payload de cada resultado
/// se guarda como JSON en texto.
#[derive(Clone)]
pub struct DieselDocumentStore {
  pool: Arc<DbPool>,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::mediciones)]
struct MedicionRow {
  pub id: String,
  pub sensor_id: i64,
  pub ciudad: String,
  pub pais: String,
  pub temperatura: f64,
  pub humedad: f64,
  pub timestamp_ts: i64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::alertas)]
struct AlertaRow {
  pub id: String,
  pub tipo: String,
  pub sensor_id: i64,
  pub timestamp_ts: i64,
  pub descripcion: String,
  pub estado: String,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::historial_ejecucion)]
struct HistorialRow {
  pub id: String,
  pub solicitud_id: String,
  pub fecha_ejecucion_ts: i64,
  pub resultado: String,
  pub completado: bool,
  pub reejecucion: bool,
}

impl MedicionRow {
  fn into_domain(self) -> PResult<Measurement> {
    Ok(Measurement { id: parse_uuid(&self.id, "mediciones.id")?,
                     sensor_id: self.sensor_id,
                     city: self.ciudad,
                     country: self.pais,
                     temperature: self.temperatura,
                     humidity: self.humedad,
                     timestamp: from_ts(self.timestamp_ts, "mediciones.timestamp_ts")? })
  }
}

impl AlertaRow {
  fn into_domain(self) -> PResult<Alert> {
    Ok(Alert { id: parse_uuid(&self.id, "alertas.id")?,
               kind: self.tipo,
               sensor_id: self.sensor_id,
               timestamp: from_ts(self.timestamp_ts, "alertas.timestamp_ts")?,
               description: self.descripcion,
               state: self.estado })
  }
}

impl HistorialRow {
  fn into_domain(self) -> PResult<ExecutionResult> {
    let payload =
      serde_json::from_str(&self.resultado).map_err(|e| PersistenceError::Corrupt("historial_ejecucion.resultado", e.to_string()))?;
    Ok(ExecutionResult { id: parse_uuid(&self.id, "historial_ejecucion.id")?,
                         request_id: parse_uuid(&self.solicitud_id, "historial_ejecucion.solicitud_id")?,
                         executed_at: from_ts(self.fecha_ejecucion_ts, "historial_ejecucion.fecha_ejecucion_ts")?,
                         payload,
                         completed: self.completado,
                         reexecution: self.reejecucion })
  }
}

impl DieselDocumentStore {
  pub fn new(pool: Arc<DbPool>) -> Self {
    Self { pool }
  }

  fn conn(&self) -> PResult<PooledConn> {
    Ok(self.pool.get()?)
  }
}

impl DocumentStore for DieselDocumentStore {
  fn insert_measurement(&self, m: &Measurement) -> Result<()> {
    let mut conn = self.conn()?;
    let row = MedicionRow { id: m.id.to_string(),
                            sensor_id: m.sensor_id,
                            ciudad: m.city.clone(),
                            pais: m.country.clone(),
                            temperatura: m.temperature,
                            humedad: m.humidity,
                            timestamp_ts: to_ts(m.timestamp) };
    diesel::insert_into(med_dsl::mediciones).values(&row)
                                            .execute(&mut conn)
                                            .map_err(PersistenceError::from)?;
    Ok(())
  }

  fn find_measurements(&self, filter: &MeasurementFilter) -> Result<Vec<Measurement>> {
    let mut conn = self.conn()?;
    let mut query = med_dsl::mediciones.into_boxed();
    if let Some(city) = &filter.city {
      query = query.filter(med_dsl::ciudad.eq(city.clone()));
    }
    if let Some(country) = &filter.country {
      query = query.filter(med_dsl::pais.eq(country.clone()));
    }
    if let Some(from) = filter.from {
      query = query.filter(med_dsl::timestamp_ts.ge(to_ts(from)));
    }
    if let Some(to) = filter.to {
      query = query.filter(med_dsl::timestamp_ts.le(to_ts(to)));
    }
    if let Some((min, max)) = filter.temperature_outside {
      query = query.filter(med_dsl::temperatura.lt(min).or(med_dsl::temperatura.gt(max)));
    }
    query = query.order(med_dsl::timestamp_ts.asc());
    if let Some(limit) = filter.limit {
      query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    let rows = query.load::<MedicionRow>(&mut conn).map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(MedicionRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }

  fn latest_measurement(&self, sensor_id: SensorId) -> Result<Option<Measurement>> {
    let mut conn = self.conn()?;
    let row = med_dsl::mediciones.filter(med_dsl::sensor_id.eq(sensor_id))
                                 .order(med_dsl::timestamp_ts.desc())
                                 .first::<MedicionRow>(&mut conn)
                                 .optional()
                                 .map_err(PersistenceError::from)?;
    Ok(row.map(MedicionRow::into_domain).transpose()?)
  }

  fn insert_alert(&self, alert: &Alert) -> Result<()> {
    let mut conn = self.conn()?;
    let row = AlertaRow { id: alert.id.to_string(),
                          tipo: alert.kind.clone(),
                          sensor_id: alert.sensor_id,
                          timestamp_ts: to_ts(alert.timestamp),
                          descripcion: alert.description.clone(),
                          estado: alert.state.clone() };
    diesel::insert_into(alertas_dsl::alertas).values(&row)
                                             .execute(&mut conn)
                                             .map_err(PersistenceError::from)?;
    Ok(())
  }

  fn list_alerts(&self, sensor_id: Option<SensorId>) -> Result<Vec<Alert>> {
    let mut conn = self.conn()?;
    let mut query = alertas_dsl::alertas.into_boxed();
    if let Some(s) = sensor_id {
      query = query.filter(alertas_dsl::sensor_id.eq(s));
    }
    let rows = query.order(alertas_dsl::timestamp_ts.asc())
                    .load::<AlertaRow>(&mut conn)
                    .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(AlertaRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }

  fn append_result(&self, result: &ExecutionResult) -> Result<()> {
    let mut conn = self.conn()?;
    let row = HistorialRow { id: result.id.to_string(),
                             solicitud_id: result.request_id.to_string(),
                             fecha_ejecucion_ts: to_ts(result.executed_at),
                             resultado: result.payload.to_string(),
                             completado: result.completed,
                             reejecucion: result.reexecution };
    // Sin upsert: un id repetido falla por clave primaria.
    diesel::insert_into(hist_dsl::historial_ejecucion).values(&row)
                                                      .execute(&mut conn)
                                                      .map_err(PersistenceError::from)?;
    Ok(())
  }

  fn results_for_request(&self, request_id: RequestId) -> Result<Vec<ExecutionResult>> {
    let mut conn = self.conn()?;
    let rows = hist_dsl::historial_ejecucion.filter(hist_dsl::solicitud_id.eq(request_id.to_string()))
                                            .order(hist_dsl::fecha_ejecucion_ts.asc())
                                            .load::<HistorialRow>(&mut conn)
                                            .map_err(PersistenceError::from)?;
    Ok(rows.into_iter().map(HistorialRow::into_domain).collect::<PResult<Vec<_>>>()?)
  }
}
