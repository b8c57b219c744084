// memory.rs
//
// Implementaciones en memoria de `RelationalStore` y `DocumentStore`.
// Cada operación compuesta toma un solo lock, lo que da la misma atomicidad
// que una transacción corta en el almacén real.
use crate::billing::{Account, Invoice, InvoiceDraft, InvoiceLine, LedgerMovement};
use crate::errors::{DomainError, Result};
use crate::execution::ExecutionResult;
use crate::measurement::{Alert, Measurement, MeasurementFilter, Sensor};
use crate::process::{ProcessDefinition, ProcessKind};
use crate::request::{Request, RequestState};
use crate::store::{DocumentStore, RelationalStore};
use crate::{ProcessId, RequestId, SensorId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Ledger {
    accounts: HashMap<UserId, Account>,
    invoices: Vec<Invoice>,
    movements: Vec<LedgerMovement>,
}

#[derive(Clone, Default)]
pub struct InMemoryRelationalStore {
    processes: Arc<Mutex<HashMap<ProcessId, ProcessDefinition>>>,
    requests: Arc<Mutex<Vec<Request>>>,
    sensors: Arc<Mutex<Vec<Sensor>>>,
    ledger: Arc<Mutex<Ledger>>,
}

fn lock_map<'a, T>(m: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>> {
    m.lock()
     .map_err(|e| DomainError::StorageError(format!("Mutex '{}' poisoned: {}", name, e)))
}

impl InMemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga una entrada de catálogo (semilla de pruebas/demos).
    pub fn insert_process(&self, id: ProcessId, name: &str, kind: ProcessKind, price: f64, enabled: bool) -> ProcessDefinition {
        let def = ProcessDefinition { id,
                                      name: name.to_string(),
                                      description: None,
                                      kind,
                                      price,
                                      enabled };
        let mut map = self.processes.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(id, def.clone());
        def
    }

    pub fn insert_sensor(&self, sensor: Sensor) {
        let mut sensors = self.sensors.lock().unwrap_or_else(|e| e.into_inner());
        sensors.retain(|s| s.id != sensor.id);
        sensors.push(sensor);
    }

    pub fn open_account(&self, user_id: UserId, balance: f64) {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.accounts.insert(user_id, Account { user_id, balance });
    }
}

impl RelationalStore for InMemoryRelationalStore {
    fn get_process(&self, id: ProcessId) -> Result<Option<ProcessDefinition>> {
        let map = lock_map(&self.processes, "processes")?;
        Ok(map.get(&id).cloned())
    }

    fn list_processes(&self, only_enabled: bool) -> Result<Vec<ProcessDefinition>> {
        let map = lock_map(&self.processes, "processes")?;
        let mut out: Vec<ProcessDefinition> = map.values().filter(|p| !only_enabled || p.enabled).cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn insert_request(&self, request: &Request) -> Result<()> {
        let mut reqs = lock_map(&self.requests, "requests")?;
        if reqs.iter().any(|r| r.id == request.id) {
            return Err(DomainError::ValidationError(format!("Solicitud duplicada: {}", request.id)));
        }
        reqs.push(request.clone());
        Ok(())
    }

    fn get_request(&self, id: RequestId) -> Result<Option<Request>> {
        let reqs = lock_map(&self.requests, "requests")?;
        Ok(reqs.iter().find(|r| r.id == id).cloned())
    }

    fn delete_pending_request(&self, id: RequestId) -> Result<bool> {
        let mut reqs = lock_map(&self.requests, "requests")?;
        match reqs.iter().position(|r| r.id == id && r.state == RequestState::Pending) {
            Some(pos) => {
                reqs.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn transition_request(&self, id: RequestId, from: RequestState, to: RequestState) -> Result<bool> {
        if !from.can_transition_to(to) {
            return Err(DomainError::ValidationError(format!("Transición inválida {} -> {}", from, to)));
        }
        let mut reqs = lock_map(&self.requests, "requests")?;
        match reqs.iter_mut().find(|r| r.id == id) {
            Some(r) if r.state == from => {
                r.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list_requests_by_state(&self, state: RequestState) -> Result<Vec<Request>> {
        let reqs = lock_map(&self.requests, "requests")?;
        let mut out: Vec<Request> = reqs.iter().filter(|r| r.state == state).cloned().collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    fn list_user_requests(&self, user_id: UserId, state: Option<RequestState>, limit: usize) -> Result<Vec<Request>> {
        let reqs = lock_map(&self.requests, "requests")?;
        // Orden de inserción invertido: desempata fechas iguales a favor de la
        // última registrada.
        let mut out: Vec<Request> = reqs.iter()
                                        .rev()
                                        .filter(|r| r.user_id == user_id && state.map_or(true, |s| r.state == s))
                                        .cloned()
                                        .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    fn count_user_requests(&self, user_id: UserId) -> Result<Vec<(RequestState, u64)>> {
        let reqs = lock_map(&self.requests, "requests")?;
        let mut counts: HashMap<RequestState, u64> = HashMap::new();
        for r in reqs.iter().filter(|r| r.user_id == user_id) {
            *counts.entry(r.state).or_insert(0) += 1;
        }
        Ok(RequestState::ALL.iter()
                            .filter_map(|s| counts.get(s).map(|c| (*s, *c)))
                            .collect())
    }

    fn find_sensors_by_zone(&self, fragment: &str) -> Result<Vec<Sensor>> {
        let sensors = lock_map(&self.sensors, "sensors")?;
        Ok(sensors.iter().filter(|s| s.matches_zone(fragment)).cloned().collect())
    }

    fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let ledger = lock_map(&self.ledger, "ledger")?;
        Ok(ledger.accounts.get(&user_id).cloned())
    }

    fn record_invoice(&self, draft: InvoiceDraft) -> Result<(Invoice, LedgerMovement)> {
        let mut ledger = lock_map(&self.ledger, "ledger")?;
        let user_id = draft.user_id;
        let balance = ledger.accounts
                            .get(&user_id)
                            .map(|a| a.balance)
                            .ok_or(DomainError::AccountNotFound(user_id))?;
        let invoice = draft.into_invoice(crate::numeric::now_micros())?;
        let movement = LedgerMovement::debit_for(&invoice, balance);
        if let Some(account) = ledger.accounts.get_mut(&user_id) {
            account.balance = movement.balance_after;
        }
        ledger.invoices.push(invoice.clone());
        ledger.movements.push(movement.clone());
        Ok((invoice, movement))
    }

    fn list_invoices(&self, user_id: UserId) -> Result<Vec<Invoice>> {
        let ledger = lock_map(&self.ledger, "ledger")?;
        Ok(ledger.invoices.iter().filter(|i| i.user_id == user_id).cloned().collect())
    }

    fn invoice_lines_for_request(&self, request_id: RequestId) -> Result<Vec<InvoiceLine>> {
        let ledger = lock_map(&self.ledger, "ledger")?;
        Ok(ledger.invoices
                 .iter()
                 .flat_map(|i| i.lines.iter())
                 .filter(|l| l.request_id == request_id)
                 .cloned()
                 .collect())
    }

    fn movements_for_account(&self, user_id: UserId) -> Result<Vec<LedgerMovement>> {
        let ledger = lock_map(&self.ledger, "ledger")?;
        Ok(ledger.movements.iter().filter(|m| m.user_id == user_id).cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    measurements: Arc<Mutex<Vec<Measurement>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
    results: Arc<Mutex<Vec<ExecutionResult>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert_measurement(&self, measurement: &Measurement) -> Result<()> {
        let mut ms = lock_map(&self.measurements, "measurements")?;
        ms.push(measurement.clone());
        Ok(())
    }

    fn find_measurements(&self, filter: &MeasurementFilter) -> Result<Vec<Measurement>> {
        let ms = lock_map(&self.measurements, "measurements")?;
        let mut out: Vec<Measurement> = ms.iter().filter(|m| filter.matches(m)).cloned().collect();
        out.sort_by_key(|m| m.timestamp);
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn latest_measurement(&self, sensor_id: SensorId) -> Result<Option<Measurement>> {
        let ms = lock_map(&self.measurements, "measurements")?;
        Ok(ms.iter()
             .filter(|m| m.sensor_id == sensor_id)
             .max_by_key(|m| m.timestamp)
             .cloned())
    }

    fn insert_alert(&self, alert: &Alert) -> Result<()> {
        let mut alerts = lock_map(&self.alerts, "alerts")?;
        alerts.push(alert.clone());
        Ok(())
    }

    fn list_alerts(&self, sensor_id: Option<SensorId>) -> Result<Vec<Alert>> {
        let alerts = lock_map(&self.alerts, "alerts")?;
        Ok(alerts.iter()
                 .filter(|a| sensor_id.map_or(true, |s| a.sensor_id == s))
                 .cloned()
                 .collect())
    }

    fn append_result(&self, result: &ExecutionResult) -> Result<()> {
        let mut results = lock_map(&self.results, "results")?;
        if results.iter().any(|r| r.id == result.id) {
            return Err(DomainError::ValidationError(format!("Resultado duplicado: {}", result.id)));
        }
        results.push(result.clone());
        Ok(())
    }

    fn results_for_request(&self, request_id: RequestId) -> Result<Vec<ExecutionResult>> {
        let results = lock_map(&self.results, "results")?;
        Ok(results.iter().filter(|r| r.request_id == request_id).cloned().collect())
    }
}
