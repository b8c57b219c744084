#![allow(dead_code)]
use chrono::{DateTime, TimeZone, Utc};
use process_engine::{EngineConfig, StoreContext};
use sensor_domain::{DocumentStore, ExecutionResult, InMemoryDocumentStore, InMemoryRelationalStore, Measurement,
                    MeasurementFilter, ProcessId, ProcessKind, RequestId, Sensor, SensorId, Alert};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use work_queue::{InMemoryPendingQueue, PendingQueue, QueueError};

pub const USER: i64 = 7;
pub const OTHER_USER: i64 = 8;

pub const EXTREMA: ProcessId = 1;
pub const ALERTS: ProcessId = 2;
pub const ONLINE: ProcessId = 3;
pub const AVERAGE: ProcessId = 4;
pub const HUMIDITY_AVERAGE: ProcessId = 5;
pub const DISABLED: ProcessId = 9;

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Cola en memoria que puede fallar a pedido.
#[derive(Default)]
pub struct FlakyQueue {
  inner: InMemoryPendingQueue,
  pub failing: AtomicBool,
}

impl FlakyQueue {
  pub fn set_failing(&self, on: bool) {
    self.failing.store(on, Ordering::SeqCst);
  }

  fn check(&self) -> work_queue::Result<()> {
    if self.failing.load(Ordering::SeqCst) {
      Err(QueueError::Unavailable("cola caída".into()))
    } else {
      Ok(())
    }
  }
}

impl PendingQueue for FlakyQueue {
  fn enqueue(&self, id: Uuid) -> work_queue::Result<()> {
    self.check()?;
    self.inner.enqueue(id)
  }
  fn peek(&self, limit: usize) -> work_queue::Result<Vec<Uuid>> {
    self.check()?;
    self.inner.peek(limit)
  }
  fn dequeue_one(&self) -> work_queue::Result<Option<Uuid>> {
    self.check()?;
    self.inner.dequeue_one()
  }
  fn remove(&self, id: Uuid) -> work_queue::Result<bool> {
    self.check()?;
    self.inner.remove(id)
  }
  fn len(&self) -> work_queue::Result<usize> {
    self.check()?;
    self.inner.len()
  }
}

/// Almacén de documentos cuyo historial o lecturas de mediciones pueden fallar.
#[derive(Default)]
pub struct FlakyDocuments {
  inner: InMemoryDocumentStore,
  pub failing_appends: AtomicBool,
  pub failing_reads: AtomicBool,
}

impl DocumentStore for FlakyDocuments {
  fn insert_measurement(&self, m: &Measurement) -> sensor_domain::Result<()> {
    self.inner.insert_measurement(m)
  }
  fn find_measurements(&self, filter: &MeasurementFilter) -> sensor_domain::Result<Vec<Measurement>> {
    if self.failing_reads.load(Ordering::SeqCst) {
      return Err(sensor_domain::DomainError::StorageError("blip".into()));
    }
    self.inner.find_measurements(filter)
  }
  fn latest_measurement(&self, sensor_id: SensorId) -> sensor_domain::Result<Option<Measurement>> {
    self.inner.latest_measurement(sensor_id)
  }
  fn insert_alert(&self, alert: &Alert) -> sensor_domain::Result<()> {
    self.inner.insert_alert(alert)
  }
  fn list_alerts(&self, sensor_id: Option<SensorId>) -> sensor_domain::Result<Vec<Alert>> {
    self.inner.list_alerts(sensor_id)
  }
  fn append_result(&self, result: &ExecutionResult) -> sensor_domain::Result<()> {
    if self.failing_appends.load(Ordering::SeqCst) {
      return Err(sensor_domain::DomainError::StorageError("historial caído".into()));
    }
    self.inner.append_result(result)
  }
  fn results_for_request(&self, request_id: RequestId) -> sensor_domain::Result<Vec<ExecutionResult>> {
    self.inner.results_for_request(request_id)
  }
}

pub struct Fixture {
  pub relational: Arc<InMemoryRelationalStore>,
  pub documents: Arc<FlakyDocuments>,
  pub queue: Arc<FlakyQueue>,
  pub ctx: StoreContext,
  pub config: EngineConfig,
}

pub fn seed_catalog(store: &InMemoryRelationalStore) {
  store.insert_process(EXTREMA, "Informe max/min", ProcessKind::ReportExtrema, 50.0, true);
  store.insert_process(ALERTS, "Alertas por rango", ProcessKind::AlertThresholdScan, 20.0, true);
  store.insert_process(ONLINE, "Consulta online", ProcessKind::OnlineQuery, 12.34, true);
  store.insert_process(AVERAGE, "Informe promedio", ProcessKind::ReportAverage, 30.0, true);
  store.insert_process(HUMIDITY_AVERAGE, "Humedad promedio", ProcessKind::HumidityAverage, 30.0, true);
  store.insert_process(DISABLED, "Proceso retirado", ProcessKind::ReportExtrema, 5.0, false);
  store.insert_sensor(Sensor { id: 1, name: "S-ROS-1".into(), city: "Rosario".into(), country: "Argentina".into(), status: "activo".into() });
  store.insert_sensor(Sensor { id: 2, name: "S-COR-1".into(), city: "Córdoba".into(), country: "Argentina".into(), status: "activo".into() });
  store.insert_sensor(Sensor { id: 3, name: "S-LIM-1".into(), city: "Lima".into(), country: "Perú".into(), status: "inactivo".into() });
}

/// Mediciones del sensor 1 en Rosario: tres en enero y una en febrero.
pub fn seed_measurements(docs: &dyn DocumentStore) {
  for (temp, hum, ts) in [(35.0, 40.0, day(2024, 1, 5)),
                          (20.0, 60.0, day(2024, 1, 10)),
                          (-5.0, 80.0, day(2024, 1, 20)),
                          (10.0, 50.0, day(2024, 2, 3))]
  {
    docs.insert_measurement(&Measurement::new(1, "Rosario", "Argentina", temp, hum, ts)).unwrap();
  }
  docs.insert_measurement(&Measurement::new(3, "Lima", "Perú", 18.5, 77.0, day(2024, 1, 6))).unwrap();
}

pub fn fixture() -> Fixture {
  let relational = Arc::new(InMemoryRelationalStore::new());
  let documents = Arc::new(FlakyDocuments::default());
  let queue = Arc::new(FlakyQueue::default());
  seed_catalog(&relational);
  seed_measurements(documents.as_ref());
  relational.open_account(USER, 100.0);
  let ctx = StoreContext::new(relational.clone(), documents.clone(), queue.clone());
  Fixture { relational, documents, queue, ctx, config: EngineConfig::default() }
}
