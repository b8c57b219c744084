//! Crate `sensor-domain` — entidades y contratos de almacenamiento de la red
//! de sensores.
//!
//! Define los tipos que atraviesan el pipeline de solicitudes de proceso
//! (`ProcessDefinition`, `Request`, `ExecutionResult`, facturas y
//! movimientos de cuenta corriente), los dos contratos de almacenamiento
//! (`RelationalStore` para el almacén transaccional y `DocumentStore` para
//! mediciones, alertas e historial de ejecución) y sus implementaciones en
//! memoria, útiles para pruebas y demos.
//!
//! Ejemplo rápido:
//! ```rust
//! use sensor_domain::{InMemoryRelationalStore, ProcessKind, RelationalStore};
//! let store = InMemoryRelationalStore::new();
//! store.insert_process(1, "Informe max/min", ProcessKind::ReportExtrema, 50.0, true);
//! assert!(store.get_process(1).unwrap().is_some());
//! ```
mod billing;
mod errors;
mod execution;
mod measurement;
mod memory;
mod numeric;
mod process;
mod request;
mod store;

pub use billing::{Account, Invoice, InvoiceDraft, InvoiceLine, InvoiceLineDraft, InvoiceState, LedgerMovement, MovementKind};
pub use errors::{DomainError, Result};
pub use execution::ExecutionResult;
pub use measurement::{Alert, Measurement, MeasurementFilter, Sensor};
pub use memory::{InMemoryDocumentStore, InMemoryRelationalStore};
pub use numeric::{now_micros, round2};
pub use process::{ProcessDefinition, ProcessKind};
pub use request::{Request, RequestState};
pub use store::{DocumentStore, RelationalStore};

/// Identificador de usuario (asignado por el servicio de usuarios).
pub type UserId = i64;
/// Identificador de una entrada del catálogo de procesos.
pub type ProcessId = i64;
/// Identificador de sensor (asignado por el directorio de sensores).
pub type SensorId = i64;
/// Identificador de solicitud, asignado en el momento de la creación.
pub type RequestId = uuid::Uuid;
