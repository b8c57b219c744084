//! Crate `process-engine` — pipeline de solicitudes de proceso.
//!
//! - `submission`: alta y cancelación; escribe la solicitud y la encola.
//! - `engine`: extrae de la cola, reclama, despacha y fija el estado final.
//! - `handlers`: un handler por tipo de proceso.
//! - `billing`: factura y débito de solicitudes completadas.
//! - `reconcile`: barrido del operador entre almacén y cola.
//! - `service`: fachada para la capa de presentación.
pub mod billing;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod params;
pub mod payload;
pub mod reconcile;
pub mod service;
pub mod submission;

pub use billing::{bill_completed, BillingRecord};
pub use config::EngineConfig;
pub use context::{queue_from_config, StoreContext};
pub use dispatch::{dispatch, handler_for};
pub use engine::{BillingStatus, DuplicatePolicy, ExecutionEngine, RunAllSummary, RunOutcome};
pub use errors::{ErrorClass, HandlerError, ProcessError, Result};
pub use params::ProcessParams;
pub use reconcile::{reconcile, retry_unbilled, ReconciliationReport};
pub use service::{ProcessService, RequestView};
pub use submission::{cancel, list_pending_identifiers, submit, Submitted};
