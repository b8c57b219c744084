// store.rs
//
// Contratos de almacenamiento. Las implementaciones viven en `memory`
// (pruebas/demos) y en el crate `sensor-persistence` (Diesel).
use crate::billing::{Account, Invoice, InvoiceDraft, InvoiceLine, LedgerMovement};
use crate::errors::Result;
use crate::execution::ExecutionResult;
use crate::measurement::{Alert, Measurement, MeasurementFilter, Sensor};
use crate::process::ProcessDefinition;
use crate::request::{Request, RequestState};
use crate::{ProcessId, RequestId, SensorId, UserId};

/// Almacén transaccional: catálogo, solicitudes, sensores, facturación.
pub trait RelationalStore: Send + Sync {
    /// Busca una entrada del catálogo, habilitada o no.
    fn get_process(&self, id: ProcessId) -> Result<Option<ProcessDefinition>>;

    /// Catálogo ordenado por nombre.
    fn list_processes(&self, only_enabled: bool) -> Result<Vec<ProcessDefinition>>;

    fn insert_request(&self, request: &Request) -> Result<()>;

    fn get_request(&self, id: RequestId) -> Result<Option<Request>>;

    /// Borra la solicitud sólo si sigue en `Pending`. Devuelve `false` si no
    /// existe o ya avanzó de estado.
    fn delete_pending_request(&self, id: RequestId) -> Result<bool>;

    /// Compare-and-set de estado: aplica `to` sólo si el estado actual es
    /// `from`. Devuelve `false` si la solicitud no existe o el estado no
    /// coincide. Una transición no permitida es `ValidationError`.
    fn transition_request(&self, id: RequestId, from: RequestState, to: RequestState) -> Result<bool>;

    /// Solicitudes en `state`, de la más antigua a la más nueva.
    fn list_requests_by_state(&self, state: RequestState) -> Result<Vec<Request>>;

    /// Solicitudes de un usuario, de la más nueva a la más antigua.
    fn list_user_requests(&self, user_id: UserId, state: Option<RequestState>, limit: usize) -> Result<Vec<Request>>;

    /// Conteo por estado para un usuario; sólo incluye estados con al menos
    /// una solicitud.
    fn count_user_requests(&self, user_id: UserId) -> Result<Vec<(RequestState, u64)>>;

    /// Sensores cuya ciudad o país contiene `fragment` (sin distinguir
    /// mayúsculas).
    fn find_sensors_by_zone(&self, fragment: &str) -> Result<Vec<Sensor>>;

    fn get_account(&self, user_id: UserId) -> Result<Option<Account>>;

    /// Registra la factura, sus líneas, el débito y el nuevo saldo en una sola
    /// operación. Sin cuenta corriente devuelve `AccountNotFound` y no escribe
    /// nada.
    fn record_invoice(&self, draft: InvoiceDraft) -> Result<(Invoice, LedgerMovement)>;

    fn list_invoices(&self, user_id: UserId) -> Result<Vec<Invoice>>;

    fn invoice_lines_for_request(&self, request_id: RequestId) -> Result<Vec<InvoiceLine>>;

    /// Movimientos de la cuenta en orden de registro.
    fn movements_for_account(&self, user_id: UserId) -> Result<Vec<LedgerMovement>>;
}

/// Almacén de documentos: mediciones, alertas e historial de ejecución.
pub trait DocumentStore: Send + Sync {
    fn insert_measurement(&self, measurement: &Measurement) -> Result<()>;

    /// Mediciones que cumplen el filtro, por timestamp ascendente, cortadas
    /// en `filter.limit` si está presente.
    fn find_measurements(&self, filter: &MeasurementFilter) -> Result<Vec<Measurement>>;

    fn latest_measurement(&self, sensor_id: SensorId) -> Result<Option<Measurement>>;

    fn insert_alert(&self, alert: &Alert) -> Result<()>;

    fn list_alerts(&self, sensor_id: Option<SensorId>) -> Result<Vec<Alert>>;

    /// Agrega un resultado; nunca reemplaza uno existente.
    fn append_result(&self, result: &ExecutionResult) -> Result<()>;

    /// Historial de una solicitud en orden de ejecución.
    fn results_for_request(&self, request_id: RequestId) -> Result<Vec<ExecutionResult>>;

    fn latest_result(&self, request_id: RequestId) -> Result<Option<ExecutionResult>> {
        Ok(self.results_for_request(request_id)?.pop())
    }

    /// Último resultado exitoso; las re-ejecuciones fallidas no lo ocultan.
    fn latest_completed_result(&self, request_id: RequestId) -> Result<Option<ExecutionResult>> {
        Ok(self.results_for_request(request_id)?.into_iter().rev().find(|r| r.completed))
    }
}
