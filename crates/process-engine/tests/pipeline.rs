mod common;

use assert_matches::assert_matches;
use common::*;
use process_engine::{BillingStatus, DuplicatePolicy, ExecutionEngine, ProcessError, ProcessService, RunAllSummary,
                     RunOutcome};
use sensor_domain::{DocumentStore, RelationalStore, RequestState};
use serde_json::json;
use std::sync::atomic::Ordering;
use work_queue::PendingQueue;

fn january_rosario() -> serde_json::Value {
  json!({"ciudad": "Rosario", "fecha_inicio": "2024-01-01", "fecha_fin": "2024-01-31"})
}

#[test]
fn submit_run_and_bill_once() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());

  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  assert!(sub.queued);
  assert_eq!(sub.message(), "Proceso solicitado. Costo: $50.00");
  assert_eq!(svc.list_pending_identifiers(10).unwrap(), vec![sub.request_id]);
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Pending);

  let outcome = svc.run_one().unwrap();
  assert!(outcome.executed());
  assert_matches!(&outcome, RunOutcome::Completed { billing: BillingStatus::Billed { total, .. }, .. } if *total == 50.0);

  let req = fx.relational.get_request(sub.request_id).unwrap().unwrap();
  assert_eq!(req.state, RequestState::Completed);

  let results = fx.documents.results_for_request(sub.request_id).unwrap();
  assert_eq!(results.len(), 1);
  assert!(results[0].completed);
  assert!(!results[0].reexecution);
  assert_eq!(results[0].payload["temperatura_maxima"], 35.0);
  assert_eq!(results[0].payload["temperatura_minima"], -5.0);
  assert_eq!(results[0].payload["total_mediciones"], 3);

  let lines = fx.relational.invoice_lines_for_request(sub.request_id).unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].concept, "Informe max/min");
  assert_eq!(lines[0].amount, 50.0);
  assert_eq!(fx.relational.get_account(USER).unwrap().unwrap().balance, 50.0);

  let movements = fx.relational.movements_for_account(USER).unwrap();
  assert_eq!(movements.len(), 1);
  assert_eq!(movements[0].balance_after, 50.0);
}

#[test]
fn empty_queue_runs_nothing() {
  let fx = fixture();
  let engine = ExecutionEngine::new(fx.ctx.clone(), fx.config.clone());
  let outcome = engine.run_one().unwrap();
  assert_eq!(outcome, RunOutcome::NoPendingWork);
  assert!(!outcome.executed());
  assert_eq!(engine.run_all().unwrap(), RunAllSummary::default());
}

#[test]
fn submit_rejects_unknown_and_disabled_processes() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  assert_matches!(svc.submit(USER, 404, json!({})), Err(ProcessError::UnknownProcess(404)));
  assert_matches!(svc.submit(USER, DISABLED, json!({})), Err(ProcessError::UnknownProcess(DISABLED)));
  assert_eq!(fx.queue.len().unwrap(), 0);
  assert!(fx.relational.list_user_requests(USER, None, 10).unwrap().is_empty());
}

#[test]
fn handler_failure_marks_error_without_invoice() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, json!({"ciudad": "Atlantis"})).unwrap();

  let outcome = svc.run_one().unwrap();
  assert_matches!(&outcome, RunOutcome::Failed { error, .. } if error.contains("No se encontraron mediciones"));

  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Error);
  let results = fx.documents.results_for_request(sub.request_id).unwrap();
  assert_eq!(results.len(), 1);
  assert!(!results[0].completed);
  assert_eq!(results[0].payload["codigo"], "sin_datos");
  assert!(fx.relational.invoice_lines_for_request(sub.request_id).unwrap().is_empty());
  assert_eq!(fx.relational.get_account(USER).unwrap().unwrap().balance, 100.0);
}

#[test]
fn malformed_params_fail_at_execution_not_submission() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, ALERTS, json!({"temp_min": 40, "temp_max": 10})).unwrap();
  assert_matches!(svc.run_one().unwrap(), RunOutcome::Failed { .. });
  let result = fx.documents.latest_result(sub.request_id).unwrap().unwrap();
  assert_eq!(result.payload["codigo"], "parametros_invalidos");
  assert!(fx.documents.list_alerts(None).unwrap().is_empty());
}

#[test]
fn cancel_removes_record_and_every_queue_entry() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.queue.enqueue(sub.request_id).unwrap();

  assert_matches!(svc.cancel(sub.request_id, OTHER_USER), Err(ProcessError::RequestNotFound(_)));
  svc.cancel(sub.request_id, USER).unwrap();

  assert!(fx.relational.get_request(sub.request_id).unwrap().is_none());
  assert_eq!(fx.queue.len().unwrap(), 0);
  assert_eq!(svc.run_one().unwrap(), RunOutcome::NoPendingWork);
  assert_matches!(svc.cancel(sub.request_id, USER), Err(ProcessError::RequestNotFound(_)));
}

#[test]
fn cancel_is_refused_once_executed() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  svc.run_one().unwrap();
  assert_matches!(svc.cancel(sub.request_id, USER),
                  Err(ProcessError::NotCancellable(_, RequestState::Completed)));
  assert!(fx.relational.get_request(sub.request_id).unwrap().is_some());
}

#[test]
fn vanished_request_is_discarded() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  // borrado directo: la entrada queda sola en la cola
  fx.relational.delete_pending_request(sub.request_id).unwrap();

  let outcome = svc.run_one().unwrap();
  assert_eq!(outcome, RunOutcome::RequestVanished(sub.request_id));
  assert!(!outcome.executed());
  assert!(fx.documents.results_for_request(sub.request_id).unwrap().is_empty());
}

#[test]
fn duplicate_entry_reexecutes_without_billing_twice() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.queue.enqueue(sub.request_id).unwrap();

  assert_matches!(svc.run_one().unwrap(), RunOutcome::Completed { .. });
  assert_matches!(svc.run_one().unwrap(), RunOutcome::Reexecuted { completed: true, .. });

  let results = fx.documents.results_for_request(sub.request_id).unwrap();
  assert_eq!(results.len(), 2);
  assert!(!results[0].reexecution);
  assert!(results[1].reexecution);
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Completed);
  assert_eq!(fx.relational.invoice_lines_for_request(sub.request_id).unwrap().len(), 1);
  assert_eq!(fx.relational.get_account(USER).unwrap().unwrap().balance, 50.0);
}

#[test]
fn failed_reexecution_does_not_hide_completed_result() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.queue.enqueue(sub.request_id).unwrap();

  assert_matches!(svc.run_one().unwrap(), RunOutcome::Completed { .. });
  fx.documents.failing_reads.store(true, Ordering::SeqCst);
  assert_matches!(svc.run_one().unwrap(), RunOutcome::Reexecuted { completed: false, .. });

  let history = fx.documents.results_for_request(sub.request_id).unwrap();
  assert_eq!(history.len(), 2);
  assert!(!history[1].completed);
  assert_eq!(history[1].payload["error"], "Error de almacenamiento: blip");

  let view = svc.get_request_with_result(sub.request_id).unwrap();
  assert_eq!(view.request.state, RequestState::Completed);
  let result = view.result.unwrap();
  assert!(result.completed);
  assert!(!result.reexecution);
  assert_eq!(result.payload["temperatura_maxima"], 35.0);
}

#[test]
fn duplicate_entry_is_skipped_under_skip_policy() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone()).with_duplicate_policy(DuplicatePolicy::Skip);
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.queue.enqueue(sub.request_id).unwrap();

  svc.run_one().unwrap();
  assert_eq!(svc.run_one().unwrap(),
             RunOutcome::AlreadyClaimed { request_id: sub.request_id, state: RequestState::Completed });
  assert_eq!(fx.documents.results_for_request(sub.request_id).unwrap().len(), 1);
}

#[test]
fn in_progress_entry_is_not_executed_again() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.relational.transition_request(sub.request_id, RequestState::Pending, RequestState::InProgress).unwrap();

  assert_matches!(svc.run_one().unwrap(), RunOutcome::AlreadyClaimed { state: RequestState::InProgress, .. });
  assert!(fx.documents.results_for_request(sub.request_id).unwrap().is_empty());
}

#[test]
fn billing_failure_leaves_request_completed() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  // OTHER_USER no tiene cuenta corriente
  let sub = svc.submit(OTHER_USER, EXTREMA, january_rosario()).unwrap();

  assert_matches!(svc.run_one().unwrap(), RunOutcome::Completed { billing: BillingStatus::Failed(_), .. });
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Completed);
  assert!(fx.relational.invoice_lines_for_request(sub.request_id).unwrap().is_empty());

  let report = svc.reconcile().unwrap();
  assert_eq!(report.completed_unbilled, vec![sub.request_id]);

  fx.relational.open_account(OTHER_USER, 80.0);
  let (_, billed) = svc.reconcile_and_bill().unwrap();
  assert_eq!(billed, 1);
  assert_eq!(fx.relational.get_account(OTHER_USER).unwrap().unwrap().balance, 30.0);
  assert!(svc.reconcile().unwrap().is_clean());
}

#[test]
fn billing_refuses_foreign_unfinished_or_billed_requests() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let done = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  svc.run_one().unwrap();
  let pending = svc.submit(USER, EXTREMA, january_rosario()).unwrap();

  assert_matches!(svc.bill(USER, &[]), Err(ProcessError::NothingToBill));
  assert_matches!(svc.bill(OTHER_USER, &[done.request_id]), Err(ProcessError::NotBillable(..)));
  assert_matches!(svc.bill(USER, &[pending.request_id]), Err(ProcessError::NotBillable(..)));
  assert_matches!(svc.bill(USER, &[done.request_id]), Err(ProcessError::AlreadyBilled(_)));
  assert_eq!(fx.relational.list_invoices(USER).unwrap().len(), 1);
}

#[test]
fn enqueue_failure_keeps_request_for_reconciliation() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  fx.queue.set_failing(true);
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  assert!(!sub.queued);
  assert_matches!(svc.run_one(), Err(ProcessError::Queue(_)));

  fx.queue.set_failing(false);
  assert_eq!(svc.run_one().unwrap(), RunOutcome::NoPendingWork);
  let report = svc.reconcile().unwrap();
  assert_eq!(report.requeued, vec![sub.request_id]);
  // un segundo barrido no duplica la entrada
  assert!(svc.reconcile().unwrap().requeued.is_empty());
  assert_matches!(svc.run_one().unwrap(), RunOutcome::Completed { .. });
}

#[test]
fn history_failure_forces_error_without_requeue() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.documents.failing_appends.store(true, Ordering::SeqCst);

  assert_matches!(svc.run_one().unwrap(), RunOutcome::Abandoned { .. });
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Error);
  assert_eq!(fx.queue.len().unwrap(), 0);
  assert!(fx.relational.invoice_lines_for_request(sub.request_id).unwrap().is_empty());
}

#[test]
fn store_failure_records_error_result_and_abandons() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.documents.failing_reads.store(true, Ordering::SeqCst);

  assert_matches!(svc.run_one().unwrap(),
                  RunOutcome::Abandoned { reason, .. } if reason == "Error de almacenamiento: blip");
  let history = fx.documents.results_for_request(sub.request_id).unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].payload["codigo"], "almacen");
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Error);
}

#[test]
fn store_failure_with_history_down_still_marks_error() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.documents.failing_reads.store(true, Ordering::SeqCst);
  fx.documents.failing_appends.store(true, Ordering::SeqCst);

  assert_matches!(svc.run_one().unwrap(), RunOutcome::Abandoned { .. });
  assert!(fx.documents.results_for_request(sub.request_id).unwrap().is_empty());
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Error);
  assert!(fx.relational.invoice_lines_for_request(sub.request_id).unwrap().is_empty());
}

#[test]
fn run_all_tallies_each_outcome() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  svc.submit(USER, ONLINE, json!({"zona": "argentina"})).unwrap();
  svc.submit(USER, EXTREMA, json!({"ciudad": "Atlantis"})).unwrap();
  let gone = svc.submit(USER, AVERAGE, json!({})).unwrap();
  fx.relational.delete_pending_request(gone.request_id).unwrap();

  let summary = svc.run_all().unwrap();
  assert_eq!(summary, RunAllSummary { executed_count: 2, error_count: 1, abandoned_count: 1 });
  assert_eq!(fx.queue.len().unwrap(), 0);
  assert_eq!(fx.relational.list_invoices(USER).unwrap().len(), 2);
}

#[test]
fn parallel_workers_execute_each_request_once() {
  let fx = fixture();
  fx.relational.open_account(USER, 10_000.0);
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let mut ids = Vec::new();
  for _ in 0..12 {
    let sub = svc.submit(USER, ONLINE, json!({"zona": "Rosario"})).unwrap();
    // entrada duplicada para cada solicitud
    fx.queue.enqueue(sub.request_id).unwrap();
    ids.push(sub.request_id);
  }

  let engine = ExecutionEngine::new(fx.ctx.clone(), fx.config.clone());
  let summary = engine.run_all_parallel(4).unwrap();
  assert_eq!(summary.executed_count, 12);
  assert_eq!(summary.error_count, 0);
  assert_eq!(summary.abandoned_count, 12);

  for id in ids {
    assert_eq!(fx.relational.get_request(id).unwrap().unwrap().state, RequestState::Completed);
    assert_eq!(fx.documents.results_for_request(id).unwrap().len(), 1);
    assert_eq!(fx.relational.invoice_lines_for_request(id).unwrap().len(), 1);
  }
  assert_eq!(fx.relational.get_account(USER).unwrap().unwrap().balance, 9851.92);
}

#[test]
fn queue_outage_stops_the_sweep() {
  let fx = fixture();
  let svc = ProcessService::new(fx.ctx.clone(), fx.config.clone());
  let sub = svc.submit(USER, EXTREMA, january_rosario()).unwrap();
  fx.queue.set_failing(true);
  assert_matches!(svc.run_all(), Err(ProcessError::Queue(_)));
  assert_eq!(fx.relational.get_request(sub.request_id).unwrap().unwrap().state, RequestState::Pending);
}
