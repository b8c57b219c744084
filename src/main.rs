use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{Duration, Utc};
use process_engine::{queue_from_config, EngineConfig, ProcessService, StoreContext};
use sensor_domain::{DocumentStore, Measurement, ProcessDefinition, ProcessKind, RequestState, Sensor};
use sensor_persistence::{DieselDocumentStore, DieselRelationalStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Menú del operador del pipeline de solicitudes.
///
/// La cola en memoria no sobrevive al proceso: si la cola construida no es
/// durable se reconcilia al arrancar para re-encolar los pendientes de la base.
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
                  .unwrap_or_else(|_| "info,sensor_persistence=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;
    let (rel, docs) = sensor_persistence::new_stores_from_env()?;
    let rel = Arc::new(rel);
    let docs = Arc::new(docs);
    let queue = queue_from_config(&config)?;
    let volatile_queue = !queue.is_durable();
    let ctx = StoreContext::new(rel.clone(), docs.clone(), queue);
    let service = ProcessService::new(ctx, config.clone());

    if volatile_queue {
        let report = service.reconcile()?;
        tracing::info!("{} solicitudes pendientes cargadas en la cola", report.requeued.len());
    }

    loop {
        println!("\n== Operador de procesos ==");
        println!("1) Ejecutar el próximo pendiente");
        println!("2) Ejecutar todos los pendientes");
        println!("3) Ver cola de pendientes");
        println!("4) Reconciliar y reintentar facturación");
        println!("5) Solicitar proceso");
        println!("6) Cancelar solicitud");
        println!("7) Ver solicitud");
        println!("8) Ver solicitudes de un usuario");
        println!("9) Cargar datos de demostración");
        println!("0) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => match service.run_one() {
                Ok(outcome) => println!("{}", outcome.summary()),
                Err(e) => eprintln!("Error ejecutando: {}", e),
            },
            "2" => match service.run_all() {
                Ok(s) => println!("Ejecutados: {} | Con error: {} | Descartados: {}",
                                  s.executed_count, s.error_count, s.abandoned_count),
                Err(e) => eprintln!("Barrido interrumpido: {}", e),
            },
            "3" => match service.list_pending_identifiers(20) {
                Ok(ids) if ids.is_empty() => println!("No hay procesos pendientes"),
                Ok(ids) => {
                    for (i, id) in ids.iter().enumerate() {
                        println!("{:>2}. {}", i + 1, id);
                    }
                }
                Err(e) => eprintln!("Error leyendo la cola: {}", e),
            },
            "4" => match service.reconcile_and_bill() {
                Ok((r, billed)) => {
                    println!("Re-encoladas: {}", r.requeued.len());
                    println!("En proceso: {}", r.stale_in_progress.len());
                    println!("Completadas sin factura: {} (facturadas ahora: {})", r.completed_unbilled.len(), billed);
                    for id in &r.stale_in_progress {
                        println!("  en proceso: {}", id);
                    }
                }
                Err(e) => eprintln!("Error reconciliando: {}", e),
            },
            "5" => {
                match service.list_available_processes() {
                    Ok(procs) => {
                        for p in procs {
                            println!("{:>3} | {:<28} | {:<26} | ${:.2}", p.id, p.name, p.kind, p.price);
                        }
                    }
                    Err(e) => { eprintln!("Error leyendo el catálogo: {}", e); continue; }
                }
                let Some(user) = prompt_i64("Usuario: ")? else { continue };
                let Some(process) = prompt_i64("Proceso: ")? else { continue };
                let raw = prompt("Parámetros (JSON, enter para ninguno): ")?;
                let params = if raw.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    match serde_json::from_str(raw.trim()) {
                        Ok(v) => v,
                        Err(e) => { eprintln!("JSON inválido: {}", e); continue; }
                    }
                };
                match service.submit(user, process, params) {
                    Ok(sub) => {
                        println!("{} (solicitud {})", sub.message(), sub.request_id);
                        if !sub.queued {
                            println!("La cola no respondió; la solicitud se encolará en la próxima reconciliación");
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            "6" => {
                let Some(id) = prompt_uuid("Solicitud a cancelar (UUID): ")? else { continue };
                let Some(user) = prompt_i64("Usuario: ")? else { continue };
                match service.cancel(id, user) {
                    Ok(()) => println!("Solicitud cancelada"),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            "7" => {
                let Some(id) = prompt_uuid("Solicitud (UUID): ")? else { continue };
                match service.get_request_with_result(id) {
                    Ok(view) => {
                        println!("Proceso: {}", view.process_name.as_deref().unwrap_or("-"));
                        println!("Estado: {}", view.request.state);
                        println!("Parámetros: {}", view.request.params);
                        if let Some(r) = view.result {
                            println!("Resultado ({}):", r.executed_at.format("%Y-%m-%d %H:%M:%S"));
                            println!("{}", serde_json::to_string_pretty(&r.payload)?);
                        } else if view.request.state == RequestState::Error {
                            for r in service.results_for_request(id)? {
                                println!("Intento {}: {}", r.executed_at.format("%Y-%m-%d %H:%M:%S"), r.payload);
                            }
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            "8" => {
                let Some(user) = prompt_i64("Usuario: ")? else { continue };
                let counts = service.count_requests_by_state(user)?;
                let line: Vec<String> = counts.iter().map(|(s, n)| format!("{}: {}", s, n)).collect();
                println!("{}", line.join(" | "));
                for v in service.list_user_requests(user, None, 20)? {
                    println!("{} | {:<11} | {:<28} | {}",
                             v.request.id,
                             v.request.state,
                             v.process_name.as_deref().unwrap_or("-"),
                             v.request.created_at.format("%Y-%m-%d %H:%M"));
                }
            }
            "9" => match seed_demo(&rel, &docs) {
                Ok(()) => println!("Catálogo, sensores, mediciones y cuenta del usuario 1 cargados"),
                Err(e) => eprintln!("Error cargando datos: {}", e),
            },
            "0" => {
                println!("Saliendo...");
                break;
            }
            other => println!("Opción inválida: {}", other),
        }
    }

    Ok(())
}

fn seed_demo(rel: &DieselRelationalStore, docs: &DieselDocumentStore) -> Result<(), Box<dyn Error>> {
    let catalog = [(1, "Informe max/min", ProcessKind::ReportExtrema, 50.0),
                   (2, "Informe promedio mensual", ProcessKind::ReportAverage, 60.0),
                   (3, "Humedad max/min", ProcessKind::HumidityExtrema, 40.0),
                   (4, "Humedad promedio mensual", ProcessKind::HumidityAverage, 45.0),
                   (5, "Alertas por rango de temperatura", ProcessKind::AlertThresholdScan, 30.0),
                   (6, "Consulta online", ProcessKind::OnlineQuery, 10.0),
                   (7, "Informe periódico mensual", ProcessKind::PeriodicReport, 80.0)];
    for (id, name, kind, price) in catalog {
        rel.upsert_process(&ProcessDefinition { id, name: name.to_string(), description: None, kind, price, enabled: true })?;
    }
    let sensors = [(1, "Rosario", "Argentina"), (2, "Córdoba", "Argentina"), (3, "Lima", "Perú")];
    for (id, city, country) in sensors {
        rel.insert_sensor(&Sensor { id,
                                    name: format!("S-{:03}", id),
                                    city: city.to_string(),
                                    country: country.to_string(),
                                    status: "activo".to_string() })?;
        for h in 0..48i64 {
            let temp = 12.0 + ((h * 7 + id * 3) % 25) as f64;
            let hum = 40.0 + ((h * 5 + id) % 50) as f64;
            docs.insert_measurement(&Measurement::new(id, city, country, temp, hum, Utc::now() - Duration::hours(h * 12)))?;
        }
    }
    rel.open_account(1, 1000.0)?;
    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}

fn prompt_i64(msg: &str) -> io::Result<Option<i64>> {
    let s = prompt(msg)?;
    match s.trim().parse() {
        Ok(n) => Ok(Some(n)),
        Err(_) => {
            eprintln!("Número inválido");
            Ok(None)
        }
    }
}

fn prompt_uuid(msg: &str) -> io::Result<Option<Uuid>> {
    let s = prompt(msg)?;
    match Uuid::parse_str(s.trim()) {
        Ok(u) => Ok(Some(u)),
        Err(_) => {
            eprintln!("UUID inválido");
            Ok(None)
        }
    }
}
