// Archivo: connection.rs
// Propósito: pool r2d2, migraciones embebidas, lectura de la URL desde el
// entorno y el error interno de la capa Diesel.
use chrono::{DateTime, Utc};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use sensor_domain::DomainError;
use std::sync::Arc;
use thiserror::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[cfg(feature = "pg")]
pub type DbConn = diesel::pg::PgConnection;
#[cfg(not(feature = "pg"))]
pub type DbConn = diesel::sqlite::SqliteConnection;

pub type DbPool = Pool<ConnectionManager<DbConn>>;
pub(crate) type PooledConn = PooledConnection<ConnectionManager<DbConn>>;

#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("db: {0}")]
  Db(#[from] diesel::result::Error),
  #[error("pool: {0}")]
  Pool(#[from] r2d2::Error),
  #[error("migraciones: {0}")]
  Migration(String),
  #[error("configuración: {0}")]
  Config(String),
  #[error("dato corrupto en '{0}': {1}")]
  Corrupt(&'static str, String),
  #[error(transparent)]
  Domain(#[from] DomainError),
}

impl From<PersistenceError> for DomainError {
  fn from(e: PersistenceError) -> Self {
    match e {
      PersistenceError::Domain(inner) => inner,
      other => DomainError::StorageError(other.to_string()),
    }
  }
}

pub(crate) type PResult<T> = std::result::Result<T, PersistenceError>;

#[cfg(not(feature = "pg"))]
#[derive(Debug)]
struct SqlitePragmas;

#[cfg(not(feature = "pg"))]
impl diesel::r2d2::CustomizeConnection<DbConn, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut DbConn) -> std::result::Result<(), diesel::r2d2::Error> {
    use diesel::RunQueryDsl;
    diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(conn)
                                                    .map_err(diesel::r2d2::Error::QueryError)?;
    diesel::sql_query("PRAGMA foreign_keys = ON;").execute(conn)
                                                  .map_err(diesel::r2d2::Error::QueryError)?;
    Ok(())
  }
}

/// Crea el pool y aplica las migraciones pendientes.
pub fn connect(database_url: &str) -> std::result::Result<Arc<DbPool>, PersistenceError> {
  let manager = ConnectionManager::<DbConn>::new(database_url);
  let builder = Pool::builder().max_size(4);
  #[cfg(not(feature = "pg"))]
  let builder = builder.connection_customizer(Box::new(SqlitePragmas));
  let pool = builder.build(manager)?;
  let mut conn = pool.get()?;
  #[cfg(not(feature = "pg"))]
  {
    use diesel::RunQueryDsl;
    diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut conn)?;
  }
  let applied = conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| PersistenceError::Migration(e.to_string()))?;
  if !applied.is_empty() {
    log::info!("migraciones aplicadas: {}", applied.len());
  }
  Ok(Arc::new(pool))
}

/// Lee `SENSOR_DB_URL` (o `DATABASE_URL`) tras cargar `.env`.
pub fn database_url_from_env() -> std::result::Result<String, PersistenceError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("SENSOR_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| PersistenceError::Config("SENSOR_DB_URL / DATABASE_URL no definida".into()))?;
  #[cfg(feature = "pg")]
  if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
    return Err(PersistenceError::Config("sensor-persistence compilado con 'pg': la URL no parece de Postgres".into()));
  }
  Ok(url)
}

pub(crate) fn to_ts(dt: DateTime<Utc>) -> i64 {
  dt.timestamp_micros()
}

pub(crate) fn from_ts(us: i64, column: &'static str) -> PResult<DateTime<Utc>> {
  let secs = us.div_euclid(1_000_000);
  let nanos = (us.rem_euclid(1_000_000) * 1_000) as u32;
  DateTime::from_timestamp(secs, nanos).ok_or_else(|| PersistenceError::Corrupt(column, us.to_string()))
}

pub(crate) fn parse_uuid(raw: &str, column: &'static str) -> PResult<uuid::Uuid> {
  uuid::Uuid::parse_str(raw).map_err(|_| PersistenceError::Corrupt(column, raw.to_string()))
}
