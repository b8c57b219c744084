//! Persistencia Diesel para la red de sensores.
//! Expone `DieselRelationalStore` (catálogo, solicitudes, sensores,
//! facturación) y `DieselDocumentStore` (mediciones, alertas, historial),
//! ambos sobre un mismo pool r2d2 con migraciones embebidas. SQLite por
//! defecto; Postgres con la feature `pg`.

mod connection;
mod documents;
mod relational;
pub mod schema;

pub use connection::{connect, database_url_from_env, DbPool, PersistenceError, MIGRATIONS};
pub use documents::DieselDocumentStore;
pub use relational::DieselRelationalStore;

/// Construye ambos almacenes desde `SENSOR_DB_URL` / `DATABASE_URL`,
/// compartiendo el pool.
pub fn new_stores_from_env() -> Result<(DieselRelationalStore, DieselDocumentStore), PersistenceError> {
  let url = database_url_from_env()?;
  new_stores(&url)
}

pub fn new_stores(database_url: &str) -> Result<(DieselRelationalStore, DieselDocumentStore), PersistenceError> {
  let pool = connect(database_url)?;
  Ok((DieselRelationalStore::new(pool.clone()), DieselDocumentStore::new(pool)))
}
