//! Persistence for the Clinical Copilot engine.
//!
//! Three tables back the application: `users` (doctors and staff),
//! `patients` (keyed naturally by an optional JKN/BPJS number) and
//! `consultations` (one row per recorded visit, enriched in place with the
//! generated note and AI payload). Every table is reached through an
//! `async_trait` repository so handlers and services can run against
//! Postgres in production and [`InMemoryDatabase`] in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use database_layer::{bootstrap, DatabasePool, PgPatientRepository, PatientRepository};
//!
//! # async fn run() -> database_layer::DatabaseResult<()> {
//! let db = DatabasePool::new("postgresql://localhost/copilot", 10).await?;
//! bootstrap(&db).await?;
//!
//! let patients = PgPatientRepository::new(db.clone());
//! if let Some(patient) = patients.find_by_jkn("0001234567890").await? {
//!     println!("existing patient {}", patient.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Reads that feed dashboards go through [`QueryCache`], a read-through
//! cache with a fixed five minute TTL and whole-table invalidation.

pub mod cache;
pub mod connection;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod schema;

pub use cache::*;
pub use connection::*;
pub use error::*;
pub use memory::*;
pub use models::*;
pub use postgres::*;
pub use repository::*;
pub use schema::bootstrap;
