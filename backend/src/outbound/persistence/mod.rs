//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the driven storage ports, backed by
//! PostgreSQL through `diesel-async` with `bb8` connection pooling. The
//! adapters stay thin: row structs and schema definitions are internal, all
//! occupancy decisions come from the domain transitions, and every database
//! failure is mapped to a typed port error.

mod diesel_error_mapping;
mod diesel_presence_mirror;
mod diesel_profile_store;
mod diesel_table_store;
mod models;
mod pool;
mod schema;

pub use diesel_presence_mirror::DieselPresenceMirror;
pub use diesel_profile_store::DieselProfileStore;
pub use diesel_table_store::DieselTableStore;
pub use pool::{DbPool, PoolConfig, PoolError};
