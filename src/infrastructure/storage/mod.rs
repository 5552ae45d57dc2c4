//! Storage infrastructure - SQLite store, statements and migrations

pub mod migrations;
mod queries;
mod store;

pub use migrations::{schema_migrations, Migration, Migrator};
pub use queries::Queries;
pub use store::{ReadConn, Store, WriteTx};
