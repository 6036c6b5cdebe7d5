//! Postgres implementation of the catalog store.

mod catalog;

pub use catalog::PgCatalogStore;
