//! Schema-driven REST API server for Postgres.
//!
//! At startup the `public` schema is read from `information_schema`, an `OpenAPI` 3.0
//! document is generated for it (see `dras-openapi`), and every table is exposed as
//! read routes backed by an injected [`store::RowStore`]. Once initialization finishes the
//! server is stateless; schema changes need a restart.

pub mod app;
pub mod config;
pub mod docs;
pub mod error;
pub mod logging;
pub mod pg;
pub mod router;
pub mod schema;
pub mod store;
