//! Schema-driven `OpenAPI` generation.
//!
//! This crate is used by `dras-server` to describe the REST surface it exposes for a
//! discovered database schema.
//!
//! It intentionally contains **no** database access: callers hand it the tables and
//! columns they discovered and get back an `openapiv3::OpenAPI` document plus its
//! serialized JSON/YAML forms.

pub mod builder;
pub mod error;
pub mod model;
pub mod render;

pub use builder::{SpecOptions, build_spec};
pub use model::TableSchema;
pub use render::RenderedSpec;
