//! Storage seams: catalog discovery and row access.
//!
//! Both traits are object-safe so the router can be handed an `Arc<dyn RowStore>` and tests
//! can swap in an in-memory implementation.

use async_trait::async_trait;
use dras_openapi::TableSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Read-only view over the database catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Names of the relations in the `public` schema.
    async fn list_tables(&self) -> anyhow::Result<Vec<String>>;

    /// Column names of `table`, in ordinal order.
    async fn list_columns(&self, table: &str) -> anyhow::Result<Vec<String>>;
}

/// Row access for tables discovered through a [`Catalog`].
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn fetch_all(&self, table: &TableSchema) -> anyhow::Result<Vec<Row>>;

    /// Rows whose `{table}_id` column equals `id` (compared as text).
    async fn fetch_by_id(&self, table: &TableSchema, id: &str) -> anyhow::Result<Vec<Row>>;

    async fn insert(&self, table: &TableSchema, values: &Map<String, Value>)
    -> anyhow::Result<Row>;

    /// Returns `None` when no row matches `id`.
    async fn update(
        &self,
        table: &TableSchema,
        id: &str,
        values: &Map<String, Value>,
    ) -> anyhow::Result<Option<Row>>;

    /// Returns `false` when no row matches `id`.
    async fn delete(&self, table: &TableSchema, id: &str) -> anyhow::Result<bool>;
}

/// One row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Whether the row's `column` equals `id` when both are rendered as text.
    #[must_use]
    pub fn matches_text(&self, column: &str, id: &str) -> bool {
        match self.0.get(column) {
            Some(Value::String(s)) => s == id,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == id,
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(values: Map<String, Value>) -> Self {
        Self(values)
    }
}

impl TryFrom<Value> for Row {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => anyhow::bail!("expected a JSON object row, got {other}"),
        }
    }
}

/// Request body for create/update: an optional identifier plus free-form column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stored in the table's `{table}_id` column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntityError {
    #[error("request body does not set any column")]
    Empty,

    #[error("unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: String, column: String },
}

impl Entity {
    /// Resolve the body into column values for `table`.
    ///
    /// # Errors
    ///
    /// Fails if a key is not a column of `table`, or if nothing would be written.
    pub fn into_columns(self, table: &TableSchema) -> Result<Map<String, Value>, EntityError> {
        let mut values = self.fields;
        if let Some(id) = self.id {
            values.insert(table.id_column(), id);
        }
        if values.is_empty() {
            return Err(EntityError::Empty);
        }
        if let Some(column) = values.keys().find(|k| !table.has_column(k)) {
            return Err(EntityError::UnknownColumn {
                table: table.name.clone(),
                column: column.clone(),
            });
        }
        Ok(values)
    }
}
