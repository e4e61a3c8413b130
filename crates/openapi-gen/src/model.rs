use serde::{Deserialize, Serialize};

/// A relation discovered in the `public` schema, with its column names in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Name of the column rows are looked up by (`{table}_id`).
    #[must_use]
    pub fn id_column(&self) -> String {
        format!("{}_id", self.name)
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}
