use crate::error::{DrasError, Result};
use crate::store::Catalog;
use dras_openapi::TableSchema;

/// First path segments owned by the documentation server.
pub const RESERVED_SEGMENTS: &[&str] = &["swagger-ui", "spec", "health"];

/// Why a table cannot be exposed as `/{table}`, if it cannot.
///
/// Anything else is routable once encoded with [`route_segment`].
#[must_use]
pub fn unroutable_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("empty name");
    }
    if RESERVED_SEGMENTS.contains(&name) {
        return Some("name collides with a documentation route");
    }
    if name.contains('/') || name == "." || name == ".." {
        return Some("name cannot be a single URL path segment");
    }
    None
}

/// The request-path form of `table`, matching what HTTP clients put on the wire.
///
/// Routing happens on the raw path, so characters that clients escape in a path segment
/// are percent-encoded here as well: non-ASCII, controls, space and the ASCII delimiters
/// listed below. Other printable ASCII stays literal.
#[must_use]
pub fn route_segment(table: &str) -> String {
    let mut segment = String::with_capacity(table.len());
    let mut buf = [0u8; 4];
    for c in table.chars() {
        let literal = c.is_ascii_graphic()
            && !matches!(c, '"' | '#' | '%' | '<' | '>' | '?' | '\\' | '`' | '{' | '}');
        if literal {
            segment.push(c);
        } else {
            segment.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    segment
}

/// Enumerate tables, then each table's columns, one query at a time.
///
/// Tables are sorted by name so the generated document is reproducible. Tables that
/// cannot be routed are skipped with a warning so that routes and document agree.
///
/// # Errors
///
/// Any catalog query failure aborts discovery.
pub async fn discover_schema(catalog: &dyn Catalog) -> Result<Vec<TableSchema>> {
    let mut names = catalog
        .list_tables()
        .await
        .map_err(|e| DrasError::Catalog(format!("{e:#}")))?;
    names.sort();
    names.dedup();

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        if let Some(reason) = unroutable_reason(&name) {
            tracing::warn!(table = %name, reason, "skipping table");
            continue;
        }
        let columns = catalog
            .list_columns(&name)
            .await
            .map_err(|e| DrasError::Catalog(format!("{e:#}")))?;
        tracing::debug!(table = %name, columns = columns.len(), "discovered table");
        tables.push(TableSchema::new(name, columns));
    }

    tracing::info!(tables = tables.len(), "schema discovered");
    Ok(tables)
}
