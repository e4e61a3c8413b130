#![allow(dead_code)]

use anyhow::Context as _;
use async_trait::async_trait;
use dras_openapi::TableSchema;
use dras_server::app::initialize;
use dras_server::config::AppOptions;
use dras_server::store::{Catalog, Row, RowStore};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use dras_test_support::{KillOnDrop, apply_sql, pick_unused_port, wait_http_ok, wait_pg_ready};

struct MemoryTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

/// In-memory catalog + row store. Tables are reported in insertion order.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Vec<MemoryTable>>,
    broken: HashSet<String>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; every row must be a JSON object.
    #[must_use]
    pub fn with_table(self, name: &str, columns: &[&str], rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| match r {
                Value::Object(m) => m,
                other => panic!("fixture row must be an object, got {other}"),
            })
            .collect();
        self.tables.write().push(MemoryTable {
            name: name.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        });
        self
    }

    /// Row queries against `name` fail as if the database were unreachable.
    #[must_use]
    pub fn with_broken_table(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .iter()
            .find(|t| t.name == table)
            .map_or(0, |t| t.rows.len())
    }

    fn check(&self, table: &TableSchema) -> anyhow::Result<()> {
        if self.broken.contains(&table.name) {
            anyhow::bail!("relation \"{}\" is unavailable", table.name);
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for MemoryDatabase {
    async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.tables.read().iter().map(|t| t.name.clone()).collect())
    }

    async fn list_columns(&self, table: &str) -> anyhow::Result<Vec<String>> {
        self.tables
            .read()
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.clone())
            .with_context(|| format!("no such table '{table}'"))
    }
}

#[async_trait]
impl RowStore for MemoryDatabase {
    async fn fetch_all(&self, table: &TableSchema) -> anyhow::Result<Vec<Row>> {
        self.check(table)?;
        let tables = self.tables.read();
        let t = tables
            .iter()
            .find(|t| t.name == table.name)
            .context("unknown table")?;
        Ok(t.rows.iter().cloned().map(Row::from).collect())
    }

    async fn fetch_by_id(&self, table: &TableSchema, id: &str) -> anyhow::Result<Vec<Row>> {
        let id_column = table.id_column();
        Ok(self
            .fetch_all(table)
            .await?
            .into_iter()
            .filter(|r| r.matches_text(&id_column, id))
            .collect())
    }

    async fn insert(
        &self,
        table: &TableSchema,
        values: &Map<String, Value>,
    ) -> anyhow::Result<Row> {
        self.check(table)?;
        let id_column = table.id_column();
        let mut tables = self.tables.write();
        let t = tables
            .iter_mut()
            .find(|t| t.name == table.name)
            .context("unknown table")?;

        let mut row = Map::new();
        for column in &t.columns {
            row.insert(
                column.clone(),
                values.get(column).cloned().unwrap_or(Value::Null),
            );
        }
        // Emulate a serial id column.
        if t.columns.contains(&id_column) && row.get(&id_column) == Some(&Value::Null) {
            let next = t
                .rows
                .iter()
                .filter_map(|r| r.get(&id_column).and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            row.insert(id_column, Value::from(next));
        }
        t.rows.push(row.clone());
        Ok(Row::from(row))
    }

    async fn update(
        &self,
        table: &TableSchema,
        id: &str,
        values: &Map<String, Value>,
    ) -> anyhow::Result<Option<Row>> {
        self.check(table)?;
        let id_column = table.id_column();
        let mut tables = self.tables.write();
        let t = tables
            .iter_mut()
            .find(|t| t.name == table.name)
            .context("unknown table")?;

        let Some(row) = t
            .rows
            .iter_mut()
            .find(|r| Row::from((*r).clone()).matches_text(&id_column, id))
        else {
            return Ok(None);
        };
        for (k, v) in values {
            row.insert(k.clone(), v.clone());
        }
        Ok(Some(Row::from(row.clone())))
    }

    async fn delete(&self, table: &TableSchema, id: &str) -> anyhow::Result<bool> {
        self.check(table)?;
        let id_column = table.id_column();
        let mut tables = self.tables.write();
        let t = tables
            .iter_mut()
            .find(|t| t.name == table.name)
            .context("unknown table")?;
        let before = t.rows.len();
        t.rows
            .retain(|r| !Row::from(r.clone()).matches_text(&id_column, id));
        Ok(t.rows.len() != before)
    }
}

/// An in-process server bound to an ephemeral localhost port.
pub struct TestServer {
    pub base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Initialize the app over `db` and serve it.
pub async fn spawn_app<D>(db: Arc<D>, options: AppOptions) -> anyhow::Result<TestServer>
where
    D: Catalog + RowStore + 'static,
{
    let store: Arc<dyn RowStore> = db.clone();
    let app = initialize(db.as_ref(), store, &options)
        .await
        .context("initialize app")?;

    let listener = TcpListener::bind("127.0.0.1:0").await.context("bind")?;
    let addr = listener.local_addr().context("local_addr")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app.router).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let handle = tokio::spawn(async move { server.await });

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        shutdown: Some(shutdown_tx),
        handle,
    })
}

/// Sample schema: two populated tables and an empty one, registered out of order.
pub fn library() -> MemoryDatabase {
    MemoryDatabase::new()
        .with_table(
            "book",
            &["book_id", "title", "author_id"],
            vec![
                serde_json::json!({"book_id": 1, "title": "The Dispossessed", "author_id": 1}),
                serde_json::json!({"book_id": 2, "title": "Kindred", "author_id": 2}),
                serde_json::json!({"book_id": 3, "title": "Parable of the Sower", "author_id": 2}),
            ],
        )
        .with_table(
            "author",
            &["author_id", "name"],
            vec![
                serde_json::json!({"author_id": 1, "name": "Ursula K. Le Guin"}),
                serde_json::json!({"author_id": 2, "name": "Octavia E. Butler"}),
            ],
        )
        .with_table("loan", &["loan_id", "book_id", "due"], Vec::new())
}
