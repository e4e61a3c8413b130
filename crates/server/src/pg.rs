use crate::config::{DatabaseConfig, Dialect};
use crate::error::{DrasError, Result};
use crate::store::{Catalog, Row, RowStore};
use anyhow::Context as _;
use async_trait::async_trait;
use dras_openapi::TableSchema;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

const SCHEMA: &str = "public";

/// Catalog and row access backed by a shared Postgres pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the pool described by `cfg`.
    ///
    /// The dialect is checked before anything touches the network.
    ///
    /// # Errors
    ///
    /// Returns [`DrasError::UnsupportedDialect`] for non-Postgres dialects and
    /// [`DrasError::Connect`] if the initial connection fails.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        match cfg.dialect {
            Dialect::Postgres => {}
            Dialect::Mssql => {
                return Err(DrasError::UnsupportedDialect(
                    cfg.dialect.as_str().to_string(),
                ));
            }
        }

        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.name)
            .ssl_mode(PgSslMode::Disable);

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect_with(options)
            .await
            .map_err(DrasError::Connect)?;
        tracing::info!(host = %cfg.host, port = cfg.port, db = %cfg.name, "connected to postgres");
        Ok(Self { pool })
    }
}

/// Quote an identifier for interpolation into SQL.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified(table: &TableSchema) -> String {
    format!("{}.{}", quote_ident(SCHEMA), quote_ident(&table.name))
}

fn rows_from_json(values: Vec<Value>) -> anyhow::Result<Vec<Row>> {
    values.into_iter().map(Row::try_from).collect()
}

#[async_trait]
impl Catalog for PgDatabase {
    async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
select table_name::text
from information_schema.tables
where table_schema = $1
order by table_name
",
        )
        .bind(SCHEMA)
        .fetch_all(&self.pool)
        .await
        .context("query information_schema.tables")
    }

    async fn list_columns(&self, table: &str) -> anyhow::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r"
select column_name::text
from information_schema.columns
where table_schema = $1 and table_name = $2
order by ordinal_position
",
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("query information_schema.columns for '{table}'"))
    }
}

#[async_trait]
impl RowStore for PgDatabase {
    async fn fetch_all(&self, table: &TableSchema) -> anyhow::Result<Vec<Row>> {
        let sql = format!("select row_to_json(t) from {} as t", qualified(table));
        let values = sqlx::query_scalar::<_, Value>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select rows from '{}'", table.name))?;
        rows_from_json(values)
    }

    async fn fetch_by_id(&self, table: &TableSchema, id: &str) -> anyhow::Result<Vec<Row>> {
        let sql = format!(
            "select row_to_json(t) from {} as t where t.{}::text = $1",
            qualified(table),
            quote_ident(&table.id_column()),
        );
        let values = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select row '{id}' from '{}'", table.name))?;
        rows_from_json(values)
    }

    async fn insert(
        &self,
        table: &TableSchema,
        values: &Map<String, Value>,
    ) -> anyhow::Result<Row> {
        let columns: Vec<String> = values.keys().map(|c| quote_ident(c)).collect();
        let selected: Vec<String> = columns.iter().map(|c| format!("r.{c}")).collect();
        // Columns absent from the body keep their defaults.
        let sql = format!(
            "insert into {table} as t ({cols}) \
             select {selected} from jsonb_populate_record(null::{table}, $1) as r \
             returning row_to_json(t)",
            table = qualified(table),
            cols = columns.join(", "),
            selected = selected.join(", "),
        );
        let value = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(values.clone()))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("insert into '{}'", table.name))?;
        Row::try_from(value)
    }

    async fn update(
        &self,
        table: &TableSchema,
        id: &str,
        values: &Map<String, Value>,
    ) -> anyhow::Result<Option<Row>> {
        let assignments: Vec<String> = values
            .keys()
            .map(|c| {
                let c = quote_ident(c);
                format!("{c} = r.{c}")
            })
            .collect();
        let sql = format!(
            "update {table} as t set {assignments} \
             from jsonb_populate_record(null::{table}, $1) as r \
             where t.{id_col}::text = $2 \
             returning row_to_json(t)",
            table = qualified(table),
            assignments = assignments.join(", "),
            id_col = quote_ident(&table.id_column()),
        );
        let value = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(values.clone()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("update row '{id}' in '{}'", table.name))?;
        value.map(Row::try_from).transpose()
    }

    async fn delete(&self, table: &TableSchema, id: &str) -> anyhow::Result<bool> {
        let sql = format!(
            "delete from {} as t where t.{}::text = $1",
            qualified(table),
            quote_ident(&table.id_column()),
        );
        let res = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete row '{id}' from '{}'", table.name))?;
        Ok(res.rows_affected() > 0)
    }
}
