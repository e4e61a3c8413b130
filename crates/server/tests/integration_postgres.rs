mod common;

use anyhow::Context as _;
use dras_server::config::AppOptions;
use dras_server::pg::PgDatabase;
use dras_server::router::ResponseEncoding;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

use common::{KillOnDrop, apply_sql, pick_unused_port, spawn_app, wait_http_ok, wait_pg_ready};

const PASSWORD: &str = "dras";

const FIXTURES: &str = r#"
create table author (author_id serial primary key, name text not null);
create table book (
    book_id serial primary key,
    title text not null,
    author_id integer references author (author_id),
    published date
);
create table audit_log (audit_log_id bigserial primary key, payload jsonb);
insert into author (name) values ('Ursula K. Le Guin'), ('Octavia E. Butler');
insert into book (title, author_id, published) values
    ('The Dispossessed', 1, '1974-05-01'),
    ('Kindred', 2, '1979-06-01');
create table "swagger-ui" (id integer)
"#;

struct Postgres {
    _container: ContainerAsync<GenericImage>,
    host: String,
    port: u16,
}

impl Postgres {
    fn url(&self) -> String {
        format!(
            "postgres://postgres:{PASSWORD}@{}:{}/postgres",
            self.host, self.port
        )
    }
}

async fn start_postgres() -> anyhow::Result<Postgres> {
    let container = GenericImage::new("postgres", "16-alpine")
        .with_exposed_port(5432.tcp())
        .with_env_var("POSTGRES_PASSWORD", PASSWORD)
        .start()
        .await
        .context("start postgres container")?;

    let host = container.get_host().await?.to_string();
    let port = container.get_host_port_ipv4(5432).await?;
    let pg = Postgres {
        _container: container,
        host,
        port,
    };

    wait_pg_ready(&pg.url(), Duration::from_secs(30)).await?;
    apply_sql(&pg.url(), FIXTURES).await?;
    Ok(pg)
}

#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn postgres_tables_are_served() -> anyhow::Result<()> {
    let pg = start_postgres().await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&pg.url())
        .await?;
    let options = AppOptions {
        encoding: ResponseEncoding::Plain,
        write_token: Some("tok".to_string()),
        ..AppOptions::default()
    };
    let server = spawn_app(Arc::new(PgDatabase::new(pool)), options).await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let doc: Value = client.get(format!("{base}/spec/oas.json")).send().await?.json().await?;
    let schemas = doc["components"]["schemas"].as_object().context("schemas")?;
    let mut names: Vec<&str> = schemas.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(names, ["audit_log", "author", "book"]);
    let book_props: Vec<&str> = doc["components"]["schemas"]["book"]["properties"]
        .as_object()
        .context("book properties")?
        .keys()
        .map(String::as_str)
        .collect();
    for column in ["book_id", "title", "author_id", "published"] {
        assert!(book_props.contains(&column), "{column} missing from {book_props:?}");
    }

    let books: Value = client.get(format!("{base}/book/")).send().await?.json().await?;
    assert_eq!(books.as_array().map(Vec::len), Some(2));

    let book: Value = client.get(format!("{base}/book/2")).send().await?.json().await?;
    assert_eq!(book["title"], "Kindred");
    assert_eq!(book["published"], "1979-06-01");

    let resp = client.get(format!("{base}/book/7")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.get(format!("{base}/audit_log")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await?, json!([]));

    let resp = client
        .post(format!("{base}/author/"))
        .bearer_auth("tok")
        .json(&json!({"name": "N. K. Jemisin"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await?;
    assert_eq!(created["author_id"], 3);

    let resp = client
        .put(format!("{base}/author/3"))
        .bearer_auth("tok")
        .json(&json!({"name": "Nora K. Jemisin"}))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await?["name"], "Nora K. Jemisin");

    let resp = client
        .delete(format!("{base}/author/3"))
        .bearer_auth("tok")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.get(format!("{base}/author/3")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker (testcontainers)"]
async fn binary_serves_a_postgres_database() -> anyhow::Result<()> {
    let pg = start_postgres().await?;
    let port = pick_unused_port()?;

    let _child = KillOnDrop(
        Command::new(env!("CARGO_BIN_EXE_dras"))
            .args(["-g", &pg.host])
            .args(["-b", &pg.port.to_string()])
            .args(["-d", "postgres", "-u", "postgres", "-w", PASSWORD])
            .args(["-p", &port.to_string(), "--bind", "127.0.0.1"])
            .args(["--log-level", "warn"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("spawn dras")?,
    );

    let base = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base}/health"), Duration::from_secs(20)).await?;

    let body = reqwest::get(format!("{base}/author/")).await?.text().await?;
    let inner: String = serde_json::from_str(&body)?;
    let rows: Value = serde_json::from_str(&inner)?;
    assert_eq!(rows.as_array().map(Vec::len), Some(2));

    let yaml = reqwest::get(format!("{base}/spec/oas.yaml")).await?.text().await?;
    assert!(yaml.contains("/author/{id}"));
    assert!(!yaml.contains("post:"));

    Ok(())
}
