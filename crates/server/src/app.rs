//! Startup sequencing: discover, describe, route, serve.

use crate::config::{AppOptions, Config};
use crate::docs;
use crate::error::Result;
use crate::pg::PgDatabase;
use crate::router::table_routes;
use crate::schema::discover_schema;
use crate::store::{Catalog, RowStore};
use axum::Router;
use dras_openapi::{RenderedSpec, SpecOptions, TableSchema, build_spec};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Everything built during initialization; read-only once serving starts.
pub struct App {
    pub tables: Vec<TableSchema>,
    pub spec: RenderedSpec,
    pub router: Router,
}

/// Discover the schema through `catalog`, build the document and register all routes.
///
/// Runs to completion before anything is served; the first failure aborts it.
///
/// # Errors
///
/// Returns an error if a catalog query fails or the document cannot be rendered.
pub async fn initialize(
    catalog: &dyn Catalog,
    store: Arc<dyn RowStore>,
    options: &AppOptions,
) -> Result<App> {
    let tables = discover_schema(catalog).await?;

    let spec = build_spec(
        &tables,
        SpecOptions {
            include_writes: options.write_token.is_some(),
        },
    )?;
    let spec = RenderedSpec::render(spec)?;

    let router = table_routes(&tables, store, options)
        .merge(docs::router(spec.clone(), &options.swagger_ui_assets))
        .layer(TraceLayer::new_for_http());

    Ok(App {
        tables,
        spec,
        router,
    })
}

/// Serve `router` on `listener` until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the server stops with an IO failure.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Connect, initialize, bind and serve.
///
/// # Errors
///
/// Returns the first startup failure (dialect, connection, catalog, rendering, bind).
pub async fn run(config: Config) -> Result<()> {
    let db = PgDatabase::connect(&config.database).await?;
    let store: Arc<dyn RowStore> = Arc::new(db.clone());

    let app = initialize(&db, store, &config.app).await?;
    tracing::info!(
        tables = app.tables.len(),
        writes = config.app.write_token.is_some(),
        "routes registered"
    );

    let listener = TcpListener::bind(config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");
    serve(listener, app.router).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutting down");
}
