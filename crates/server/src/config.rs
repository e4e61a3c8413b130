use crate::docs::SWAGGER_UI_CDN;
use crate::error::{DrasError, Result};
use crate::router::ResponseEncoding;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Command line of the `dras` binary.
#[derive(Debug, Parser)]
#[command(
    name = "dras",
    version,
    about = "A REST API server with CRUD operations for a Postgres database",
    long_about = "A REST API server with CRUD operations for a Postgres database.\n\n\
                  Every table of the `public` schema is exposed as `GET /{table}/` and \
                  `GET /{table}/{id}`, described by an OpenAPI 3.0 document served at \
                  /spec/oas.json and /spec/oas.yaml and browsable under /swagger-ui/."
)]
pub struct Cli {
    /// DB dialect - postgres, mssql
    #[arg(short = 'l', long, env = "DRAS_DIALECT", default_value = "postgres")]
    pub dialect: String,

    /// Database host name
    #[arg(short = 'g', long, env = "DRAS_HOSTNAME")]
    pub hostname: String,

    /// Database name
    #[arg(short = 'd', long = "db", env = "DRAS_DB")]
    pub db_name: String,

    /// Database port
    #[arg(short = 'b', long = "dbport", env = "DRAS_DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Server port number
    #[arg(short = 'p', long = "port", env = "DRAS_PORT", default_value_t = 8080)]
    pub server_port: u16,

    /// Database user
    #[arg(short = 'u', long, env = "DRAS_USER")]
    pub user: String,

    /// Database password
    #[arg(short = 'w', long, env = "DRAS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Address the HTTP server binds to
    #[arg(long, env = "DRAS_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Size of the shared connection pool
    #[arg(long, env = "DRAS_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Bearer token that enables and guards the create/update/delete routes
    #[arg(long, env = "DRAS_WRITE_TOKEN", hide_env_values = true)]
    pub write_token: Option<String>,

    /// Return row JSON as-is instead of wrapping it in a JSON string
    #[arg(long, env = "DRAS_PLAIN_JSON")]
    pub plain_json: bool,

    /// Base URL the Swagger UI page loads its scripts and stylesheet from
    #[arg(long, env = "DRAS_SWAGGER_UI_ASSETS", default_value = SWAGGER_UI_CDN)]
    pub swagger_ui_assets: String,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, env = "DRAS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "DRAS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Database engine the connection is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    /// Recognised so it can be reported precisely; no driver is wired up.
    Mssql,
}

impl Dialect {
    /// Parse a `--dialect` value.
    ///
    /// # Errors
    ///
    /// Returns [`DrasError::UnsupportedDialect`] for anything that is not a known dialect.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            _ => Err(DrasError::UnsupportedDialect(value.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mssql => "mssql",
        }
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub dialect: Dialect,
    pub host: String,
    pub name: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Options that shape the HTTP surface, independent of where rows come from.
#[derive(Clone)]
pub struct AppOptions {
    pub encoding: ResponseEncoding,
    /// When set, write routes are registered and require `Authorization: Bearer <token>`.
    pub write_token: Option<String>,
    /// Where `swagger-ui-bundle.js` and friends are served from.
    pub swagger_ui_assets: String,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            encoding: ResponseEncoding::default(),
            write_token: None,
            swagger_ui_assets: SWAGGER_UI_CDN.to_string(),
        }
    }
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("encoding", &self.encoding)
            .field("writes_enabled", &self.write_token.is_some())
            .field("swagger_ui_assets", &self.swagger_ui_assets)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub listen: SocketAddr,
    pub app: AppOptions,
}

impl Cli {
    /// Validate flag values and build the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown dialect, blank required values, a zero-sized pool,
    /// or an empty write token.
    pub fn into_config(self) -> Result<Config> {
        let dialect = Dialect::parse(&self.dialect)?;

        for (flag, value) in [
            ("--hostname", &self.hostname),
            ("--db", &self.db_name),
            ("--user", &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(DrasError::Config(format!("{flag} must not be empty")));
            }
        }
        if self.max_connections == 0 {
            return Err(DrasError::Config(
                "--max-connections must be at least 1".to_string(),
            ));
        }
        let swagger_ui_assets = self.swagger_ui_assets.trim().trim_end_matches('/');
        if swagger_ui_assets.is_empty() {
            return Err(DrasError::Config(
                "--swagger-ui-assets must not be empty".to_string(),
            ));
        }
        let swagger_ui_assets = swagger_ui_assets.to_string();

        let write_token = match self.write_token {
            Some(t) if t.trim().is_empty() => {
                return Err(DrasError::Config(
                    "--write-token must not be empty".to_string(),
                ));
            }
            other => other,
        };

        Ok(Config {
            database: DatabaseConfig {
                dialect,
                host: self.hostname,
                name: self.db_name,
                port: self.db_port,
                user: self.user,
                password: self.password,
                max_connections: self.max_connections,
            },
            listen: SocketAddr::new(self.bind, self.server_port),
            app: AppOptions {
                encoding: if self.plain_json {
                    ResponseEncoding::Plain
                } else {
                    ResponseEncoding::EncodedString
                },
                write_token,
                swagger_ui_assets,
            },
        })
    }
}
