use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use pg_publication_controller::api::{build_router, ApiCredentials, AppState};
use pg_publication_controller::config::{PostgresConfig, ServerConfig, SslMode};
use pg_publication_controller::postgres::ClusterClient;
use pg_publication_controller::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "pg-publication-controller")]
#[command(about = "Manages PostgreSQL logical replication publications over HTTP", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", help = "Load settings from a config file instead of flags")]
    config: Option<PathBuf>,

    #[arg(long = "pg_host", env = "POSTGRES_HOST", default_value = "127.0.0.1")]
    pg_host: String,

    #[arg(long = "pg_port", env = "POSTGRES_PORT", default_value_t = 5432)]
    pg_port: u16,

    #[arg(long = "pg_user", env = "POSTGRES_ADMIN_USER", default_value = "postgres")]
    pg_user: String,

    #[arg(long = "pg_pass", env = "POSTGRES_ADMIN_PASSWORD", default_value = "", hide_env_values = true)]
    pg_pass: String,

    #[arg(long = "pg_ssl", env = "PG_SSL", default_value = "off", help = "TLS to Postgres when \"on\"")]
    pg_ssl: SslMode,

    #[arg(long = "pg_conn_timeout", env = "PG_CONN_TIMEOUT_SEC", default_value_t = 20)]
    pg_conn_timeout: u64,

    #[arg(long = "serve_addr", env = "SERVE_ADDR", default_value = "0.0.0.0:8080")]
    serve_addr: SocketAddr,

    #[arg(long = "server_user", env = "API_USER", default_value = "logical-repl-user")]
    server_user: String,

    #[arg(long = "server_pass", env = "API_PASSWORD", default_value = "logical-repl-password", hide_env_values = true)]
    server_pass: String,

    #[arg(
        long = "log_debug",
        env = "LOG_DEBUG",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        help = "Verbose logging"
    )]
    log_debug: bool,

    #[arg(long = "log_format", env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

impl Args {
    fn into_config(self) -> pg_publication_controller::Result<Config> {
        if let Some(path) = &self.config {
            return Config::from_file(path);
        }
        Ok(Config {
            postgres: PostgresConfig {
                host: self.pg_host,
                port: self.pg_port,
                username: self.pg_user,
                password: self.pg_pass,
                ssl: self.pg_ssl,
                connect_timeout_secs: self.pg_conn_timeout,
                ..PostgresConfig::default()
            },
            server: ServerConfig {
                bind_addr: self.serve_addr,
                api_user: self.server_user,
                api_password: self.server_pass,
            },
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.log_format == LogFormat::Json, args.log_debug);

    info!("Starting pg-publication-controller");
    let config = args.into_config().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    info!(
        postgres_host = %config.postgres.host,
        postgres_port = %config.postgres.port,
        postgres_database = %config.postgres.database,
        postgres_ssl = ?config.postgres.ssl,
        bind_addr = %config.server.bind_addr,
        "Configuration summary"
    );

    let client = ClusterClient::connect_checked(config.postgres.clone())
        .await
        .inspect_err(|e| error!("Postgres is unavailable at startup: {}", e))
        .context("postgres health check failed")?;

    let state = AppState::new(
        client,
        ApiCredentials::new(&config.server.api_user, &config.server.api_password),
        config.postgres.connect_timeout(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Controller listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("controller has been stopped")?;

    Ok(())
}

fn init_logging(json: bool, debug: bool) {
    let env_filter = if debug {
        EnvFilter::new("pg_publication_controller=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("pg_publication_controller=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
