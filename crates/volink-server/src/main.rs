use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use volink_ai::{MatchEngine, OpenAiProvider};
use volink_notify::mailers::{LogMailer, SmtpMailer};
use volink_notify::Mailer;
use volink_server::app;
use volink_server::config::ServerConfig;
use volink_server::state::AppState;
use volink_storage::HubStore;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  volink-server [config.toml]    Start the server");
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    volink_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("volink=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        path => run_server(path.unwrap_or("config/server.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        "volink-server starting"
    );

    let db_url = config.database.connection_url();
    let store = Arc::new(HubStore::new(&db_url, Path::new(&config.database.data_dir)).await?);

    // Mail: SMTP when configured, otherwise deliveries go to the log.
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            let smtp_mailer = SmtpMailer::new(
                &smtp.host,
                smtp.port,
                smtp.username.as_deref(),
                smtp.password.as_deref(),
                &smtp.from,
            )?;
            tracing::info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");
            Arc::new(smtp_mailer)
        }
        None => {
            tracing::warn!(
                "No [smtp] section configured. Outgoing mail will be written to the log; \
                 OTP login codes are only usable from the server log."
            );
            Arc::new(LogMailer)
        }
    };

    let matcher: Option<Arc<dyn MatchEngine>> = if config.ai.enabled {
        match &config.ai.api_key {
            Some(api_key) => {
                let provider = OpenAiProvider::new(
                    api_key.clone(),
                    config.ai.model.clone(),
                    config.ai.base_url.clone(),
                    config.ai.timeout_secs,
                    config.ai.max_tokens,
                    config.ai.temperature,
                )?;
                tracing::info!(model = provider.model_name(), "AI matching enabled");
                Some(Arc::new(provider))
            }
            None => {
                tracing::warn!("[ai].enabled is set but api_key is missing; matching disabled");
                None
            }
        }
    } else {
        tracing::info!("AI matching disabled");
        None
    };

    // JWT secret: use configured value or generate random
    let jwt_secret = match &config.auth.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!(
                "No jwt_secret configured. A random secret was generated and will change on \
                 restart. Set [auth].jwt_secret in config for production use."
            );
            volink_storage::auth::generate_secret()
        }
    };

    let http_port = config.http_port;
    let state = AppState::new(store, mailer, matcher, jwt_secret, config);

    let http_addr: SocketAddr = format!("0.0.0.0:{http_port}").parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        signal::ctrl_c().await.ok();
        tracing::info!("Shutting down gracefully");
    })
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
