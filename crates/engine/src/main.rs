use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use txwerewolves_engine::config::{AppConfig, Cli};
use txwerewolves_engine::random::SystemRandom;
use txwerewolves_engine::registry::{SessionRegistry, UserRegistry};
use txwerewolves_engine::signal::SignalBus;
use txwerewolves_engine::transport::http::{self, HttpState};
use txwerewolves_engine::transport::ssh::{self, SshServer, UserKeyDb};
use txwerewolves_engine::transport::Services;

/// Cancels the token on Ctrl+C or, on unix, SIGTERM.
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
            _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        }

        cancel_token.cancel();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "txwerewolves_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("invalid configuration")?;

    tracing::info!(
        ssh_enabled = config.ssh_enabled,
        web_enabled = config.web_enabled,
        "starting txwerewolves server"
    );

    let users = Arc::new(UserRegistry::new());
    let sessions = Arc::new(SessionRegistry::new());
    let bus = Arc::new(SignalBus::new(users.clone(), sessions.clone()));
    let services = Services {
        users,
        sessions,
        bus,
        rng: Arc::new(SystemRandom),
    };

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let mut tasks = Vec::new();

    if config.web_enabled {
        let state = HttpState::new(services.clone());
        let app: Router = http::routes()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state);

        let addr: SocketAddr = config
            .web_endpoint
            .parse()
            .with_context(|| format!("invalid web endpoint {}", config.web_endpoint))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind web endpoint {addr}"))?;
        tracing::info!(%addr, "HTTP transport listening");

        let web_cancel = cancel_token.clone();
        tasks.push(tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                web_cancel.cancelled().await;
                tracing::info!("HTTP transport received shutdown signal");
            });
            if let Err(e) = server.await {
                tracing::error!(error = %e, "HTTP transport exited with an error");
            }
        }));
    }

    if config.ssh_enabled {
        std::fs::create_dir_all(&config.ssh_key_dir)
            .with_context(|| format!("failed to create {}", config.ssh_key_dir.display()))?;
        let host_key = ssh::load_or_generate_host_key(&config.ssh_key_dir)
            .context("failed to load or generate the SSH host key")?;

        let user_keys = if config.user_db_path.exists() {
            UserKeyDb::load(&config.user_db_path).context("failed to load the user key database")?
        } else {
            tracing::warn!(
                path = %config.user_db_path.display(),
                "no user key database on disk; no SSH logins will be accepted"
            );
            UserKeyDb::default()
        };

        let server = SshServer::new(services.clone(), user_keys);
        let endpoint = config.ssh_endpoint.clone();
        let ssh_cancel = cancel_token.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                result = server.run(&endpoint, host_key) => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "SSH transport exited with an error");
                    }
                }
                _ = ssh_cancel.cancelled() => {
                    tracing::info!("SSH transport received shutdown signal");
                }
            }
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}
