mod config;
mod handlers;
mod state;
mod tasks;

use anyhow::Context;
use pokify_common::{TaskClient, TaskRegistry};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("pokify_server=debug,pokify_common=debug,tower_http=info")
            }),
        )
        .init();

    let config = Config::from_env();

    // cliente y registro se arman una sola vez y se comparten por referencia
    let client = TaskClient::new(config.client_config());
    if !client.has_credential() {
        warn!("TRIGGER_API_KEY no está definida; el endpoint va a rechazar todo");
    }

    let mut registry = TaskRegistry::new();
    let handles = tasks::register_all(&mut registry).context("registrando tareas")?;
    info!(
        "{} tareas registradas para el proyecto {}",
        handles.len(),
        config.project_id
    );

    let state = AppState::new(client, registry);
    let app = handlers::build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("no se pudo abrir {}", config.bind_addr))?;
    info!("endpoint de tareas escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("no se pudo escuchar ctrl-c: {:?}", e);
    }
}
