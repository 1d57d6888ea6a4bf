use crate::components::redis_service::RedisActorHandle;
use crate::components::ComponentManager;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Wait for a termination signal, then stop components and storage
pub async fn handle_signals(
    shutdown_send: oneshot::Sender<()>,
    component_manager: Arc<ComponentManager>,
    redis_handle: Option<RedisActorHandle>,
) {
    wait_for_signal().await;

    if let Err(e) = component_manager.shutdown_all().await {
        error!("Error shutting down components: {:?}", e);
    } else {
        info!("All components shut down successfully");
    }

    if let Some(redis_handle) = redis_handle {
        if let Err(e) = redis_handle.shutdown().await {
            error!("Error shutting down Redis actor: {:?}", e);
        } else {
            info!("Redis actor shut down successfully");
        }
    }

    // Send shutdown signal to main task
    let _ = shutdown_send.send(());
}

#[cfg(unix)]
async fn wait_for_signal() {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers, using Ctrl+C only: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal, initiating graceful shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Received Ctrl+C signal, initiating graceful shutdown");
}
