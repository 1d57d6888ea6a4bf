use crate::application::{FormConfig, SessionRegistry};
use crate::components::calendar_sync::CalendarSync;
use crate::components::redis_service::{RedisActor, RedisActorHandle};
use crate::components::{CalendarSyncHandle, ComponentManager};
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use crate::storage::{InMemoryStore, Store};
use crate::web::{router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Connect to Redis, falling back to an in-memory store when unreachable
pub async fn connect_store(redis_url: &str) -> (Arc<dyn Store>, Option<RedisActorHandle>) {
    match RedisActor::connect(redis_url).await {
        Ok((mut actor, handle)) => {
            info!("Connected to Redis successfully");
            tokio::spawn(async move {
                actor.run().await;
            });
            let store: Arc<dyn Store> = Arc::new(handle.clone());
            (store, Some(handle))
        }
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            warn!("Using in-memory store as fallback; data will not persist");
            let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
            (store, None)
        }
    }
}

/// Wire up storage, components and the HTTP server, then serve until a
/// shutdown signal arrives
pub async fn start_server(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let (redis_url, form_path, autosave_delay, addr) = {
        let config_read = config.read().await;
        (
            config_read.redis_url.clone(),
            config_read.application_form_path.clone(),
            Duration::from_millis(config_read.autosave_delay_ms),
            format!("{}:{}", config_read.bind_addr, config_read.port),
        )
    };

    let form = FormConfig::load(&form_path).map_err(|e| {
        error!("Failed to load application form from {}: {}", form_path, e);
        e
    })?;
    info!("Loaded application form with {} sections", form.sections.len());

    let (store, redis_handle) = connect_store(&redis_url).await;

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));

    let calendar = CalendarSyncHandle::new(Arc::clone(&config), Arc::clone(&store));
    component_manager.register(CalendarSync::new(calendar.clone()));

    let component_manager = Arc::new(component_manager);
    component_manager.init_all(Arc::clone(&store)).await?;

    let state = AppState {
        store: Arc::clone(&store),
        calendar,
        form: Arc::new(form),
        sessions: Arc::new(SessionRegistry::new(store, autosave_delay)),
    };
    let app = router(state);

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();
    let shutdown_components = Arc::clone(&component_manager);
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components, redis_handle).await;
    });

    let listener = TcpListener::bind(&addr).await.map_err(Error::from)?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_recv.await;
            info!("Received shutdown signal, stopping server...");
        })
        .await
        .map_err(Error::from)?;

    Ok(())
}
