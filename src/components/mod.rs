use crate::config::Config;
use crate::error::AppResult;
use crate::storage::Store;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// Export components
pub mod calendar_sync;
pub mod redis_service;

pub use calendar_sync::CalendarSyncHandle;

/// Component trait that all background components must implement
#[async_trait]
pub trait Component: Send + Sync {
    /// Get the name of the component
    fn name(&self) -> &'static str;

    /// Initialize the component
    async fn init(&self, config: Arc<RwLock<Config>>, store: Arc<dyn Store>) -> AppResult<()>;

    /// Shutdown the component
    async fn shutdown(&self) -> AppResult<()>;
}

/// Manager for all components
pub struct ComponentManager {
    components: Vec<Box<dyn Component>>,
    config: Arc<RwLock<Config>>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("component_count", &self.components.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ComponentManager {
    /// Create a new component manager
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            components: Vec::new(),
            config,
        }
    }

    /// Register a component
    pub fn register<T: Component + 'static>(&mut self, component: T) {
        info!("Registering component: {}", component.name());
        self.components.push(Box::new(component));
    }

    /// Initialize every registered component enabled in the config
    pub async fn init_all(&self, store: Arc<dyn Store>) -> AppResult<()> {
        for component in &self.components {
            let enabled = self.config.read().await.is_component_enabled(component.name());
            if !enabled {
                info!("Component disabled: {}", component.name());
                continue;
            }

            info!("Initializing component: {}", component.name());

            if let Err(e) = component
                .init(Arc::clone(&self.config), Arc::clone(&store))
                .await
            {
                // Log error but continue with other components
                tracing::error!("Error initializing component {}: {:?}", component.name(), e);
            }
        }

        Ok(())
    }

    /// Shutdown all components
    pub async fn shutdown_all(&self) -> AppResult<()> {
        info!("Shutting down all components");

        for component in &self.components {
            info!("Shutting down component: {}", component.name());

            if let Err(e) = component.shutdown().await {
                // Log error but continue with other components
                tracing::error!(
                    "Error shutting down component {}: {:?}",
                    component.name(),
                    e
                );
            }
        }

        Ok(())
    }

    /// Names of the registered components, in registration order
    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }
}
