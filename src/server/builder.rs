//! ServerBuilder for fluent API to build the HTTP server

use super::host::{AdminHost, EntityStores};
use super::router::build_router;
use crate::config::AdminConfig;
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

/// Builder for the admin server
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config(AdminConfig::from_env()?)
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: AdminConfig,
    stores: Option<EntityStores>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: AdminConfig::default(),
            stores: None,
        }
    }

    /// Use this configuration
    pub fn with_config(mut self, config: AdminConfig) -> Self {
        self.config = config;
        self
    }

    /// Use these collections instead of fresh in-memory ones
    pub fn with_stores(mut self, stores: EntityStores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Build the host and apply its startup state
    pub async fn build_host(self) -> Result<AdminHost> {
        let stores = self.stores.unwrap_or_else(EntityStores::in_memory);
        let host = AdminHost::new(self.config, stores);
        host.bootstrap().await?;
        Ok(host)
    }

    /// Build the final REST router
    pub async fn build(self) -> Result<Router> {
        let host = self.build_host().await?;
        build_router(&host)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the configured `host:port`
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let app = self.build().await?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;

    #[tokio::test]
    async fn test_build_host_bootstraps_root_role() {
        let host = ServerBuilder::new().build_host().await.unwrap();
        let root = host.cascade.root_role().await.unwrap();
        assert_eq!(root.name, "root");
    }

    #[tokio::test]
    async fn test_with_stores_and_config() {
        let stores = EntityStores::in_memory();
        stores.roles.save(Role::named("guest")).await.unwrap();
        let config = AdminConfig {
            default_role: Some("guest".to_string()),
            root_role: "superuser".to_string(),
            ..AdminConfig::default()
        };

        let host = ServerBuilder::new()
            .with_config(config)
            .with_stores(stores)
            .build_host()
            .await
            .unwrap();
        assert_eq!(host.cascade.root_role().await.unwrap().name, "superuser");
        assert_eq!(
            host.cascade.get_default_role().await.unwrap().unwrap().name,
            "guest"
        );
    }

    #[tokio::test]
    async fn test_build_router() {
        assert!(ServerBuilder::new().build().await.is_ok());
    }
}
