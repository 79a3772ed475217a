//! Crawl server implementation
//!
//! Builds the shared [`CrawlService`] once and serves it over axum.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::service::CrawlService;

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Crawl orchestration and quota state
    pub service: Arc<CrawlService>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<CrawlService>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Crawl Server
// ============================================================================

/// HTTP front end for the crawl service
pub struct CrawlServer {
    config: ServerConfig,
    state: AppState,
}

impl CrawlServer {
    /// Wrap an already-built service
    pub fn new(config: ServerConfig, service: Arc<CrawlService>) -> Self {
        Self {
            config,
            state: AppState::new(service),
        }
    }

    /// Validate configuration and build every collaborator
    pub async fn from_config(config: &Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(format!("{e:#}")))?;

        let service = CrawlService::from_config(config)
            .await
            .map_err(|e| ServerError::InitError(format!("{e:#}")))?;

        Ok(Self::new(config.server.clone(), Arc::new(service)))
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves, then abandon queued work
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting crawl server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        let abandoned = self.state.service.shutdown();
        tracing::info!(abandoned, "Crawl server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
            max_workers: self.state.service.quota().max_workers(),
            max_pages_per_window: self.state.service.quota().max_pages_per_window(),
            cache_backend: self.state.service.cache().backend(),
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
    pub max_workers: u32,
    pub max_pages_per_window: u64,
    pub cache_backend: &'static str,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Crawl Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Max Workers: {}\n\
             Max Pages/Window: {}\n\
             Cache: {}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.max_workers,
            self.max_pages_per_window,
            self.cache_backend,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Initialization error
    InitError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InitError(msg) => write!(f, "Initialization error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheBackend;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.cache.backend = CacheBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_server_from_config() {
        let server = CrawlServer::from_config(&memory_config()).await.unwrap();
        let info = server.info();

        assert_eq!(info.max_workers, 10);
        assert_eq!(info.max_pages_per_window, 100);
        assert_eq!(info.cache_backend, "memory");
        assert!(info.cors_enabled);
        assert!(info.display().contains("Crawl Server"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = memory_config();
        config.quota.max_workers = 0;

        let result = CrawlServer::from_config(&config).await;
        assert!(matches!(result, Err(ServerError::ConfigError(_))));
    }
}
