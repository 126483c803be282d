//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS header, timeout)
//! - Bind server to listener
//! - Run the idle reaper alongside the server
//! - Shut the pool down once the listener has drained

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::command::CommandExecutor;
use crate::config::ProxyConfig;
use crate::http::handlers::{self, AppState};
use crate::http::request::{request_id, UuidRequestId};
use crate::pool::{IdleReaper, Pool};
use crate::store::{Connector, RedisConnector, StoreError};

/// HTTP front end for the store gateway.
pub struct HttpServer<C: Connector> {
    router: Router,
    config: ProxyConfig,
    executor: CommandExecutor<C>,
}

impl HttpServer<RedisConnector> {
    /// Build a server backed by the Redis instance named in `config.store.url`.
    pub fn connect(config: ProxyConfig) -> Result<Self, StoreError> {
        let connector = RedisConnector::new(&config.store.url, config.store.connect_timeout())?;
        tracing::info!(url = %connector.display_url(), "Backing store configured");
        let pool = Pool::new(connector, config.pool.clone());
        Ok(Self::new(config, pool))
    }
}

impl<C: Connector> HttpServer<C> {
    /// Create a new HTTP server over an existing pool.
    pub fn new(config: ProxyConfig, pool: Pool<C>) -> Self {
        let executor = CommandExecutor::new(pool, config.store.command_timeout());

        let state = AppState {
            executor: executor.clone(),
            info: Arc::new(config.info.clone()),
            malformed_value: config.codec.malformed_value,
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            executor,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState<C>) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(req),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/get", get(handlers::get_value::<C>))
            .route("/set", get(handlers::set_value::<C>))
            .route("/about", get(handlers::about::<C>))
            .route("/uptime", get(handlers::uptime::<C>))
            .route("/", get(handlers::redirect_root::<C>))
            .fallback(handlers::redirect_root::<C>)
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires, then drain and close the pool.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let pool = self.executor.pool().clone();
        let reaper = IdleReaper::new(pool.clone());
        let reaper_shutdown = shutdown.resubscribe();
        let reaper_task = tokio::spawn(async move {
            reaper.run(reaper_shutdown).await;
        });

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining HTTP connections");
            })
            .await;

        // The listener has stopped; no request can reach the pool any more.
        pool.shutdown();
        reaper_task.abort();

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with all layers, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn executor(&self) -> &CommandExecutor<C> {
        &self.executor
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
