//! Server mode
//!
//! The one-call bootstrap: builds the actix-web application with the
//! built-in middleware stack and health endpoint, registers the caller's
//! routes, binds, and installs the graceful shutdown coordinator so a
//! termination signal stops the listener, runs the teardown hooks and
//! exits with a deterministic code.

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Compress, web};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::middleware::{RequestIdMiddleware, ServiceIdentity, TimingMiddleware};
use crate::config::get_config;
use crate::errors::MicrobaseError;
use crate::runtime::lifetime::hooks::ShutdownHooks;
use crate::runtime::lifetime::shutdown::ShutdownCoordinator;
use crate::services::health::{AppStartTime, HealthMonitor, HealthService};

type ConfigureFn = Arc<dyn Fn(&mut web::ServiceConfig) + Send + Sync>;

/// Caller-facing options for [`run_server`].
///
/// Routes are registered through the `configure` callback; there is no
/// filesystem route loading. Extra cleanup actions go through
/// [`on_close`](ServerOptions::on_close) and run as part of the graceful
/// shutdown sequence.
#[derive(Clone)]
pub struct ServerOptions {
    pub name: Option<String>,
    configure: Option<ConfigureFn>,
    hooks: Arc<ShutdownHooks>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self {
            name: None,
            configure: None,
            hooks: Arc::new(ShutdownHooks::new()),
        }
    }

    /// Service name, reported in startup logs. Overrides `service.name`
    /// from the config file.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Register the service's routes and app data.
    pub fn with_configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut web::ServiceConfig) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }

    /// Register a named cleanup hook, run at shutdown before the process
    /// exits. Hooks run sequentially in registration order.
    pub fn on_close<F, Fut>(&self, name: &str, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.hooks.on_close(name, action);
    }

    pub fn hooks(&self) -> Arc<ShutdownHooks> {
        self.hooks.clone()
    }
}

/// Run the HTTP server until a termination signal arrives.
///
/// This function:
/// 1. Validates configuration
/// 2. Starts the health monitor
/// 3. Configures and binds the HTTP server
/// 4. Installs the graceful shutdown coordinator
///
/// **Note**: Config and logging must be initialized before calling this
/// function.
pub async fn run_server(options: ServerOptions) -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let config = get_config();
    config
        .validate()
        .context("Invalid configuration")?;

    let service_name = options
        .name
        .clone()
        .unwrap_or_else(|| config.service.name.clone());

    let shutdown_config = config
        .shutdown
        .to_shutdown_config()
        .context("Invalid shutdown configuration")?;

    let monitor = HealthMonitor::new(&config.health);
    let health_state = monitor.state();
    let sampler = monitor.spawn();

    let configure = options.configure.clone();
    let health_enabled = config.health.enabled;
    let health_route = config.health.route.clone();
    let identity = ServiceIdentity::new(
        service_name.clone(),
        config.service.instance_id.as_deref(),
    );

    let server = HttpServer::new(move || {
        // Last `wrap` runs outermost: the request-ID span encloses the
        // timing log, so completion lines carry the request ID and the
        // service identity.
        let mut app = App::new()
            .wrap(Compress::default())
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware::new(identity.clone()))
            .app_data(web::Data::new(health_state.clone()))
            .app_data(web::Data::new(app_start_time.clone()));

        if health_enabled {
            app = app
                .route(&health_route, web::get().to(HealthService::health_check))
                .route(&health_route, web::head().to(HealthService::health_check));
        }

        if let Some(ref configure) = configure {
            app = app.configure(|cfg| configure(cfg));
        }

        app
    })
    .workers(config.server.cpu_count.min(32));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let server = server
        .bind(&bind_address)
        .map_err(|e| MicrobaseError::startup(format!("failed to bind {}: {}", bind_address, e)))?
        .run();

    info!(
        service = %service_name,
        "Starting server at http://{}",
        bind_address
    );

    // Teardown: stop accepting connections, drain in-flight requests,
    // then run the registered close hooks.
    let coordinator = Arc::new(ShutdownCoordinator::new(shutdown_config));
    let server_handle = server.handle();
    let hooks = options.hooks();
    let registry = coordinator.install(move || {
        let server_handle = server_handle.clone();
        let hooks = hooks.clone();
        async move {
            server_handle.stop(true).await;
            hooks.run_all().await
        }
    });

    if registry.is_empty() {
        warn!("No signal listeners installed; graceful shutdown is unavailable");
    }

    // In production the coordinator exits the process; reaching past this
    // await means the server stopped through its own handle.
    server.await.context("HTTP server error")?;
    sampler.abort();
    Ok(())
}
