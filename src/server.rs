//! Reusable dashboard server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: user store, dataset and model
//! loading, the REST API, the session sweeper, metrics and graceful
//! shutdown. The binary and the CLI's `serve` command both go through it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::{
    DashboardRenderer, Dataset, IdentityService, PageController, PredictionService,
    SessionRegistry, SharedSessionRegistry,
};
use crate::config::{AppConfig, StorageBackend};
use crate::domain::UserStore;
use crate::infrastructure::{CsvUserStore, DatabaseConfig, SeaOrmUserStore};
use crate::interfaces::http::middleware::SessionLayerState;
use crate::interfaces::http::{create_api_router, AppServices};
use crate::shared::{AppError, ShutdownCoordinator, ShutdownSignal};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the dashboard server.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Install the Prometheus recorder and mount `/metrics` (default: true).
    pub enable_metrics: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            enable_metrics: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running dashboard server.
///
/// ```rust,no_run
/// use insurance_dashboard::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub store: Arc<dyn UserStore>,
    pub session_registry: SharedSessionRegistry,
    pub config: AppConfig,
    /// Address actually bound (differs from the config when port 0 was requested)
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the server.
    ///
    /// A user store that cannot be opened, a dataset that cannot be read or
    /// a model artifact that cannot be loaded aborts startup.
    pub async fn start(opts: ServerOptions) -> Result<Self, AppError> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting Medical Insurance Dashboard...");

        let prometheus = if opts.enable_metrics {
            prometheus_handle()
        } else {
            None
        };

        // ── User store ─────────────────────────────────────────
        let (store, db): (Arc<dyn UserStore>, Option<DatabaseConnection>) =
            match app_cfg.storage.backend {
                StorageBackend::Csv => {
                    let store = CsvUserStore::new(app_cfg.storage.users_csv.clone());
                    let users = store.load().await?;
                    info!(
                        path = %store.path().display(),
                        users = users.len(),
                        "Using CSV user store"
                    );
                    (Arc::new(store), None)
                }
                StorageBackend::Sqlite => {
                    let db_config = DatabaseConfig::new(app_cfg.storage.database_url.clone());
                    let store = SeaOrmUserStore::open(&db_config)
                        .await
                        .map_err(crate::shared::InfraError::from)?;
                    let db = store.connection().clone();
                    (Arc::new(store), Some(db))
                }
            };

        // ── Dataset & model ────────────────────────────────────
        let dataset = Arc::new(Dataset::load(&app_cfg.data.dataset_path)?);
        info!(
            path = %app_cfg.data.dataset_path.display(),
            rows = dataset.len(),
            "Dataset loaded"
        );

        let predictor = Arc::new(PredictionService::load(&app_cfg.data.model_path)?);
        let artifact = predictor.artifact();
        info!(
            path = %app_cfg.data.model_path.display(),
            r2_test = artifact.metrics.r2_test,
            region_encoding = ?artifact.region_encoding,
            "Model loaded"
        );
        if !artifact.dataset_sha256.is_empty() && artifact.dataset_sha256 != dataset.sha256() {
            warn!("Model was trained on a different dataset than the one being served");
        }

        let renderer = DashboardRenderer::new(
            Arc::clone(&dataset),
            app_cfg.dashboard.clone(),
            predictor.region_encoding(),
        );

        // ── Sessions & shutdown ────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let session_registry = SessionRegistry::shared(app_cfg.security.session_ttl_minutes);
        session_registry.start_sweeper(SESSION_SWEEP_INTERVAL, shutdown_signal.clone());

        // ── REST API server ────────────────────────────────────
        let services = AppServices {
            identity: Arc::new(IdentityService::new(
                Arc::clone(&store),
                app_cfg.security.bcrypt_cost,
            )),
            store: Arc::clone(&store),
            sessions: SessionLayerState::new(session_registry.clone(), &app_cfg.security),
            predictor,
            pages: PageController::new(renderer.clone()),
            renderer,
            started_at: Arc::new(Instant::now()),
        };
        let api_router = create_api_router(services, prometheus);

        let listener = tokio::net::TcpListener::bind(app_cfg.listen_address())
            .await
            .map_err(crate::shared::InfraError::from)?;
        let local_addr = listener
            .local_addr()
            .map_err(crate::shared::InfraError::from)?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            store,
            session_registry,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered.
    ///
    /// In-flight requests get `server.shutdown_timeout` seconds once the
    /// signal fires.
    pub async fn wait(self) {
        let signal = self.shutdown.signal();
        let timeout = Duration::from_secs(self.shutdown.timeout_secs());
        let mut api_task = self.api_task;

        tokio::select! {
            result = &mut api_task => log_task_end(result),
            _ = signal.wait() => {
                info!("Waiting up to {}s for in-flight requests...", timeout.as_secs());
                match tokio::time::timeout(timeout, &mut api_task).await {
                    Ok(result) => log_task_end(result),
                    Err(_) => {
                        warn!("Shutdown timeout elapsed, aborting REST API server");
                        api_task.abort();
                    }
                }
            }
        }

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("Medical Insurance Dashboard shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down Medical Insurance Dashboard...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

fn log_task_end(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => info!("REST API server stopped"),
        Err(e) => error!("REST API server task panicked: {}", e),
    }
}

/// The global recorder can only be installed once per process; a restart
/// within the same process reuses it.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder unavailable, /metrics disabled: {}", e);
                None
            }
        })
        .clone()
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup, before [`ServerHandle::start`].
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
