use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    CheckinLedger, DecodePipeline, InMemoryStore, InviteRegistry, InviteStore, QrDecoder,
    QrEncoder, ValidationEngine,
};
use domain::CheckinError;
use persistence::{JsonFileStore, PgCheckinLedger, PgInviteRepository};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, StorageBackend};
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id, SecurityHeaders,
};
use crate::routes::{artifacts, health, invites, scan, stats};
use crate::services::ArtifactStore;

/// Registry and ledger backends behind the HTTP surface.
#[derive(Clone)]
pub struct Stores {
    pub backend: StorageBackend,
    pub invites: Arc<dyn InviteStore>,
    pub ledger: Arc<dyn CheckinLedger>,
    /// Set for the PostgreSQL backend; used for pool gauges.
    pub pool: Option<PgPool>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            backend: StorageBackend::Memory,
            invites: store.clone(),
            ledger: store,
            pool: None,
        }
    }

    pub fn local_file(store: JsonFileStore) -> Self {
        let store = Arc::new(store);
        Self {
            backend: StorageBackend::File,
            invites: store.clone(),
            ledger: store,
            pool: None,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            backend: StorageBackend::Postgres,
            invites: Arc::new(PgInviteRepository::new(pool.clone())),
            ledger: Arc::new(PgCheckinLedger::new(pool.clone())),
            pool: Some(pool),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Stores,
    pub registry: InviteRegistry,
    pub engine: ValidationEngine,
    pub pipeline: DecodePipeline,
    pub artifacts: ArtifactStore,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Result<Self, CheckinError> {
        let registry = InviteRegistry::new(
            stores.invites.clone(),
            config.codes.generator()?,
            Arc::new(QrEncoder::default()),
        )
        .with_max_name_length(config.limits.max_name_length);

        tracing::info!(
            code_length = registry.generator().code_length(),
            entropy_bits = registry.generator().entropy_bits(),
            entry_policy = ?config.codes.entry_policy,
            backend = stores.backend.as_str(),
            "Check-in services configured"
        );

        let engine = ValidationEngine::new(
            stores.invites.clone(),
            stores.ledger.clone(),
            config.codes.entry_policy,
        )
        .with_max_code_length(config.limits.max_code_length);

        let pipeline = DecodePipeline::new(Arc::new(QrDecoder))
            .with_max_image_dimension(config.limits.max_image_dimension);
        let artifacts = ArtifactStore::new(config.artifacts.dir.clone());

        Ok(Self {
            config: Arc::new(config),
            stores,
            registry,
            engine,
            pipeline,
            artifacts,
        })
    }
}

pub fn create_app(config: Config, stores: Stores) -> Result<Router, CheckinError> {
    let state = AppState::new(config, stores)?;
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .route("/api/v1/invites", post(invites::issue_invite))
        .route("/api/v1/invites/:code", get(invites::get_invite))
        .route("/api/v1/scan", post(scan::scan_image))
        .route("/api/v1/validate/:code", get(scan::validate_code))
        .route("/api/v1/stats", get(stats::get_stats))
        .route("/api/v1/checkins", get(stats::list_checkins))
        .route("/api/v1/download/:artifact_id", get(artifacts::download));

    // Unversioned paths used by existing scan-desk clients
    let legacy_routes = Router::new()
        .route("/generate", post(invites::issue_invite))
        .route("/scan", post(scan::scan_image))
        .route("/validate/:code", get(scan::validate_code))
        .route("/stats", get(stats::get_stats))
        .route("/download/:artifact_id", get(artifacts::download));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let security = SecurityHeaders {
        hsts: config.security.hsts_enabled,
    };

    Ok(Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(legacy_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            security,
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state))
}
