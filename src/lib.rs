pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod parser;
pub mod ports;
pub mod use_cases;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::{InMemoryStore, PostgresChallanRepository, PostgresFilingRepository, SimulatedGateway};
use crate::config::registry::ReferenceRegistry;
use crate::config::{AllowedOrigins, Config, StorageKind};
use crate::ports::{ChallanRepository, FilingRepository, PaymentGateway, ReferenceData};
use crate::use_cases::{EmployerViews, ReviewReturn, SettleChallan, SubmitReturn};

#[derive(Clone)]
pub struct AppState {
    pub filings: Arc<dyn FilingRepository>,
    pub submit: Arc<SubmitReturn>,
    pub review: Arc<ReviewReturn>,
    pub settle: Arc<SettleChallan>,
    pub views: Arc<EmployerViews>,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: AllowedOrigins,
}

impl AppState {
    pub fn new(
        filings: Arc<dyn FilingRepository>,
        challans: Arc<dyn ChallanRepository>,
        reference: Arc<dyn ReferenceData>,
        gateway: Arc<dyn PaymentGateway>,
        config: &Config,
    ) -> Self {
        Self {
            submit: Arc::new(SubmitReturn::new(filings.clone(), reference.clone())),
            review: Arc::new(ReviewReturn::new(filings.clone())),
            settle: Arc::new(SettleChallan::new(
                challans.clone(),
                reference.clone(),
                gateway,
            )),
            views: Arc::new(EmployerViews::new(filings.clone(), challans, reference)),
            filings,
            max_upload_bytes: config.max_upload_bytes,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        }
    }

    /// Single in-process store backing both repositories.
    pub fn in_memory(
        reference: Arc<dyn ReferenceData>,
        gateway: Arc<dyn PaymentGateway>,
        config: &Config,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store, reference, gateway, config)
    }
}

/// Wires storage, reference data and the gateway according to `config`.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let reference: Arc<dyn ReferenceData> = Arc::new(ReferenceRegistry::load(&config.registry_path)?);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(SimulatedGateway);

    match config.storage {
        StorageKind::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            Ok(AppState::in_memory(reference, gateway, config))
        }
        StorageKind::Postgres => {
            let pool = db::create_pool(config).await?;
            db::run_migrations(&pool).await?;
            Ok(AppState::new(
                Arc::new(PostgresFilingRepository::new(pool.clone())),
                Arc::new(PostgresChallanRepository::new(pool)),
                reference,
                gateway,
                config,
            ))
        }
    }
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::from(Any),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let upload = Router::new()
        .route("/returns/upload", post(handlers::returns::upload))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let cors = cors_layer(&state.cors_allowed_origins);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/annexures/banks", get(handlers::annexures::banks))
        .route("/dashboard", get(handlers::dashboard))
        .merge(upload)
        .route("/returns", get(handlers::returns::list))
        .route("/wage-months", get(handlers::returns::monthly))
        .route("/returns/:id", get(handlers::returns::detail))
        .route("/returns/:id/file", get(handlers::returns::download))
        .route("/returns/:id/approve", post(handlers::returns::approve))
        .route("/returns/:id/reject", post(handlers::returns::reject))
        .route("/challans", get(handlers::challans::list))
        .route("/bank-validations", post(handlers::challans::validate_bank))
        .route("/challans/:id/pay", post(handlers::challans::pay))
        .route("/challans/:id/cancel", post(handlers::challans::cancel))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
