pub mod annexures;
pub mod challans;
pub mod returns;

use crate::error::AppError;
use crate::validation::validate_employer_id;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// Header carrying the employer established by the upstream auth layer.
pub const EMPLOYER_HEADER: &str = "x-employer-id";

/// Establishment id of the calling employer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployerId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for EmployerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(EMPLOYER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", EMPLOYER_HEADER)))?;

        validate_employer_id(value).map_err(|e| AppError::Unauthorized(e.to_string()))?;
        Ok(EmployerId(value.to_string()))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub storage: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let storage_ok = match state.filings.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "storage health check failed");
            false
        }
    };

    let health_response = HealthStatus {
        status: if storage_ok { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: if storage_ok { "connected" } else { "disconnected" }.to_string(),
    };

    // Return 503 if storage is down, 200 otherwise
    let status_code = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}

pub async fn dashboard(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.views.dashboard(&employer_id).await?;
    Ok(Json(serde_json::json!({ "summary": summary })))
}
