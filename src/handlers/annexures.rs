use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Banks a challan can be paid from. Credentials are never included.
pub async fn banks(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "banks": state.views.banks() }))
}
