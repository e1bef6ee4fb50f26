use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::EmployerId;
use crate::error::AppError;
use crate::ports::BankCredentials;
use crate::validation::validate_required;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BankValidationRequest {
    pub bank_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub challan_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayRequest {
    pub bank_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn bank_request(
    bank_name: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<(String, BankCredentials), AppError> {
    let bank_name = bank_name.unwrap_or_default();
    let username = username.unwrap_or_default();
    let password = password.unwrap_or_default();
    validate_required("bank_name", &bank_name)?;
    validate_required("username", &username)?;
    validate_required("password", &password)?;
    Ok((bank_name, BankCredentials { username, password }))
}

pub async fn list(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
) -> Result<impl IntoResponse, AppError> {
    let challans = state.views.challans(&employer_id).await?;
    Ok(Json(json!({ "challans": challans })))
}

pub async fn validate_bank(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Json(request): Json<BankValidationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (bank_name, credentials) = bank_request(request.bank_name, request.username, request.password)?;
    let bank = state
        .settle
        .validate_bank(&employer_id, &bank_name, &credentials, request.challan_id)
        .await?;
    Ok(Json(json!({
        "valid": true,
        "message": "Bank credentials validated successfully",
        "bank_details": bank,
    })))
}

pub async fn pay(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Path(id): Path<Uuid>,
    Json(request): Json<PayRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (bank_name, credentials) = bank_request(request.bank_name, request.username, request.password)?;
    let payment = state
        .settle
        .pay(&employer_id, id, &bank_name, &credentials)
        .await?;
    let message = if payment.is_success() {
        "Transaction Successful"
    } else {
        "Transaction Failed"
    };
    Ok(Json(json!({
        "message": message,
        "challan_id": id,
        "payment": payment,
    })))
}

pub async fn cancel(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let challan = state.settle.cancel(&employer_id, id).await?;
    Ok(Json(json!({
        "message": "Challan cancelled successfully",
        "challan_id": challan.id,
        "challan": challan,
    })))
}
