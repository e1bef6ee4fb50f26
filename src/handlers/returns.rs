use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::EmployerId;
use crate::domain::RawReturnMetadata;
use crate::error::AppError;
use crate::use_cases::SubmitReturnInput;
use crate::validation::validate_upload_file_name;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub wage_month: Option<String>,
    pub return_type: Option<String>,
    pub contribution_rate: Option<String>,
    pub remark: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub wage_month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if let Some(file_name) = query.file_name.as_deref() {
        validate_upload_file_name(file_name)?;
    }

    let output = state
        .submit
        .execute(SubmitReturnInput {
            employer_id,
            metadata: RawReturnMetadata {
                wage_month: query.wage_month,
                return_type: query.return_type,
                contribution_rate: query.contribution_rate,
                remark: query.remark,
            },
            file_name: query.file_name,
            content: body.to_vec(),
        })
        .await?;

    let filing = output.filing;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File Validation Successful. File processing is in progress and may take more time. Please revisit after some time.",
            "return_file_id": filing.id,
            "status": filing.status,
            "trrn": filing.trrn,
            "totals": filing.totals,
            "warnings": output.warnings,
        })),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filings = state
        .views
        .list_filings(&employer_id, query.wage_month.as_deref())
        .await?;
    Ok(Json(filings))
}

pub async fn monthly(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
) -> Result<impl IntoResponse, AppError> {
    let months = state.views.monthly(&employer_id).await?;
    Ok(Json(json!({ "months": months })))
}

pub async fn detail(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.views.filing_detail(&employer_id, id).await?;
    Ok(Json(detail))
}

pub async fn download(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.views.return_file(&employer_id, id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content,
    ))
}

pub async fn approve(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let challan = state.review.approve(&employer_id, id).await?;
    Ok(Json(json!({
        "message": format!(
            "Return File Id [{}] approved successfully. Kindly prepare the challan using appropriate payment option.",
            challan.trrn
        ),
        "challan_id": challan.id,
        "challan": challan,
    })))
}

pub async fn reject(
    State(state): State<AppState>,
    EmployerId(employer_id): EmployerId,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let reason = body.and_then(|Json(request)| request.reason);
    let rejected = state.review.reject(&employer_id, id, reason).await?;
    Ok(Json(json!({
        "message": format!("Return File [Id = {}] rejected successfully.", rejected.trrn),
        "reason": rejected.rejection_reason,
    })))
}
