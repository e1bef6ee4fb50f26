use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{MetadataError, TransitionError, WageMonthError};
use crate::parser::ParseError;
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Return file is empty")]
    EmptyInput,

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Unsupported return type: {0}")]
    UnsupportedReturnType(String),

    #[error("Invalid contribution rate: {0}")]
    InvalidContributionRate(String),

    #[error("Invalid wage month: {0}")]
    InvalidWageMonth(String),

    #[error("A return for {wage_month} already exists")]
    DuplicateFiling { existing_id: Uuid, wage_month: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid banking credentials. Please check your username and password.")]
    CredentialMismatch,

    #[error("Challan is not payable: {0}")]
    ChallanNotPayable(String),

    #[error("Unknown bank: {0}")]
    UnknownBank(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Repository(RepositoryError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::EmptyInput
            | AppError::MalformedRecord { .. }
            | AppError::UnsupportedReturnType(_)
            | AppError::InvalidContributionRate(_)
            | AppError::InvalidWageMonth(_)
            | AppError::UnknownBank(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::CredentialMismatch | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateFiling { .. }
            | AppError::InvalidTransition(_)
            | AppError::ChallanNotPayable(_) => StatusCode::CONFLICT,
            AppError::Repository(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::EmptyInput => AppError::EmptyInput,
            ParseError::MalformedRecord { line, reason } => AppError::MalformedRecord {
                line,
                reason: reason.to_string(),
            },
        }
    }
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::UnsupportedReturnType(value) => AppError::UnsupportedReturnType(format!(
                "only \"Regular Return\" is allowed, got '{}'",
                value
            )),
            MetadataError::InvalidContributionRate(value) => AppError::InvalidContributionRate(
                format!("must be one of 10, 12, got '{}'", value),
            ),
            MetadataError::InvalidWageMonth(inner) => inner.into(),
        }
    }
}

impl From<WageMonthError> for AppError {
    fn from(err: WageMonthError) -> Self {
        AppError::InvalidWageMonth(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::InvalidTransition(err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            other => {
                tracing::error!(error = %other, "repository failure");
                AppError::Repository(other)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let AppError::DuplicateFiling { existing_id, .. } = &self {
            body["existing_return_id"] = json!(existing_id);
        }

        (status, Json(body)).into_response()
    }
}
