//! Seams between the use cases and their collaborators: storage, reference
//! data and the bank gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Challan, Filing, Payment, WageMonth};

/// Storage-level uniqueness guarantees the use cases rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueKey {
    FilingTrrn,
    FilingPeriod,
    ChallanForFiling,
    ChallanTrrn,
    PaymentCrn,
    SuccessfulPaymentForChallan,
    Other(String),
}

impl UniqueKey {
    pub fn from_constraint(name: &str) -> Self {
        match name {
            "return_files_trrn_key" => UniqueKey::FilingTrrn,
            "return_files_period_key" => UniqueKey::FilingPeriod,
            "challans_return_file_key" => UniqueKey::ChallanForFiling,
            "challans_trrn_key" => UniqueKey::ChallanTrrn,
            "payments_crn_key" => UniqueKey::PaymentCrn,
            "payments_success_per_challan" => UniqueKey::SuccessfulPaymentForChallan,
            other => UniqueKey::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(UniqueKey),

    /// A compare-and-set lost: the row left the expected state first.
    #[error("{0} is no longer in the expected state")]
    StaleState(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                let key = db_err
                    .constraint()
                    .map(UniqueKey::from_constraint)
                    .unwrap_or_else(|| UniqueKey::Other("unknown".to_string()));
                RepositoryError::UniqueViolation(key)
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                RepositoryError::Unavailable(err.to_string())
            }
            other => RepositoryError::Database(other),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait FilingRepository: Send + Sync {
    /// Fails with `UniqueViolation` on a duplicate trrn or employer period.
    async fn insert(&self, filing: &Filing) -> RepositoryResult<Filing>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Filing>;

    async fn find_by_period(
        &self,
        employer_id: &str,
        wage_month: WageMonth,
    ) -> RepositoryResult<Option<Filing>>;

    /// Newest upload first.
    async fn list_by_employer(
        &self,
        employer_id: &str,
        wage_month: Option<WageMonth>,
    ) -> RepositoryResult<Vec<Filing>>;

    /// Atomically moves the filing from `uploaded` to `approved`, stores the
    /// challan and links it. `StaleState` if the filing was not `uploaded`.
    async fn approve(
        &self,
        filing_id: Uuid,
        approved_at: DateTime<Utc>,
        challan: &Challan,
    ) -> RepositoryResult<Challan>;

    /// Deletes the filing only while it is `uploaded`. `StaleState` otherwise.
    async fn delete_uploaded(&self, filing_id: Uuid) -> RepositoryResult<()>;

    async fn ping(&self) -> RepositoryResult<()>;
}

#[async_trait]
pub trait ChallanRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Challan>;

    /// Newest first.
    async fn list_by_employer(&self, employer_id: &str) -> RepositoryResult<Vec<Challan>>;

    /// Atomically moves the challan from `due` to `paid`, stores the
    /// successful payment and links it. `StaleState` if it was not `due`.
    async fn settle(
        &self,
        challan_id: Uuid,
        paid_at: DateTime<Utc>,
        payment: &Payment,
    ) -> RepositoryResult<Payment>;

    /// Stores a failed payment without touching the challan.
    async fn record_failed_payment(&self, payment: &Payment) -> RepositoryResult<Payment>;

    /// `StaleState` if the challan was not `due`.
    async fn cancel(&self, challan_id: Uuid, cancelled_at: DateTime<Utc>) -> RepositoryResult<Challan>;

    async fn payments_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Payment>>;
}

/// Employer establishment as known to the reference registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Establishment {
    pub establishment_id: String,
    pub establishment_name: String,
    pub lin: String,
}

/// Bank the statutory payment can be drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Bank {
    pub name: String,
    pub account_number: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Bank {
    pub fn accepts(&self, credentials: &BankCredentials) -> bool {
        self.user_id == credentials.username && self.password == credentials.password
    }

    pub fn summary(&self) -> BankSummary {
        BankSummary {
            name: self.name.clone(),
            account_number: self.account_number.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankSummary {
    pub name: String,
    pub account_number: String,
    pub user_id: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct BankCredentials {
    pub username: String,
    pub password: String,
}

/// Read-only employer and bank directory.
pub trait ReferenceData: Send + Sync {
    fn establishment(&self, employer_id: &str) -> Option<Establishment>;

    fn bank(&self, name: &str) -> Option<Bank>;

    fn banks(&self) -> Vec<Bank>;

    /// Registration number for establishments without one of their own.
    fn default_lin(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Approved,
    Declined { reason: String },
}

/// Debits the challan amount from the selected bank.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn debit(&self, bank: &Bank, challan: &Challan) -> GatewayOutcome;
}
