//! Review return use case.
//! Approves a filing into a due challan, or rejects and removes it.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Challan, Filing};
use crate::error::AppError;
use crate::ports::{FilingRepository, RepositoryError, UniqueKey};
use crate::validation::{sanitize_string, validate_rejection_reason};

pub const DEFAULT_REJECTION_REASON: &str = "Return rejected by employer";

pub struct ReviewReturn {
    filings: Arc<dyn FilingRepository>,
}

impl ReviewReturn {
    pub fn new(filings: Arc<dyn FilingRepository>) -> Self {
        Self { filings }
    }

    async fn load(&self, employer_id: &str, filing_id: Uuid) -> Result<Filing, AppError> {
        let filing = self.filings.get_by_id(filing_id).await?;
        if filing.employer_id != employer_id {
            return Err(AppError::NotFound(format!("return {}", filing_id)));
        }
        Ok(filing)
    }

    /// Computes the challan from the stored totals and links it to the filing.
    pub async fn approve(&self, employer_id: &str, filing_id: Uuid) -> Result<Challan, AppError> {
        let filing = self.load(employer_id, filing_id).await?;
        filing.ensure_uploaded("approve")?;

        let now = Utc::now();
        let challan = Challan::for_filing(&filing, now);
        let stored = match self.filings.approve(filing.id, now, &challan).await {
            Ok(stored) => stored,
            Err(RepositoryError::StaleState(_))
            | Err(RepositoryError::UniqueViolation(UniqueKey::ChallanForFiling)) => {
                tracing::warn!(filing_id = %filing.id, "return approved concurrently");
                return Err(AppError::InvalidTransition(format!(
                    "return {} is no longer uploaded",
                    filing.id
                )));
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!(
            filing_id = %filing.id,
            challan_id = %stored.id,
            trrn = %stored.trrn,
            total_amount = %stored.total_amount,
            "return approved, challan due"
        );
        Ok(stored)
    }

    /// Deletes the filing and returns it as it stood when rejected.
    pub async fn reject(
        &self,
        employer_id: &str,
        filing_id: Uuid,
        reason: Option<String>,
    ) -> Result<Filing, AppError> {
        let reason = reason
            .map(|r| sanitize_string(&r))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        validate_rejection_reason(&reason)?;

        let mut filing = self.load(employer_id, filing_id).await?;
        filing.reject(reason, Utc::now())?;

        match self.filings.delete_uploaded(filing.id).await {
            Ok(()) => {}
            Err(RepositoryError::StaleState(_)) => {
                return Err(AppError::InvalidTransition(format!(
                    "return {} is no longer uploaded",
                    filing.id
                )));
            }
            Err(other) => return Err(other.into()),
        }

        tracing::info!(
            filing_id = %filing.id,
            employer_id = %filing.employer_id,
            wage_month = %filing.wage_month,
            trrn = %filing.trrn,
            "return rejected"
        );
        Ok(filing)
    }
}
