//! Settle challan use case.
//! Pays a due challan through the gateway, cancels it, or pre-checks a bank.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::reference::{generate_crn, MAX_REFERENCE_ATTEMPTS};
use crate::domain::{Challan, Payment, PaymentStatus};
use crate::error::AppError;
use crate::ports::{
    Bank, BankCredentials, BankSummary, ChallanRepository, GatewayOutcome, PaymentGateway,
    ReferenceData, RepositoryError, UniqueKey,
};

pub struct SettleChallan {
    challans: Arc<dyn ChallanRepository>,
    reference: Arc<dyn ReferenceData>,
    gateway: Arc<dyn PaymentGateway>,
}

impl SettleChallan {
    pub fn new(
        challans: Arc<dyn ChallanRepository>,
        reference: Arc<dyn ReferenceData>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            challans,
            reference,
            gateway,
        }
    }

    fn authorize(&self, bank_name: &str, credentials: &BankCredentials) -> Result<Bank, AppError> {
        let bank = self
            .reference
            .bank(bank_name)
            .ok_or_else(|| AppError::UnknownBank(bank_name.to_string()))?;
        if !bank.accepts(credentials) {
            tracing::warn!(bank = %bank.name, "bank credentials rejected");
            return Err(AppError::CredentialMismatch);
        }
        Ok(bank)
    }

    async fn load(&self, employer_id: &str, challan_id: Uuid) -> Result<Challan, AppError> {
        let challan = self.challans.get_by_id(challan_id).await?;
        if challan.employer_id != employer_id {
            return Err(AppError::NotFound(format!("challan {}", challan_id)));
        }
        Ok(challan)
    }

    fn ensure_payable(challan: &Challan) -> Result<(), AppError> {
        if !challan.is_payable() {
            return Err(AppError::ChallanNotPayable(format!(
                "challan {} is {}",
                challan.id, challan.status
            )));
        }
        Ok(())
    }

    /// Checks bank credentials and, when named, that the challan can be paid.
    pub async fn validate_bank(
        &self,
        employer_id: &str,
        bank_name: &str,
        credentials: &BankCredentials,
        challan_id: Option<Uuid>,
    ) -> Result<BankSummary, AppError> {
        let bank = self.authorize(bank_name, credentials)?;
        if let Some(challan_id) = challan_id {
            let challan = self.load(employer_id, challan_id).await?;
            Self::ensure_payable(&challan)?;
        }
        Ok(bank.summary())
    }

    /// A declined debit is stored and returned as a failed payment; the
    /// challan stays due.
    pub async fn pay(
        &self,
        employer_id: &str,
        challan_id: Uuid,
        bank_name: &str,
        credentials: &BankCredentials,
    ) -> Result<Payment, AppError> {
        let bank = self.authorize(bank_name, credentials)?;
        let challan = self.load(employer_id, challan_id).await?;
        Self::ensure_payable(&challan)?;

        let outcome = self.gateway.debit(&bank, &challan).await;
        let (status, failure_reason) = match outcome {
            GatewayOutcome::Approved => (PaymentStatus::Success, None),
            GatewayOutcome::Declined { reason } => (PaymentStatus::Failed, Some(reason)),
        };

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let now = Utc::now();
            let payment = Payment::new(
                &challan,
                &bank.name,
                generate_crn(),
                status,
                failure_reason.clone(),
                now,
            );
            let result = match status {
                PaymentStatus::Success => self.challans.settle(challan.id, now, &payment).await,
                PaymentStatus::Failed => self.challans.record_failed_payment(&payment).await,
            };

            match result {
                Ok(stored) => {
                    if stored.is_success() {
                        tracing::info!(
                            challan_id = %challan.id,
                            crn = %stored.crn,
                            bank = %stored.bank,
                            amount = %stored.amount,
                            "challan paid"
                        );
                    } else {
                        tracing::warn!(
                            challan_id = %challan.id,
                            crn = %stored.crn,
                            reason = stored.failure_reason.as_deref().unwrap_or_default(),
                            "challan payment declined"
                        );
                    }
                    return Ok(stored);
                }
                Err(RepositoryError::UniqueViolation(UniqueKey::PaymentCrn)) => {
                    tracing::warn!(attempt, crn = %payment.crn, "crn collision, regenerating");
                }
                Err(RepositoryError::StaleState(_))
                | Err(RepositoryError::UniqueViolation(UniqueKey::SuccessfulPaymentForChallan)) => {
                    tracing::warn!(challan_id = %challan.id, "challan settled concurrently");
                    return Err(AppError::ChallanNotPayable(format!(
                        "challan {} is no longer due",
                        challan.id
                    )));
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(AppError::Internal(format!(
            "could not allocate a unique crn after {} attempts",
            MAX_REFERENCE_ATTEMPTS
        )))
    }

    pub async fn cancel(&self, employer_id: &str, challan_id: Uuid) -> Result<Challan, AppError> {
        let mut challan = self.load(employer_id, challan_id).await?;
        challan.cancel(Utc::now())?;

        let cancelled = match self.challans.cancel(challan.id, Utc::now()).await {
            Ok(cancelled) => cancelled,
            Err(RepositoryError::StaleState(_)) => {
                return Err(AppError::InvalidTransition(format!(
                    "challan {} is no longer due",
                    challan.id
                )));
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!(
            challan_id = %cancelled.id,
            employer_id = %cancelled.employer_id,
            trrn = %cancelled.trrn,
            "challan cancelled"
        );
        Ok(cancelled)
    }
}
