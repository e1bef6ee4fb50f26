//! In-process implementation of the repository ports.
//!
//! One mutex guards all three collections so every compare-and-set below is
//! atomic with respect to the others, mirroring the Postgres transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{Challan, Filing, FilingStatus, Payment, PaymentStatus, WageMonth};
use crate::ports::{
    ChallanRepository, FilingRepository, RepositoryError, RepositoryResult, UniqueKey,
};

#[derive(Default)]
struct MemoryState {
    filings: HashMap<Uuid, Filing>,
    challans: HashMap<Uuid, Challan>,
    payments: HashMap<Uuid, Payment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl MemoryState {
    fn check_payment_unique(&self, payment: &Payment) -> RepositoryResult<()> {
        if self.payments.values().any(|p| p.crn == payment.crn) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::PaymentCrn));
        }
        Ok(())
    }
}

#[async_trait]
impl FilingRepository for InMemoryStore {
    async fn insert(&self, filing: &Filing) -> RepositoryResult<Filing> {
        let mut state = self.lock()?;
        if state.filings.values().any(|f| f.trrn == filing.trrn) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::FilingTrrn));
        }
        if state
            .filings
            .values()
            .any(|f| f.employer_id == filing.employer_id && f.wage_month == filing.wage_month)
        {
            return Err(RepositoryError::UniqueViolation(UniqueKey::FilingPeriod));
        }
        state.filings.insert(filing.id, filing.clone());
        Ok(filing.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Filing> {
        self.lock()?
            .filings
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn find_by_period(
        &self,
        employer_id: &str,
        wage_month: WageMonth,
    ) -> RepositoryResult<Option<Filing>> {
        Ok(self
            .lock()?
            .filings
            .values()
            .find(|f| f.employer_id == employer_id && f.wage_month == wage_month)
            .cloned())
    }

    async fn list_by_employer(
        &self,
        employer_id: &str,
        wage_month: Option<WageMonth>,
    ) -> RepositoryResult<Vec<Filing>> {
        let mut filings: Vec<Filing> = self
            .lock()?
            .filings
            .values()
            .filter(|f| f.employer_id == employer_id)
            .filter(|f| wage_month.map_or(true, |month| f.wage_month == month))
            .cloned()
            .collect();
        filings.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(filings)
    }

    async fn approve(
        &self,
        filing_id: Uuid,
        approved_at: DateTime<Utc>,
        challan: &Challan,
    ) -> RepositoryResult<Challan> {
        let mut state = self.lock()?;
        let status = state
            .filings
            .get(&filing_id)
            .map(|f| f.status)
            .ok_or_else(|| RepositoryError::NotFound(filing_id.to_string()))?;
        if status != FilingStatus::Uploaded {
            return Err(RepositoryError::StaleState(format!("return {}", filing_id)));
        }
        if state.challans.values().any(|c| c.return_file_id == filing_id) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::ChallanForFiling));
        }
        if state.challans.values().any(|c| c.trrn == challan.trrn) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::ChallanTrrn));
        }

        state.challans.insert(challan.id, challan.clone());
        if let Some(filing) = state.filings.get_mut(&filing_id) {
            filing.status = FilingStatus::Approved;
            filing.approved_at = Some(approved_at);
            filing.challan_id = Some(challan.id);
        }
        Ok(challan.clone())
    }

    async fn delete_uploaded(&self, filing_id: Uuid) -> RepositoryResult<()> {
        let mut state = self.lock()?;
        match state.filings.get(&filing_id).map(|f| f.status) {
            None => Err(RepositoryError::NotFound(filing_id.to_string())),
            Some(FilingStatus::Uploaded) => {
                state.filings.remove(&filing_id);
                Ok(())
            }
            Some(_) => Err(RepositoryError::StaleState(format!("return {}", filing_id))),
        }
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl ChallanRepository for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Challan> {
        self.lock()?
            .challans
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn list_by_employer(&self, employer_id: &str) -> RepositoryResult<Vec<Challan>> {
        let mut challans: Vec<Challan> = self
            .lock()?
            .challans
            .values()
            .filter(|c| c.employer_id == employer_id)
            .cloned()
            .collect();
        challans.sort_by(|a, b| b.prepared_at.cmp(&a.prepared_at));
        Ok(challans)
    }

    async fn settle(
        &self,
        challan_id: Uuid,
        paid_at: DateTime<Utc>,
        payment: &Payment,
    ) -> RepositoryResult<Payment> {
        let mut state = self.lock()?;
        let challan = state
            .challans
            .get(&challan_id)
            .ok_or_else(|| RepositoryError::NotFound(challan_id.to_string()))?;
        if !challan.is_payable() {
            return Err(RepositoryError::StaleState(format!("challan {}", challan_id)));
        }
        state.check_payment_unique(payment)?;
        if state
            .payments
            .values()
            .any(|p| p.challan_id == challan_id && p.status == PaymentStatus::Success)
        {
            return Err(RepositoryError::UniqueViolation(
                UniqueKey::SuccessfulPaymentForChallan,
            ));
        }

        state.payments.insert(payment.id, payment.clone());
        if let Some(challan) = state.challans.get_mut(&challan_id) {
            challan
                .mark_paid(payment.id, paid_at)
                .map_err(|e| RepositoryError::StaleState(e.to_string()))?;
        }
        Ok(payment.clone())
    }

    async fn record_failed_payment(&self, payment: &Payment) -> RepositoryResult<Payment> {
        let mut state = self.lock()?;
        if !state.challans.contains_key(&payment.challan_id) {
            return Err(RepositoryError::NotFound(payment.challan_id.to_string()));
        }
        state.check_payment_unique(payment)?;
        state.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn cancel(&self, challan_id: Uuid, cancelled_at: DateTime<Utc>) -> RepositoryResult<Challan> {
        let mut state = self.lock()?;
        let challan = state
            .challans
            .get_mut(&challan_id)
            .ok_or_else(|| RepositoryError::NotFound(challan_id.to_string()))?;
        challan
            .cancel(cancelled_at)
            .map_err(|_| RepositoryError::StaleState(format!("challan {}", challan_id)))?;
        Ok(challan.clone())
    }

    async fn payments_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Payment>> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.payments.get(id).cloned())
            .collect())
    }
}
