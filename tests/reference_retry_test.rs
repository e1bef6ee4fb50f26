mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use common::*;
use ecr_core::adapters::{InMemoryStore, SimulatedGateway};
use ecr_core::domain::reference::MAX_REFERENCE_ATTEMPTS;
use ecr_core::domain::{Challan, Filing, Payment, PaymentStatus, RawReturnMetadata, WageMonth};
use ecr_core::error::AppError;
use ecr_core::ports::{
    BankCredentials, ChallanRepository, FilingRepository, RepositoryError, RepositoryResult,
    UniqueKey,
};
use ecr_core::use_cases::{ReviewReturn, SettleChallan, SubmitReturn, SubmitReturnInput};

/// Reports a trrn collision for the first `collisions` inserts.
struct CollidingFilings {
    inner: Arc<InMemoryStore>,
    collisions: AtomicUsize,
    attempted: Mutex<Vec<String>>,
}

impl CollidingFilings {
    fn new(inner: Arc<InMemoryStore>, collisions: usize) -> Self {
        Self {
            inner,
            collisions: AtomicUsize::new(collisions),
            attempted: Mutex::new(Vec::new()),
        }
    }

    fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

fn take_collision(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl FilingRepository for CollidingFilings {
    async fn insert(&self, filing: &Filing) -> RepositoryResult<Filing> {
        self.attempted.lock().unwrap().push(filing.trrn.clone());
        if take_collision(&self.collisions) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::FilingTrrn));
        }
        FilingRepository::insert(self.inner.as_ref(), filing).await
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Filing> {
        FilingRepository::get_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_period(
        &self,
        employer_id: &str,
        wage_month: WageMonth,
    ) -> RepositoryResult<Option<Filing>> {
        self.inner.find_by_period(employer_id, wage_month).await
    }

    async fn list_by_employer(
        &self,
        employer_id: &str,
        wage_month: Option<WageMonth>,
    ) -> RepositoryResult<Vec<Filing>> {
        FilingRepository::list_by_employer(self.inner.as_ref(), employer_id, wage_month).await
    }

    async fn approve(
        &self,
        filing_id: Uuid,
        approved_at: DateTime<Utc>,
        challan: &Challan,
    ) -> RepositoryResult<Challan> {
        self.inner.approve(filing_id, approved_at, challan).await
    }

    async fn delete_uploaded(&self, filing_id: Uuid) -> RepositoryResult<()> {
        self.inner.delete_uploaded(filing_id).await
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.inner.ping().await
    }
}

/// Reports a crn collision for the first `collisions` settlements.
struct CollidingChallans {
    inner: Arc<InMemoryStore>,
    collisions: AtomicUsize,
    attempted: Mutex<Vec<String>>,
}

impl CollidingChallans {
    fn new(inner: Arc<InMemoryStore>, collisions: usize) -> Self {
        Self {
            inner,
            collisions: AtomicUsize::new(collisions),
            attempted: Mutex::new(Vec::new()),
        }
    }

    fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallanRepository for CollidingChallans {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Challan> {
        ChallanRepository::get_by_id(self.inner.as_ref(), id).await
    }

    async fn list_by_employer(&self, employer_id: &str) -> RepositoryResult<Vec<Challan>> {
        ChallanRepository::list_by_employer(self.inner.as_ref(), employer_id).await
    }

    async fn settle(
        &self,
        challan_id: Uuid,
        paid_at: DateTime<Utc>,
        payment: &Payment,
    ) -> RepositoryResult<Payment> {
        self.attempted.lock().unwrap().push(payment.crn.clone());
        if take_collision(&self.collisions) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::PaymentCrn));
        }
        self.inner.settle(challan_id, paid_at, payment).await
    }

    async fn record_failed_payment(&self, payment: &Payment) -> RepositoryResult<Payment> {
        self.inner.record_failed_payment(payment).await
    }

    async fn cancel(&self, challan_id: Uuid, cancelled_at: DateTime<Utc>) -> RepositoryResult<Challan> {
        self.inner.cancel(challan_id, cancelled_at).await
    }

    async fn payments_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Payment>> {
        self.inner.payments_by_ids(ids).await
    }
}

fn input() -> SubmitReturnInput {
    SubmitReturnInput {
        employer_id: EMPLOYER.to_string(),
        metadata: RawReturnMetadata {
            wage_month: Some("2024-03".to_string()),
            ..Default::default()
        },
        file_name: None,
        content: return_file(&[ALICE, BOB]),
    }
}

fn credentials() -> BankCredentials {
    BankCredentials {
        username: BANK_USER.to_string(),
        password: BANK_PASSWORD.to_string(),
    }
}

async fn approved_challan(store: &Arc<InMemoryStore>) -> Challan {
    let filing = SubmitReturn::new(store.clone(), registry())
        .execute(input())
        .await
        .unwrap()
        .filing;
    ReviewReturn::new(store.clone())
        .approve(EMPLOYER, filing.id)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_trrn_collision_regenerates_reference() {
    let store = Arc::new(InMemoryStore::new());
    let filings = Arc::new(CollidingFilings::new(store.clone(), MAX_REFERENCE_ATTEMPTS - 1));
    let submit = SubmitReturn::new(filings.clone(), registry());

    let filing = submit.execute(input()).await.unwrap().filing;

    let attempted = filings.attempted();
    assert_eq!(attempted.len(), MAX_REFERENCE_ATTEMPTS);
    assert_eq!(attempted.last(), Some(&filing.trrn));
    assert_eq!(filing.trrn.len(), 12);

    let stored = FilingRepository::get_by_id(store.as_ref(), filing.id).await.unwrap();
    assert_eq!(stored.trrn, filing.trrn);
}

#[tokio::test]
async fn test_trrn_collisions_give_up_after_bound() {
    let store = Arc::new(InMemoryStore::new());
    let filings = Arc::new(CollidingFilings::new(store.clone(), MAX_REFERENCE_ATTEMPTS));
    let submit = SubmitReturn::new(filings.clone(), registry());

    assert!(matches!(
        submit.execute(input()).await,
        Err(AppError::Internal(_))
    ));
    assert_eq!(filings.attempted().len(), MAX_REFERENCE_ATTEMPTS);

    let stored = FilingRepository::list_by_employer(store.as_ref(), EMPLOYER, None)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_crn_collision_regenerates_reference() {
    let store = Arc::new(InMemoryStore::new());
    let challan = approved_challan(&store).await;
    let challans = Arc::new(CollidingChallans::new(store.clone(), 2));
    let settle = SettleChallan::new(challans.clone(), registry(), Arc::new(SimulatedGateway));

    let payment = settle
        .pay(EMPLOYER, challan.id, BANK, &credentials())
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);

    let attempted = challans.attempted();
    assert_eq!(attempted.len(), 3);
    assert_eq!(attempted.last(), Some(&payment.crn));
    let distinct: HashSet<&String> = attempted.iter().collect();
    assert_eq!(distinct.len(), attempted.len());
}

#[tokio::test]
async fn test_crn_collisions_give_up_after_bound() {
    let store = Arc::new(InMemoryStore::new());
    let challan = approved_challan(&store).await;
    let challans = Arc::new(CollidingChallans::new(store.clone(), MAX_REFERENCE_ATTEMPTS));
    let settle = SettleChallan::new(challans.clone(), registry(), Arc::new(SimulatedGateway));

    assert!(matches!(
        settle.pay(EMPLOYER, challan.id, BANK, &credentials()).await,
        Err(AppError::Internal(_))
    ));
    assert_eq!(challans.attempted().len(), MAX_REFERENCE_ATTEMPTS);

    let still_due = ChallanRepository::get_by_id(store.as_ref(), challan.id)
        .await
        .unwrap();
    assert!(still_due.is_payable());
}
