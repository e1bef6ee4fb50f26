//! Postgres implementation of ChallanRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Challan, ChallanAccounts, ChallanStatus, Payment, WageMonth};
use crate::ports::{ChallanRepository, RepositoryError, RepositoryResult};

const CHALLAN_COLUMNS: &str = "id, employer_id, wage_month, return_file_id, trrn, ac1, ac2, ac10, \
     ac21, ac22, total_amount, status, prepared_at, paid_at, cancelled_at, payment_id";

const PAYMENT_COLUMNS: &str =
    "id, challan_id, bank, crn, amount, status, failure_reason, processed_at";

/// Postgres-backed challan and payment repository.
#[derive(Clone)]
pub struct PostgresChallanRepository {
    pool: PgPool,
}

impl PostgresChallanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn challan_exists(&self, id: Uuid) -> RepositoryResult<bool> {
        let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM challans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(found.is_some())
    }
}

/// Inserts a challan inside the caller's transaction.
pub(super) async fn insert_challan(
    tx: &mut Transaction<'_, Postgres>,
    challan: &Challan,
) -> RepositoryResult<Challan> {
    let query = format!(
        r#"
        INSERT INTO challans ({CHALLAN_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {CHALLAN_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, ChallanRow>(&query)
        .bind(challan.id)
        .bind(&challan.employer_id)
        .bind(challan.wage_month.to_string())
        .bind(challan.return_file_id)
        .bind(&challan.trrn)
        .bind(&challan.accounts.ac1)
        .bind(&challan.accounts.ac2)
        .bind(&challan.accounts.ac10)
        .bind(&challan.accounts.ac21)
        .bind(&challan.accounts.ac22)
        .bind(&challan.total_amount)
        .bind(challan.status.as_str())
        .bind(challan.prepared_at)
        .bind(challan.paid_at)
        .bind(challan.cancelled_at)
        .bind(challan.payment_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(RepositoryError::from)?;

    row.into_domain()
}

async fn insert_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> RepositoryResult<Payment> {
    let query = format!(
        r#"
        INSERT INTO payments ({PAYMENT_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {PAYMENT_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, PaymentRow>(&query)
        .bind(payment.id)
        .bind(payment.challan_id)
        .bind(&payment.bank)
        .bind(&payment.crn)
        .bind(&payment.amount)
        .bind(payment.status.as_str())
        .bind(&payment.failure_reason)
        .bind(payment.processed_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(RepositoryError::from)?;

    row.into_domain()
}

#[async_trait]
impl ChallanRepository for PostgresChallanRepository {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Challan> {
        let query = format!("SELECT {CHALLAN_COLUMNS} FROM challans WHERE id = $1");
        let row = sqlx::query_as::<_, ChallanRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }

    async fn list_by_employer(&self, employer_id: &str) -> RepositoryResult<Vec<Challan>> {
        let query = format!(
            "SELECT {CHALLAN_COLUMNS} FROM challans WHERE employer_id = $1 ORDER BY prepared_at DESC"
        );
        let rows = sqlx::query_as::<_, ChallanRow>(&query)
            .bind(employer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        rows.into_iter().map(ChallanRow::into_domain).collect()
    }

    async fn settle(
        &self,
        challan_id: Uuid,
        paid_at: DateTime<Utc>,
        payment: &Payment,
    ) -> RepositoryResult<Payment> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let stored = insert_payment(&mut tx, payment).await?;
        let updated = sqlx::query(
            r#"
            UPDATE challans
            SET status = 'paid', paid_at = $2, payment_id = $3
            WHERE id = $1 AND status = 'due'
            "#,
        )
        .bind(challan_id)
        .bind(paid_at)
        .bind(stored.id)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(RepositoryError::from)?;
            return Err(if self.challan_exists(challan_id).await? {
                RepositoryError::StaleState(format!("challan {}", challan_id))
            } else {
                RepositoryError::NotFound(challan_id.to_string())
            });
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(stored)
    }

    async fn record_failed_payment(&self, payment: &Payment) -> RepositoryResult<Payment> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let stored = insert_payment(&mut tx, payment).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(stored)
    }

    async fn cancel(&self, challan_id: Uuid, cancelled_at: DateTime<Utc>) -> RepositoryResult<Challan> {
        let query = format!(
            r#"
            UPDATE challans SET status = 'cancelled', cancelled_at = $2
            WHERE id = $1 AND status = 'due'
            RETURNING {CHALLAN_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ChallanRow>(&query)
            .bind(challan_id)
            .bind(cancelled_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain(),
            None if self.challan_exists(challan_id).await? => {
                Err(RepositoryError::StaleState(format!("challan {}", challan_id)))
            }
            None => Err(RepositoryError::NotFound(challan_id.to_string())),
        }
    }

    async fn payments_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<Payment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ANY($1) ORDER BY processed_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        rows.into_iter().map(PaymentRow::into_domain).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct ChallanRow {
    id: Uuid,
    employer_id: String,
    wage_month: String,
    return_file_id: Uuid,
    trrn: String,
    ac1: BigDecimal,
    ac2: BigDecimal,
    ac10: BigDecimal,
    ac21: BigDecimal,
    ac22: BigDecimal,
    total_amount: BigDecimal,
    status: String,
    prepared_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    payment_id: Option<Uuid>,
}

impl ChallanRow {
    fn into_domain(self) -> RepositoryResult<Challan> {
        let wage_month = WageMonth::parse(&self.wage_month).map_err(|_| {
            RepositoryError::Corrupt(format!("challan {}: wage_month '{}'", self.id, self.wage_month))
        })?;
        let status: ChallanStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Corrupt(format!("challan {}: {}", self.id, e)))?;

        Ok(Challan {
            id: self.id,
            employer_id: self.employer_id,
            wage_month,
            return_file_id: self.return_file_id,
            trrn: self.trrn,
            accounts: ChallanAccounts {
                ac1: self.ac1,
                ac2: self.ac2,
                ac10: self.ac10,
                ac21: self.ac21,
                ac22: self.ac22,
            },
            total_amount: self.total_amount,
            status,
            prepared_at: self.prepared_at,
            paid_at: self.paid_at,
            cancelled_at: self.cancelled_at,
            payment_id: self.payment_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    challan_id: Uuid,
    bank: String,
    crn: String,
    amount: BigDecimal,
    status: String,
    failure_reason: Option<String>,
    processed_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> RepositoryResult<Payment> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Corrupt(format!("payment {}: {}", self.id, e)))?;

        Ok(Payment {
            id: self.id,
            challan_id: self.challan_id,
            bank: self.bank,
            crn: self.crn,
            amount: self.amount,
            status,
            failure_reason: self.failure_reason,
            processed_at: self.processed_at,
        })
    }
}
