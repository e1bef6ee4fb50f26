//! Postgres implementation of FilingRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Challan, ContributionRate, ContributionRecord, Filing, FilingStatus, Totals, WageMonth,
};
use crate::ports::{FilingRepository, RepositoryError, RepositoryResult};

use super::postgres_challan_repository::insert_challan;

const FILING_COLUMNS: &str = "id, employer_id, establishment_name, lin, wage_month, return_type, \
     contribution_rate, remark, file_name, file_size, raw_file_content, status, totals, records, \
     trrn, challan_id, uploaded_at, approved_at, rejected_at, rejection_reason";

/// Postgres-backed return file repository.
#[derive(Clone)]
pub struct PostgresFilingRepository {
    pool: PgPool,
}

impl PostgresFilingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FilingRepository for PostgresFilingRepository {
    async fn insert(&self, filing: &Filing) -> RepositoryResult<Filing> {
        let query = format!(
            r#"
            INSERT INTO return_files ({FILING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {FILING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FilingRow>(&query)
            .bind(filing.id)
            .bind(&filing.employer_id)
            .bind(&filing.establishment_name)
            .bind(&filing.lin)
            .bind(filing.wage_month.to_string())
            .bind(filing.return_type.as_str())
            .bind(i16::from(filing.contribution_rate.percent()))
            .bind(&filing.remark)
            .bind(&filing.file_name)
            .bind(filing.file_size)
            .bind(&filing.raw_file_content)
            .bind(filing.status.as_str())
            .bind(Json(&filing.totals))
            .bind(Json(&filing.records))
            .bind(&filing.trrn)
            .bind(filing.challan_id)
            .bind(filing.uploaded_at)
            .bind(filing.approved_at)
            .bind(filing.rejected_at)
            .bind(&filing.rejection_reason)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Filing> {
        let query = format!("SELECT {FILING_COLUMNS} FROM return_files WHERE id = $1");
        let row = sqlx::query_as::<_, FilingRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }

    async fn find_by_period(
        &self,
        employer_id: &str,
        wage_month: WageMonth,
    ) -> RepositoryResult<Option<Filing>> {
        let query = format!(
            "SELECT {FILING_COLUMNS} FROM return_files WHERE employer_id = $1 AND wage_month = $2"
        );
        let row = sqlx::query_as::<_, FilingRow>(&query)
            .bind(employer_id)
            .bind(wage_month.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.map(FilingRow::into_domain).transpose()
    }

    async fn list_by_employer(
        &self,
        employer_id: &str,
        wage_month: Option<WageMonth>,
    ) -> RepositoryResult<Vec<Filing>> {
        let query = format!(
            r#"
            SELECT {FILING_COLUMNS} FROM return_files
            WHERE employer_id = $1 AND ($2::TEXT IS NULL OR wage_month = $2)
            ORDER BY uploaded_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, FilingRow>(&query)
            .bind(employer_id)
            .bind(wage_month.map(|m| m.to_string()))
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        rows.into_iter().map(FilingRow::into_domain).collect()
    }

    async fn approve(
        &self,
        filing_id: Uuid,
        approved_at: DateTime<Utc>,
        challan: &Challan,
    ) -> RepositoryResult<Challan> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let updated = sqlx::query(
            r#"
            UPDATE return_files
            SET status = 'approved', approved_at = $2, challan_id = $3
            WHERE id = $1 AND status = 'uploaded'
            "#,
        )
        .bind(filing_id)
        .bind(approved_at)
        .bind(challan.id)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        if updated.rows_affected() == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM return_files WHERE id = $1")
                .bind(filing_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;
            return Err(match exists {
                Some(_) => RepositoryError::StaleState(format!("return {}", filing_id)),
                None => RepositoryError::NotFound(filing_id.to_string()),
            });
        }

        let stored = insert_challan(&mut tx, challan).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        tracing::debug!(filing_id = %filing_id, challan_id = %stored.id, "return approved");
        Ok(stored)
    }

    async fn delete_uploaded(&self, filing_id: Uuid) -> RepositoryResult<()> {
        let deleted = sqlx::query("DELETE FROM return_files WHERE id = $1 AND status = 'uploaded'")
            .bind(filing_id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        if deleted.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM return_files WHERE id = $1")
            .bind(filing_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        match exists {
            Some(_) => Err(RepositoryError::StaleState(format!("return {}", filing_id))),
            None => Err(RepositoryError::NotFound(filing_id.to_string())),
        }
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct FilingRow {
    id: Uuid,
    employer_id: String,
    establishment_name: Option<String>,
    lin: Option<String>,
    wage_month: String,
    return_type: String,
    contribution_rate: i16,
    remark: Option<String>,
    file_name: Option<String>,
    file_size: i64,
    raw_file_content: String,
    status: String,
    totals: Json<Totals>,
    records: Json<Vec<ContributionRecord>>,
    trrn: String,
    challan_id: Option<Uuid>,
    uploaded_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl FilingRow {
    fn into_domain(self) -> RepositoryResult<Filing> {
        let id = self.id;
        let corrupt = move |what: &str, value: &str| {
            RepositoryError::Corrupt(format!("return {}: {} '{}'", id, what, value))
        };
        let wage_month = WageMonth::parse(&self.wage_month)
            .map_err(|_| corrupt("wage_month", &self.wage_month))?;
        let return_type = self
            .return_type
            .parse()
            .map_err(|_| corrupt("return_type", &self.return_type))?;
        let contribution_rate = ContributionRate::from_percent(i64::from(self.contribution_rate))
            .ok_or_else(|| corrupt("contribution_rate", &self.contribution_rate.to_string()))?;
        let status: FilingStatus = self
            .status
            .parse()
            .map_err(|_| corrupt("status", &self.status))?;

        Ok(Filing {
            id: self.id,
            employer_id: self.employer_id,
            establishment_name: self.establishment_name,
            lin: self.lin,
            wage_month,
            return_type,
            contribution_rate,
            remark: self.remark,
            file_name: self.file_name,
            file_size: self.file_size,
            raw_file_content: self.raw_file_content,
            status,
            totals: self.totals.0,
            records: self.records.0,
            trrn: self.trrn,
            challan_id: self.challan_id,
            uploaded_at: self.uploaded_at,
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason,
        })
    }
}
