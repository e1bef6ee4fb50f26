//! Read-only views over an employer's filings and challans.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::totals::{ContributionTotals, MemberCounts, WageTotals};
use crate::domain::{
    Challan, ChallanStatus, ContributionRate, Filing, FilingStatus, PaymentStatus,
    ReturnStatement, ReturnType, WageMonth,
};
use crate::error::AppError;
use crate::ports::{BankSummary, ChallanRepository, FilingRepository, ReferenceData};

#[derive(Debug, Clone, Serialize)]
pub struct FilingListItem {
    pub id: Uuid,
    pub serial_no: usize,
    pub trrn: String,
    pub wage_month: WageMonth,
    pub return_type: ReturnType,
    pub contribution_rate: ContributionRate,
    pub status: FilingStatus,
    pub status_label: &'static str,
    pub uploaded_at: DateTime<Utc>,
    pub remark: Option<String>,
    pub file_name: Option<String>,
    pub challan_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilingList {
    pub in_process: Vec<FilingListItem>,
    pub recent: Vec<FilingListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyRow {
    pub id: Uuid,
    pub serial_no: usize,
    pub wage_month: WageMonth,
    pub status: FilingStatus,
    pub members: MemberCounts,
    pub wages: WageTotals,
    pub contributions: ContributionTotals,
    pub ncp_days: i64,
    pub trrn: String,
    pub challan_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilingDetail {
    #[serde(flatten)]
    pub filing: Filing,
    pub statement: ReturnStatement,
    pub challan_status: Option<ChallanStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub id: Uuid,
    pub crn: String,
    pub status: PaymentStatus,
    pub bank: String,
    pub amount: BigDecimal,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallanView {
    #[serde(flatten)]
    pub challan: Challan,
    pub payment: Option<PaymentSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub uploaded_returns: usize,
    pub approved_returns: usize,
    pub pending_challans: usize,
}

/// Downloadable copy of an uploaded return file.
#[derive(Debug, Clone)]
pub struct ReturnFileDownload {
    pub file_name: String,
    pub content: String,
}

pub struct EmployerViews {
    filings: Arc<dyn FilingRepository>,
    challans: Arc<dyn ChallanRepository>,
    reference: Arc<dyn ReferenceData>,
}

impl EmployerViews {
    pub fn new(
        filings: Arc<dyn FilingRepository>,
        challans: Arc<dyn ChallanRepository>,
        reference: Arc<dyn ReferenceData>,
    ) -> Self {
        Self {
            filings,
            challans,
            reference,
        }
    }

    async fn owned_filing(&self, employer_id: &str, filing_id: Uuid) -> Result<Filing, AppError> {
        let filing = self.filings.get_by_id(filing_id).await?;
        if filing.employer_id != employer_id {
            return Err(AppError::NotFound(format!("return {}", filing_id)));
        }
        Ok(filing)
    }

    /// Newest upload first, split into returns still awaiting review and the rest.
    pub async fn list_filings(
        &self,
        employer_id: &str,
        wage_month: Option<&str>,
    ) -> Result<FilingList, AppError> {
        let wage_month = wage_month
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(WageMonth::parse)
            .transpose()?;
        let filings = self.filings.list_by_employer(employer_id, wage_month).await?;

        let (in_process, recent): (Vec<Filing>, Vec<Filing>) = filings
            .into_iter()
            .partition(|f| f.status == FilingStatus::Uploaded);

        Ok(FilingList {
            in_process: numbered(&in_process),
            recent: numbered(&recent),
        })
    }

    /// One row per filing, latest wage month first.
    pub async fn monthly(&self, employer_id: &str) -> Result<Vec<MonthlyRow>, AppError> {
        let mut filings = self.filings.list_by_employer(employer_id, None).await?;
        filings.sort_by(|a, b| b.wage_month.cmp(&a.wage_month));

        Ok(filings
            .into_iter()
            .enumerate()
            .map(|(index, f)| MonthlyRow {
                id: f.id,
                serial_no: index + 1,
                wage_month: f.wage_month,
                status: f.status,
                members: f.totals.members,
                wages: f.totals.wages,
                contributions: f.totals.contributions,
                ncp_days: f.totals.ncp_days,
                trrn: f.trrn,
                challan_id: f.challan_id,
            })
            .collect())
    }

    pub async fn filing_detail(
        &self,
        employer_id: &str,
        filing_id: Uuid,
    ) -> Result<FilingDetail, AppError> {
        let filing = self.owned_filing(employer_id, filing_id).await?;
        let challan_status = match filing.challan_id {
            Some(challan_id) => self
                .challans
                .get_by_id(challan_id)
                .await
                .map(|c| Some(c.status))
                .or_else(|err| match err {
                    crate::ports::RepositoryError::NotFound(_) => Ok(None),
                    other => Err(other),
                })?,
            None => None,
        };

        Ok(FilingDetail {
            statement: filing.statement(),
            filing,
            challan_status,
        })
    }

    pub async fn return_file(
        &self,
        employer_id: &str,
        filing_id: Uuid,
    ) -> Result<ReturnFileDownload, AppError> {
        let filing = self.owned_filing(employer_id, filing_id).await?;
        if filing.raw_file_content.is_empty() {
            return Err(AppError::NotFound(format!(
                "return {} file content unavailable",
                filing_id
            )));
        }
        Ok(ReturnFileDownload {
            file_name: filing.download_name(),
            content: filing.raw_file_content,
        })
    }

    /// Newest first, each with its linked payment when there is one.
    pub async fn challans(&self, employer_id: &str) -> Result<Vec<ChallanView>, AppError> {
        let challans = self.challans.list_by_employer(employer_id).await?;
        let payment_ids: Vec<Uuid> = challans.iter().filter_map(|c| c.payment_id).collect();
        let payments: HashMap<Uuid, PaymentSummary> = self
            .challans
            .payments_by_ids(&payment_ids)
            .await?
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    PaymentSummary {
                        id: p.id,
                        crn: p.crn,
                        status: p.status,
                        bank: p.bank,
                        amount: p.amount,
                        processed_at: p.processed_at,
                    },
                )
            })
            .collect();

        Ok(challans
            .into_iter()
            .map(|challan| {
                let payment = challan.payment_id.and_then(|id| payments.get(&id).cloned());
                ChallanView { challan, payment }
            })
            .collect())
    }

    pub async fn dashboard(&self, employer_id: &str) -> Result<DashboardSummary, AppError> {
        let filings = self.filings.list_by_employer(employer_id, None).await?;
        let challans = self.challans.list_by_employer(employer_id).await?;

        Ok(DashboardSummary {
            uploaded_returns: filings.len(),
            approved_returns: filings
                .iter()
                .filter(|f| f.status == FilingStatus::Approved)
                .count(),
            pending_challans: challans.iter().filter(|c| c.is_payable()).count(),
        })
    }

    pub fn banks(&self) -> Vec<BankSummary> {
        self.reference.banks().iter().map(|b| b.summary()).collect()
    }
}

fn numbered(filings: &[Filing]) -> Vec<FilingListItem> {
    filings
        .iter()
        .enumerate()
        .map(|(index, f)| FilingListItem {
            id: f.id,
            serial_no: index + 1,
            trrn: f.trrn.clone(),
            wage_month: f.wage_month,
            return_type: f.return_type,
            contribution_rate: f.contribution_rate,
            status: f.status,
            status_label: f.status.label(),
            uploaded_at: f.uploaded_at,
            remark: f.remark.clone(),
            file_name: f.file_name.clone(),
            challan_id: f.challan_id,
        })
        .collect()
}
