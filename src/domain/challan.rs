//! Payable statement derived from an approved filing.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::filing::Filing;
use super::money::{self, per_mille, round_currency};
use super::totals::Totals;
use super::wage_month::WageMonth;
use super::TransitionError;

/// Administrative charge on EPF wages, per mille.
pub const ADMIN_CHARGE_PER_MILLE: i64 = 5;
/// Minimum administrative charge.
pub const ADMIN_CHARGE_FLOOR: i64 = 500;
/// EDLI contribution on EDLI wages, per mille.
pub const EDLI_PER_MILLE: i64 = 5;

/// Statutory account buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallanAccounts {
    /// Provident fund: employee share plus the employer's PF/EPS difference.
    pub ac1: BigDecimal,
    /// Administrative charges.
    pub ac2: BigDecimal,
    /// Pension fund.
    pub ac10: BigDecimal,
    /// EDLI contribution.
    pub ac21: BigDecimal,
    /// EDLI administrative charges; always zero.
    pub ac22: BigDecimal,
}

impl ChallanAccounts {
    pub fn sum(&self) -> BigDecimal {
        &self.ac1 + &self.ac2 + &self.ac10 + &self.ac21 + &self.ac22
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChallanComputation {
    pub accounts: ChallanAccounts,
    pub total_amount: BigDecimal,
}

/// Derives the account split and total payable from a filing's totals.
pub fn compute_challan(totals: &Totals) -> ChallanComputation {
    let contributions = &totals.contributions;

    let ac1 = &contributions.employee_pf + &contributions.difference;
    let ac2 = round_currency(&money::max(
        per_mille(&totals.wages.epf, ADMIN_CHARGE_PER_MILLE),
        BigDecimal::from(ADMIN_CHARGE_FLOOR),
    ));
    let ac10 = contributions.employer_eps.clone();
    let ac21 = round_currency(&per_mille(&totals.wages.edli, EDLI_PER_MILLE));
    let ac22 = money::zero();

    let accounts = ChallanAccounts {
        ac1,
        ac2,
        ac10,
        ac21,
        ac22,
    };
    let total_amount = round_currency(&accounts.sum());

    ChallanComputation {
        accounts,
        total_amount,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallanStatus {
    Due,
    Paid,
    Cancelled,
}

impl ChallanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallanStatus::Due => "due",
            ChallanStatus::Paid => "paid",
            ChallanStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ChallanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "due" => Ok(ChallanStatus::Due),
            "paid" => Ok(ChallanStatus::Paid),
            "cancelled" => Ok(ChallanStatus::Cancelled),
            other => Err(format!("unknown challan status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challan {
    pub id: Uuid,
    pub employer_id: String,
    pub wage_month: WageMonth,
    pub return_file_id: Uuid,
    pub trrn: String,
    pub accounts: ChallanAccounts,
    pub total_amount: BigDecimal,
    pub status: ChallanStatus,
    pub prepared_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
}

impl Challan {
    /// Prepares the challan for a filing that is being approved.
    pub fn for_filing(filing: &Filing, prepared_at: DateTime<Utc>) -> Self {
        let ChallanComputation {
            accounts,
            total_amount,
        } = compute_challan(&filing.totals);

        Self {
            id: Uuid::new_v4(),
            employer_id: filing.employer_id.clone(),
            wage_month: filing.wage_month,
            return_file_id: filing.id,
            trrn: filing.trrn.clone(),
            accounts,
            total_amount,
            status: ChallanStatus::Due,
            prepared_at,
            paid_at: None,
            cancelled_at: None,
            payment_id: None,
        }
    }

    pub fn is_payable(&self) -> bool {
        self.status == ChallanStatus::Due
    }

    pub fn mark_paid(&mut self, payment_id: Uuid, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_due("pay")?;
        self.status = ChallanStatus::Paid;
        self.paid_at = Some(at);
        self.payment_id = Some(payment_id);
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_due("cancel")?;
        self.status = ChallanStatus::Cancelled;
        self.cancelled_at = Some(at);
        Ok(())
    }

    fn ensure_due(&self, action: &'static str) -> Result<(), TransitionError> {
        if !self.is_payable() {
            return Err(TransitionError::new("challan", self.status.as_str(), action));
        }
        Ok(())
    }
}
