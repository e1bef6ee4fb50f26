//! Filing-level aggregates.
//!
//! `Totals` is always rebuilt from the full record list; it is never patched
//! in place.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::money::zero;
use super::record::ContributionRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCounts {
    pub active: u32,
    pub joined: u32,
    pub left: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WageTotals {
    pub gross: BigDecimal,
    pub epf: BigDecimal,
    pub eps: BigDecimal,
    pub edli: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionTotals {
    pub employee_pf: BigDecimal,
    pub employer_eps: BigDecimal,
    pub employer_pf: BigDecimal,
    pub difference: BigDecimal,
    pub refund: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub members: MemberCounts,
    pub wages: WageTotals,
    pub contributions: ContributionTotals,
    pub ncp_days: i64,
}

impl Totals {
    pub fn empty() -> Self {
        Self {
            members: MemberCounts::default(),
            wages: WageTotals {
                gross: zero(),
                epf: zero(),
                eps: zero(),
                edli: zero(),
            },
            contributions: ContributionTotals {
                employee_pf: zero(),
                employer_eps: zero(),
                employer_pf: zero(),
                difference: zero(),
                refund: zero(),
            },
            ncp_days: 0,
        }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ContributionRecord>) -> Self {
        let mut builder = TotalsBuilder::new();
        for record in records {
            builder.add(record);
        }
        builder.finish()
    }
}

/// Running sums folded one record at a time.
///
/// Joiners and leavers are not derivable from the file content, so
/// `members.joined` and `members.left` stay at zero and `members.active` is
/// the record count.
#[derive(Debug)]
pub struct TotalsBuilder {
    totals: Totals,
    records: u32,
}

impl TotalsBuilder {
    pub fn new() -> Self {
        Self {
            totals: Totals::empty(),
            records: 0,
        }
    }

    pub fn add(&mut self, record: &ContributionRecord) {
        let wages = &mut self.totals.wages;
        wages.gross += &record.gross_wages;
        wages.epf += &record.epf_wages;
        wages.eps += &record.eps_wages;
        wages.edli += &record.edli_wages;

        let contributions = &mut self.totals.contributions;
        contributions.employee_pf += &record.employee_pf_contribution;
        contributions.employer_eps += &record.employer_eps_contribution;
        contributions.employer_pf += &record.employer_pf_contribution;
        contributions.difference += &record.pf_eps_difference;
        contributions.refund += &record.advance_refund;

        self.totals.ncp_days = self.totals.ncp_days.saturating_add(record.ncp_days);
        self.records += 1;
    }

    pub fn finish(mut self) -> Totals {
        self.totals.members = MemberCounts {
            active: self.records,
            joined: 0,
            left: 0,
        };
        self.totals
    }
}

impl Default for TotalsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
