use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// One member's line in a monthly return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    /// Universal account number of the member.
    pub member_id: String,
    pub member_name: String,
    pub gross_wages: BigDecimal,
    pub epf_wages: BigDecimal,
    pub eps_wages: BigDecimal,
    pub edli_wages: BigDecimal,
    pub employee_pf_contribution: BigDecimal,
    pub employer_eps_contribution: BigDecimal,
    pub employer_pf_contribution: BigDecimal,
    /// `max(employer_pf - employer_eps, 0)`.
    pub pf_eps_difference: BigDecimal,
    pub ncp_days: i64,
    pub advance_refund: BigDecimal,
}

/// Field values of a record before the PF/EPS difference is derived.
#[derive(Debug, Clone)]
pub struct RecordFields {
    pub member_id: String,
    pub member_name: String,
    pub gross_wages: BigDecimal,
    pub epf_wages: BigDecimal,
    pub eps_wages: BigDecimal,
    pub edli_wages: BigDecimal,
    pub employee_pf_contribution: BigDecimal,
    pub employer_eps_contribution: BigDecimal,
    pub employer_pf_contribution: BigDecimal,
    pub ncp_days: i64,
    pub advance_refund: BigDecimal,
}

impl ContributionRecord {
    pub fn new(fields: RecordFields) -> Self {
        let pf_eps_difference = super::money::max(
            &fields.employer_pf_contribution - &fields.employer_eps_contribution,
            super::money::zero(),
        );

        Self {
            member_id: fields.member_id,
            member_name: fields.member_name,
            gross_wages: fields.gross_wages,
            epf_wages: fields.epf_wages,
            eps_wages: fields.eps_wages,
            edli_wages: fields.edli_wages,
            employee_pf_contribution: fields.employee_pf_contribution,
            employer_eps_contribution: fields.employer_eps_contribution,
            employer_pf_contribution: fields.employer_pf_contribution,
            pf_eps_difference,
            ncp_days: fields.ncp_days,
            advance_refund: fields.advance_refund,
        }
    }
}
