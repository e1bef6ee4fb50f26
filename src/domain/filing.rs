//! Monthly return filing aggregate and its lifecycle.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::record::ContributionRecord;
use super::totals::Totals;
use super::wage_month::{WageMonth, WageMonthError};
use super::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Regular,
    Revised,
    Supplementary,
}

impl ReturnType {
    pub const ALL: [ReturnType; 3] = [
        ReturnType::Regular,
        ReturnType::Revised,
        ReturnType::Supplementary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Regular => "Regular Return",
            ReturnType::Revised => "Revised Return",
            ReturnType::Supplementary => "Supplementary Return",
        }
    }

    /// Only regular returns can be filed through this pipeline.
    pub fn is_supported(&self) -> bool {
        matches!(self, ReturnType::Regular)
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnType {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == s)
            .ok_or_else(|| MetadataError::UnsupportedReturnType(s.to_string()))
    }
}

impl Serialize for ReturnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReturnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Statutory contribution rate in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributionRate {
    Ten,
    Twelve,
}

impl ContributionRate {
    pub const ALLOWED: [ContributionRate; 2] = [ContributionRate::Ten, ContributionRate::Twelve];

    pub fn percent(&self) -> u8 {
        match self {
            ContributionRate::Ten => 10,
            ContributionRate::Twelve => 12,
        }
    }

    pub fn from_percent(percent: i64) -> Option<Self> {
        Self::ALLOWED
            .into_iter()
            .find(|rate| i64::from(rate.percent()) == percent)
    }
}

impl FromStr for ContributionRate {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MetadataError::InvalidContributionRate(s.to_string());
        let value: f64 = s.trim().parse().map_err(|_| invalid())?;
        if value.fract() != 0.0 {
            return Err(invalid());
        }
        Self::from_percent(value as i64).ok_or_else(invalid)
    }
}

impl Serialize for ContributionRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.percent())
    }
}

impl<'de> Deserialize<'de> for ContributionRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::from_percent(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported contribution rate {}", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("only \"Regular Return\" is allowed, got '{0}'")]
    UnsupportedReturnType(String),

    #[error("contribution rate must be one of 10, 12, got '{0}'")]
    InvalidContributionRate(String),

    #[error(transparent)]
    InvalidWageMonth(#[from] WageMonthError),
}

/// Declared metadata accompanying an uploaded return, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReturnMetadata {
    pub wage_month: Option<String>,
    pub return_type: Option<String>,
    pub contribution_rate: Option<String>,
    pub remark: Option<String>,
}

/// Declared metadata after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnMetadata {
    pub wage_month: WageMonth,
    pub return_type: ReturnType,
    pub contribution_rate: ContributionRate,
    pub remark: Option<String>,
}

impl ReturnMetadata {
    /// Checks return type, then contribution rate, then wage month.
    pub fn validate(raw: RawReturnMetadata) -> Result<Self, MetadataError> {
        let return_type = match raw.return_type.as_deref().map(str::trim) {
            None | Some("") => ReturnType::Regular,
            Some(value) => value.parse::<ReturnType>()?,
        };
        if !return_type.is_supported() {
            return Err(MetadataError::UnsupportedReturnType(return_type.to_string()));
        }

        let contribution_rate = match raw.contribution_rate.as_deref().map(str::trim) {
            None | Some("") => ContributionRate::Twelve,
            Some(value) => value.parse::<ContributionRate>()?,
        };

        let wage_month = match raw.wage_month.as_deref() {
            None => return Err(WageMonthError::Missing.into()),
            Some(value) => WageMonth::parse(value)?,
        };

        let remark = raw
            .remark
            .map(|r| crate::validation::sanitize_string(&r))
            .filter(|r| !r.is_empty());

        Ok(Self {
            wage_month,
            return_type,
            contribution_rate,
            remark,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingStatus {
    Uploaded,
    Approved,
    Rejected,
}

impl FilingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilingStatus::Uploaded => "uploaded",
            FilingStatus::Approved => "approved",
            FilingStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilingStatus::Uploaded => "Return Statement Generated",
            FilingStatus::Approved => "Approved",
            FilingStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(FilingStatus::Uploaded),
            "approved" => Ok(FilingStatus::Approved),
            "rejected" => Ok(FilingStatus::Rejected),
            other => Err(format!("unknown filing status '{}'", other)),
        }
    }
}

/// The uploaded file a filing was parsed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_name: Option<String>,
    pub file_size: i64,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstablishmentInfo {
    pub establishment_name: Option<String>,
    pub lin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filing {
    pub id: Uuid,
    pub employer_id: String,
    pub establishment_name: Option<String>,
    pub lin: Option<String>,
    pub wage_month: WageMonth,
    pub return_type: ReturnType,
    pub contribution_rate: ContributionRate,
    pub remark: Option<String>,
    pub file_name: Option<String>,
    pub file_size: i64,
    #[serde(skip_serializing)]
    pub raw_file_content: String,
    pub status: FilingStatus,
    pub totals: Totals,
    pub records: Vec<ContributionRecord>,
    pub trrn: String,
    pub challan_id: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Filing {
    pub fn new(
        employer_id: String,
        establishment: EstablishmentInfo,
        metadata: ReturnMetadata,
        records: Vec<ContributionRecord>,
        totals: Totals,
        source: SourceFile,
        trrn: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            employer_id,
            establishment_name: establishment.establishment_name,
            lin: establishment.lin,
            wage_month: metadata.wage_month,
            return_type: metadata.return_type,
            contribution_rate: metadata.contribution_rate,
            remark: metadata.remark,
            file_name: source.file_name,
            file_size: source.file_size,
            raw_file_content: source.content,
            status: FilingStatus::Uploaded,
            totals,
            records,
            trrn,
            challan_id: None,
            uploaded_at: Utc::now(),
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    /// Whether this filing still holds its employer's wage-month slot.
    pub fn occupies_period(&self) -> bool {
        self.status != FilingStatus::Rejected
    }

    pub fn ensure_uploaded(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.status != FilingStatus::Uploaded {
            return Err(TransitionError::new("return", self.status.as_str(), action));
        }
        Ok(())
    }

    pub fn approve(&mut self, challan_id: Uuid, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_uploaded("approve")?;
        self.status = FilingStatus::Approved;
        self.challan_id = Some(challan_id);
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, reason: String, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_uploaded("reject")?;
        self.status = FilingStatus::Rejected;
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    pub fn download_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("{}.txt", self.trrn))
    }

    pub fn statement(&self) -> ReturnStatement {
        let contributions = &self.totals.contributions;
        ReturnStatement {
            establishment_name: self.establishment_name.clone(),
            establishment_id: self.employer_id.clone(),
            lin: self.lin.clone(),
            contribution_rate: self.contribution_rate,
            trrn: self.trrn.clone(),
            uploaded_at: self.uploaded_at,
            remark: self.remark.clone(),
            exemption_status: EXEMPTION_STATUS,
            totals: StatementTotals {
                members: self.totals.members.active,
                epf_contribution: contributions.employee_pf.clone(),
                epf_eps_contribution: contributions.employer_pf.clone(),
                eps_contribution: contributions.employer_eps.clone(),
                refund_of_advance: contributions.refund.clone(),
            },
            records: self.records.clone(),
        }
    }
}

const EXEMPTION_STATUS: &str = "Unexempted";

/// Printable return statement for a filing.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnStatement {
    pub establishment_name: Option<String>,
    pub establishment_id: String,
    pub lin: Option<String>,
    pub contribution_rate: ContributionRate,
    pub trrn: String,
    pub uploaded_at: DateTime<Utc>,
    pub remark: Option<String>,
    pub exemption_status: &'static str,
    pub totals: StatementTotals,
    pub records: Vec<ContributionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementTotals {
    pub members: u32,
    pub epf_contribution: BigDecimal,
    pub epf_eps_contribution: BigDecimal,
    pub eps_contribution: BigDecimal,
    pub refund_of_advance: BigDecimal,
}
