//! Parser for `#~#`-delimited monthly return files.
//!
//! Every non-blank line is one member record of exactly eleven fields:
//!
//! ```text
//! UAN#~#NAME#~#GROSS#~#EPF#~#EPS#~#EDLI#~#EE_PF#~#ER_EPS#~#ER_PF#~#NCP_DAYS#~#REFUND
//! ```
//!
//! Structure is checked strictly and one bad line fails the whole file.
//! Numeric fields are lenient: anything that does not parse becomes zero and
//! is reported through [`ParsedReturn::warnings`]. Amounts must be plain
//! decimals (`-12`, `1500.50`); exponent forms are not numbers here.

use bigdecimal::BigDecimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::money::{is_negative, zero};
use crate::domain::{ContributionRecord, RecordFields, Totals, TotalsBuilder};

pub const FIELD_DELIMITER: &str = "#~#";
pub const FIELD_COUNT: usize = 11;

/// Widest integer part accepted for an amount (below one trillion crore).
pub const MAX_INTEGER_DIGITS: usize = 15;
pub const MAX_FRACTION_DIGITS: usize = 4;
pub const MAX_NCP_DAYS: i64 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("return file is empty")]
    EmptyInput,

    #[error("line {line}: {reason}")]
    MalformedRecord { line: usize, reason: MalformedReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    FieldCount { found: usize },
    MissingMemberId,
    MissingMemberName,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::FieldCount { found } => {
                write!(f, "expected {} fields, found {}", FIELD_COUNT, found)
            }
            MalformedReason::MissingMemberId => f.write_str("member id is empty"),
            MalformedReason::MissingMemberName => f.write_str("member name is empty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    GrossWages,
    EpfWages,
    EpsWages,
    EdliWages,
    EmployeePfContribution,
    EmployerEpsContribution,
    EmployerPfContribution,
    NcpDays,
    AdvanceRefund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionKind {
    NotNumeric,
    Negative,
    NotInteger,
    OutOfRange,
}

/// A numeric field that was replaced by zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionWarning {
    pub line: usize,
    pub field: NumericField,
    pub raw: String,
    pub kind: CoercionKind,
}

#[derive(Debug, Clone)]
pub struct ParsedReturn {
    /// Records in input line order.
    pub records: Vec<ContributionRecord>,
    pub totals: Totals,
    pub warnings: Vec<CoercionWarning>,
}

/// Parses a raw return file in a single pass.
pub fn parse_return(bytes: &[u8]) -> Result<ParsedReturn, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut records = Vec::new();
    let mut totals = TotalsBuilder::new();
    let mut warnings = Vec::new();

    for (index, line) in normalized.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_line(index + 1, line, &mut warnings)?;
        totals.add(&record);
        records.push(record);
    }

    if records.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    Ok(ParsedReturn {
        records,
        totals: totals.finish(),
        warnings,
    })
}

fn parse_line(
    line: usize,
    raw: &str,
    warnings: &mut Vec<CoercionWarning>,
) -> Result<ContributionRecord, ParseError> {
    let fields: Vec<&str> = raw.split(FIELD_DELIMITER).map(str::trim).collect();
    let malformed = |reason| ParseError::MalformedRecord { line, reason };

    let [member_id, member_name, gross, epf, eps, edli, employee_pf, employer_eps, employer_pf, ncp_days, refund] =
        fields.as_slice()
    else {
        return Err(malformed(MalformedReason::FieldCount {
            found: fields.len(),
        }));
    };

    if member_id.is_empty() {
        return Err(malformed(MalformedReason::MissingMemberId));
    }
    if member_name.is_empty() {
        return Err(malformed(MalformedReason::MissingMemberName));
    }

    let mut amount = |field, value: &str| coerce_amount(line, field, value, warnings);
    let gross_wages = amount(NumericField::GrossWages, gross);
    let epf_wages = amount(NumericField::EpfWages, epf);
    let eps_wages = amount(NumericField::EpsWages, eps);
    let edli_wages = amount(NumericField::EdliWages, edli);
    let employee_pf_contribution = amount(NumericField::EmployeePfContribution, employee_pf);
    let employer_eps_contribution = amount(NumericField::EmployerEpsContribution, employer_eps);
    let employer_pf_contribution = amount(NumericField::EmployerPfContribution, employer_pf);
    let advance_refund = amount(NumericField::AdvanceRefund, refund);
    let ncp_days = coerce_days(line, ncp_days, warnings);

    Ok(ContributionRecord::new(RecordFields {
        member_id: member_id.to_string(),
        member_name: member_name.to_string(),
        gross_wages,
        epf_wages,
        eps_wages,
        edli_wages,
        employee_pf_contribution,
        employer_eps_contribution,
        employer_pf_contribution,
        ncp_days,
        advance_refund,
    }))
}

fn coerce_amount(
    line: usize,
    field: NumericField,
    raw: &str,
    warnings: &mut Vec<CoercionWarning>,
) -> BigDecimal {
    if raw.is_empty() {
        return zero();
    }

    let mut warn = |kind| {
        warnings.push(CoercionWarning {
            line,
            field,
            raw: raw.to_string(),
            kind,
        })
    };

    let Some(shape) = DecimalShape::of(raw) else {
        warn(CoercionKind::NotNumeric);
        return zero();
    };
    if shape.integer_digits > MAX_INTEGER_DIGITS || shape.fraction_digits > MAX_FRACTION_DIGITS {
        warn(CoercionKind::OutOfRange);
        return zero();
    }

    match BigDecimal::from_str(raw) {
        Ok(value) if is_negative(&value) => {
            warn(CoercionKind::Negative);
            zero()
        }
        Ok(value) => value,
        Err(_) => {
            warn(CoercionKind::NotNumeric);
            zero()
        }
    }
}

fn coerce_days(line: usize, raw: &str, warnings: &mut Vec<CoercionWarning>) -> i64 {
    if raw.is_empty() {
        return 0;
    }

    let kind = match DecimalShape::of(raw) {
        None => CoercionKind::NotNumeric,
        Some(shape) if shape.negative => CoercionKind::Negative,
        Some(shape) if shape.fraction_digits > 0 => CoercionKind::NotInteger,
        Some(_) => match raw.parse::<i64>() {
            Ok(days) if days <= MAX_NCP_DAYS => return days,
            _ => CoercionKind::OutOfRange,
        },
    };

    warnings.push(CoercionWarning {
        line,
        field: NumericField::NcpDays,
        raw: raw.to_string(),
        kind,
    });
    0
}

/// Digit counts of a plain `[+-]digits[.digits]` literal.
struct DecimalShape {
    negative: bool,
    integer_digits: usize,
    fraction_digits: usize,
}

impl DecimalShape {
    fn of(raw: &str) -> Option<Self> {
        let (negative, unsigned) = match raw.as_bytes().first() {
            Some(b'-') => (true, &raw[1..]),
            Some(b'+') => (false, &raw[1..]),
            _ => (false, raw),
        };
        let (integer, fraction) = match unsigned.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (unsigned, ""),
        };
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            negative,
            integer_digits: integer.trim_start_matches('0').len(),
            fraction_digits: fraction.len(),
        })
    }
}
