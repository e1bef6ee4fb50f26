//! Framework-agnostic return, challan and payment entities.

pub mod challan;
pub mod filing;
pub mod money;
pub mod payment;
pub mod record;
pub mod reference;
pub mod totals;
pub mod wage_month;

pub use challan::{compute_challan, Challan, ChallanAccounts, ChallanComputation, ChallanStatus};
pub use filing::{
    ContributionRate, EstablishmentInfo, Filing, FilingStatus, MetadataError, RawReturnMetadata,
    ReturnMetadata, ReturnStatement, ReturnType, SourceFile,
};
pub use payment::{Payment, PaymentStatus};
pub use record::{ContributionRecord, RecordFields};
pub use totals::{Totals, TotalsBuilder};
pub use wage_month::{WageMonth, WageMonthError};

use thiserror::Error;

/// A lifecycle action attempted from a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} {entity} in status '{from}'")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub action: &'static str,
}

impl TransitionError {
    pub fn new(entity: &'static str, from: &'static str, action: &'static str) -> Self {
        Self {
            entity,
            from,
            action,
        }
    }
}
