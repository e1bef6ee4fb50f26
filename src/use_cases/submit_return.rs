//! Submit return use case.
//! Validates declared metadata, parses the uploaded file and stores the filing.

use std::sync::Arc;

use crate::domain::reference::{generate_trrn, MAX_REFERENCE_ATTEMPTS};
use crate::domain::{
    ContributionRecord, EstablishmentInfo, Filing, RawReturnMetadata, ReturnMetadata, SourceFile,
    Totals,
};
use crate::error::AppError;
use crate::parser::{parse_return, CoercionWarning};
use crate::ports::{FilingRepository, ReferenceData, RepositoryError, UniqueKey};
use crate::validation::{validate_employer_id, validate_remark};

/// Input for the SubmitReturn use case.
#[derive(Debug, Clone)]
pub struct SubmitReturnInput {
    pub employer_id: String,
    pub metadata: RawReturnMetadata,
    pub file_name: Option<String>,
    pub content: Vec<u8>,
}

/// Output of the SubmitReturn use case.
#[derive(Debug, Clone)]
pub struct SubmitReturnOutput {
    pub filing: Filing,
    pub warnings: Vec<CoercionWarning>,
}

pub struct SubmitReturn {
    filings: Arc<dyn FilingRepository>,
    reference: Arc<dyn ReferenceData>,
}

impl SubmitReturn {
    pub fn new(filings: Arc<dyn FilingRepository>, reference: Arc<dyn ReferenceData>) -> Self {
        Self { filings, reference }
    }

    pub async fn execute(&self, input: SubmitReturnInput) -> Result<SubmitReturnOutput, AppError> {
        validate_employer_id(&input.employer_id)?;
        if let Some(remark) = input.metadata.remark.as_deref() {
            validate_remark(remark)?;
        }
        let metadata = ReturnMetadata::validate(input.metadata)?;

        let parsed = parse_return(&input.content)?;
        if !parsed.warnings.is_empty() {
            tracing::warn!(
                employer_id = %input.employer_id,
                wage_month = %metadata.wage_month,
                count = parsed.warnings.len(),
                "numeric fields coerced to zero"
            );
        }

        let source = SourceFile {
            file_name: input.file_name,
            file_size: i64::try_from(input.content.len()).unwrap_or(i64::MAX),
            content: String::from_utf8_lossy(&input.content).into_owned(),
        };
        let filing = self
            .create_filing(
                &input.employer_id,
                metadata,
                parsed.records,
                parsed.totals,
                source,
            )
            .await?;

        Ok(SubmitReturnOutput {
            filing,
            warnings: parsed.warnings,
        })
    }

    /// Stores a parsed filing in `uploaded`, regenerating the trrn on collision.
    pub async fn create_filing(
        &self,
        employer_id: &str,
        metadata: ReturnMetadata,
        records: Vec<ContributionRecord>,
        totals: Totals,
        source: SourceFile,
    ) -> Result<Filing, AppError> {
        if let Some(existing) = self
            .filings
            .find_by_period(employer_id, metadata.wage_month)
            .await?
        {
            return Err(duplicate(&existing));
        }

        let establishment = match self.reference.establishment(employer_id) {
            Some(found) => EstablishmentInfo {
                establishment_name: Some(found.establishment_name),
                lin: Some(found.lin),
            },
            None => EstablishmentInfo {
                establishment_name: None,
                lin: Some(self.reference.default_lin()),
            },
        };

        let mut filing = Filing::new(
            employer_id.to_string(),
            establishment,
            metadata,
            records,
            totals,
            source,
            generate_trrn(),
        );

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            match self.filings.insert(&filing).await {
                Ok(stored) => {
                    tracing::info!(
                        filing_id = %stored.id,
                        employer_id = %stored.employer_id,
                        wage_month = %stored.wage_month,
                        trrn = %stored.trrn,
                        members = stored.totals.members.active,
                        "return uploaded"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::UniqueViolation(UniqueKey::FilingTrrn)) => {
                    tracing::warn!(attempt, trrn = %filing.trrn, "trrn collision, regenerating");
                    filing.trrn = generate_trrn();
                }
                Err(RepositoryError::UniqueViolation(UniqueKey::FilingPeriod)) => {
                    let existing = self
                        .filings
                        .find_by_period(employer_id, filing.wage_month)
                        .await?;
                    tracing::warn!(
                        employer_id = %employer_id,
                        wage_month = %filing.wage_month,
                        "concurrent upload for the same wage month"
                    );
                    return Err(match existing {
                        Some(existing) => duplicate(&existing),
                        None => AppError::Internal(
                            "return period conflict without an existing return".to_string(),
                        ),
                    });
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(AppError::Internal(format!(
            "could not allocate a unique trrn after {} attempts",
            MAX_REFERENCE_ATTEMPTS
        )))
    }
}

fn duplicate(existing: &Filing) -> AppError {
    AppError::DuplicateFiling {
        existing_id: existing.id,
        wage_month: existing.wage_month.to_string(),
    }
}
