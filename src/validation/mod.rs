use std::fmt;

pub const EMPLOYER_ID_MAX_LEN: usize = 32;
pub const FILE_NAME_MAX_LEN: usize = 255;
pub const REMARK_MAX_LEN: usize = 500;
pub const REJECTION_REASON_MAX_LEN: usize = 500;
pub const ALLOWED_FILE_EXTENSIONS: &[&str] = &["txt"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Employer ids are establishment codes such as `APHYD1234567001`.
pub fn validate_employer_id(employer_id: &str) -> ValidationResult {
    validate_required("employer_id", employer_id)?;
    validate_max_len("employer_id", employer_id, EMPLOYER_ID_MAX_LEN)?;

    if !employer_id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "employer_id",
            "must contain only letters and digits",
        ));
    }

    Ok(())
}

/// Only plain-text uploads are accepted.
pub fn validate_upload_file_name(file_name: &str) -> ValidationResult {
    validate_required("file_name", file_name)?;
    validate_max_len("file_name", file_name, FILE_NAME_MAX_LEN)?;

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    validate_enum("file_name", &extension, ALLOWED_FILE_EXTENSIONS)
        .map_err(|_| ValidationError::new("file_name", "only .txt files are allowed"))
}

pub fn validate_remark(remark: &str) -> ValidationResult {
    validate_max_len("remark", remark, REMARK_MAX_LEN)
}

pub fn validate_rejection_reason(reason: &str) -> ValidationResult {
    validate_max_len("reason", reason, REJECTION_REASON_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("status", "due", &["due", "paid"]).is_ok());
        assert!(validate_enum("status", "unknown", &["due", "paid"]).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
    }

    #[test]
    fn validates_employer_id() {
        assert!(validate_employer_id("APHYD1234567001").is_ok());
        assert!(validate_employer_id("").is_err());
        assert!(validate_employer_id("APHYD 123").is_err());
        assert!(validate_employer_id(&"A".repeat(33)).is_err());
    }

    #[test]
    fn accepts_only_txt_uploads() {
        assert!(validate_upload_file_name("march.txt").is_ok());
        assert!(validate_upload_file_name("MARCH.TXT").is_ok());
        assert!(validate_upload_file_name("march.csv").is_err());
        assert!(validate_upload_file_name("march").is_err());
        assert!(validate_upload_file_name("").is_err());
    }

    #[test]
    fn bounds_free_text() {
        assert!(validate_remark("first filing").is_ok());
        assert!(validate_remark(&"x".repeat(501)).is_err());
        assert!(validate_rejection_reason(&"x".repeat(500)).is_ok());
    }
}
