use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// A single rejected field in an administrator submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} cannot start or end with whitespace")]
    SurroundingWhitespace { field: &'static str },

    #[error("{field} cannot exceed {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} has unknown value '{value}'")]
    UnknownEnumValue { field: &'static str, value: String },

    #[error("{field} must be yes or no, got '{value}'")]
    InvalidBoolean { field: &'static str, value: String },
}

impl ValidationError {
    /// Raw field key the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::SurroundingWhitespace { field }
            | ValidationError::FieldTooLong { field, .. }
            | ValidationError::InvalidUrl { field, .. }
            | ValidationError::UnknownEnumValue { field, .. }
            | ValidationError::InvalidBoolean { field, .. } => field,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::SurroundingWhitespace { .. } => "surrounding_whitespace",
            ValidationError::FieldTooLong { .. } => "field_too_long",
            ValidationError::InvalidUrl { .. } => "invalid_url",
            ValidationError::UnknownEnumValue { .. } => "unknown_enum_value",
            ValidationError::InvalidBoolean { .. } => "invalid_boolean",
        }
    }
}

/// Every field error found in one submission.
///
/// Validation does not stop at the first bad field, so the admin surface can
/// report all of them at once. Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.errors.contains(error)
    }

    /// Messages grouped by field key, for display next to each form field.
    pub fn field_errors(&self) -> BTreeMap<&'static str, Vec<FieldMessage>> {
        let mut grouped: BTreeMap<&'static str, Vec<FieldMessage>> = BTreeMap::new();
        for error in &self.errors {
            grouped.entry(error.field()).or_default().push(FieldMessage {
                code: error.code(),
                message: error.to_string(),
            });
        }
        grouped
    }

    /// `Ok(value)` when no error was recorded.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// One message shown against a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMessage {
    pub code: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_grouped_by_key() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::FieldTooLong {
            field: "attribute_name",
            max: 50,
        });
        errors.push(ValidationError::InvalidBoolean {
            field: "to_lower",
            value: "maybe".to_string(),
        });

        let grouped = errors.field_errors();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["attribute_name"][0].code, "field_too_long");
        assert_eq!(
            grouped["attribute_name"][0].message,
            "attribute_name cannot exceed 50 characters"
        );
        assert_eq!(grouped["to_lower"][0].code, "invalid_boolean");
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::new().into_result(|| 7).unwrap(), 7);

        let errors: ValidationErrors = ValidationError::MissingField { field: "idp_id" }.into();
        let err = errors.into_result(|| 7).unwrap_err();
        assert_eq!(err.to_string(), "idp_id is required");
    }
}
