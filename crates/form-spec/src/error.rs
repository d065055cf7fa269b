use thiserror::Error;

use crate::validate::ValidationReport;

/// Failures surfaced by the form engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("catalog provider unavailable: {message}")]
    CatalogUnavailable {
        status: Option<u16>,
        message: String,
    },
    #[error("table '{0}' not found in this base")]
    TableNotFound(String),
    #[error("catalog has not been loaded yet")]
    CatalogNotLoaded,
    #[error("form validation failed for {} question(s)", .0.failures.len())]
    ValidationFailed(ValidationReport),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("no catalog field selected")]
    InvalidSelection,
    #[error("condition needs both a question key and a value")]
    IncompleteCondition,
    #[error("question '{0}' is already bound to this form")]
    DuplicateQuestion(String),
    #[error("question '{0}' is not part of this form")]
    UnknownQuestion(String),
    #[error("question '{0}' is hidden by its conditional rules")]
    QuestionHidden(String),
    #[error("form '{0}' not found")]
    FormNotFound(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl FormError {
    /// Builds a `CatalogUnavailable` from an HTTP-like status code.
    pub fn catalog_status(status: u16) -> Self {
        FormError::CatalogUnavailable {
            status: Some(status),
            message: format!("provider responded with status {}", status),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            FormError::CatalogUnavailable {
                status: Some(401),
                ..
            }
        )
    }

    /// The single notification shown to the person driving the form.
    pub fn user_message(&self) -> String {
        match self {
            FormError::CatalogUnavailable { .. } if self.is_unauthorized() => {
                "Sign in and try again".to_string()
            }
            FormError::CatalogUnavailable { .. } => "Could not load table fields".to_string(),
            FormError::TableNotFound(_) => "Table not found in this base".to_string(),
            FormError::CatalogNotLoaded => "Table fields are still loading".to_string(),
            FormError::ValidationFailed(_) => {
                "Please fill all required fields correctly".to_string()
            }
            FormError::SubmissionFailed(_) => "Failed to submit form".to_string(),
            FormError::FormNotFound(_) => "Could not fetch form".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for FormError {
    fn from(err: serde_json::Error) -> Self {
        FormError::MalformedPayload(err.to_string())
    }
}
