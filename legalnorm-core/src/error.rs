use thiserror::Error;

/// Error taxonomy shared by every component of the core (spec §7).
///
/// Each variant maps to a single HTTP status at the service boundary;
/// that mapping lives in the enclosing router, not here.
#[derive(Error, Debug, Clone)]
pub enum LegalNormError {
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("resource not found: {what}")]
    ResourceNotFound { what: String },

    #[error("network error: {operation}: {reason}")]
    NetworkError { operation: String, reason: String },

    #[error("rate limited: {source_tag}: {reason}")]
    RateLimit { source_tag: String, reason: String },

    #[error("parsing error: {context}: first bytes: {snippet}")]
    Parsing { context: String, snippet: String },
}

impl LegalNormError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::ResourceNotFound { what: what.into() }
    }

    pub fn network(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NetworkError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn rate_limit(source_tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RateLimit {
            source_tag: source_tag.into(),
            reason: reason.into(),
        }
    }

    /// Builds a `Parsing` error, truncating the diagnostic snippet to the
    /// first 200 characters of the offending HTML (spec §4.6, §7).
    pub fn parsing(context: impl Into<String>, html: &str) -> Self {
        let snippet: String = html.chars().take(200).collect();
        Self::Parsing {
            context: context.into(),
            snippet,
        }
    }

    /// True for errors that should never be retried internally.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::ResourceNotFound { .. }
        )
    }
}

pub type LegalNormResult<T> = Result<T, LegalNormError>;
