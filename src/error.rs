use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    #[error("No subject provided. Either supply a 'subject' parameter or reference a template whose defaults include one.")]
    MissingSubject,

    #[error("Invalid parameters: {0}.")]
    InvalidParameters(String),

    #[error("Parameter '{slot}' must be a string.")]
    InvalidParameterType { slot: &'static str },

    #[error("Parameter '{slot}' must be a non-empty string.")]
    InvalidParameterValue { slot: &'static str },

    #[error("Invalid template: {0}.")]
    InvalidTemplate(String),

    #[error("Template '{id}' not found.")]
    TemplateNotFound { id: String },

    #[error("Invalid completion response: {0}.")]
    InvalidResponse(String),

    #[error("Completion request failed. Original error: {source}")]
    CompletionRequestFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("Sampling failed: {source}")]
    SamplingFailed {
        #[source]
        source: Box<Error>,
    },

    #[error("Internal error: {0}.")]
    Internal(#[source] anyhow::Error),
}

impl Error {
    /// Whether retrying with different input could help the caller.
    ///
    /// Client-input faults (missing subject, bad slot values, unknown
    /// template ids) are distinguished from server/upstream failures
    /// (remote call failures, malformed completion responses).
    /// Stable error code reported to tool callers.
    pub fn code(&self) -> &'static str {
        match self {
            Error::IoError(_) => "IO_ERROR",
            Error::JsonError(_) => "JSON_ERROR",
            Error::MissingSubject => "MISSING_SUBJECT",
            Error::InvalidParameters(_) => "INVALID_PARAMETERS",
            Error::InvalidParameterType { .. } => "INVALID_PARAMETER_TYPE",
            Error::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            Error::InvalidTemplate(_) => "INVALID_TEMPLATE",
            Error::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            Error::InvalidResponse(_) => "INVALID_RESPONSE",
            Error::CompletionRequestFailed { .. } => "COMPLETION_REQUEST_FAILED",
            Error::SamplingFailed { .. } => "SAMPLING_FAILED",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingSubject
                | Error::InvalidParameters(_)
                | Error::InvalidParameterType { .. }
                | Error::InvalidParameterValue { .. }
                | Error::InvalidTemplate(_)
                | Error::TemplateNotFound { .. }
        )
    }
}

/// Convenience type alias for Results with easel's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_distinguished_from_upstream_errors() {
        assert!(Error::MissingSubject.is_client_error());
        assert!(Error::TemplateNotFound { id: "x".into() }.is_client_error());
        assert!(Error::InvalidParameterValue { slot: "style" }.is_client_error());

        assert!(!Error::InvalidResponse("null".into()).is_client_error());
        assert!(!Error::CompletionRequestFailed {
            source: anyhow::anyhow!("connection reset")
        }
        .is_client_error());
        assert!(!Error::SamplingFailed {
            source: Box::new(Error::InvalidResponse("bad".into()))
        }
        .is_client_error());
    }
}
