//! Directory client error types.

use thiserror::Error;

/// Errors surfaced by directory client implementations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("Directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with a non-success status.
    #[error("Directory returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Token acquisition for the admin API failed.
    #[error("Directory authentication failed: {0}")]
    Auth(String),

    /// The directory answered 2xx but the payload was not usable.
    #[error("Invalid directory response: {0}")]
    InvalidResponse(String),
}

impl DirectoryError {
    /// Upstream HTTP status, when one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            DirectoryError::Upstream { status, .. } => Some(*status),
            DirectoryError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_reports_status() {
        let err = DirectoryError::Upstream {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Directory returned 404: not found");
    }

    #[test]
    fn auth_error_has_no_status() {
        let err = DirectoryError::Auth("bad client secret".to_string());
        assert_eq!(err.status(), None);
    }
}
