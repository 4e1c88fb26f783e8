use std::fmt;

/// A failed call to the translation service.
///
/// Transient failures (network, 5xx, timeout) and permanent failures (auth,
/// other 4xx) are recovered the same way (the affected call fails and the
/// pipeline moves on) but are logged at different levels.
#[derive(Debug)]
pub enum TranslateError {
    /// The request did not complete within the per-request timeout.
    Timeout,
    /// Connection-level failure before a response was received.
    Network(String),
    /// Non-success HTTP status from the service.
    Status { code: u16, body: String },
    /// A response arrived but could not be interpreted.
    Malformed(String),
}

impl TranslateError {
    /// True for failures unlikely to succeed on retry (auth, bad request).
    /// Rate limiting is treated as transient.
    pub fn is_permanent(&self) -> bool {
        match self {
            TranslateError::Status { code, .. } => (400..500).contains(code) && *code != 429,
            _ => false,
        }
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Timeout => write!(f, "translation request timed out"),
            TranslateError::Network(msg) => write!(f, "translation request failed: {msg}"),
            TranslateError::Status { code, body } => {
                write!(f, "translation service returned {code}: {body}")
            }
            TranslateError::Malformed(msg) => {
                write!(f, "unexpected translation response: {msg}")
            }
        }
    }
}

impl std::error::Error for TranslateError {}

/// Unrecoverable per-session conditions that trigger teardown.
#[derive(Debug)]
pub enum SessionError {
    /// The ordered-release buffer exceeded its cap: upstream is running away.
    DispatchOverflow { pending: usize, cap: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DispatchOverflow { pending, cap } => write!(
                f,
                "dispatch buffer overflow: {pending} pending results exceed cap {cap}"
            ),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_classification() {
        assert!(
            TranslateError::Status {
                code: 403,
                body: String::new()
            }
            .is_permanent()
        );
        assert!(
            !TranslateError::Status {
                code: 429,
                body: String::new()
            }
            .is_permanent()
        );
        assert!(
            !TranslateError::Status {
                code: 503,
                body: String::new()
            }
            .is_permanent()
        );
        assert!(!TranslateError::Timeout.is_permanent());
        assert!(!TranslateError::Network("reset".into()).is_permanent());
    }
}
