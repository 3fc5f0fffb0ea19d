use thiserror::Error;

/// Why sampling a polygon failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SampleError {
    /// The polygon has zero area, so rejection sampling would never terminate.
    #[error("polygon has zero area")]
    DegenerateGeometry,

    /// The draw ceiling was hit before a contained point was found.
    #[error("no interior point found after {0} draws")]
    Exhausted(u32),
}

/// Classification of a failed call to an external service.
///
/// A miss (the service answered but had nothing for the query) is not an
/// error; callers represent it as `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The service itself is unreachable. Halts a batch run.
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// The request failed in a way worth retrying with a fresh attempt
    /// (timeout, unexpected status, unparseable page).
    #[error("request failed: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else {
            FetchError::Transient(err.to_string())
        }
    }
}

impl FetchError {
    /// True for failures that should stop a whole batch rather than one attempt.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FetchError::Unreachable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_is_classified() {
        assert!(FetchError::Unreachable("refused".into()).is_unreachable());
        assert!(!FetchError::Transient("timeout".into()).is_unreachable());
    }
}
