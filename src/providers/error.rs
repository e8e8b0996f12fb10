//! Provider error types and retry classification.

use std::time::Duration;

/// What went wrong talking to a remote generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection failure, timeout, DNS, etc.
    Network,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// HTTP 4xx other than 429.
    ClientError,
    /// The remote answered but the body could not be interpreted.
    Parse,
    /// The remote completed the job and reported failure.
    Generation,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorKind::Network => "network error",
            ProviderErrorKind::RateLimited => "rate limited",
            ProviderErrorKind::ServerError => "server error",
            ProviderErrorKind::ClientError => "client error",
            ProviderErrorKind::Parse => "parse error",
            ProviderErrorKind::Generation => "generation failed",
        };
        f.write_str(s)
    }
}

/// Error from a provider adapter.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// HTTP status, when the remote answered at all.
    pub status: Option<u16>,
    /// Server-suggested wait from a Retry-After header.
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Network,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Parse,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Generation,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    /// Build an error from a non-success HTTP response.
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        Self {
            kind: classify_http_status(status),
            message: body,
            status: Some(status),
            retry_after,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Network
                | ProviderErrorKind::RateLimited
                | ProviderErrorKind::ServerError
        )
    }

    /// Delay before the given retry attempt (0-based), honoring a server
    /// Retry-After over exponential backoff.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(after) = self.retry_after {
            return after;
        }
        let backoff = Duration::from_millis(500) * 2u32.saturating_pow(attempt);
        backoff.min(Duration::from_secs(8))
    }
}

/// Map an HTTP status code onto an error kind.
pub fn classify_http_status(status: u16) -> ProviderErrorKind {
    match status {
        429 => ProviderErrorKind::RateLimited,
        500..=599 => ProviderErrorKind::ServerError,
        400..=499 => ProviderErrorKind::ClientError,
        _ => ProviderErrorKind::ServerError,
    }
}

/// Retry policy for transient submission errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn should_retry(&self, error: &ProviderError) -> bool {
        error.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_http_status() {
        assert_eq!(classify_http_status(429), ProviderErrorKind::RateLimited);
        assert_eq!(classify_http_status(503), ProviderErrorKind::ServerError);
        assert_eq!(classify_http_status(400), ProviderErrorKind::ClientError);
        assert_eq!(classify_http_status(404), ProviderErrorKind::ClientError);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::network("boom").is_transient());
        assert!(ProviderError::from_status(500, String::new(), None).is_transient());
        assert!(ProviderError::from_status(429, String::new(), None).is_transient());
        assert!(!ProviderError::from_status(401, String::new(), None).is_transient());
        assert!(!ProviderError::parse("bad json").is_transient());
        assert!(!ProviderError::generation("no output").is_transient());
    }

    #[test]
    fn test_suggested_delay_backoff() {
        let err = ProviderError::network("boom");
        assert_eq!(err.suggested_delay(0), Duration::from_millis(500));
        assert_eq!(err.suggested_delay(1), Duration::from_secs(1));
        // Capped.
        assert_eq!(err.suggested_delay(10), Duration::from_secs(8));
    }

    #[test]
    fn test_suggested_delay_honors_retry_after() {
        let err = ProviderError::from_status(429, String::new(), Some(Duration::from_secs(3)));
        assert_eq!(err.suggested_delay(0), Duration::from_secs(3));
    }
}
