//! Classification of API errors for retry logic.

/// Retry category of a failed API operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRetryableError {
    /// Errors that should be retried (5xx server errors, network issues)
    Retryable(String),
    /// Rate limiting errors (429, or 403 carrying a rate-limit message)
    RateLimit,
    /// Client errors that should not be retried (4xx except 429)
    NonRetryable(String),
}

impl ApiRetryableError {
    /// Convert an octocrab error to its retry category.
    pub fn from_octocrab_error(error: octocrab::Error) -> Self {
        match &error {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                let detail = format!(
                    "GitHub API error - Status: {}, Message: {:?}",
                    status, source.message
                );
                match status {
                    429 => Self::RateLimit,
                    403 if source.message.contains("rate limit")
                        || source.message.contains("API rate limit") =>
                    {
                        Self::RateLimit
                    }
                    400..=499 => Self::NonRetryable(detail),
                    500..=599 => Self::Retryable(detail),
                    _ => Self::NonRetryable(detail),
                }
            }
            octocrab::Error::Http { .. } | octocrab::Error::Hyper { .. } => {
                Self::Retryable(format!("HTTP layer error: {error}"))
            }
            octocrab::Error::Json { .. } => {
                Self::NonRetryable(format!("JSON parsing error: {error}"))
            }
            octocrab::Error::Uri { .. } => Self::NonRetryable(format!("URI error: {error}")),
            _ => Self::NonRetryable(format!("Unknown error type: {error}")),
        }
    }

    /// Classify a GraphQL-level error by its message text. The GraphQL
    /// endpoint reports rate limiting inside the `errors` array rather
    /// than with an HTTP status.
    pub fn from_graphql_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("rate limit") || lowered.contains("ratelimited") {
            Self::RateLimit
        } else if lowered.contains("timeout") || lowered.contains("something went wrong") {
            Self::Retryable(message.to_string())
        } else {
            Self::NonRetryable(message.to_string())
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

impl std::fmt::Display for ApiRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retryable(msg) => write!(f, "Retryable error: {msg}"),
            Self::RateLimit => write!(f, "Rate limit error"),
            Self::NonRetryable(msg) => write!(f, "Non-retryable error: {msg}"),
        }
    }
}

impl std::error::Error for ApiRetryableError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_messages_classify_rate_limits() {
        assert_eq!(
            ApiRetryableError::from_graphql_message("API rate limit exceeded for user"),
            ApiRetryableError::RateLimit
        );
        assert!(matches!(
            ApiRetryableError::from_graphql_message("Timeout waiting for response"),
            ApiRetryableError::Retryable(_)
        ));
        assert!(matches!(
            ApiRetryableError::from_graphql_message("Field 'bogus' doesn't exist"),
            ApiRetryableError::NonRetryable(_)
        ));
    }
}
