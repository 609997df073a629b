use relay_common::RelayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
        /// Parsed `retry-after` header, in milliseconds
        retry_after_ms: Option<u64>,
    },

    #[error("Failed to parse {provider} response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{0} returned no content")]
    Empty(&'static str),

    #[error("LLM configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Rate limits, server errors and transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Transport { .. } => true,
            Self::Decode { .. } | Self::Empty(_) | Self::Config(_) => false,
        }
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Status { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

impl From<LlmError> for RelayError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Config(msg) => RelayError::Config(msg),
            other => RelayError::Llm(other.to_string()),
        }
    }
}

/// Read the `retry-after` header (seconds) of a response.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs * 1000)
}

/// Turn a non-2xx response into [`LlmError::Status`].
pub(crate) async fn status_error(provider: &'static str, response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let retry_after_ms = retry_after_ms(response.headers());
    let body = response.text().await.unwrap_or_default();
    LlmError::Status {
        provider,
        status,
        body,
        retry_after_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> LlmError {
        LlmError::Status {
            provider: "Anthropic",
            status: code,
            body: String::new(),
            retry_after_ms: None,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(529).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(
            LlmError::Transport {
                provider: "OpenAI",
                message: "connection reset".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::Empty("OpenAI").is_retryable());
    }

    #[test]
    fn test_parses_retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "5".parse().unwrap());
        assert_eq!(retry_after_ms(&headers), Some(5000));

        headers.insert(reqwest::header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(retry_after_ms(&headers), None);
    }

    #[test]
    fn test_converts_into_relay_error() {
        let relay: RelayError = LlmError::Config("missing key".to_string()).into();
        assert!(matches!(relay, RelayError::Config(_)));

        let relay: RelayError = status(503).into();
        assert!(relay.to_string().contains("503"));
    }
}
