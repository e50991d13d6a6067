// ─── REST envelope ───
// Every provider adapter resolves to a `RestResponse`: payload plus a
// status category and an optional provider-specific error code. Network
// failures never cross the adapter boundary as raw errors.

pub mod discord;
pub mod microsoft;
pub mod mojang;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestStatus {
    Success,
    Error,
}

/// Uniform adapter result: `data` on success, a displayable message and a
/// provider code on failure.
#[derive(Debug, Clone, Serialize)]
pub struct RestResponse<T, C> {
    pub data: Option<T>,
    pub status: RestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_code: Option<C>,
}

impl<T, C> RestResponse<T, C> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            status: RestStatus::Success,
            error: None,
            provider_code: None,
        }
    }

    pub fn failure(code: C, message: impl Into<String>) -> Self {
        Self {
            data: None,
            status: RestStatus::Error,
            error: Some(message.into()),
            provider_code: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RestStatus::Success
    }
}

/// Transport-layer failure categories shared by all adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    DnsFailure,
    ConnectionRefused,
    Decode,
    Other,
}

/// Classify a `reqwest` error that produced no HTTP response.
pub fn classify_transport(err: &reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        warn!("Request timed out: {}", err);
        return TransportFailure::Timeout;
    }
    if err.is_decode() {
        warn!("Response body failed to parse: {}", err);
        return TransportFailure::Decode;
    }
    if err.is_connect() {
        // reqwest does not expose the resolver error as a type; the
        // source chain is the only place the distinction survives.
        let chain = error_chain(err);
        if chain.contains("dns error") || chain.contains("failed to lookup address") {
            return TransportFailure::DnsFailure;
        }
        return TransportFailure::ConnectionRefused;
    }
    warn!("Unclassified transport error: {}", err);
    TransportFailure::Other
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data() {
        let resp: RestResponse<u32, ()> = RestResponse::success(7);
        assert!(resp.is_success());
        assert_eq!(resp.data, Some(7));
        assert!(resp.error.is_none());
    }

    #[test]
    fn failure_envelope_carries_code_and_message() {
        let resp: RestResponse<(), &str> = RestResponse::failure("RATELIMIT", "slow down");
        assert!(!resp.is_success());
        assert_eq!(resp.provider_code, Some("RATELIMIT"));
        assert_eq!(resp.error.as_deref(), Some("slow down"));
    }
}
