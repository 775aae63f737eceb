//! Error taxonomy shared by the Direct Line client and the inference relay.
//!
//! No local recovery anywhere: every failure propagates to the caller, which
//! logs and aborts the current exchange.

/// Error for all client operations (Direct Line and relay).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or rejected credential, or an expired conversation token (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport failure, timeout, or a response body that could not be decoded.
    #[error("network error: {0}")]
    Network(String),

    /// Non-auth HTTP error status from the remote service, body included verbatim.
    #[error("service returned {status}: {body}")]
    Service {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Empty or malformed outgoing input. Raised before any request is issued.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

/// Map a non-success HTTP response to `Auth` (401/403) or `Service`, consuming the body.
pub(crate) async fn error_for_status(res: reqwest::Response) -> ClientError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ClientError::Auth(format!("{} {}", status, body))
    } else {
        ClientError::Service { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_errors_map_to_network() {
        // Build a reqwest error by parsing an invalid URL through the client API.
        let err = reqwest::Client::new().get("http://[invalid").build().unwrap_err();
        let mapped: ClientError = err.into();
        assert!(matches!(mapped, ClientError::Network(_)));
    }

    #[test]
    fn display_includes_variant_context() {
        let e = ClientError::Validation("message text is empty".to_string());
        assert_eq!(e.to_string(), "invalid input: message text is empty");
        let e = ClientError::Auth("401 invalid secret".to_string());
        assert!(e.to_string().starts_with("authentication failed"));
    }
}
