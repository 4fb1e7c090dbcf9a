//! Error types for the REST client.
//!
//! The client never retries. Callers decide what each variant means for
//! them; the live loop stops on [`ApiError::SessionExpired`] and reports
//! [`ApiError::NotFound`] as "no such shipment".

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The bearer credential was rejected (HTTP 401). Re-authentication is
    /// required.
    #[error("session expired, re-authentication required")]
    SessionExpired,

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("backend returned {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body did not have the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The client configuration is unusable.
    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the error requires re-authentication.
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

/// Map a non-success status to an error. `resource` names what was
/// requested, for [`ApiError::NotFound`].
pub fn classify_status(status: u16, body: String, resource: &str) -> ApiError {
    match status {
        401 => ApiError::SessionExpired,
        404 => ApiError::NotFound(resource.to_owned()),
        _ => ApiError::Http { status, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_session_expired() {
        let err = classify_status(401, String::new(), "track/COL123");
        assert!(err.is_session_expired());
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = classify_status(404, "{}".to_owned(), "COL123");
        assert!(matches!(err, ApiError::NotFound(ref r) if r == "COL123"));
        assert_eq!(err.to_string(), "not found: COL123");
    }

    #[test]
    fn other_statuses_keep_the_body() {
        let err = classify_status(500, "boom".to_owned(), "agences");
        assert!(matches!(err, ApiError::Http { status: 500, ref body } if body == "boom"));
    }
}
