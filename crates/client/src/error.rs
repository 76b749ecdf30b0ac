//! Client error taxonomy.
//!
//! `Protocol` is the primary channel the harness is built around: it
//! reproduces the node's HTTP-level rejection verbatim so that suites
//! can compare code and message byte-for-byte.

use thiserror::Error;

/// Errors produced by [`crate::ApiClient`] calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The node rejected the call with a non-2xx status.
    ///
    /// `message` is `"Error calling <Op>: <body>\n"` where `<body>` is
    /// the node's plain-text error body with trailing whitespace
    /// normalized to a single newline. The trailing newline is part of
    /// the observable contract.
    #[error("{message}")]
    Protocol { code: u16, message: String },

    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON shape the caller expected.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build a protocol error from an operation name and the raw
    /// response body.
    pub fn protocol(op: &str, code: u16, body: &str) -> Self {
        ApiError::Protocol {
            code,
            message: format!("Error calling {}: {}\n", op, body.trim_end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_message_format() {
        let err = ApiError::protocol("Block", 404, "404 Not Found\n");
        match err {
            ApiError::Protocol { code, message } => {
                assert_eq!(code, 404);
                assert_eq!(message, "Error calling Block: 404 Not Found\n");
            }
            other => panic!("expected Protocol, got {:?}", other),
        }
    }

    #[test]
    fn test_protocol_message_preserves_body_detail() {
        let err = ApiError::protocol("AddressUxouts", 400, "400 Bad Request - address is empty\n");
        match err {
            ApiError::Protocol { message, .. } => {
                assert_eq!(
                    message,
                    "Error calling AddressUxouts: 400 Bad Request - address is empty\n"
                );
            }
            other => panic!("expected Protocol, got {:?}", other),
        }
    }
}
