//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body returned for all error responses.
///
/// ```json
/// { "result": false, "error_type": "423", "error_message": "The user is already subscribed" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Always `false`.
    pub result: bool,

    /// The HTTP status code, as a decimal string.
    ///
    /// | `error_type` | Meaning |
    /// |--------------|---------|
    /// | `400` | upload without a file |
    /// | `401` | missing or unknown `api-key` |
    /// | `404` | tweet or user not found |
    /// | `422` | invalid input, self follow/unfollow |
    /// | `423` | duplicate or missing like/follow, foreign tweet |
    /// | `500` | unexpected store failure |
    pub error_type: String,

    /// Human-readable description of the problem.
    pub error_message: String,
}

impl ErrorResponse {
    pub fn new(status: u16, error_message: impl Into<String>) -> Self {
        Self {
            result: false,
            error_type: status.to_string(),
            error_message: error_message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let e = ErrorResponse::new(423, "The user has already liked this tweet");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "result": false,
                "error_type": "423",
                "error_message": "The user has already liked this tweet",
            })
        );
    }
}
