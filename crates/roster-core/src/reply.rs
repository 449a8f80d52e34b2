//! Outward reply envelope
//!
//! Every core operation is reported as `{ "message": null | string, ...payload }`.
//! A null message means success and the payload fields sit beside it; otherwise
//! the message is the verbatim user-facing string and there is no payload.

use serde::Serialize;
use tracing::{debug, error};

use crate::error::{ErrorKind, Result};

/// Reply envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply<T> {
    /// `None` on success, otherwise the denial or validation string
    pub message: Option<&'static str>,
    /// Operation result, flattened beside `message`
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T> Reply<T> {
    /// Successful reply
    pub fn ok(payload: T) -> Self {
        Self {
            message: None,
            payload: Some(payload),
        }
    }

    /// Failed reply carrying `message`
    pub fn failure(message: &'static str) -> Self {
        Self {
            message: Some(message),
            payload: None,
        }
    }

    /// Reduce an operation result to a reply; errors are logged before being dropped
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => {
                match e.kind() {
                    ErrorKind::Storage => error!(error = %e, "Operation failed"),
                    _ => debug!(error = %e, "Operation refused"),
                }
                Self::failure(e.user_message())
            }
        }
    }

    /// Whether the operation succeeded
    pub fn is_success(&self) -> bool {
        self.message.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ledger::PointBalance;
    use crate::messages;
    use crate::store::StoreError;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    struct Token {
        token: String,
    }

    #[test]
    fn test_success_flattens_payload() {
        let reply = Reply::ok(PointBalance {
            merit: 10,
            demerit: 2,
            spent: 3,
            available: 5,
        });
        assert!(reply.is_success());
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"message": null, "merit": 10, "demerit": 2, "spent": 3, "available": 5})
        );
    }

    #[test]
    fn test_failure_has_only_message() {
        let reply: Reply<Token> = Reply::from_result(Err(Error::Conflict(messages::INSUFFICIENT_POINTS)));
        assert!(!reply.is_success());
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"message": "상점이 부족합니다"})
        );
    }

    #[test]
    fn test_storage_failure_uses_generic_message() {
        let reply: Reply<Token> =
            Reply::from_result(Err(StoreError::Backend("disk full".to_string()).into()));
        assert_eq!(reply.message, Some(messages::UNKNOWN_ERROR));
    }

    #[test]
    fn test_unit_payload() {
        let reply = Reply::from_result(Ok(()));
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"message": null}));
    }
}
