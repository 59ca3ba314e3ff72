use reqwest::StatusCode;
use serde_json::Value;

use crate::{credential::StorageError, transport::TransportError};

/// Uniform failure shape of every client call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{status}: {message}")]
    Server {
        status: StatusCode,
        message: String,
        /// Error body as sent by the server, when it was JSON.
        body: Option<Value>,
    },
    #[error("decode error: {0}")]
    Decode(String),
    /// The service answered successfully but had nothing to compute.
    #[error("no data: {0}")]
    NoData(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Server { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    /// Builds a [`ClientError::Server`] out of a non-2xx response.
    pub(crate) fn from_response(status: StatusCode, raw: &[u8]) -> Self {
        let fallback = || status.canonical_reason().unwrap_or("server error").to_string();

        let (message, body) = match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Null) => (fallback(), None),
            Ok(value) => {
                let message = ["detail", "error", "message"]
                    .iter()
                    .find_map(|key| value.get(key).and_then(Value::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                (message, Some(value))
            }
            Err(_) => {
                let text = String::from_utf8_lossy(raw).trim().to_string();
                if text.is_empty() {
                    (fallback(), None)
                } else {
                    (text, None)
                }
            }
        };

        Self::Server {
            status,
            message,
            body,
        }
    }
}

/// Failure of a call that also touches the credential store.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
