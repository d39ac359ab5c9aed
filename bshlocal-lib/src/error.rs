use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the controller client.
#[derive(Debug, Error)]
pub enum Error {
    /// The controller answered with a non-success HTTP status.
    #[error("API call {method} {url} returned non-OK result (code {status}): {body}")]
    Transport {
        status: u16,
        body: String,
        method: String,
        url: String,
    },

    /// A response carried an unexpected `@type`.
    ///
    /// This usually means the controller speaks a different API version than the one
    /// this client was written against.
    #[error("expected @type \"{expected}\", found {found}")]
    Schema { expected: String, found: String },

    /// The JSON-RPC response carried an `error` member.
    #[error(transparent)]
    Rpc(#[from] JsonRpcError),

    /// The JSON-RPC envelope itself was malformed.
    #[error("malformed JSON-RPC response: {0}")]
    Protocol(String),

    /// A poll record was handed to a service with a different id.
    #[error("record for device service \"{found}\" given to \"{expected}\"")]
    ServiceMismatch { expected: String, found: String },

    /// A state patch was not a JSON object.
    #[error("state update must be a JSON object, got {0}")]
    InvalidState(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The HTTP status code, if this is a transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn schema(expected: &str, found: Option<&str>) -> Self {
        Error::Schema {
            expected: expected.to_string(),
            found: match found {
                Some(found) => format!("\"{}\"", found),
                None => "nothing".to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The `error` member of a JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Error)]
#[error("JSONRPCError (code: {code}, message: {message})")]
pub struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        JsonRpcError {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
