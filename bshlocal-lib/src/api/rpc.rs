use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, JsonRpcError, Result};

pub const JSON_RPC_VERSION: &str = "2.0";

pub const METHOD_SUBSCRIBE: &str = "RE/subscribe";
pub const METHOD_LONG_POLL: &str = "RE/longPoll";
pub const METHOD_UNSUBSCRIBE: &str = "RE/unsubscribe";

/// Topic the subscription listens on; covers every remote event the controller emits.
pub const SUBSCRIPTION_TOPIC: &str = "com/bosch/sh/remote/*";

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
}

impl<'a> Request<'a> {
    pub(crate) fn new(method: &'a str, params: Vec<Value>) -> Self {
        Request {
            jsonrpc: JSON_RPC_VERSION,
            method,
            params,
        }
    }

    /// The request as the controller wants it on the wire: a batch of one.
    pub(crate) fn to_batch(&self) -> Result<Value> {
        Ok(Value::Array(vec![serde_json::to_value(self)?]))
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// Unwraps a batch response: checks the version, then yields `result` or raises `error`.
pub(crate) fn into_result(batch: Value) -> Result<Value> {
    let mut responses: Vec<Response> = match batch {
        Value::Array(_) => serde_json::from_value(batch)?,
        Value::Object(ref map) if map.is_empty() => {
            return Err(Error::Protocol("empty response body".to_string()))
        }
        other => {
            return Err(Error::Protocol(format!(
                "expected a response batch, got {}",
                other
            )))
        }
    };
    if responses.is_empty() {
        return Err(Error::Protocol("empty response batch".to_string()));
    }
    let response = responses.swap_remove(0);

    match response.jsonrpc.as_deref() {
        Some(JSON_RPC_VERSION) => {}
        other => {
            return Err(Error::Protocol(format!(
                "unexpected jsonrpc version {:?}",
                other
            )))
        }
    }

    if let Some(error) = response.error {
        return Err(error.into());
    }
    Ok(response.result.unwrap_or(Value::Null))
}
