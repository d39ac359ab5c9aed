use log::{debug, info};
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::transport::{Expect, Transport};

pub mod records;
pub mod rpc;
pub mod subscription;

use records::{RawDevice, Room, DEVICE_SERVICE_DATA_TYPE, DEVICE_TYPE, ROOM_TYPE};
use rpc::{Request, METHOD_LONG_POLL, METHOD_SUBSCRIBE, METHOD_UNSUBSCRIBE, SUBSCRIPTION_TOPIC};
pub use subscription::LongPollSubscription;

/// How long the controller holds a long poll open when nothing happens.
pub const DEFAULT_POLL_WAIT_SECONDS: u32 = 30;

/// Opaque token naming a long-polling subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollId(String);

impl PollId {
    pub fn new(id: impl Into<String>) -> Self {
        PollId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client for the local API of one controller.
///
/// Cheap to clone; clones share the underlying connection pool. Devices and device services
/// keep a clone so they can write state back.
#[derive(Debug, Clone)]
pub struct BshLocalApi {
    transport: Transport,
    api_root: String,
    rpc_root: String,
}

impl BshLocalApi {
    /// Connects to the controller described by `config`, loading the client certificate.
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::from_transport(Transport::new(config).await?))
    }

    pub fn from_transport(transport: Transport) -> Self {
        BshLocalApi {
            api_root: transport.url("/smarthome"),
            rpc_root: transport.url("/remote/json-rpc"),
            transport,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn get_rooms(&self) -> Result<Vec<Room>> {
        let url = format!("{}/rooms", self.api_root);
        let rooms = self.transport.get(&url, Expect::ElementType(ROOM_TYPE)).await?;
        decode_list(rooms)
    }

    pub async fn get_devices(&self) -> Result<Vec<RawDevice>> {
        let url = format!("{}/devices", self.api_root);
        let devices = self
            .transport
            .get(&url, Expect::ElementType(DEVICE_TYPE))
            .await?;
        decode_list(devices)
    }

    /// Fetches the current data of one device service, as a raw `DeviceServiceData` record.
    pub async fn get_device_service(&self, device_id: &str, service_id: &str) -> Result<Value> {
        let url = format!(
            "{}/devices/{}/services/{}",
            self.api_root, device_id, service_id
        );
        self.transport
            .get(&url, Expect::Type(DEVICE_SERVICE_DATA_TYPE))
            .await
    }

    /// Writes a partial state to a device service. Only the fields in `state_update` change.
    pub async fn put_device_service_state(
        &self,
        device_id: &str,
        service_id: &str,
        state_update: &Value,
    ) -> Result<()> {
        let url = format!(
            "{}/devices/{}/services/{}/state",
            self.api_root, device_id, service_id
        );
        self.transport.put(&url, state_update).await?;
        Ok(())
    }

    /// Opens a long-polling subscription for all remote events.
    pub async fn long_polling_subscribe(&self) -> Result<PollId> {
        let result = self
            .call(METHOD_SUBSCRIBE, vec![json!(SUBSCRIPTION_TOPIC), Value::Null])
            .await?;
        match result {
            Value::String(id) => {
                info!("Subscribed to long polling with poll id {}", id);
                Ok(PollId(id))
            }
            other => Err(Error::Protocol(format!(
                "subscribe returned {} instead of a poll id",
                other
            ))),
        }
    }

    /**
    Waits up to `wait_seconds` for change records on the subscription.

    Returns the raw records, which may be empty when nothing changed. Only meaningful between
    [`Self::long_polling_subscribe`] and [`Self::long_polling_unsubscribe`] for the same id.
     */
    pub async fn long_polling_poll(&self, poll_id: &PollId, wait_seconds: u32) -> Result<Vec<Value>> {
        let result = self
            .call(METHOD_LONG_POLL, vec![json!(poll_id.as_str()), json!(wait_seconds)])
            .await?;
        let records = match result {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            other => {
                return Err(Error::Protocol(format!(
                    "long poll returned {} instead of a list",
                    other
                )))
            }
        };
        debug!("Long poll {} returned {} record(s)", poll_id, records.len());
        Ok(records)
    }

    pub async fn long_polling_unsubscribe(&self, poll_id: &PollId) -> Result<()> {
        let result = self
            .call(METHOD_UNSUBSCRIBE, vec![json!(poll_id.as_str())])
            .await?;
        info!("Unsubscribed poll id {} ({})", poll_id, result);
        Ok(())
    }

    /// Subscribes and wraps the poll id in a handle that owns it.
    pub async fn subscribe(&self) -> Result<LongPollSubscription> {
        let poll_id = self.long_polling_subscribe().await?;
        Ok(LongPollSubscription::new(self.clone(), poll_id))
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let batch = Request::new(method, params).to_batch()?;
        let response = self.transport.post(&self.rpc_root, &batch).await?;
        rpc::into_result(response)
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    match value {
        Value::Object(ref map) if map.is_empty() => Ok(Vec::new()),
        other => Ok(serde_json::from_value(other)?),
    }
}
