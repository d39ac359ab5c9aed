use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ROOM_TYPE: &str = "room";
pub const DEVICE_TYPE: &str = "device";
pub const DEVICE_SERVICE_DATA_TYPE: &str = "DeviceServiceData";

/// A room as returned by `GET /smarthome/rooms`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_id: Option<String>,
    /// Everything else the controller sent, kept as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A device record as returned by `GET /smarthome/devices`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    pub id: String,
    #[serde(default)]
    pub root_device_id: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub device_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub device_service_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/**
The data of one device service, as returned by
`GET /smarthome/devices/{deviceId}/services/{serviceId}` and as delivered by long polling.

Long-polling records may carry only the fields that changed, so `state` is partial there.
 */
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceServiceData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, Value>>,
}
