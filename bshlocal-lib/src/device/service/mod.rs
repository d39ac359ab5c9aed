use std::collections::HashMap;

use derivative::Derivative;
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::records::{DeviceServiceData, DEVICE_SERVICE_DATA_TYPE};
use crate::api::BshLocalApi;
use crate::error::{Error, Result};
use crate::transport::require_type;

mod variants;

pub use variants::*;

/// What every device service wraps: the owning device, the service id and the cached state.
#[derive(Derivative)]
#[derivative(Debug, PartialEq)]
#[derive(Clone)]
pub struct ServiceCore {
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    api: BshLocalApi,
    device_id: String,
    id: String,
    state: Map<String, Value>,
}

impl ServiceCore {
    fn new(api: BshLocalApi, device_id: String, id: String, state: Map<String, Value>) -> Self {
        ServiceCore {
            api,
            device_id,
            id,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// Reads one state field as `T`; `None` if it is missing or has another shape.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.state
            .get(name)
            .and_then(|value| T::deserialize(value).ok())
    }

    /**
    Writes `update` to the controller and, once accepted, into the cached state.

    `update` must be a JSON object holding only the fields to change. The cache is not
    re-read from the controller.
     */
    pub async fn set_state(&mut self, update: Value) -> Result<()> {
        let patch = match update {
            Value::Object(patch) => patch,
            other => return Err(Error::InvalidState(other.to_string())),
        };
        self.api
            .put_device_service_state(&self.device_id, &self.id, &Value::Object(patch.clone()))
            .await?;
        self.merge(patch);
        Ok(())
    }

    /// Merges the `state` of a `DeviceServiceData` record into the cache.
    pub fn process_poll_result(&mut self, raw: &Value) -> Result<()> {
        require_type(raw, DEVICE_SERVICE_DATA_TYPE)?;
        let data = DeviceServiceData::deserialize(raw)?;
        if data.id != self.id {
            return Err(Error::ServiceMismatch {
                expected: self.id.clone(),
                found: data.id,
            });
        }
        if let Some(state) = data.state {
            self.merge(state);
        }
        Ok(())
    }

    // Fields missing from the patch are kept.
    fn merge(&mut self, patch: Map<String, Value>) {
        for (field, value) in patch {
            self.state.insert(field, value);
        }
    }
}

type Constructor = fn(ServiceCore) -> DeviceService;

macro_rules! device_services {
    ($($variant:ident),* $(,)?) => {
        /// A device service, one variant per supported service id.
        #[derive(Debug, Clone, PartialEq)]
        pub enum DeviceService {
            $($variant($variant),)*
        }

        impl DeviceService {
            pub fn core(&self) -> &ServiceCore {
                match self {
                    $(DeviceService::$variant(service) => &service.core,)*
                }
            }

            pub fn core_mut(&mut self) -> &mut ServiceCore {
                match self {
                    $(DeviceService::$variant(service) => &mut service.core,)*
                }
            }
        }

        /// Service ids for which a typed wrapper exists. Everything else is skipped.
        pub const SUPPORTED_DEVICE_SERVICE_IDS: &[&str] = &[$(stringify!($variant),)*];

        lazy_static! {
            static ref CONSTRUCTORS: HashMap<&'static str, Constructor> = {
                let mut constructors: HashMap<&'static str, Constructor> = HashMap::new();
                $(
                    constructors.insert(stringify!($variant), |core| {
                        DeviceService::$variant($variant { core })
                    });
                )*
                constructors
            };
        }
    };
}

device_services!(
    PowerSwitch,
    BinarySwitch,
    MultiLevelSwitch,
    TemperatureLevel,
    HumidityLevel,
    RoomClimateControl,
    ValveTappet,
    ShutterContact,
    ShutterControl,
);

pub fn is_supported(service_id: &str) -> bool {
    CONSTRUCTORS.contains_key(service_id)
}

/**
Builds the typed service for a raw `DeviceServiceData` record.

The owning device is taken from the record's `deviceId`, which must be present. Returns
`Ok(None)` when the record's service id has no typed wrapper.
 */
pub fn build(api: BshLocalApi, raw: &Value) -> Result<Option<DeviceService>> {
    let data = decode(raw)?;
    let device_id = data.device_id.clone().ok_or_else(|| {
        Error::Protocol(format!("device service data for {} has no deviceId", data.id))
    })?;
    Ok(construct(api, device_id, data))
}

/**
Builds the typed service `service_id` of device `device_id` from the record fetched for it.

The owning device comes from the caller, so a record without `deviceId` still yields a service
that writes to the right device. A record describing some other service is rejected with
[`Error::ServiceMismatch`].
 */
pub fn build_for(
    api: BshLocalApi,
    device_id: &str,
    service_id: &str,
    raw: &Value,
) -> Result<Option<DeviceService>> {
    let data = decode(raw)?;
    if data.id != service_id {
        return Err(Error::ServiceMismatch {
            expected: service_id.to_string(),
            found: data.id,
        });
    }
    Ok(construct(api, device_id.to_string(), data))
}

fn decode(raw: &Value) -> Result<DeviceServiceData> {
    require_type(raw, DEVICE_SERVICE_DATA_TYPE)?;
    Ok(DeviceServiceData::deserialize(raw)?)
}

fn construct(
    api: BshLocalApi,
    device_id: String,
    data: DeviceServiceData,
) -> Option<DeviceService> {
    let constructor = CONSTRUCTORS.get(data.id.as_str())?;
    let core = ServiceCore::new(api, device_id, data.id, data.state.unwrap_or_default());
    Some(constructor(core))
}

impl DeviceService {
    pub fn id(&self) -> &str {
        self.core().id()
    }

    pub fn device_id(&self) -> &str {
        self.core().device_id()
    }

    pub fn state(&self) -> &Map<String, Value> {
        self.core().state()
    }

    pub async fn set_state(&mut self, update: Value) -> Result<()> {
        self.core_mut().set_state(update).await
    }

    pub fn process_poll_result(&mut self, raw: &Value) -> Result<()> {
        self.core_mut().process_poll_result(raw)
    }
}
