use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::api::records::{DeviceServiceData, RawDevice, DEVICE_SERVICE_DATA_TYPE};
use crate::api::BshLocalApi;
use crate::error::Result;
use crate::transport::{require_type, type_tag};

pub mod service;

use service::DeviceService;

/// A device known to the controller, together with the typed services it offers.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    raw: RawDevice,
    services: HashMap<String, DeviceService>,
}

impl Device {
    /**
    Builds a device from its raw record, fetching the current data of each supported service.

    Services without a typed wrapper are skipped. A failed fetch, or a fetched record that
    describes a different service, fails the whole device.
     */
    pub async fn new(api: &BshLocalApi, raw: RawDevice) -> Result<Self> {
        let mut services = HashMap::new();

        for service_id in &raw.device_service_ids {
            if !service::is_supported(service_id) {
                debug!(
                    "Skipping unsupported device service {} of device {}",
                    service_id, raw.id
                );
                continue;
            }

            let data = api.get_device_service(&raw.id, service_id).await?;
            if let Some(device_service) =
                service::build_for(api.clone(), &raw.id, service_id, &data)?
            {
                services.insert(service_id.clone(), device_service);
            }
        }

        Ok(Device { raw, services })
    }

    /// Assembles a device from services that were already built.
    pub fn from_parts(raw: RawDevice, services: impl IntoIterator<Item = DeviceService>) -> Self {
        let services = services
            .into_iter()
            .map(|device_service| (device_service.id().to_string(), device_service))
            .collect();
        Device { raw, services }
    }

    pub fn raw(&self) -> &RawDevice {
        &self.raw
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn root_device_id(&self) -> &str {
        &self.raw.root_device_id
    }

    pub fn manufacturer(&self) -> &str {
        &self.raw.manufacturer
    }

    pub fn room_id(&self) -> Option<&str> {
        self.raw.room_id.as_deref()
    }

    pub fn device_model(&self) -> &str {
        &self.raw.device_model
    }

    pub fn serial(&self) -> Option<&str> {
        self.raw.serial.as_deref()
    }

    pub fn profile(&self) -> Option<&str> {
        self.raw.profile.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn status(&self) -> &str {
        &self.raw.status
    }

    pub fn device_services(&self) -> impl Iterator<Item = &DeviceService> {
        self.services.values()
    }

    pub fn device_service_ids(&self) -> HashSet<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    pub fn device_service(&self, service_id: &str) -> Option<&DeviceService> {
        self.services.get(service_id)
    }

    pub fn device_service_mut(&mut self, service_id: &str) -> Option<&mut DeviceService> {
        self.services.get_mut(service_id)
    }

    /**
    Forwards a long-polling `DeviceServiceData` record to the service it names.

    Returns whether a service took the record. Records for services this device does not hold
    are dropped; records of any other `@type` are an error.
     */
    pub fn process_poll_result(&mut self, raw_result: &Value) -> Result<bool> {
        require_type(raw_result, DEVICE_SERVICE_DATA_TYPE)?;
        let data = DeviceServiceData::deserialize(raw_result)?;

        match self.services.get_mut(&data.id) {
            Some(device_service) => {
                device_service.process_poll_result(raw_result)?;
                Ok(true)
            }
            None => {
                debug!(
                    "Skipping polling result with unknown device service id {}.",
                    data.id
                );
                Ok(false)
            }
        }
    }
}

/// A device service that took a long-polling record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdatedService {
    pub device_id: String,
    pub service_id: String,
}

/**
Routes a batch of long-polling records to the devices they belong to.

`devices` is keyed by device id. Records that are not `DeviceServiceData`, that carry no
`deviceId`, or that name a device or service not in `devices`, are skipped. Returns the
services that were updated, in record order.
 */
pub fn dispatch_poll_results(
    devices: &mut HashMap<String, Device>,
    results: &[Value],
) -> Result<Vec<UpdatedService>> {
    let mut updated = Vec::new();

    for raw_result in results {
        if type_tag(raw_result) != Some(DEVICE_SERVICE_DATA_TYPE) {
            debug!("Skipping polling result of type {:?}", type_tag(raw_result));
            continue;
        }

        let data = DeviceServiceData::deserialize(raw_result)?;
        let Some(device_id) = data.device_id else {
            debug!("Skipping polling result for {} without a device id", data.id);
            continue;
        };
        let Some(device) = devices.get_mut(&device_id) else {
            debug!("Skipping polling result for unknown device {}", device_id);
            continue;
        };

        if device.process_poll_result(raw_result)? {
            updated.push(UpdatedService {
                device_id,
                service_id: data.id,
            });
        }
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::service::{DeviceService, SUPPORTED_DEVICE_SERVICE_IDS};
    use super::*;
    use crate::error::Error;
    use crate::test_util::{api, offline_api};
    use serde_json::json;

    const DEVICE_ID: &str = "hdm:HomeMaticIP:3014F711A0000000000001";

    fn raw_device(service_ids: &[&str]) -> RawDevice {
        serde_json::from_value(json!({
            "@type": "device",
            "rootDeviceId": "64-da-a0-00-00-01",
            "id": DEVICE_ID,
            "deviceServiceIds": service_ids,
            "manufacturer": "BOSCH",
            "roomId": "hz_1",
            "deviceModel": "TRV",
            "serial": "3014F711A0000000000001",
            "profile": "GENERIC",
            "name": "Radiator",
            "status": "AVAILABLE"
        }))
        .unwrap()
    }

    fn service_data(id: &str, state: Value) -> Value {
        json!({"@type": "DeviceServiceData", "id": id, "deviceId": DEVICE_ID, "state": state})
    }

    fn built(id: &str, state: Value) -> DeviceService {
        service::build(offline_api(), &service_data(id, state))
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_fetches_only_supported_services() {
        let mut server = mockito::Server::new_async().await;
        let temperature = server
            .mock(
                "GET",
                format!("/smarthome/devices/{}/services/TemperatureLevel", DEVICE_ID).as_str(),
            )
            .with_status(200)
            .with_body(service_data("TemperatureLevel", json!({"temperature": 20.5})).to_string())
            .create_async()
            .await;
        let valve = server
            .mock(
                "GET",
                format!("/smarthome/devices/{}/services/ValveTappet", DEVICE_ID).as_str(),
            )
            .with_status(200)
            .with_body(service_data("ValveTappet", json!({"position": 30})).to_string())
            .create_async()
            .await;
        let unsupported = server
            .mock(
                "GET",
                format!("/smarthome/devices/{}/services/Thermostat", DEVICE_ID).as_str(),
            )
            .expect(0)
            .create_async()
            .await;

        let device = Device::new(
            &api(&server),
            raw_device(&["TemperatureLevel", "ValveTappet", "Thermostat"]),
        )
        .await
        .unwrap();

        temperature.assert_async().await;
        valve.assert_async().await;
        unsupported.assert_async().await;
        assert_eq!(
            device.device_service_ids(),
            HashSet::from(["TemperatureLevel", "ValveTappet"])
        );
        assert_eq!(device.device_services().count(), 2);
        assert_eq!(device.name(), "Radiator");
        assert_eq!(device.room_id(), Some("hz_1"));
        assert_eq!(device.root_device_id(), "64-da-a0-00-00-01");
        assert_eq!(device.manufacturer(), "BOSCH");
        assert_eq!(device.device_model(), "TRV");
        assert_eq!(device.serial(), Some("3014F711A0000000000001"));
        assert_eq!(device.profile(), Some("GENERIC"));
        assert_eq!(device.status(), "AVAILABLE");
    }

    #[tokio::test]
    async fn test_new_fails_on_service_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                format!("/smarthome/devices/{}/services/BinarySwitch", DEVICE_ID).as_str(),
            )
            .with_status(404)
            .create_async()
            .await;

        let err = Device::new(&api(&server), raw_device(&["BinarySwitch"]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_service_without_device_id_writes_to_its_device() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock(
                "GET",
                format!("/smarthome/devices/{}/services/BinarySwitch", DEVICE_ID).as_str(),
            )
            .with_status(200)
            .with_body(
                r#"{"@type": "DeviceServiceData", "id": "BinarySwitch", "state": {"on": false}}"#,
            )
            .create_async()
            .await;
        let put = server
            .mock(
                "PUT",
                format!("/smarthome/devices/{}/services/BinarySwitch/state", DEVICE_ID).as_str(),
            )
            .match_body(mockito::Matcher::Json(json!({"on": true})))
            .with_status(204)
            .create_async()
            .await;
        let orphan_put = server
            .mock("PUT", "/smarthome/devices//services/BinarySwitch/state")
            .expect(0)
            .create_async()
            .await;

        let mut device = Device::new(&api(&server), raw_device(&["BinarySwitch"]))
            .await
            .unwrap();
        let switch = device.device_service_mut("BinarySwitch").unwrap();
        assert_eq!(switch.device_id(), DEVICE_ID);

        switch.set_state(json!({"on": true})).await.unwrap();

        put.assert_async().await;
        orphan_put.assert_async().await;
        assert_eq!(switch.state()["on"], true);
    }

    #[tokio::test]
    async fn test_new_rejects_record_for_other_service() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock(
                "GET",
                format!("/smarthome/devices/{}/services/BinarySwitch", DEVICE_ID).as_str(),
            )
            .with_status(200)
            .with_body(service_data("PowerSwitch", json!({"switchState": "ON"})).to_string())
            .create_async()
            .await;

        let err = Device::new(&api(&server), raw_device(&["BinarySwitch"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceMismatch { .. }));
    }

    #[tokio::test]
    async fn test_new_with_only_unsupported_services_makes_no_requests() {
        let server = mockito::Server::new_async().await;
        let device = Device::new(&api(&server), raw_device(&["Thermostat", "BatteryLevel"]))
            .await
            .unwrap();
        assert!(device.device_service_ids().is_empty());
    }

    #[test]
    fn test_every_supported_service_is_held_once() {
        let services: Vec<DeviceService> = SUPPORTED_DEVICE_SERVICE_IDS
            .iter()
            .map(|id| built(id, json!({})))
            .collect();
        let device = Device::from_parts(raw_device(SUPPORTED_DEVICE_SERVICE_IDS), services);
        assert_eq!(device.device_services().count(), SUPPORTED_DEVICE_SERVICE_IDS.len());
        for id in SUPPORTED_DEVICE_SERVICE_IDS {
            assert_eq!(device.device_service(id).map(DeviceService::id), Some(*id));
        }
    }

    #[test]
    fn test_process_poll_result_updates_matching_service() {
        let mut device = Device::from_parts(
            raw_device(&["BinarySwitch"]),
            [built("BinarySwitch", json!({"on": false}))],
        );

        let taken = device
            .process_poll_result(&service_data("BinarySwitch", json!({"on": true})))
            .unwrap();

        assert!(taken);
        let DeviceService::BinarySwitch(switch) = device.device_service("BinarySwitch").unwrap()
        else {
            panic!("expected a binary switch");
        };
        assert_eq!(switch.is_on(), Some(true));
    }

    #[test]
    fn test_process_poll_result_drops_unknown_service() {
        let mut device = Device::from_parts(
            raw_device(&["BinarySwitch"]),
            [built("BinarySwitch", json!({"on": false}))],
        );
        let before = device.clone();

        let taken = device
            .process_poll_result(&service_data("PowerSwitch", json!({"switchState": "ON"})))
            .unwrap();

        assert!(!taken);
        assert_eq!(device, before);
    }

    #[test]
    fn test_process_poll_result_requires_device_service_data() {
        let mut device = Device::from_parts(raw_device(&[]), Vec::<DeviceService>::new());
        let err = device
            .process_poll_result(&json!({"@type": "room", "id": "hz_1"}))
            .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_dispatch_routes_by_device_id() {
        let other_raw: RawDevice = serde_json::from_value(json!({
            "@type": "device",
            "id": "hdm:ZigBee:0001",
            "deviceServiceIds": ["BinarySwitch"]
        }))
        .unwrap();
        let other_switch = service::build(
            offline_api(),
            &json!({
                "@type": "DeviceServiceData",
                "id": "BinarySwitch",
                "deviceId": "hdm:ZigBee:0001",
                "state": {"on": false}
            }),
        )
        .unwrap()
        .unwrap();

        let mut devices = HashMap::from([
            (
                DEVICE_ID.to_string(),
                Device::from_parts(
                    raw_device(&["BinarySwitch"]),
                    [built("BinarySwitch", json!({"on": false}))],
                ),
            ),
            (
                "hdm:ZigBee:0001".to_string(),
                Device::from_parts(other_raw, [other_switch]),
            ),
        ]);

        let results = vec![
            json!({"@type": "message", "id": "m1"}),
            service_data("BinarySwitch", json!({"on": true})),
            json!({"@type": "DeviceServiceData", "id": "BinarySwitch", "state": {"on": false}}),
            json!({"@type": "DeviceServiceData", "id": "BinarySwitch", "deviceId": "hdm:unknown", "state": {"on": true}}),
            service_data("PowerMeter", json!({"powerConsumption": 3})),
        ];

        let updated = dispatch_poll_results(&mut devices, &results).unwrap();

        assert_eq!(
            updated,
            vec![UpdatedService {
                device_id: DEVICE_ID.to_string(),
                service_id: "BinarySwitch".to_string(),
            }]
        );
        assert_eq!(
            devices[DEVICE_ID].device_service("BinarySwitch").unwrap().state()["on"],
            true
        );
        assert_eq!(
            devices["hdm:ZigBee:0001"]
                .device_service("BinarySwitch")
                .unwrap()
                .state()["on"],
            false
        );
    }
}
