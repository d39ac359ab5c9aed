use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ServiceCore;
use crate::error::Result;

/// Switch position of a [`PowerSwitch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchState {
    On,
    Off,
}

/// Operation mode of a [`RoomClimateControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationMode {
    /// Follows the heating schedule.
    Automatic,
    Manual,
}

/// Reading of a [`ShutterContact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactState {
    Open,
    Closed,
}

/// Smart plugs and relays.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSwitch {
    pub(super) core: ServiceCore,
}

impl PowerSwitch {
    pub fn switch_state(&self) -> Option<SwitchState> {
        self.core.field("switchState")
    }

    pub fn is_on(&self) -> Option<bool> {
        self.switch_state().map(|state| state == SwitchState::On)
    }

    /// Seconds after which the plug switches itself off; 0 when disabled.
    pub fn automatic_power_off_time(&self) -> Option<u64> {
        self.core.field("automaticPowerOffTime")
    }

    pub async fn set_switch_state(&mut self, switch_state: SwitchState) -> Result<()> {
        self.core
            .set_state(json!({"@type": "powerSwitchState", "switchState": switch_state}))
            .await
    }
}

/// A plain on/off switch.
#[derive(Debug, Clone, PartialEq)]
pub struct BinarySwitch {
    pub(super) core: ServiceCore,
}

impl BinarySwitch {
    pub fn is_on(&self) -> Option<bool> {
        self.core.field("on")
    }

    pub async fn set_on(&mut self, on: bool) -> Result<()> {
        self.core
            .set_state(json!({"@type": "binarySwitchState", "on": on}))
            .await
    }
}

/// Dimmers and other switches with a level.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLevelSwitch {
    pub(super) core: ServiceCore,
}

impl MultiLevelSwitch {
    /// Level in percent.
    pub fn level(&self) -> Option<u8> {
        self.core.field("level")
    }

    pub async fn set_level(&mut self, level: u8) -> Result<()> {
        self.core
            .set_state(json!({"@type": "multiLevelSwitchState", "level": level.min(100)}))
            .await
    }
}

/// Measured temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureLevel {
    pub(super) core: ServiceCore,
}

impl TemperatureLevel {
    /// Degrees Celsius.
    pub fn temperature(&self) -> Option<f64> {
        self.core.field("temperature")
    }
}

/// Measured relative humidity.
#[derive(Debug, Clone, PartialEq)]
pub struct HumidityLevel {
    pub(super) core: ServiceCore,
}

impl HumidityLevel {
    /// Percent.
    pub fn humidity(&self) -> Option<f64> {
        self.core.field("humidity")
    }
}

/// Climate control of a room: the setpoint the thermostats in it work towards.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomClimateControl {
    pub(super) core: ServiceCore,
}

impl RoomClimateControl {
    const STATE_TYPE: &'static str = "climateControlState";

    pub fn setpoint_temperature(&self) -> Option<f64> {
        self.core.field("setpointTemperature")
    }

    pub fn operation_mode(&self) -> Option<OperationMode> {
        self.core.field("operationMode")
    }

    pub fn boost_mode(&self) -> Option<bool> {
        self.core.field("boostMode")
    }

    pub fn low(&self) -> Option<bool> {
        self.core.field("low")
    }

    pub fn summer_mode(&self) -> Option<bool> {
        self.core.field("summerMode")
    }

    pub async fn set_setpoint_temperature(&mut self, temperature: f64) -> Result<()> {
        self.core
            .set_state(json!({"@type": Self::STATE_TYPE, "setpointTemperature": temperature}))
            .await
    }

    pub async fn set_operation_mode(&mut self, mode: OperationMode) -> Result<()> {
        self.core
            .set_state(json!({"@type": Self::STATE_TYPE, "operationMode": mode}))
            .await
    }

    pub async fn set_boost_mode(&mut self, boost_mode: bool) -> Result<()> {
        self.core
            .set_state(json!({"@type": Self::STATE_TYPE, "boostMode": boost_mode}))
            .await
    }
}

/// Valve of a radiator thermostat.
#[derive(Debug, Clone, PartialEq)]
pub struct ValveTappet {
    pub(super) core: ServiceCore,
}

impl ValveTappet {
    /// Opening in percent.
    pub fn position(&self) -> Option<u8> {
        self.core.field("position")
    }

    /// Valve status, e.g. `VALVE_ADAPTION_SUCCESSFUL`.
    pub fn value(&self) -> Option<String> {
        self.core.field("value")
    }
}

/// Door and window contacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutterContact {
    pub(super) core: ServiceCore,
}

impl ShutterContact {
    pub fn value(&self) -> Option<ContactState> {
        self.core.field("value")
    }

    pub fn is_open(&self) -> Option<bool> {
        self.value().map(|value| value == ContactState::Open)
    }
}

/// Shutter motors.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutterControl {
    pub(super) core: ServiceCore,
}

impl ShutterControl {
    const STATE_TYPE: &'static str = "shutterControlState";

    /// 0.0 is fully closed, 1.0 fully open.
    pub fn level(&self) -> Option<f64> {
        self.core.field("level")
    }

    /// e.g. `STOPPED`, `MOVING`, `CALIBRATING`.
    pub fn operation_state(&self) -> Option<String> {
        self.core.field("operationState")
    }

    pub async fn set_level(&mut self, level: f64) -> Result<()> {
        self.core
            .set_state(json!({"@type": Self::STATE_TYPE, "level": level.clamp(0.0, 1.0)}))
            .await
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.core
            .set_state(json!({"@type": Self::STATE_TYPE, "operationState": "STOPPED"}))
            .await
    }
}
