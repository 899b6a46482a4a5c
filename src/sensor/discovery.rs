use core::fmt::Write;

use heapless::String;
use serde::{ser::Error as _, ser::SerializeMap, Serialize, Serializer};

use crate::config::MeasurementChannel;

#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SensorDeviceClass {
    /// : Voltage in V, mV
    Voltage,
    /// : Current in A, mA
    Current,
    /// : Power in W or kW
    Power,
    /// : Energy in Wh, kWh, MWh, MJ, or GJ
    Energy,
}

#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

impl MeasurementChannel {
    pub fn name(self) -> &'static str {
        match self {
            MeasurementChannel::Voltage => "Voltage",
            MeasurementChannel::Current1 => "Current 1",
            MeasurementChannel::Current2 => "Current 2",
            MeasurementChannel::Power1 => "Power 1",
            MeasurementChannel::Power2 => "Power 2",
            MeasurementChannel::Energy1 => "Energy 1",
            MeasurementChannel::Energy2 => "Energy 2",
            MeasurementChannel::EnergyTotal => "Energy sum",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MeasurementChannel::Voltage => "V",
            MeasurementChannel::Current1 | MeasurementChannel::Current2 => "A",
            MeasurementChannel::Power1 | MeasurementChannel::Power2 => "W",
            _ => "kWh",
        }
    }

    pub fn device_class(self) -> SensorDeviceClass {
        match self {
            MeasurementChannel::Voltage => SensorDeviceClass::Voltage,
            MeasurementChannel::Current1 | MeasurementChannel::Current2 => SensorDeviceClass::Current,
            MeasurementChannel::Power1 | MeasurementChannel::Power2 => SensorDeviceClass::Power,
            _ => SensorDeviceClass::Energy,
        }
    }

    pub fn state_class(self) -> StateClass {
        match self.device_class() {
            SensorDeviceClass::Energy => StateClass::TotalIncreasing,
            _ => StateClass::Measurement,
        }
    }

    /// suggested decimals for display
    pub fn accuracy_decimals(self) -> u8 {
        match self.device_class() {
            SensorDeviceClass::Voltage => 1,
            SensorDeviceClass::Current => 2,
            SensorDeviceClass::Power => 0,
            SensorDeviceClass::Energy => 3,
        }
    }
}

pub struct Device<'a> {
    pub identifiers: &'a str,
    pub name: &'a str,
}

impl<'a> Serialize for Device<'a> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_map(Some(2))?;
        st.serialize_entry("ids", self.identifiers)?;
        st.serialize_entry("name", self.name)?;
        st.end()
    }
}

/// Home Assistant MQTT discovery payload for one channel. Values are read
/// from the JSON state payload of [`crate::bl0939::sample::Readings`].
pub struct DiscoveryConfig<'a> {
    pub state_topic: &'a str,
    pub device: Device<'a>,
    pub channel: MeasurementChannel,
    /// seconds, 0 disables
    pub expire_after: u32,
}

impl<'a> Serialize for DiscoveryConfig<'a> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut buffer: String<64> = String::new();
        let key = self.channel.key();

        let mut st = s.serialize_map(None)?;

        st.serialize_entry("stat_t", self.state_topic)?;
        st.serialize_entry("dev", &self.device)?;
        st.serialize_entry("dev_cla", &self.channel.device_class())?;
        st.serialize_entry("stat_cla", &self.channel.state_class())?;
        if self.expire_after != 0 {
            st.serialize_entry("exp_aft", &self.expire_after)?;
        }
        st.serialize_entry("sug_dsp_prc", &self.channel.accuracy_decimals())?;
        st.serialize_entry("unit_of_meas", self.channel.unit())?;
        st.serialize_entry("name", self.channel.name())?;

        // value template
        write!(buffer, "{{{{ value_json.{key} }}}}").map_err(|_| S::Error::custom("template too long"))?;
        st.serialize_entry("val_tpl", buffer.as_str())?;

        // unique id
        buffer.clear();
        write!(buffer, "{}.{key}", self.device.identifiers).map_err(|_| S::Error::custom("unique id too long"))?;
        st.serialize_entry("uniq_id", buffer.as_str())?;

        st.end()
    }
}

impl<'a> DiscoveryConfig<'a> {
    pub fn to_json<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b [u8], serde_json_core::ser::Error> {
        let n = serde_json_core::to_slice(self, buffer)?;
        Ok(&buffer[..n])
    }
}

/// `<prefix>/sensor/<unique id>/<channel key>/config`
pub fn config_topic(prefix: &str, unique_id: &str, channel: MeasurementChannel) -> Option<String<128>> {
    let mut topic = String::new();
    write!(topic, "{prefix}/sensor/{unique_id}/{}/config", channel.key()).ok()?;
    Some(topic)
}

/// `<prefix>/sensor/<unique id>/state`
pub fn state_topic(prefix: &str, unique_id: &str) -> Option<String<128>> {
    let mut topic = String::new();
    write!(topic, "{prefix}/sensor/{unique_id}/state").ok()?;
    Some(topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_metadata() {
        use MeasurementChannel::*;
        assert_eq!(Voltage.unit(), "V");
        assert_eq!(Current2.unit(), "A");
        assert_eq!(Power1.unit(), "W");
        assert_eq!(EnergyTotal.unit(), "kWh");
        assert_eq!(Energy1.state_class(), StateClass::TotalIncreasing);
        assert_eq!(Power2.state_class(), StateClass::Measurement);
        assert_eq!(
            MeasurementChannel::ALL.map(|c| c.accuracy_decimals()),
            [1, 2, 2, 0, 0, 3, 3, 3]
        );
    }

    #[test]
    fn discovery_payload() {
        let topic = state_topic("homeassistant", "bl0939_a1").unwrap();
        let config = DiscoveryConfig {
            state_topic: &topic,
            device: Device {
                identifiers: "bl0939_a1",
                name: "Dual meter",
            },
            channel: MeasurementChannel::Power2,
            expire_after: 0,
        };

        let mut buffer = [0u8; 512];
        let json = core::str::from_utf8(config.to_json(&mut buffer).unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"stat_t":"homeassistant/sensor/bl0939_a1/state","#,
                r#""dev":{"ids":"bl0939_a1","name":"Dual meter"},"#,
                r#""dev_cla":"power","stat_cla":"measurement","sug_dsp_prc":0,"#,
                r#""unit_of_meas":"W","name":"Power 2","#,
                r#""val_tpl":"{{ value_json.active_power_2 }}","#,
                r#""uniq_id":"bl0939_a1.active_power_2"}"#,
            )
        );
    }

    #[test]
    fn topics() {
        assert_eq!(
            config_topic("ha", "meter", MeasurementChannel::EnergyTotal).unwrap(),
            "ha/sensor/meter/energy_total/config"
        );
        let long = [b'x'; 130];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(state_topic(long, "meter"), None);
    }
}
