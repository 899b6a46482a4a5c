use serde::Serialize;

use super::calibration::CalibrationReferences;
use super::frame::{Field, ResponsePacket};
use crate::config::{ChannelSet, MeasurementChannel};

/// Register values of one full data packet, before calibration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawSample {
    pub ia_fast_rms: u32,
    pub ia_rms: u32,
    pub ib_rms: u32,
    pub v_rms: u32,
    pub ib_fast_rms: u32,
    pub a_watt: i32,
    pub b_watt: i32,
    pub cfa_cnt: u32,
    pub cfb_cnt: u32,
    pub tps1: u32,
    pub tps2: u32,
}

impl From<&ResponsePacket> for RawSample {
    fn from(packet: &ResponsePacket) -> Self {
        Self {
            ia_fast_rms: packet.unsigned(Field::IaFastRms),
            ia_rms: packet.unsigned(Field::IaRms),
            ib_rms: packet.unsigned(Field::IbRms),
            v_rms: packet.unsigned(Field::VRms),
            ib_fast_rms: packet.unsigned(Field::IbFastRms),
            a_watt: packet.signed(Field::AWatt),
            b_watt: packet.signed(Field::BWatt),
            cfa_cnt: packet.unsigned(Field::CfaCnt),
            cfb_cnt: packet.unsigned(Field::CfbCnt),
            tps1: packet.unsigned(Field::Tps1),
            tps2: packet.unsigned(Field::Tps2),
        }
    }
}

impl RawSample {
    /// Pulse count behind the energy total: both counters, unless only one
    /// of the per-channel energies is enabled, then just that one.
    pub fn energy_total_count(&self, channels: ChannelSet) -> u32 {
        let ch1 = channels.contains(MeasurementChannel::Energy1);
        let ch2 = channels.contains(MeasurementChannel::Energy2);
        match (ch1, ch2) {
            (true, false) => self.cfa_cnt,
            (false, true) => self.cfb_cnt,
            // 24 bit counters, the sum cannot overflow
            _ => self.cfa_cnt + self.cfb_cnt,
        }
    }

    /// Scales the registers of all enabled channels, the others stay `None`.
    pub fn decode(&self, refs: &CalibrationReferences, channels: ChannelSet) -> Readings {
        let mut readings = Readings::default();
        for channel in channels.iter() {
            let value = match channel {
                MeasurementChannel::Voltage => self.v_rms as f64 / refs.voltage,
                MeasurementChannel::Current1 => self.ia_rms as f64 / refs.current,
                MeasurementChannel::Current2 => self.ib_rms as f64 / refs.current,
                MeasurementChannel::Power1 => self.a_watt as f64 / refs.power,
                MeasurementChannel::Power2 => self.b_watt as f64 / refs.power,
                MeasurementChannel::Energy1 => self.cfa_cnt as f64 / refs.energy,
                MeasurementChannel::Energy2 => self.cfb_cnt as f64 / refs.energy,
                MeasurementChannel::EnergyTotal => {
                    self.energy_total_count(channels) as f64 / refs.energy
                }
            };
            readings.set(channel, value);
        }
        readings
    }
}

/// Calibrated values of one poll cycle, in V, A, W and kWh.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Readings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_2: Option<f64>,
    #[serde(rename = "active_power_1", skip_serializing_if = "Option::is_none")]
    pub power_1: Option<f64>,
    #[serde(rename = "active_power_2", skip_serializing_if = "Option::is_none")]
    pub power_2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_total: Option<f64>,
}

impl Readings {
    fn slot(&mut self, channel: MeasurementChannel) -> &mut Option<f64> {
        match channel {
            MeasurementChannel::Voltage => &mut self.voltage,
            MeasurementChannel::Current1 => &mut self.current_1,
            MeasurementChannel::Current2 => &mut self.current_2,
            MeasurementChannel::Power1 => &mut self.power_1,
            MeasurementChannel::Power2 => &mut self.power_2,
            MeasurementChannel::Energy1 => &mut self.energy_1,
            MeasurementChannel::Energy2 => &mut self.energy_2,
            MeasurementChannel::EnergyTotal => &mut self.energy_total,
        }
    }

    pub fn set(&mut self, channel: MeasurementChannel, value: f64) {
        *self.slot(channel) = Some(value);
    }

    pub fn get(&self, channel: MeasurementChannel) -> Option<f64> {
        match channel {
            MeasurementChannel::Voltage => self.voltage,
            MeasurementChannel::Current1 => self.current_1,
            MeasurementChannel::Current2 => self.current_2,
            MeasurementChannel::Power1 => self.power_1,
            MeasurementChannel::Power2 => self.power_2,
            MeasurementChannel::Energy1 => self.energy_1,
            MeasurementChannel::Energy2 => self.energy_2,
            MeasurementChannel::EnergyTotal => self.energy_total,
        }
    }

    /// channels that carry a value, in [`MeasurementChannel::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (MeasurementChannel, f64)> + '_ {
        MeasurementChannel::ALL
            .into_iter()
            .filter_map(|channel| self.get(channel).map(|v| (channel, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// compact JSON state payload, absent channels are skipped
    pub fn to_json<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b [u8], serde_json_core::ser::Error> {
        let n = serde_json_core::to_slice(self, buffer)?;
        Ok(&buffer[..n])
    }
}
