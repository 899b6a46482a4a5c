use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::bl0939::calibration::CalibrationReferences;

/// Bus address of the IC, selected by its A1..A4 pins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    pub const MAX: u8 = 15;

    pub const fn new(address: u8) -> Option<Self> {
        if address <= Self::MAX {
            Some(Self(address))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = ConfigError;

    fn try_from(address: u8) -> Result<Self, Self::Error> {
        Self::new(address).ok_or(ConfigError::InvalidAddress(address))
    }
}

impl From<DeviceAddress> for u8 {
    fn from(address: DeviceAddress) -> Self {
        address.0
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineFrequency {
    #[default]
    F50Hz,
    F60Hz,
}

impl LineFrequency {
    pub fn hz(self) -> u16 {
        match self {
            LineFrequency::F50Hz => 50,
            LineFrequency::F60Hz => 60,
        }
    }
}

impl TryFrom<u16> for LineFrequency {
    type Error = ConfigError;

    fn try_from(hz: u16) -> Result<Self, Self::Error> {
        match hz {
            50 => Ok(LineFrequency::F50Hz),
            60 => Ok(LineFrequency::F60Hz),
            other => Err(ConfigError::InvalidFrequency(other)),
        }
    }
}

/// One published quantity of the monitor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementChannel {
    Voltage,
    Current1,
    Current2,
    Power1,
    Power2,
    Energy1,
    Energy2,
    /// sum of the per-channel energy counters
    EnergyTotal,
}

impl MeasurementChannel {
    pub const COUNT: usize = 8;

    pub const ALL: [MeasurementChannel; Self::COUNT] = [
        MeasurementChannel::Voltage,
        MeasurementChannel::Current1,
        MeasurementChannel::Current2,
        MeasurementChannel::Power1,
        MeasurementChannel::Power2,
        MeasurementChannel::Energy1,
        MeasurementChannel::Energy2,
        MeasurementChannel::EnergyTotal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// key used in JSON state payloads and entity ids
    pub fn key(self) -> &'static str {
        match self {
            MeasurementChannel::Voltage => "voltage",
            MeasurementChannel::Current1 => "current_1",
            MeasurementChannel::Current2 => "current_2",
            MeasurementChannel::Power1 => "active_power_1",
            MeasurementChannel::Power2 => "active_power_2",
            MeasurementChannel::Energy1 => "energy_1",
            MeasurementChannel::Energy2 => "energy_2",
            MeasurementChannel::EnergyTotal => "energy_total",
        }
    }
}

/// Set of enabled channels, one bit per [`MeasurementChannel`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub const EMPTY: ChannelSet = ChannelSet(0);
    pub const ALL: ChannelSet = ChannelSet(0xff);

    pub const fn with(self, channel: MeasurementChannel) -> Self {
        Self(self.0 | (1 << channel as u8))
    }

    pub fn insert(&mut self, channel: MeasurementChannel) {
        self.0 |= 1 << channel as u8;
    }

    pub fn remove(&mut self, channel: MeasurementChannel) {
        self.0 &= !(1 << channel as u8);
    }

    pub fn contains(self, channel: MeasurementChannel) -> bool {
        self.0 & (1 << channel as u8) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = MeasurementChannel> {
        MeasurementChannel::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<MeasurementChannel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = MeasurementChannel>>(iter: I) -> Self {
        let mut set = ChannelSet::EMPTY;
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Bl0939Config {
    /// bus address of the IC (0..=15)
    pub address: DeviceAddress,
    /// mains frequency, programmed into the MODE register during setup
    pub line_frequency: LineFrequency,
    /// period of the poll ticker
    pub update_interval_ms: u32,
    /// how long to wait for the full data packet
    pub response_timeout_ms: u32,
    // calibration overrides, datasheet reference circuit if unset
    pub current_reference: Option<f64>,
    pub energy_reference: Option<f64>,
    pub power_reference: Option<f64>,
    pub voltage_reference: Option<f64>,
    /// channels that are decoded and published
    pub channels: ChannelSet,
}

impl Default for Bl0939Config {
    fn default() -> Self {
        Self {
            address: DeviceAddress::default(),
            line_frequency: LineFrequency::default(),
            update_interval_ms: 60_000,
            response_timeout_ms: 250,
            current_reference: None,
            energy_reference: None,
            power_reference: None,
            voltage_reference: None,
            channels: ChannelSet::default(),
        }
    }
}

impl Bl0939Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let references = [
            ("current_reference", self.current_reference),
            ("energy_reference", self.energy_reference),
            ("power_reference", self.power_reference),
            ("voltage_reference", self.voltage_reference),
        ];
        for (name, value) in references {
            if let Some(v) = value {
                if !v.is_finite() || v == 0.0 {
                    return Err(ConfigError::InvalidReference(name));
                }
            }
        }
        if self.update_interval_ms == 0 || self.response_timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }

    pub fn references(&self) -> CalibrationReferences {
        CalibrationReferences::with_overrides(
            self.current_reference,
            self.energy_reference,
            self.power_reference,
            self.voltage_reference,
        )
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms as u64)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms as u64)
    }
}
