//! Async driver for the BL0939 two channel energy metering IC, attached over UART.
//!
//! The driver polls the IC's full data packet, checks it and publishes voltage,
//! the two channel currents, active powers and energy counters to [`sensor::Sensor`]s.
//! The transport is anything implementing the `embedded-io-async` traits, timing
//! comes from `embassy-time`.
//!
//! ```ignore
//! let mut chip = Bl0939::new(uart, Bl0939Config::default())?;
//! chip.setup().await?;
//!
//! let mut voltage = |v: f64| log::info!("{v} V");
//! let mut sensors = Sensors::new().with(MeasurementChannel::Voltage, &mut voltage);
//! let mut ticker = chip.ticker();
//! chip.run(&mut ticker, &mut sensors).await
//! ```

#![cfg_attr(not(test), no_std)]

pub mod bl0939;
pub mod config;
pub mod sensor;

pub use bl0939::calibration::CalibrationReferences;
pub use bl0939::sample::{RawSample, Readings};
pub use bl0939::{Bl0939, Error, PollState, PollTimer};
pub use config::{Bl0939Config, ChannelSet, DeviceAddress, LineFrequency, MeasurementChannel};
pub use sensor::{Sensor, Sensors};
