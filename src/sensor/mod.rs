pub mod discovery;

use embassy_sync::{blocking_mutex::raw::RawMutex, signal::Signal};

use crate::bl0939::sample::Readings;
use crate::config::{ChannelSet, MeasurementChannel};

/// Receives the value of one measurement channel after each good poll.
pub trait Sensor {
    fn publish_state(&mut self, value: f64);
}

impl<F: FnMut(f64)> Sensor for F {
    fn publish_state(&mut self, value: f64) {
        self(value)
    }
}

/// Hands values to another task, the latest value wins.
pub struct SignalSensor<'a, M: RawMutex>(pub &'a Signal<M, f64>);

impl<'a, M: RawMutex> Sensor for SignalSensor<'a, M> {
    fn publish_state(&mut self, value: f64) {
        self.0.signal(value);
    }
}

/// One optional sensor per [`MeasurementChannel`].
#[derive(Default)]
pub struct Sensors<'s> {
    slots: [Option<&'s mut dyn Sensor>; MeasurementChannel::COUNT],
}

impl<'s> Sensors<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: MeasurementChannel, sensor: &'s mut dyn Sensor) -> Self {
        self.attach(channel, sensor);
        self
    }

    pub fn attach(&mut self, channel: MeasurementChannel, sensor: &'s mut dyn Sensor) {
        self.slots[channel.index()] = Some(sensor);
    }

    pub fn detach(&mut self, channel: MeasurementChannel) {
        self.slots[channel.index()] = None;
    }

    /// channels that have a sensor attached
    pub fn channels(&self) -> ChannelSet {
        MeasurementChannel::ALL
            .into_iter()
            .filter(|c| self.slots[c.index()].is_some())
            .collect()
    }

    /// Publishes every value in `readings` that has a sensor, returns how many.
    pub fn publish(&mut self, readings: &Readings) -> usize {
        let mut published = 0;
        for (channel, value) in readings.iter() {
            if let Some(sensor) = self.slots[channel.index()].as_mut() {
                sensor.publish_state(value);
                published += 1;
            }
        }
        published
    }
}
