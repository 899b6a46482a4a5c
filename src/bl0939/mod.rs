pub mod calibration;
pub mod frame;
pub mod registers;
pub mod sample;
mod uart;

use core::fmt::{self, Debug};

use embassy_time::{Duration, Ticker, Timer};
use embedded_io_async::{Read, ReadReady, Write};
use log::{debug, error, info, trace, warn};

use crate::config::{Bl0939Config, ConfigError};
use crate::sensor::Sensors;
use calibration::CalibrationReferences;
use frame::{FrameError, REGISTER_REPLY_LEN, RESPONSE_LEN};
use registers::Reg;
use sample::{RawSample, Readings};

/// the IC needs a moment after each register write
const WRITE_SETTLE: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub enum Error<E> {
    Uart(E),
    /// fewer bytes than a full frame arrived before the response window closed
    Timeout { received: usize },
    Frame(FrameError),
    /// MODE register did not read back as written
    Setup { expected: u32, received: u32 },
}

impl<E> From<FrameError> for Error<E> {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}

impl<E: Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Uart(e) => write!(f, "uart error: {e:?}"),
            Error::Timeout { received } => write!(f, "timeout after {received} bytes"),
            Error::Frame(e) => write!(f, "bad frame: {e}"),
            Error::Setup { expected, received } => {
                write!(f, "MODE reads back {received:#x}, wrote {expected:#x}")
            }
        }
    }
}

/// Progress of the current poll cycle. Anything but `Idle` between cycles
/// means the last poll future was dropped half way.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PollState {
    #[default]
    Idle,
    Requesting,
    AwaitingResponse,
    Decoding,
}

/// Periodic trigger for [`Bl0939::run`].
#[allow(async_fn_in_trait)]
pub trait PollTimer {
    async fn tick(&mut self);
}

impl PollTimer for Ticker {
    async fn tick(&mut self) {
        self.next().await
    }
}

pub struct Bl0939<U> {
    uart: U,
    config: Bl0939Config,
    references: CalibrationReferences,
    state: PollState,
}

impl<U> Bl0939<U>
where
    U: Read + Write + ReadReady,
{
    /// Takes ownership of the transport. Fails if `config` does not pass
    /// [`Bl0939Config::validate`].
    pub fn new(uart: U, config: Bl0939Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let references = config.references();
        debug!(
            "bl0939 at address {}, references I {} E {} P {} U {}",
            config.address.get(),
            references.current,
            references.energy,
            references.power,
            references.voltage
        );
        Ok(Self {
            uart,
            config,
            references,
            state: PollState::Idle,
        })
    }

    pub fn config(&self) -> &Bl0939Config {
        &self.config
    }

    pub fn references(&self) -> &CalibrationReferences {
        &self.references
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn release(self) -> U {
        self.uart
    }

    /// ticker firing every `update_interval` of the config
    pub fn ticker(&self) -> Ticker {
        Ticker::every(self.config.update_interval())
    }

    fn enter(&mut self, state: PollState) {
        trace!("bl0939 {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// One poll cycle: request the full packet, validate it and decode the
    /// enabled channels. Nothing is published.
    pub async fn poll(&mut self) -> Result<Readings, Error<U::Error>> {
        if self.state != PollState::Idle {
            debug!("bl0939 previous cycle abandoned in {:?}", self.state);
        }
        let res = self.poll_cycle().await;
        self.enter(PollState::Idle);
        res
    }

    async fn poll_cycle(&mut self) -> Result<Readings, Error<U::Error>> {
        self.enter(PollState::Requesting);

        let dropped = uart::drain(&mut self.uart).await.map_err(Error::Uart)?;
        if dropped > 0 {
            warn!("bl0939 junk on wire, discarded {dropped} bytes");
        }

        let request = frame::build_request(self.config.address);
        uart::send(&mut self.uart, &request).await.map_err(Error::Uart)?;

        self.enter(PollState::AwaitingResponse);

        let mut buffer = [0u8; RESPONSE_LEN];
        let received = uart::receive(&mut self.uart, &mut buffer, self.config.response_timeout())
            .await
            .map_err(Error::Uart)?;
        if received < RESPONSE_LEN {
            return Err(Error::Timeout { received });
        }

        self.enter(PollState::Decoding);

        let packet = frame::parse_response(self.config.address, &buffer)?;
        let raw = RawSample::from(&packet);
        trace!("bl0939 raw {raw:?}");

        let readings = raw.decode(&self.references, self.config.channels);
        debug!(
            "bl0939 U {:?}V, I1 {:?}A, I2 {:?}A, P1 {:?}W, P2 {:?}W, CntA {}, CntB {}, E {:?}kWh",
            readings.voltage,
            readings.current_1,
            readings.current_2,
            readings.power_1,
            readings.power_2,
            raw.cfa_cnt,
            raw.cfb_cnt,
            readings.energy_total,
        );

        Ok(readings)
    }

    /// Scheduler entry point. Polls once and publishes the result; a failed
    /// cycle is logged and publishes nothing, the next tick retries.
    pub async fn update(&mut self, sensors: &mut Sensors<'_>) -> Option<Readings> {
        match self.poll().await {
            Ok(readings) => {
                sensors.publish(&readings);
                Some(readings)
            }
            Err(e) => {
                error!("bl0939 poll failed: {e}");
                None
            }
        }
    }

    pub async fn run<T: PollTimer>(&mut self, timer: &mut T, sensors: &mut Sensors<'_>) -> ! {
        loop {
            timer.tick().await;
            self.update(sensors).await;
        }
    }

    pub async fn write_register(&mut self, reg: Reg, value: u32) -> Result<(), Error<U::Error>> {
        let frame = frame::build_write(self.config.address, reg, value);
        uart::send(&mut self.uart, &frame).await.map_err(Error::Uart)?;
        Timer::after(WRITE_SETTLE).await;
        Ok(())
    }

    pub async fn read_register(&mut self, reg: Reg) -> Result<u32, Error<U::Error>> {
        uart::drain(&mut self.uart).await.map_err(Error::Uart)?;

        let request = frame::build_register_request(self.config.address, reg);
        uart::send(&mut self.uart, &request).await.map_err(Error::Uart)?;

        let mut buffer = [0u8; REGISTER_REPLY_LEN];
        let received = uart::receive(&mut self.uart, &mut buffer, self.config.response_timeout())
            .await
            .map_err(Error::Uart)?;
        if received < REGISTER_REPLY_LEN {
            return Err(Error::Timeout { received });
        }

        Ok(frame::parse_register_read(self.config.address, reg, &buffer)?)
    }

    /// Resets the IC and programs the MODE register for the configured
    /// line frequency. Optional, the power-on defaults assume 50 Hz.
    pub async fn setup(&mut self) -> Result<(), Error<U::Error>> {
        let mode = registers::mode_value(self.config.line_frequency);

        self.write_register(Reg::SOFT_RESET, registers::SOFT_RESET_MAGIC).await?;
        self.write_register(Reg::USR_WRPROT, registers::USR_WRPROT_UNLOCK).await?;
        self.write_register(Reg::MODE, mode).await?;
        self.write_register(Reg::USR_WRPROT, registers::USR_WRPROT_LOCK).await?;

        let received = self.read_register(Reg::MODE).await?;
        if received != mode {
            warn!("bl0939 setup failed, MODE {received:#x} != {mode:#x}");
            return Err(Error::Setup {
                expected: mode,
                received,
            });
        }

        info!(
            "bl0939 configured for {} Hz at address {}",
            self.config.line_frequency.hz(),
            self.config.address.get()
        );
        Ok(())
    }
}
