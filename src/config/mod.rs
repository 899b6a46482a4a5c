mod structs;

use core::fmt;

use crc::{Crc, CRC_32_ISCSI};
use embedded_storage::{ReadStorage, Storage};
use log::{debug, warn};
pub use structs::*;

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// space reserved for the serialized config, including the crc
pub const CONFIG_BLOB_LEN: usize = 128;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidAddress(u8),
    InvalidFrequency(u16),
    InvalidReference(&'static str),
    InvalidInterval,
    Storage,
    Encode,
    Decode,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress(a) => write!(f, "device address {a} out of range 0..=15"),
            ConfigError::InvalidFrequency(hz) => write!(f, "unsupported line frequency {hz} Hz"),
            ConfigError::InvalidReference(name) => write!(f, "{name} must be finite and non-zero"),
            ConfigError::InvalidInterval => write!(f, "intervals must be non-zero"),
            ConfigError::Storage => write!(f, "storage access failed"),
            ConfigError::Encode => write!(f, "config does not fit the storage blob"),
            ConfigError::Decode => write!(f, "stored config is corrupt or missing"),
        }
    }
}

/// Writes `config` as a postcard blob with a trailing crc32 at `offset`.
pub fn save<S: Storage>(storage: &mut S, offset: u32, config: &Bl0939Config) -> Result<(), ConfigError>
where
    S::Error: fmt::Debug,
{
    config.validate()?;

    let mut buffer = [0u8; CONFIG_BLOB_LEN];
    let n = postcard::to_slice_crc32(config, &mut buffer, CRC.digest())
        .map_err(|_| ConfigError::Encode)?
        .len();

    if let Err(e) = storage.write(offset, &buffer[..n]) {
        warn!("error writing config to storage {e:?}");
        return Err(ConfigError::Storage);
    }

    debug!("saved config, {n} bytes at {offset:#x}");
    Ok(())
}

/// Reads a config written by [`save`]. Erased or corrupted storage yields
/// [`ConfigError::Decode`], the caller usually falls back to the default.
pub fn load<S: ReadStorage>(storage: &mut S, offset: u32) -> Result<Bl0939Config, ConfigError>
where
    S::Error: fmt::Debug,
{
    let mut buffer = [0u8; CONFIG_BLOB_LEN];
    if let Err(e) = storage.read(offset, &mut buffer) {
        warn!("error reading config from storage {e:?}");
        return Err(ConfigError::Storage);
    }

    let Ok((config, _)) = postcard::take_from_bytes_crc32::<Bl0939Config>(&buffer, CRC.digest())
    else {
        return Err(ConfigError::Decode);
    };

    config.validate()?;
    Ok(config)
}
