use crate::config::LineFrequency;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(non_camel_case_types, unused)]
pub enum Reg {
    /// fast current RMS, channel A
    IA_FAST_RMS = 0x00,
    /// current RMS, channel A
    IA_RMS = 0x04,
    /// current RMS, channel B
    IB_RMS = 0x05,
    /// voltage RMS
    V_RMS = 0x06,
    /// fast current RMS, channel B
    IB_FAST_RMS = 0x07,
    /// active power, channel A
    A_WATT = 0x08,
    /// active power, channel B
    B_WATT = 0x09,
    /// active energy pulse count, channel A
    CFA_CNT = 0x0A,
    /// active energy pulse count, channel B
    CFB_CNT = 0x0B,
    /// internal temperature
    TPS1 = 0x0E,
    /// external temperature
    TPS2 = 0x0F,

    /// user mode selection
    MODE = 0x18,
    /// write 0x5A5A5A to reset
    SOFT_RESET = 0x19,
    /// write 0x55 to unlock user registers
    USR_WRPROT = 0x1A,
}

impl Reg {
    pub fn addr(&self) -> u8 {
        *self as u8
    }
}

/// Register selector that makes the IC answer with the full data packet.
pub const FULL_PACKET: u8 = 0xAA;

pub const SOFT_RESET_MAGIC: u32 = 0x5A5A5A;
pub const USR_WRPROT_UNLOCK: u32 = 0x55;
pub const USR_WRPROT_LOCK: u32 = 0x00;

// MODE register bits
pub const MODE_RMS_UPDATE_800MS: u32 = 0x100;
pub const MODE_AC_FREQ_60HZ: u32 = 0x200;
pub const MODE_CF_OUT_B: u32 = 0x800;
pub const MODE_CF_UNABLE_ALARM: u32 = 0x1000;

/// MODE value programmed at setup: 800 ms RMS update, CF pins as energy
/// pulse outputs of channel A, mains frequency from the config.
pub fn mode_value(line_frequency: LineFrequency) -> u32 {
    let mut mode = MODE_RMS_UPDATE_800MS;
    if line_frequency == LineFrequency::F60Hz {
        mode |= MODE_AC_FREQ_60HZ;
    }
    mode
}
