#![allow(dead_code)]

use std::collections::VecDeque;

use bl0939_monitor::bl0939::frame::{response_checksum, PACKET_HEADER, READ_COMMAND, RESPONSE_LEN};
use bl0939_monitor::{DeviceAddress, RawSample};
use embedded_io_async::{ErrorKind, ErrorType, Read, ReadReady, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineError;

impl embedded_io_async::Error for LineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// What the simulated IC does after a read command.
pub enum Reply {
    Bytes(Vec<u8>),
    /// part of a reply, then the line stays quiet
    Stall(Vec<u8>),
    /// the transport itself fails
    Fail,
}

/// In-memory UART with a scripted BL0939 on the other end.
#[derive(Default)]
pub struct MockUart {
    pub replies: VecDeque<Reply>,
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pending: Vec<u8>,
    stalled: bool,
    failed: bool,
}

impl MockUart {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl ErrorType for MockUart {
    type Error = LineError;
}

impl Read for MockUart {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LineError> {
        if self.failed {
            self.failed = false;
            return Err(LineError);
        }
        if self.rx.is_empty() && self.stalled {
            core::future::pending::<()>().await;
        }
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl ReadReady for MockUart {
    fn read_ready(&mut self) -> Result<bool, LineError> {
        Ok(!self.rx.is_empty())
    }
}

impl Write for MockUart {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, LineError> {
        self.tx.extend_from_slice(buf);
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), LineError> {
        let is_read = self.pending.first().is_some_and(|b| b & 0xf0 == READ_COMMAND);
        self.pending.clear();
        self.stalled = false;
        if !is_read {
            return Ok(());
        }
        match self.replies.pop_front() {
            Some(Reply::Bytes(bytes)) => self.rx.extend(bytes),
            Some(Reply::Stall(bytes)) => {
                self.rx.extend(bytes);
                self.stalled = true;
            }
            Some(Reply::Fail) => self.failed = true,
            None => {}
        }
        Ok(())
    }
}

/// Full data packet as the IC would send it for `raw`.
pub fn encode_packet(address: DeviceAddress, raw: &RawSample) -> Vec<u8> {
    let fields = [
        raw.ia_fast_rms,
        raw.ia_rms,
        raw.ib_rms,
        raw.v_rms,
        raw.ib_fast_rms,
        raw.a_watt as u32,
        raw.b_watt as u32,
        raw.cfa_cnt,
        raw.cfb_cnt,
        raw.tps1,
        raw.tps2,
    ];

    let mut packet = vec![PACKET_HEADER];
    for field in fields {
        packet.extend_from_slice(&field.to_le_bytes()[..3]);
    }
    packet.push(response_checksum(address, &packet));
    assert_eq!(packet.len(), RESPONSE_LEN);
    packet
}

pub fn sample() -> RawSample {
    RawSample {
        ia_fast_rms: 0x1234,
        ia_rms: 0x04_1eb8,
        ib_rms: 0x00_2710,
        v_rms: 0x3d_f2a0,
        ib_fast_rms: 0x0100,
        a_watt: 0x01_5f90,
        // reverse flow on channel B
        b_watt: -0x00_3a98,
        cfa_cnt: 0x00_c350,
        cfb_cnt: 0x80_0010,
        tps1: 0x40,
        tps2: 0x41,
    }
}
