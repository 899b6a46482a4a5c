use embassy_time::{with_timeout, Duration};
use embedded_io_async::{Read, ReadReady, Write};

/// upper bound of reads spent discarding stale input per cycle
const DRAIN_READS: usize = 8;

pub async fn send<U: Write>(uart: &mut U, frame: &[u8]) -> Result<(), U::Error> {
    uart.write_all(frame).await?;
    uart.flush().await
}

/// Fills `buf` from the uart. Returns how many bytes arrived before the
/// transport reported EOF or `timeout` elapsed.
pub async fn receive<U: Read>(uart: &mut U, buf: &mut [u8], timeout: Duration) -> Result<usize, U::Error> {
    let mut received = 0;
    let res = with_timeout(timeout, async {
        while received < buf.len() {
            let n = uart.read(&mut buf[received..]).await?;
            if n == 0 {
                break;
            }
            received += n;
        }
        Ok::<(), U::Error>(())
    })
    .await;

    match res {
        Ok(Err(e)) => Err(e),
        // timeout is reported through the short count
        Ok(Ok(())) | Err(_) => Ok(received),
    }
}

/// Throws away bytes that are already waiting, e.g. the tail of a reply
/// that arrived after the previous cycle gave up on it.
pub async fn drain<U: Read + ReadReady>(uart: &mut U) -> Result<usize, U::Error> {
    let mut scratch = [0u8; 16];
    let mut dropped = 0;
    for _ in 0..DRAIN_READS {
        if !uart.read_ready()? {
            break;
        }
        let n = uart.read(&mut scratch).await?;
        if n == 0 {
            break;
        }
        dropped += n;
    }
    Ok(dropped)
}
