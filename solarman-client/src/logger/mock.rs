//! In-memory logger answering register requests

use async_trait::async_trait;
use solarman_core::{checksum8, crc16_modbus, SolarmanError, SolarmanResult};
use solarman_session::FrameMeta;
use solarman_transport::{StreamAccessor, TransportLayer};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything the fake logger saw, shared with the test
#[derive(Debug, Default)]
pub(crate) struct Wire {
    pub events: Vec<&'static str>,
    pub requests: Vec<Vec<u8>>,
    pub opens: usize,
    pub closes: usize,
    /// Replies used instead of the computed answer, in order
    pub scripted: VecDeque<Vec<u8>>,
    pub fail_next_read: Option<io::ErrorKind>,
    pub stall_reads: bool,
    pending: VecDeque<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub(crate) struct MockInverter {
    wire: Arc<Mutex<Wire>>,
    closed: bool,
}

impl MockInverter {
    pub fn new() -> (Self, Arc<Mutex<Wire>>) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        (
            Self {
                wire: wire.clone(),
                closed: true,
            },
            wire,
        )
    }
}

/// Response envelope around `payload`
pub(crate) fn envelope(sequence: u16, serial: u32, payload: &[u8]) -> Vec<u8> {
    let meta = FrameMeta::default();
    let mut out = vec![meta.start_marker];
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(&meta.response_control_code.to_le_bytes());
    out.extend_from_slice(&sequence.to_be_bytes());
    out.extend_from_slice(&serial.to_le_bytes());
    out.extend_from_slice(payload);
    out.push(checksum8(&out[1..]));
    out.push(meta.end_marker);
    out
}

/// Read response payload carrying `registers`
pub(crate) fn read_payload(registers: &[u16]) -> Vec<u8> {
    let mut out = vec![0x02, 0x01];
    out.extend_from_slice(&[0u8; 12]);
    let body = out.len();
    out.extend_from_slice(&[0x01, 0x03, (registers.len() * 2) as u8]);
    for value in registers {
        out.extend_from_slice(&value.to_be_bytes());
    }
    let crc = crc16_modbus(&out[body..]);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&[0x00, 0x00]);
    out
}

/// Write confirmation payload
pub(crate) fn write_payload(start: u16, quantity: u16) -> Vec<u8> {
    let mut out = vec![0x02, 0x01];
    out.extend_from_slice(&[0u8; 12]);
    let body = out.len();
    out.extend_from_slice(&[0x01, 0x10]);
    out.extend_from_slice(&start.to_be_bytes());
    out.extend_from_slice(&quantity.to_be_bytes());
    let crc = crc16_modbus(&out[body..]);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&[0x00, 0x00]);
    out
}

/// Answer a request envelope; reads return each register's own address
fn answer(request: &[u8]) -> Vec<u8> {
    let sequence = u16::from_le_bytes([request[5], request[6]]);
    let serial = u32::from_le_bytes([request[7], request[8], request[9], request[10]]);
    let body = &request[11 + 15..request.len() - 2];
    let start = u16::from_be_bytes([body[2], body[3]]);
    let quantity = u16::from_be_bytes([body[4], body[5]]);

    let payload = match body[1] {
        0x03 => {
            let registers: Vec<u16> = (0..quantity).map(|i| start.wrapping_add(i)).collect();
            read_payload(&registers)
        }
        _ => write_payload(start, quantity),
    };
    envelope(sequence, serial, &payload)
}

#[async_trait]
impl StreamAccessor for MockInverter {
    async fn set_timeout(&mut self, _timeout: Option<Duration>) -> SolarmanResult<()> {
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SolarmanResult<usize> {
        tokio::task::yield_now().await;

        let stall = self.wire.lock().unwrap().stall_reads;
        if stall {
            std::future::pending::<()>().await;
        }

        let mut wire = self.wire.lock().unwrap();
        wire.events.push("read");
        if let Some(kind) = wire.fail_next_read.take() {
            self.closed = true;
            return Err(SolarmanError::transport(
                "read",
                io::Error::new(kind, "injected failure"),
            ));
        }
        match wire.pending.pop_front() {
            Some(reply) => {
                let n = reply.len().min(buf.len());
                buf[..n].copy_from_slice(&reply[..n]);
                Ok(n)
            }
            None => {
                self.closed = true;
                Ok(0)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> SolarmanResult<usize> {
        {
            let mut wire = self.wire.lock().unwrap();
            wire.events.push("write");
            let reply = match wire.scripted.pop_front() {
                Some(reply) => reply,
                None => answer(buf),
            };
            wire.requests.push(buf.to_vec());
            wire.pending.push_back(reply);
        }
        tokio::task::yield_now().await;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> SolarmanResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SolarmanResult<()> {
        let mut wire = self.wire.lock().unwrap();
        wire.closes += 1;
        wire.pending.clear();
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl TransportLayer for MockInverter {
    async fn open(&mut self) -> SolarmanResult<()> {
        self.wire.lock().unwrap().opens += 1;
        self.closed = false;
        Ok(())
    }
}
