//! Inverter logger session
//!
//! All operations on one logger share a single connection and are serialized:
//! a call holds the session lock from encoding its request until its reply is
//! decoded, so requests and replies never interleave on the wire.

use super::LoggerBuilder;
use chrono::NaiveDateTime;
use solarman_application::{ReadRequest, ReadResponse, WriteRequest, WriteResponse};
use solarman_core::{
    date_time_to_registers, registers_to_date_time, RegisterMap, SolarmanError, SolarmanResult,
    DATE_TIME_REGISTERS,
};
use solarman_session::{FrameMeta, SessionStatistics, V5Session};
use solarman_transport::{TcpTransport, TransportLayer};
use std::time::Duration;
use tokio::sync::Mutex;

/// Session with one SolarMan V5 data logger
#[derive(Debug)]
pub struct InverterLogger<T: TransportLayer = TcpTransport> {
    logger_serial: u32,
    session: Mutex<V5Session<T>>,
}

impl InverterLogger<TcpTransport> {
    /// Create a logger session; nothing is dialed until the first call
    ///
    /// # Arguments
    /// * `address` - "host" or "host:port", port 8899 when omitted
    /// * `serial_number` - Serial number of the data logger
    /// * `timeout_secs` - Deadline for connect and for each write and read
    pub fn init(address: &str, serial_number: u32, timeout_secs: u64) -> SolarmanResult<Self> {
        LoggerBuilder::new()
            .address(address)
            .serial_number(serial_number)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
    }
}

impl<T: TransportLayer> InverterLogger<T> {
    pub(crate) fn from_session(session: V5Session<T>) -> Self {
        Self {
            logger_serial: session.logger_serial(),
            session: Mutex::new(session),
        }
    }

    pub fn logger_serial(&self) -> u32 {
        self.logger_serial
    }

    /// Override envelope markers and control codes
    pub async fn set_meta(
        &self,
        start_marker: u8,
        end_marker: u8,
        request_control_code: u16,
        response_control_code: u16,
    ) {
        self.set_frame_meta(FrameMeta::new(
            start_marker,
            end_marker,
            request_control_code,
            response_control_code,
        ))
        .await;
    }

    pub async fn set_frame_meta(&self, meta: FrameMeta) {
        self.session.lock().await.set_meta(meta);
    }

    pub async fn meta(&self) -> FrameMeta {
        *self.session.lock().await.meta()
    }

    /// Deadline for connect and for each write and read
    pub async fn timeout(&self) -> Duration {
        self.session.lock().await.timeout()
    }

    /// Log connection events and frame hex dumps at debug level
    pub async fn set_debug(&self, enable: bool) {
        self.session.lock().await.set_debug(enable);
    }

    pub async fn debug(&self) -> bool {
        self.session.lock().await.debug()
    }

    /// Read `count` holding registers starting at `start`
    ///
    /// # Returns
    /// Register values keyed by address
    pub async fn read(&self, start: u16, count: u16) -> SolarmanResult<RegisterMap> {
        let serial = self.logger_serial;
        let request = ReadRequest::new(start, count)
            .map_err(|e| e.context("Read.request", serial, "invalid request"))?;

        let mut session = self.session.lock().await;
        let frame = session
            .frame_request(request.encode())
            .map_err(|e| e.context("Read.requestFrame", serial, "encode failed"))?;
        let reply = session
            .exchange(&frame)
            .await
            .map_err(|e| e.context("Read.exchange", serial, "request failed"))?;

        let envelope = session
            .decode_reply(&reply)
            .map_err(|e| e.context("Read.responseFrame", serial, "bad response frame"))?;

        ReadResponse::decode(envelope.payload())
            .and_then(|response| response.into_registers(start, count))
            .map_err(|e| {
                session.reject_payload(&e);
                e.context("Read.responsePayload", serial, "bad response payload")
            })
    }

    /// Write `values` to consecutive holding registers from `start`
    ///
    /// # Returns
    /// `(bytes written, start register)` as confirmed by the inverter
    pub async fn write(&self, start: u16, values: &[u16]) -> SolarmanResult<(usize, u16)> {
        let serial = self.logger_serial;
        let request = WriteRequest::new(start, values)
            .map_err(|e| e.context("Write.request", serial, "invalid request"))?;

        let mut session = self.session.lock().await;
        let frame = session
            .frame_request(request.encode())
            .map_err(|e| e.context("Write.requestFrame", serial, "encode failed"))?;
        let reply = session
            .exchange(&frame)
            .await
            .map_err(|e| e.context("Write.exchange", serial, "request failed"))?;

        let envelope = session
            .decode_reply(&reply)
            .map_err(|e| e.context("Write.responseFrame", serial, "bad response frame"))?;

        WriteResponse::parse(envelope.payload(), values.len()).map_err(|e| {
            session.reject_payload(&e);
            e.context("Write.parseResponse", serial, "bad write confirmation")
        })
    }

    /// Close the connection; safe to call when already closed
    pub async fn close(&self) -> SolarmanResult<()> {
        self.session.lock().await.close().await
    }

    /// Read the inverter clock from three registers at `start` (22 on Deye)
    pub async fn get_date_time(&self, start: u16) -> SolarmanResult<NaiveDateTime> {
        let registers = self.read(start, DATE_TIME_REGISTERS as u16).await?;
        let values: Vec<u16> = registers.into_values().collect();
        registers_to_date_time(&values)
    }

    /// Set the inverter clock at `start`
    ///
    /// # Returns
    /// `(bytes written, start register, time as stored)`; seconds are the
    /// finest resolution the inverter keeps
    pub async fn set_date_time(
        &self,
        start: u16,
        time: &NaiveDateTime,
    ) -> SolarmanResult<(usize, u16, NaiveDateTime)> {
        let registers = date_time_to_registers(time)?;
        let (written, confirmed_start) = self.write(start, &registers).await?;

        if written != registers.len() * 2 {
            return Err(SolarmanError::QuantityMismatch {
                expected: registers.len() * 2,
                actual: written,
            });
        }

        let stored = registers_to_date_time(&registers)?;
        Ok((written, confirmed_start, stored))
    }

    /// Diagnostic id of the open connection, 0 when disconnected
    pub async fn connection_id(&self) -> u64 {
        self.session.lock().await.connection_id()
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_connected()
    }

    /// Snapshot of the session counters
    pub async fn statistics(&self) -> SessionStatistics {
        self.session.lock().await.statistics().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::mock::{envelope, read_payload, MockInverter, Wire};
    use chrono::{NaiveDate, Timelike};
    use futures::future::join_all;
    use solarman_core::{crc16_modbus, FailureKind};
    use std::io;
    use std::sync::{Arc, Mutex as StdMutex};

    const SERIAL: u32 = 2_900_000_000;

    fn logger() -> (InverterLogger<MockInverter>, Arc<StdMutex<Wire>>) {
        let (transport, wire) = MockInverter::new();
        let logger = LoggerBuilder::new()
            .serial_number(SERIAL)
            .build_with_transport(transport)
            .unwrap();
        (logger, wire)
    }

    #[tokio::test]
    async fn test_read_registers() {
        let (logger, wire) = logger();
        let registers = logger.read(0x6D, 3).await.unwrap();
        let expected: RegisterMap = [(0x6D, 0x6D), (0x6E, 0x6E), (0x6F, 0x6F)]
            .into_iter()
            .collect();
        assert_eq!(registers, expected);

        let wire = wire.lock().unwrap();
        let request = &wire.requests[0];
        assert_eq!(request.len(), 13 + 15 + 8);
        assert_eq!(&request[5..7], &[0x01, 0x00]);
        assert_eq!(&request[7..11], &SERIAL.to_le_bytes());
        let body = &request[26..34];
        assert_eq!(&body[..6], &[0x01, 0x03, 0x00, 0x6D, 0x00, 0x03]);
        assert_eq!(&body[6..], &crc16_modbus(&body[..6]).to_le_bytes());
    }

    #[tokio::test]
    async fn test_write_registers() {
        let (logger, wire) = logger();
        let result = logger.write(0x16, &[1, 2, 3]).await.unwrap();
        assert_eq!(result, (6, 0x16));
        assert_eq!(wire.lock().unwrap().requests.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_sent() {
        let (logger, wire) = logger();
        let err = logger.read(0, 0).await.unwrap_err();
        assert!(matches!(err.root(), SolarmanError::InvalidData(_)));
        assert!(err.to_string().starts_with("Read.request [2900000000]"));

        let err = logger.write(0, &[]).await.unwrap_err();
        assert!(matches!(err.root(), SolarmanError::InvalidData(_)));
        assert!(err.to_string().starts_with("Write.request [2900000000]"));
        assert!(wire.lock().unwrap().events.is_empty());
        assert!(!logger.is_connected().await);
    }

    #[tokio::test]
    async fn test_get_date_time() {
        let (logger, wire) = logger();
        wire.lock()
            .unwrap()
            .scripted
            .push_back(envelope(1, SERIAL, &read_payload(&[6402, 4883, 3859])));

        let time = logger.get_date_time(22).await.unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 2, 19)
            .unwrap()
            .and_hms_opt(19, 15, 19)
            .unwrap();
        assert_eq!(time, expected);
    }

    #[tokio::test]
    async fn test_set_date_time() {
        let (logger, wire) = logger();
        let time = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_milli_opt(12, 34, 56, 789)
            .unwrap();

        let (written, start, stored) = logger.set_date_time(22, &time).await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(start, 22);
        assert_eq!(stored, time.with_nanosecond(0).unwrap());

        let wire = wire.lock().unwrap();
        let body = &wire.requests[0][26..];
        assert_eq!(
            &body[..13],
            &[0x01, 0x10, 0x00, 0x16, 0x00, 0x03, 0x06, 0x18, 0x05, 0x06, 0x0C, 0x22, 0x38]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_reconnects() {
        let (logger, wire) = logger();
        logger.read(0, 1).await.unwrap();
        assert_eq!(logger.connection_id().await, 1);

        wire.lock().unwrap().fail_next_read = Some(io::ErrorKind::TimedOut);
        let err = logger.read(0, 1).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.failure_kind(), Some(FailureKind::Timeout));
        assert!(err.to_string().starts_with("Read.exchange [2900000000]"));
        assert!(!logger.is_connected().await);
        assert_eq!(logger.connection_id().await, 0);

        logger.read(0, 1).await.unwrap();
        assert_eq!(logger.connection_id().await, 2);

        let wire = wire.lock().unwrap();
        assert_eq!(wire.opens, 2);
        assert_eq!(wire.closes, 1);

        // Sequence numbers keep counting across the reconnect
        let sequences: Vec<u16> = wire
            .requests
            .iter()
            .map(|r| u16::from_le_bytes([r[5], r[6]]))
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_write_timeout_names_operation() {
        let (logger, wire) = logger();
        wire.lock().unwrap().fail_next_read = Some(io::ErrorKind::TimedOut);

        let err = logger.write(0x16, &[1, 2, 3]).await.unwrap_err();
        assert!(err.to_string().starts_with("Write.exchange [2900000000]"));
        assert!(matches!(err.root(), SolarmanError::Transport { .. }));
        assert_eq!(err.failure_kind(), Some(FailureKind::Timeout));
        assert!(!logger.is_connected().await);
    }

    #[tokio::test]
    async fn test_protocol_error_keeps_connection() {
        let (logger, wire) = logger();
        let mut corrupted = envelope(1, SERIAL, &read_payload(&[1]));
        let checksum_pos = corrupted.len() - 2;
        corrupted[checksum_pos] ^= 0xFF;
        wire.lock().unwrap().scripted.push_back(corrupted);

        let err = logger.read(0, 1).await.unwrap_err();
        assert!(matches!(err.root(), SolarmanError::ChecksumMismatch { .. }));
        assert!(err.to_string().starts_with("Read.responseFrame"));
        assert!(logger.is_connected().await);

        logger.read(0, 1).await.unwrap();
        assert_eq!(logger.connection_id().await, 1);
        assert_eq!(wire.lock().unwrap().opens, 1);
        assert_eq!(logger.statistics().await.checksum_errors, 1);
    }

    #[tokio::test]
    async fn test_changed_response_code_rejected() {
        let (logger, _wire) = logger();
        logger.set_meta(0xA5, 0x15, 0x4510, 0x1110).await;

        let err = logger.read(0, 1).await.unwrap_err();
        assert!(matches!(
            err.root(),
            SolarmanError::ProtocolMismatch {
                expected: 0x1110,
                actual: 0x1510
            }
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (logger, wire) = logger();
        logger.close().await.unwrap();
        logger.read(0, 1).await.unwrap();
        logger.close().await.unwrap();
        logger.close().await.unwrap();

        assert!(!logger.is_connected().await);
        assert_eq!(wire.lock().unwrap().closes, 1);

        logger.read(0, 1).await.unwrap();
        assert_eq!(logger.connection_id().await, 2);
    }

    #[tokio::test]
    async fn test_cancelled_call_forces_reconnect() {
        let (logger, wire) = logger();
        wire.lock().unwrap().stall_reads = true;

        let attempt = tokio::time::timeout(Duration::from_millis(50), logger.read(0, 1)).await;
        assert!(attempt.is_err());

        wire.lock().unwrap().stall_reads = false;
        let registers = logger.read(5, 1).await.unwrap();
        assert_eq!(registers.get(&5), Some(&5));

        let wire = wire.lock().unwrap();
        assert_eq!(wire.opens, 2);
        assert_eq!(wire.closes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_do_not_interleave() {
        let (logger, wire) = logger();
        let logger = Arc::new(logger);

        let calls = (0..16u16).map(|i| {
            let logger = logger.clone();
            async move {
                if i % 3 == 0 {
                    let (written, start) = logger.write(i * 10, &[i, i + 1]).await?;
                    assert_eq!((written, start), (4, i * 10));
                } else {
                    let registers = logger.read(i * 10, 4).await?;
                    let expected: RegisterMap =
                        (0..4).map(|k| (i * 10 + k, i * 10 + k)).collect();
                    assert_eq!(registers, expected);
                }
                Ok::<(), SolarmanError>(())
            }
        });
        let handles: Vec<_> = calls.map(tokio::spawn).collect();

        for result in join_all(handles).await {
            result.unwrap().unwrap();
        }

        let wire = wire.lock().unwrap();
        assert_eq!(wire.events.len(), 32);
        for pair in wire.events.chunks(2) {
            assert_eq!(pair, ["write", "read"]);
        }

        let mut sequences: Vec<u16> = wire
            .requests
            .iter()
            .map(|r| u16::from_le_bytes([r[5], r[6]]))
            .collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=16).collect::<Vec<u16>>());
        assert_eq!(wire.opens, 1);
    }
}
