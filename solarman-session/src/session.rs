//! V5 session over a single transport
//!
//! The session owns the transport handle, the envelope metadata and the
//! sequence counter. A round trip writes one request envelope and reads one
//! reply envelope, each under its own deadline. Any transport failure tears the
//! connection down; the next round trip dials again. Failures to interpret a
//! reply leave the connection alone, since the bytes did arrive.

use crate::frame::{expected_frame_len, V5Frame};
use crate::meta::FrameMeta;
use crate::sequence::SequenceGenerator;
use crate::state::ConnectionState;
use crate::statistics::SessionStatistics;
use solarman_core::{FailureKind, SolarmanError, SolarmanResult};
use solarman_transport::TransportLayer;
use std::io;
use std::time::Duration;
use tokio::time::Instant;

/// Bytes requested from the transport per read
pub const READ_CHUNK_SIZE: usize = 512;

/// Format bytes as space separated lowercase hex
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// V5 session layer
#[derive(Debug)]
pub struct V5Session<T: TransportLayer> {
    transport: T,
    logger_serial: u32,
    meta: FrameMeta,
    timeout: Duration,
    sequence: SequenceGenerator,
    state: ConnectionState,
    connection_id: u64,
    last_connection_id: u64,
    debug: bool,
    /// A request was written but its reply never consumed
    in_flight: bool,
    statistics: SessionStatistics,
}

impl<T: TransportLayer> V5Session<T> {
    /// Create a new session; nothing is dialed until the first round trip
    ///
    /// # Arguments
    /// * `transport` - Closed transport, opened lazily
    /// * `logger_serial` - Serial number of the data logger (not the inverter)
    /// * `timeout` - Deadline for connect and for each write and read
    pub fn new(transport: T, logger_serial: u32, timeout: Duration) -> Self {
        Self {
            transport,
            logger_serial,
            meta: FrameMeta::default(),
            timeout,
            sequence: SequenceGenerator::new(),
            state: ConnectionState::Disconnected,
            connection_id: 0,
            last_connection_id: 0,
            debug: false,
            in_flight: false,
            statistics: SessionStatistics::new(),
        }
    }

    pub fn logger_serial(&self) -> u32 {
        self.logger_serial
    }

    pub fn meta(&self) -> &FrameMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: FrameMeta) {
        self.meta = meta;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, enable: bool) {
        self.debug = enable;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Diagnostic id of the open connection, 0 when disconnected
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Last sequence number handed out
    pub fn last_sequence(&self) -> u16 {
        self.sequence.current()
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Wrap a payload in a freshly sequenced request envelope
    pub fn frame_request(&self, payload: Vec<u8>) -> SolarmanResult<Vec<u8>> {
        V5Frame::new(
            self.meta.request_control_code,
            self.sequence.next(),
            self.logger_serial,
            payload,
        )
        .encode(&self.meta)
    }

    /// Unwrap a reply envelope
    pub fn decode_reply(&mut self, reply: &[u8]) -> SolarmanResult<V5Frame> {
        V5Frame::decode(reply, &self.meta).inspect_err(|e| self.statistics.record_rejected(e))
    }

    /// Count a reply whose payload could not be interpreted
    pub fn reject_payload(&mut self, error: &SolarmanError) {
        self.statistics.record_rejected(error);
    }

    /// Open the transport unless already connected
    pub async fn connect(&mut self) -> SolarmanResult<()> {
        if self.state.is_connected() && !self.transport.is_closed() {
            return Ok(());
        }
        if self.state.is_connected() {
            // Peer hung up since the last round trip
            self.close_connection("peer_closed").await;
        }

        self.transport.set_timeout(Some(self.timeout)).await?;
        if let Err(e) = self.transport.open().await {
            self.statistics.connect_failures += 1;
            return Err(e.context("transport.open", self.logger_serial, "conn failed"));
        }

        self.last_connection_id += 1;
        self.connection_id = self.last_connection_id;
        self.state = ConnectionState::Connected;
        self.statistics.connects += 1;
        self.debug_conn("OPEN", "");
        Ok(())
    }

    /// Write `request` and read one reply envelope
    ///
    /// Transport failures close the connection and are returned without
    /// retrying.
    pub async fn exchange(&mut self, request: &[u8]) -> SolarmanResult<Vec<u8>> {
        if self.in_flight {
            // A cancelled round trip may have left a reply unread
            self.close_connection("abandoned").await;
            self.in_flight = false;
        }

        self.connect().await?;

        self.debug_frame("net.requestFrame", "SENT", request);
        self.in_flight = true;

        if let Err(e) = self.write_request(request).await {
            self.fail_transport(&e).await;
            return Err(e.context("conn.Write", self.logger_serial, "write failed"));
        }
        self.statistics.frames_sent += 1;

        let reply = match self.read_reply().await {
            Ok(reply) => reply,
            Err(e) => {
                self.fail_transport(&e).await;
                return Err(e.context("conn.Read", self.logger_serial, "read failed"));
            }
        };
        self.in_flight = false;
        self.statistics.frames_received += 1;

        self.debug_frame("net.reply", "RECD", &reply);
        Ok(reply)
    }

    /// Close the connection; a no-op when already disconnected
    pub async fn close(&mut self) -> SolarmanResult<()> {
        if !self.state.is_connected() {
            if self.debug {
                log::debug!(
                    "net.conn [{}] CLOSE: id=0 conn=nil reason=manual",
                    self.logger_serial
                );
            }
            return Ok(());
        }
        self.close_connection("manual").await;
        self.in_flight = false;
        Ok(())
    }

    async fn write_request(&mut self, request: &[u8]) -> SolarmanResult<()> {
        self.transport.set_timeout(Some(self.timeout)).await?;
        self.transport.write_all(request).await?;
        self.transport.flush().await
    }

    /// Read until the envelope's declared length has arrived
    ///
    /// The whole reply shares one deadline. Bytes that cannot start an
    /// envelope are returned as they are and rejected by the decoder.
    async fn read_reply(&mut self) -> SolarmanResult<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut reply = Vec::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SolarmanError::transport(
                    "read",
                    io::Error::new(io::ErrorKind::TimedOut, "read deadline elapsed"),
                ));
            }

            self.transport.set_timeout(Some(remaining)).await?;
            let n = self.transport.read(&mut chunk).await?;
            if n == 0 {
                return Err(SolarmanError::transport(
                    "read",
                    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by logger"),
                ));
            }
            reply.extend_from_slice(&chunk[..n]);

            let complete = match expected_frame_len(&reply, &self.meta) {
                Some(total) => reply.len() >= total,
                None => reply.len() >= 3 || reply[0] != self.meta.start_marker,
            };
            if complete {
                return Ok(reply);
            }
        }
    }

    async fn fail_transport(&mut self, error: &SolarmanError) {
        let reason = match error.root() {
            SolarmanError::Transport { stage, kind, .. } => {
                if *kind == FailureKind::Timeout {
                    self.statistics.timeouts += 1;
                }
                format!("{}_{}", stage, kind)
            }
            _ => "error".to_string(),
        };
        log::warn!(
            "net.conn [{}] closing connection id={} after failure: {}",
            self.logger_serial,
            self.connection_id,
            error
        );
        self.statistics.teardowns += 1;
        self.close_connection(&reason).await;
        self.in_flight = false;
    }

    async fn close_connection(&mut self, reason: &str) {
        if !self.state.is_connected() {
            return;
        }
        self.debug_conn("CLOSE", &format!("reason={}", reason));

        if let Err(e) = self.transport.close().await {
            log::warn!("net.conn [{}] close failed: {}", self.logger_serial, e);
        }
        self.state = ConnectionState::Disconnected;
        self.connection_id = 0;
    }

    fn debug_frame(&self, point: &str, op: &str, frame: &[u8]) {
        if self.debug {
            log::debug!(
                "{} [{}] {}: {}",
                point,
                self.logger_serial,
                op,
                hex_dump(frame)
            );
        }
    }

    fn debug_conn(&self, event: &str, extra: &str) {
        if !self.debug {
            return;
        }
        match self.transport.endpoints() {
            Some((local, remote)) => log::debug!(
                "net.conn [{}] {}: id={} {} -> {} {}",
                self.logger_serial,
                event,
                self.connection_id,
                local,
                remote,
                extra
            ),
            None => log::debug!(
                "net.conn [{}] {}: id={} {}",
                self.logger_serial,
                event,
                self.connection_id,
                extra
            ),
        }
    }
}
