//! Session connection state

/// Connection state of a V5 session
///
/// # State Transitions
/// ```text
/// Disconnected -> Connected    (successful dial)
/// Connected    -> Disconnected (I/O error, timeout or close())
/// ```
///
/// There is no explicit reconnect: the next round trip on a disconnected
/// session dials again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport is open (initial state)
    #[default]
    Disconnected,
    /// A transport is open and idle between round trips
    Connected,
}

impl ConnectionState {
    /// Check if a round trip can start without dialing
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connected => "Connected",
        }
    }
}
