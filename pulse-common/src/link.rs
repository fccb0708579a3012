//! Client-side connection state for the relay socket.

use std::time::Duration;

/// Wait between a disconnect and the next attempt. Never grows.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1500);

/// Path of the relay's WebSocket route.
pub const SOCKET_PATH: &str = "/ws";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

/// Tracks whether pulses can be sent and when to dial again.
#[derive(Debug)]
pub struct Link {
    state: LinkState,
    attempts: u64,
}

impl Link {
    pub fn new() -> Self {
        Self {
            state: LinkState::Closed,
            attempts: 0,
        }
    }

    /// Number of connection attempts so far, including the first.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn connecting(&mut self) {
        self.attempts += 1;
        self.state = LinkState::Connecting;
    }

    pub fn opened(&mut self) {
        self.state = LinkState::Open;
    }

    /// Marks the link closed and returns how long to wait before redialing.
    pub fn closed(&mut self) -> Duration {
        self.state = LinkState::Closed;
        RECONNECT_DELAY
    }

    /// Outbound pulses are sent only while open; otherwise they are dropped.
    pub fn can_send(&self) -> bool {
        self.state == LinkState::Open
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}

/// Socket address derived from the page's own origin.
pub fn socket_url(protocol: &str, host: &str) -> String {
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    format!("{scheme}://{host}{SOCKET_PATH}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url() {
        assert_eq!(socket_url("https:", "pulse.example"), "wss://pulse.example/ws");
        assert_eq!(socket_url("http:", "localhost:3000"), "ws://localhost:3000/ws");
        assert_eq!(socket_url("file:", ""), "ws:///ws");
    }

    #[test]
    fn test_send_only_when_open() {
        let mut link = Link::new();
        assert!(!link.can_send());
        link.connecting();
        assert!(!link.can_send());
        link.opened();
        assert!(link.can_send());
        link.closed();
        assert!(!link.can_send());
    }

    #[test]
    fn test_fixed_delay_forever() {
        let mut link = Link::new();
        for attempt in 1..=500 {
            link.connecting();
            assert_eq!(link.attempts(), attempt);
            assert_eq!(link.closed(), RECONNECT_DELAY);
        }
        assert_eq!(link.state, LinkState::Closed);
    }
}
