//! Server-side record of one connected participant.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A player session ties a transport address to its room membership.
///
/// Created only after admission control accepts a join; destroyed when the
/// connection disconnects or its room is deleted. Nothing here survives a
/// process restart.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// Server-assigned identity, unique per live connection
    pub session_id: u32,
    /// Remote address used to route responses
    pub addr: SocketAddr,
    /// The room this session belongs to
    pub room_id: String,
    /// 1 or 2, fixed once assigned
    pub player_number: u8,
    /// Client-supplied display name, untrusted
    pub name: String,
    /// Last time any packet arrived from this address
    pub last_seen: Instant,
}

impl PlayerSession {
    pub fn new(
        session_id: u32,
        addr: SocketAddr,
        room_id: String,
        player_number: u8,
        name: String,
    ) -> Self {
        Self {
            session_id,
            addr,
            room_id,
            player_number,
            name,
            last_seen: Instant::now(),
        }
    }

    /// Marks the session as recently active.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// True once no packet has arrived within the liveness window.
    pub fn is_idle(&self, window: Duration) -> bool {
        self.last_seen.elapsed() > window
    }
}
