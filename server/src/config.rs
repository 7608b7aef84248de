use std::time::Duration;

use shared::DEFAULT_MAX_ROOMS;

/// Recognized server options.
///
/// `max_players` defaults to twice `max_rooms` since every room holds at most
/// two participants. The liveness window bounds how long a silent connection
/// is considered alive before the sweep treats it as disconnected.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Maximum number of concurrent rooms
    pub max_rooms: usize,
    /// Maximum number of concurrent player sessions
    pub max_players: usize,
    /// How long a lone player waits before receiving a waiting-timeout
    pub wait_timeout: Duration,
    /// How long an explicit wait extension lasts before the final timeout
    pub extend_timeout: Duration,
    /// Grace period after the final timeout before the connection is closed
    pub final_grace: Duration,
    /// Inactivity window after which a session counts as disconnected
    pub liveness_timeout: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_rooms: DEFAULT_MAX_ROOMS,
            max_players: DEFAULT_MAX_ROOMS * 2,
            wait_timeout: Duration::from_millis(30_000),
            extend_timeout: Duration::from_millis(30_000),
            final_grace: Duration::from_millis(10_000),
            liveness_timeout: Duration::from_millis(10_000),
        }
    }
}

impl MatchConfig {
    /// Builds a config from command-line values. A missing `max_players`
    /// derives from `max_rooms`.
    pub fn from_options(
        max_rooms: usize,
        max_players: Option<usize>,
        wait_timeout_ms: u64,
        extend_timeout_ms: u64,
        final_grace_ms: u64,
        liveness_timeout_ms: u64,
    ) -> Self {
        Self {
            max_rooms,
            max_players: max_players.unwrap_or(max_rooms * 2),
            wait_timeout: Duration::from_millis(wait_timeout_ms),
            extend_timeout: Duration::from_millis(extend_timeout_ms),
            final_grace: Duration::from_millis(final_grace_ms),
            liveness_timeout: Duration::from_millis(liveness_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MatchConfig::default();
        assert_eq!(config.max_rooms, 10);
        assert_eq!(config.max_players, 20);
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
        assert_eq!(config.extend_timeout, Duration::from_secs(30));
        assert_eq!(config.final_grace, Duration::from_secs(10));
    }

    #[test]
    fn test_max_players_derived_from_rooms() {
        let config = MatchConfig::from_options(4, None, 30_000, 30_000, 10_000, 10_000);
        assert_eq!(config.max_players, 8);
    }

    #[test]
    fn test_max_players_override() {
        let config = MatchConfig::from_options(4, Some(3), 30_000, 30_000, 10_000, 10_000);
        assert_eq!(config.max_players, 3);
    }
}
