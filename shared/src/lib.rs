use serde::{Deserialize, Serialize};

/// Default number of concurrent rooms the server will host.
pub const DEFAULT_MAX_ROOMS: usize = 10;

/// Public record of one participant in a room.
///
/// This is the subset of the server-side session that is safe to share with
/// the other participant: no addresses, no transport identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    pub id: u32,
    pub name: String,
    pub player_number: u8,
    pub loadout: Option<String>,
    pub ready: bool,
}

impl RoomPlayer {
    pub fn new(id: u32, name: String, player_number: u8) -> Self {
        Self {
            id,
            name,
            player_number,
            loadout: None,
            ready: false,
        }
    }
}

/// Wire protocol between clients and the match server.
///
/// A single enum carries both directions, serialized with bincode per
/// datagram. Relay payloads (`GameInput`, `SyncGameState`) are opaque byte
/// blobs: the server forwards them without interpreting their contents.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Packet {
    // Client -> server
    Join {
        player_name: String,
    },
    ExtendWait,
    SelectLoadout {
        loadout: String,
    },
    GameInput {
        payload: Vec<u8>,
    },
    SyncGameState {
        payload: Vec<u8>,
    },
    GameOver {
        winner: u8,
    },
    Leave,

    // Server -> client
    ServerFull {
        message: String,
        current_players: u32,
        max_players: u32,
    },
    RoomJoined {
        room_id: String,
        player_number: u8,
        waiting_for_opponent: bool,
    },
    OpponentJoined {
        player1: RoomPlayer,
        player2: RoomPlayer,
    },
    WaitingTimeout,
    WaitExtended,
    FinalTimeout,
    OpponentSelected {
        player_number: u8,
        loadout: String,
    },
    StartGame {
        player1: RoomPlayer,
        player2: RoomPlayer,
    },
    OpponentInput {
        player_number: u8,
        payload: Vec<u8>,
    },
    GameStateUpdate {
        payload: Vec<u8>,
    },
    MatchResult {
        winner: u8,
        player1: RoomPlayer,
        player2: RoomPlayer,
    },
    OpponentDisconnected,
    Disconnected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_player_creation() {
        let player = RoomPlayer::new(7, "Alice".to_string(), 1);
        assert_eq!(player.id, 7);
        assert_eq!(player.name, "Alice");
        assert_eq!(player.player_number, 1);
        assert_eq!(player.loadout, None);
        assert!(!player.ready);
    }

    #[test]
    fn test_packet_serialization_join() {
        let packet = Packet::Join {
            player_name: "Alice".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Join { player_name } => assert_eq!(player_name, "Alice"),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_opaque_payload() {
        let payload = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let packet = Packet::SyncGameState {
            payload: payload.clone(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::SyncGameState { payload: p } => assert_eq!(p, payload),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_match_result() {
        let mut player1 = RoomPlayer::new(1, "Alice".to_string(), 1);
        player1.loadout = Some("storm-pegasus".to_string());
        player1.ready = true;
        let player2 = RoomPlayer::new(2, "Bob".to_string(), 2);

        let packet = Packet::MatchResult {
            winner: 1,
            player1: player1.clone(),
            player2: player2.clone(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::MatchResult {
                winner,
                player1: p1,
                player2: p2,
            } => {
                assert_eq!(winner, 1);
                assert_eq!(p1, player1);
                assert_eq!(p2, player2);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
