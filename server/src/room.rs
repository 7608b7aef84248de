//! Room model and its forward-only lifecycle state machine.

use log::warn;
use shared::RoomPlayer;

use crate::utils::get_timestamp;

/// Lifecycle status of a room. Transitions only move forward; a room never
/// returns to an earlier status. Removal of an empty room is a deletion, not
/// a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Selecting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Whether moving from `self` to `next` is a legal forward transition.
    /// A room may finish early (opponent never arrives, forfeit during
    /// selection) but may never skip into `Playing` or step backwards.
    pub fn can_advance_to(self, next: RoomStatus) -> bool {
        use RoomStatus::*;
        matches!(
            (self, next),
            (Waiting, Selecting)
                | (Selecting, Playing)
                | (Waiting, Finished)
                | (Selecting, Finished)
                | (Playing, Finished)
        )
    }
}

/// State container for one two-player match.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub players: Vec<RoomPlayer>,
    pub status: RoomStatus,
    /// Last-known game state, written only by the host (player number 1).
    pub game_state: Option<Vec<u8>>,
    /// Creation time in unix milliseconds, for diagnostics only.
    pub created_at: u64,
}

impl Room {
    pub fn new(id: String) -> Self {
        Self {
            id,
            players: Vec::with_capacity(2),
            status: RoomStatus::Waiting,
            game_state: None,
            created_at: get_timestamp(),
        }
    }

    /// Generates a fresh room id: creation timestamp plus a random suffix.
    /// No external uniqueness authority is needed at this scale.
    pub fn generate_id() -> String {
        format!("room-{}-{:04x}", get_timestamp(), rand::random::<u16>())
    }

    /// Adds a player to the room. Rejects a third participant and duplicate
    /// player numbers.
    pub fn add_player(&mut self, player: RoomPlayer) -> bool {
        if self.players.len() >= 2 {
            return false;
        }
        if self
            .players
            .iter()
            .any(|p| p.player_number == player.player_number)
        {
            return false;
        }
        self.players.push(player);
        true
    }

    /// Removes the player holding `player_number`. Returns true if present.
    pub fn remove_player(&mut self, player_number: u8) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.player_number != player_number);
        self.players.len() < before
    }

    /// A room is open for matchmaking while it is still waiting with exactly
    /// one participant.
    pub fn is_open(&self) -> bool {
        self.status == RoomStatus::Waiting && self.players.len() == 1
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.status == RoomStatus::Finished
    }

    /// Both participants present and both have locked in a loadout.
    pub fn all_ready(&self) -> bool {
        self.players.len() == 2 && self.players.iter().all(|p| p.ready)
    }

    pub fn player(&self, player_number: u8) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.player_number == player_number)
    }

    pub fn player_mut(&mut self, player_number: u8) -> Option<&mut RoomPlayer> {
        self.players
            .iter_mut()
            .find(|p| p.player_number == player_number)
    }

    /// The other participant's player number.
    pub fn opponent_number(player_number: u8) -> u8 {
        if player_number == 1 {
            2
        } else {
            1
        }
    }

    /// Attempts a forward transition. Illegal transitions are rejected and
    /// logged; the current status is kept.
    pub fn advance(&mut self, next: RoomStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            warn!(
                "Room {}: rejected status transition {:?} -> {:?}",
                self.id, self.status, next
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_room() -> Room {
        Room::new(Room::generate_id())
    }

    #[test]
    fn test_new_room_is_waiting_and_empty() {
        let room = make_room();
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(room.is_empty());
        assert!(room.game_state.is_none());
        assert!(room.created_at > 0);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = Room::generate_id();
        let b = Room::generate_id();
        assert_ne!(a, b);
        assert!(a.starts_with("room-"));
    }

    #[test]
    fn test_add_player_capacity() {
        let mut room = make_room();
        assert!(room.add_player(RoomPlayer::new(1, "Alice".into(), 1)));
        assert!(room.add_player(RoomPlayer::new(2, "Bob".into(), 2)));
        assert!(!room.add_player(RoomPlayer::new(3, "Carol".into(), 1)));
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn test_add_player_rejects_duplicate_number() {
        let mut room = make_room();
        assert!(room.add_player(RoomPlayer::new(1, "Alice".into(), 1)));
        assert!(!room.add_player(RoomPlayer::new(2, "Bob".into(), 1)));
        assert_eq!(room.players.len(), 1);
    }

    #[test]
    fn test_is_open_only_with_one_waiting_player() {
        let mut room = make_room();
        assert!(!room.is_open());

        room.add_player(RoomPlayer::new(1, "Alice".into(), 1));
        assert!(room.is_open());

        room.add_player(RoomPlayer::new(2, "Bob".into(), 2));
        assert!(!room.is_open());

        let mut lone = make_room();
        lone.add_player(RoomPlayer::new(3, "Carol".into(), 1));
        lone.advance(RoomStatus::Finished);
        assert!(!lone.is_open());
    }

    #[test]
    fn test_remove_player() {
        let mut room = make_room();
        room.add_player(RoomPlayer::new(1, "Alice".into(), 1));
        room.add_player(RoomPlayer::new(2, "Bob".into(), 2));

        assert!(room.remove_player(1));
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].player_number, 2);
        assert!(!room.remove_player(1));
    }

    #[test]
    fn test_all_ready_requires_two_ready_players() {
        let mut room = make_room();
        room.add_player(RoomPlayer::new(1, "Alice".into(), 1));
        room.player_mut(1).unwrap().ready = true;
        assert!(!room.all_ready());

        room.add_player(RoomPlayer::new(2, "Bob".into(), 2));
        assert!(!room.all_ready());

        room.player_mut(2).unwrap().ready = true;
        assert!(room.all_ready());
    }

    #[test]
    fn test_opponent_number() {
        assert_eq!(Room::opponent_number(1), 2);
        assert_eq!(Room::opponent_number(2), 1);
    }

    #[test]
    fn test_status_advances_forward_only() {
        let mut room = make_room();
        assert!(room.advance(RoomStatus::Selecting));
        assert!(room.advance(RoomStatus::Playing));
        assert!(room.advance(RoomStatus::Finished));
        assert_eq!(room.status, RoomStatus::Finished);

        // Terminal: nothing advances out of Finished
        assert!(!room.advance(RoomStatus::Waiting));
        assert!(!room.advance(RoomStatus::Playing));
        assert_eq!(room.status, RoomStatus::Finished);
    }

    #[test]
    fn test_status_cannot_skip_to_playing() {
        let mut room = make_room();
        assert!(!room.advance(RoomStatus::Playing));
        assert_eq!(room.status, RoomStatus::Waiting);
    }

    #[test]
    fn test_early_finish_allowed() {
        let mut room = make_room();
        assert!(room.advance(RoomStatus::Finished));

        let mut selecting = make_room();
        selecting.advance(RoomStatus::Selecting);
        assert!(selecting.advance(RoomStatus::Finished));
    }
}
