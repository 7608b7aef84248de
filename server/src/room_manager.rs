//! Single-writer orchestration core for rooms and player sessions
//!
//! This module owns both in-memory registries: rooms and player sessions.
//! Every mutating operation (join, select, relay, sync, game over,
//! disconnect, timer firing) goes through a `RoomManager` method, and the
//! gateway drives all of them from one event-loop task, so no two mutations
//! ever interleave.
//!
//! Handlers never perform I/O. Each returns an [`Outcome`] describing the
//! packets to send, the timers to schedule, and the connections to close,
//! which keeps the whole state machine testable without sockets. Failures
//! that the protocol treats as silent (stale references, non-host sync,
//! events on a finished room) produce empty outcomes with a debug log.

use log::{debug, info, warn};
use shared::{Packet, RoomPlayer};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::MatchConfig;
use crate::room::{Room, RoomStatus};
use crate::session::PlayerSession;

/// The three timers a room may see across its waiting lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Started when a room reaches exactly one player
    Wait,
    /// Started on an explicit extend request from the lone waiter
    Extend,
    /// Started when the final timeout fires; expiry force-closes
    FinalGrace,
}

/// Request to fire a timer for a room after a delay. The firing side must
/// route the event back through the single-writer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRequest {
    pub room_id: String,
    pub kind: TimerKind,
    pub delay: Duration,
}

/// Effects of one handled event: packets to deliver, timers to arm, and
/// transport addresses to force-close.
#[derive(Debug, Default)]
pub struct Outcome {
    pub sends: Vec<(SocketAddr, Packet)>,
    pub timers: Vec<TimerRequest>,
    pub closes: Vec<SocketAddr>,
}

impl Outcome {
    fn send(&mut self, addr: SocketAddr, packet: Packet) {
        self.sends.push((addr, packet));
    }

    fn schedule(&mut self, room_id: String, kind: TimerKind, delay: Duration) {
        self.timers.push(TimerRequest {
            room_id,
            kind,
            delay,
        });
    }

    fn close(&mut self, addr: SocketAddr) {
        self.closes.push(addr);
    }

    /// Folds another outcome's effects into this one, preserving order.
    pub fn merge(&mut self, other: Outcome) {
        self.sends.extend(other.sends);
        self.timers.extend(other.timers);
        self.closes.extend(other.closes);
    }
}

/// Owns the two registries and enforces capacity, pairing, lifecycle, and
/// host authority for every room.
pub struct RoomManager {
    rooms: HashMap<String, Room>,
    sessions: HashMap<SocketAddr, PlayerSession>,
    next_session_id: u32,
    config: MatchConfig,
}

impl RoomManager {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            next_session_id: 1,
            config,
        }
    }

    /// Capacity admission check. Pure read over the registry sizes, called
    /// before any session or room is created.
    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.config.max_players || self.rooms.len() >= self.config.max_rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn session(&self, addr: &SocketAddr) -> Option<&PlayerSession> {
        self.sessions.get(addr)
    }

    /// Marks a session as recently active. Called for every inbound packet.
    pub fn touch(&mut self, addr: SocketAddr) {
        if let Some(session) = self.sessions.get_mut(&addr) {
            session.touch();
        }
    }

    /// Addresses whose sessions have gone silent past the liveness window.
    /// The sweep routes each of these through [`RoomManager::disconnect`].
    pub fn idle_addrs(&self) -> Vec<SocketAddr> {
        self.sessions
            .values()
            .filter(|s| s.is_idle(self.config.liveness_timeout))
            .map(|s| s.addr)
            .collect()
    }

    /// Handles a join request: admission control, then find-or-create a
    /// waiting room and register the session.
    pub fn join(&mut self, addr: SocketAddr, player_name: String) -> Outcome {
        let mut outcome = Outcome::default();

        if self.sessions.contains_key(&addr) {
            debug!("Ignoring join from {}: session already active", addr);
            return outcome;
        }

        if self.is_full() {
            info!(
                "Rejecting join from {}: server full ({} players, {} rooms)",
                addr,
                self.sessions.len(),
                self.rooms.len()
            );
            outcome.send(
                addr,
                Packet::ServerFull {
                    message: "Server is full, try again later".to_string(),
                    current_players: self.sessions.len() as u32,
                    max_players: self.config.max_players as u32,
                },
            );
            return outcome;
        }

        // Scan for a room still waiting on its second player. The scan and
        // the assignment below run inside the single writer, so two joins
        // can never both claim player number 2 in the same room.
        let open_room_id = self
            .rooms
            .values()
            .find(|r| r.is_open())
            .map(|r| r.id.clone());

        let (room_id, player_number) = match open_room_id {
            Some(id) => (id, 2),
            None => {
                let room = Room::new(Room::generate_id());
                let id = room.id.clone();
                self.rooms.insert(id.clone(), room);
                (id, 1)
            }
        };

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let mut waiting_for_opponent = true;
        let mut paired: Option<(RoomPlayer, RoomPlayer)> = None;
        if let Some(room) = self.rooms.get_mut(&room_id) {
            if !room.add_player(RoomPlayer::new(session_id, player_name.clone(), player_number)) {
                warn!("Room {} refused player {}, dropping join", room_id, session_id);
                return outcome;
            }
            waiting_for_opponent = room.players.len() == 1;
            if room.players.len() == 2 {
                room.advance(RoomStatus::Selecting);
                if let (Some(p1), Some(p2)) = (room.player(1), room.player(2)) {
                    paired = Some((p1.clone(), p2.clone()));
                }
            }
        }

        self.sessions.insert(
            addr,
            PlayerSession::new(session_id, addr, room_id.clone(), player_number, player_name),
        );

        info!(
            "Session {} joined room {} as player {}",
            session_id, room_id, player_number
        );

        outcome.send(
            addr,
            Packet::RoomJoined {
                room_id: room_id.clone(),
                player_number,
                waiting_for_opponent,
            },
        );

        if let Some((player1, player2)) = paired {
            for peer in self.room_addrs(&room_id) {
                outcome.send(
                    peer,
                    Packet::OpponentJoined {
                        player1: player1.clone(),
                        player2: player2.clone(),
                    },
                );
            }
        } else {
            outcome.schedule(room_id, TimerKind::Wait, self.config.wait_timeout);
        }

        outcome
    }

    /// The lone waiting player asks for more time. Acknowledged immediately;
    /// the extend timer re-validates on fire like every other timer.
    pub fn extend_wait(&mut self, addr: SocketAddr) -> Outcome {
        let mut outcome = Outcome::default();
        let Some((room_id, _)) = self.session_room(addr) else {
            debug!("Extend request from unknown session {}", addr);
            return outcome;
        };

        let still_waiting_alone = self
            .rooms
            .get(&room_id)
            .map(|r| r.is_open())
            .unwrap_or(false);
        if !still_waiting_alone {
            debug!("Ignoring extend request for room {}: not waiting alone", room_id);
            return outcome;
        }

        outcome.send(addr, Packet::WaitExtended);
        outcome.schedule(room_id, TimerKind::Extend, self.config.extend_timeout);
        outcome
    }

    /// Locks in the caller's loadout, notifies the opponent, and starts the
    /// game once both participants are ready.
    pub fn select_loadout(&mut self, addr: SocketAddr, loadout: String) -> Outcome {
        let mut outcome = Outcome::default();
        let Some((room_id, player_number)) = self.session_room(addr) else {
            debug!("Loadout selection from unknown session {}", addr);
            return outcome;
        };

        let mut started: Option<(RoomPlayer, RoomPlayer)> = None;
        match self.rooms.get_mut(&room_id) {
            Some(room) if !room.is_finished() => {
                if let Some(player) = room.player_mut(player_number) {
                    player.loadout = Some(loadout.clone());
                    player.ready = true;
                }
                if room.status == RoomStatus::Selecting && room.all_ready() {
                    room.advance(RoomStatus::Playing);
                    if let (Some(p1), Some(p2)) = (room.player(1), room.player(2)) {
                        started = Some((p1.clone(), p2.clone()));
                    }
                }
            }
            _ => {
                debug!("Ignoring loadout selection for room {}", room_id);
                return outcome;
            }
        }

        if let Some(opponent) = self.addr_of(&room_id, Room::opponent_number(player_number)) {
            outcome.send(
                opponent,
                Packet::OpponentSelected {
                    player_number,
                    loadout,
                },
            );
        }

        if let Some((player1, player2)) = started {
            info!("Room {}: both players ready, starting game", room_id);
            for peer in self.room_addrs(&room_id) {
                outcome.send(
                    peer,
                    Packet::StartGame {
                        player1: player1.clone(),
                        player2: player2.clone(),
                    },
                );
            }
        }

        outcome
    }

    /// Fire-and-forget forward of a gameplay input blob to the opponent,
    /// tagged with the sender's player number. No validation, no storage.
    pub fn relay_input(&mut self, addr: SocketAddr, payload: Vec<u8>) -> Outcome {
        let mut outcome = Outcome::default();
        let Some((room_id, player_number)) = self.session_room(addr) else {
            debug!("Input relay from unknown session {}", addr);
            return outcome;
        };

        let live = self
            .rooms
            .get(&room_id)
            .map(|r| !r.is_finished())
            .unwrap_or(false);
        if !live {
            debug!("Dropping input for finished or missing room {}", room_id);
            return outcome;
        }

        if let Some(opponent) = self.addr_of(&room_id, Room::opponent_number(player_number)) {
            outcome.send(
                opponent,
                Packet::OpponentInput {
                    player_number,
                    payload,
                },
            );
        }
        outcome
    }

    /// Overwrites the room's game state and forwards it to the opponent.
    /// Host authority: only player number 1 may write; anyone else is
    /// silently ignored. Authority rests solely on the player number held in
    /// the session record, matched via the sender's address.
    pub fn sync_state(&mut self, addr: SocketAddr, payload: Vec<u8>) -> Outcome {
        let mut outcome = Outcome::default();
        let Some((room_id, player_number)) = self.session_room(addr) else {
            debug!("State sync from unknown session {}", addr);
            return outcome;
        };

        if player_number != 1 {
            debug!(
                "Ignoring state sync from non-host player {} in room {}",
                player_number, room_id
            );
            return outcome;
        }

        match self.rooms.get_mut(&room_id) {
            Some(room) if !room.is_finished() => {
                // Last write wins, no merging.
                room.game_state = Some(payload.clone());
            }
            _ => {
                debug!("Dropping state sync for room {}", room_id);
                return outcome;
            }
        }

        if let Some(opponent) = self.addr_of(&room_id, 2) {
            outcome.send(opponent, Packet::GameStateUpdate { payload });
        }
        outcome
    }

    /// Terminal transition: marks the room finished and broadcasts the
    /// result with both players' records. Later room events are no-ops.
    pub fn game_over(&mut self, addr: SocketAddr, winner: u8) -> Outcome {
        let mut outcome = Outcome::default();
        let Some((room_id, _)) = self.session_room(addr) else {
            debug!("Game-over report from unknown session {}", addr);
            return outcome;
        };

        let mut result: Option<(RoomPlayer, RoomPlayer)> = None;
        match self.rooms.get_mut(&room_id) {
            Some(room) if !room.is_finished() => {
                if !room.advance(RoomStatus::Finished) {
                    return outcome;
                }
                if let (Some(p1), Some(p2)) = (room.player(1), room.player(2)) {
                    result = Some((p1.clone(), p2.clone()));
                }
            }
            _ => {
                debug!("Ignoring game-over report for room {}", room_id);
                return outcome;
            }
        }

        info!("Room {}: match finished, winner is player {}", room_id, winner);
        if let Some((player1, player2)) = result {
            for peer in self.room_addrs(&room_id) {
                outcome.send(
                    peer,
                    Packet::MatchResult {
                        winner,
                        player1: player1.clone(),
                        player2: player2.clone(),
                    },
                );
            }
        }
        outcome
    }

    /// Transport-level disconnect: notify the remaining participant, drop
    /// the session, and delete the room once it is empty. Timers pending for
    /// a deleted room are left to fire and re-validate into no-ops.
    pub fn disconnect(&mut self, addr: SocketAddr) -> Outcome {
        let mut outcome = Outcome::default();
        let Some(session) = self.sessions.remove(&addr) else {
            debug!("Disconnect for unknown session {}", addr);
            return outcome;
        };

        info!(
            "Session {} ('{}') disconnected from room {}",
            session.session_id, session.name, session.room_id
        );

        if let Some(room) = self.rooms.get_mut(&session.room_id) {
            room.remove_player(session.player_number);
            if room.is_empty() {
                self.rooms.remove(&session.room_id);
                info!("Deleted empty room {}", session.room_id);
            } else if let Some(opponent) = self.addr_of(
                &session.room_id,
                Room::opponent_number(session.player_number),
            ) {
                outcome.send(opponent, Packet::OpponentDisconnected);
            }
        }
        outcome
    }

    /// A firing timer is a hint, not an authoritative event: the room may
    /// have paired up or emptied since it was armed, so the precondition
    /// (exists, still waiting, exactly one player) is re-checked here.
    pub fn handle_timer(&mut self, room_id: &str, kind: TimerKind) -> Outcome {
        let mut outcome = Outcome::default();

        let still_waiting_alone = self
            .rooms
            .get(room_id)
            .map(|r| r.is_open())
            .unwrap_or(false);
        if !still_waiting_alone {
            debug!("Stale {:?} timer for room {}, ignoring", kind, room_id);
            return outcome;
        }

        let Some(lone) = self
            .sessions
            .values()
            .find(|s| s.room_id == room_id)
            .map(|s| s.addr)
        else {
            debug!("No session left for waiting room {}", room_id);
            return outcome;
        };

        match kind {
            TimerKind::Wait => {
                outcome.send(lone, Packet::WaitingTimeout);
            }
            TimerKind::Extend => {
                outcome.send(lone, Packet::FinalTimeout);
                outcome.schedule(
                    room_id.to_string(),
                    TimerKind::FinalGrace,
                    self.config.final_grace,
                );
            }
            TimerKind::FinalGrace => {
                info!(
                    "Room {}: waiting period expired, closing connection {}",
                    room_id, lone
                );
                outcome.send(
                    lone,
                    Packet::Disconnected {
                        reason: "Waiting period expired".to_string(),
                    },
                );
                outcome.close(lone);
                self.sessions.remove(&lone);
                self.rooms.remove(room_id);
            }
        }
        outcome
    }

    fn session_room(&self, addr: SocketAddr) -> Option<(String, u8)> {
        self.sessions
            .get(&addr)
            .map(|s| (s.room_id.clone(), s.player_number))
    }

    fn addr_of(&self, room_id: &str, player_number: u8) -> Option<SocketAddr> {
        self.sessions
            .values()
            .find(|s| s.room_id == room_id && s.player_number == player_number)
            .map(|s| s.addr)
    }

    fn room_addrs(&self, room_id: &str) -> Vec<SocketAddr> {
        self.sessions
            .values()
            .filter(|s| s.room_id == room_id)
            .map(|s| s.addr)
            .collect()
    }
}
