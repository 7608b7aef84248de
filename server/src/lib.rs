//! # Match Orchestration Server Library
//!
//! This library implements the real-time session-orchestration service that
//! pairs exactly two clients into a head-to-head match, enforces global
//! server capacity, drives each match through its lifecycle, and relays the
//! host's authoritative game state to the other participant.
//!
//! ## Core Responsibilities
//!
//! ### Matchmaking and Admission Control
//! Incoming joins are checked against global capacity (room and player
//! limits) before any state is created. Accepted joins are paired into a
//! waiting room when one exists, otherwise a fresh room is opened and the
//! joiner waits for an opponent.
//!
//! ### Match Lifecycle
//! Every room moves forward through `waiting -> selecting -> playing ->
//! finished` and never regresses. Lone waiters are driven by a chain of
//! timers (wait, extend, final grace) that re-validate room state when they
//! fire rather than trusting their own scheduling.
//!
//! ### State Relay
//! Gameplay input and host game-state snapshots are forwarded between the two
//! participants as opaque byte blobs. The server never interprets or referees
//! them; only capacity, turn ordering, and host authority are enforced.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! Both registries (rooms and player sessions) are owned by one event loop
//! task. Network receive, timer firings, and the liveness sweep all funnel
//! through the same mpsc channel, so no two mutations ever interleave and
//! races such as two connections claiming the same waiting-room slot cannot
//! occur.
//!
//! ### UDP-Based Communication
//! Clients are identified by their remote socket address. Disconnection is an
//! explicit `Leave` packet or inactivity past the liveness window, detected
//! by a periodic sweep.
//!
//! ## Module Organization
//!
//! - [`config`]: recognized server options and their defaults
//! - [`room`]: the `Room` record and its forward-only state machine
//! - [`session`]: the per-connection `PlayerSession` record
//! - [`room_manager`]: the single-writer orchestration core owning both
//!   registries; every handler returns an [`room_manager::Outcome`] so the
//!   core is testable without sockets
//! - [`network`]: the connection gateway binding the core to UDP transport
//! - [`utils`]: timestamp helpers

pub mod config;
pub mod network;
pub mod room;
pub mod room_manager;
pub mod session;
pub mod utils;
