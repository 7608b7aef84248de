//! Connection gateway binding the orchestration core to UDP transport

use crate::config::MatchConfig;
use crate::room_manager::{Outcome, RoomManager, TimerKind};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Events funneled into the single owning loop. Network receive, timer
/// firings, and the liveness sweep all arrive through this channel, so every
/// registry mutation happens on one task.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    RoomTimer {
        room_id: String,
        kind: TimerKind,
    },
    SweepIdle,
    #[allow(dead_code)]
    Shutdown,
}

/// Main server coordinating transport and match orchestration
pub struct Server {
    socket: Arc<UdpSocket>,
    manager: RoomManager,
    config: MatchConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<(SocketAddr, Packet)>,
    out_rx: Option<mpsc::UnboundedReceiver<(SocketAddr, Packet)>>,
}

impl Server {
    pub async fn new(addr: &str, config: MatchConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Match server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            manager: RoomManager::new(config.clone()),
            config,
            server_tx,
            server_rx,
            out_tx,
            out_rx: Some(out_rx),
        })
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut out_rx) = self.out_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some((addr, packet)) = out_rx.recv().await {
                match serialize(&packet) {
                    Ok(data) => {
                        if let Err(e) = socket.send_to(&data, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    Err(e) => error!("Failed to serialize packet for {}: {}", addr, e),
                }
            }
        });
    }

    /// Spawns task that periodically asks the main loop to sweep idle
    /// sessions. The sweep itself runs on the owning loop, never here.
    fn spawn_liveness_sweeper(&self) {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;
                if server_tx.send(ServerMessage::SweepIdle).is_err() {
                    break;
                }
            }
        });
    }

    /// Applies the effects of one handled event: queues sends, arms timers,
    /// and logs force-closes. Timer expiry is routed back through the event
    /// channel so it mutates the registries on the owning loop only.
    fn apply(&self, outcome: Outcome) {
        for (addr, packet) in outcome.sends {
            if let Err(e) = self.out_tx.send((addr, packet)) {
                error!("Failed to queue packet for sending: {}", e);
            }
        }

        for timer in outcome.timers {
            let server_tx = self.server_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timer.delay).await;
                // Stale firings are fine; the manager re-validates.
                let _ = server_tx.send(ServerMessage::RoomTimer {
                    room_id: timer.room_id,
                    kind: timer.kind,
                });
            });
        }

        for addr in outcome.closes {
            // UDP has no connection to tear down; the session is already
            // gone, so later datagrams from this address are stale no-ops.
            info!("Force-closed connection {}", addr);
        }
    }

    /// Dispatches one inbound packet to the orchestration core
    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        self.manager.touch(addr);

        let outcome = match packet {
            Packet::Join { player_name } => self.manager.join(addr, player_name),
            Packet::ExtendWait => self.manager.extend_wait(addr),
            Packet::SelectLoadout { loadout } => self.manager.select_loadout(addr, loadout),
            Packet::GameInput { payload } => self.manager.relay_input(addr, payload),
            Packet::SyncGameState { payload } => self.manager.sync_state(addr, payload),
            Packet::GameOver { winner } => self.manager.game_over(addr, winner),
            Packet::Leave => self.manager.disconnect(addr),
            _ => {
                warn!("Unexpected packet type from client at {}", addr);
                Outcome::default()
            }
        };

        self.apply(outcome);
    }

    /// Disconnects every session that went silent past the liveness window
    fn sweep_idle(&mut self) {
        let idle = self.manager.idle_addrs();
        for addr in idle {
            debug!("Session {} idle past liveness window", addr);
            let outcome = self.manager.disconnect(addr);
            self.apply(outcome);
        }
    }

    /// Main server loop owning both registries
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_liveness_sweeper();

        info!(
            "Match server started ({} rooms / {} players max)",
            self.config.max_rooms, self.config.max_players
        );

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr);
                }
                ServerMessage::RoomTimer { room_id, kind } => {
                    let outcome = self.manager.handle_timer(&room_id, kind);
                    self.apply(outcome);
                }
                ServerMessage::SweepIdle => {
                    self.sweep_idle();
                }
                ServerMessage::Shutdown => {
                    info!("Match server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080)
    }

    #[test]
    fn test_server_message_packet_received() {
        let msg = ServerMessage::PacketReceived {
            packet: Packet::Join {
                player_name: "Alice".to_string(),
            },
            addr: test_addr(),
        };

        match msg {
            ServerMessage::PacketReceived { packet, addr } => {
                assert_eq!(addr, test_addr());
                match packet {
                    Packet::Join { player_name } => assert_eq!(player_name, "Alice"),
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_server_message_room_timer() {
        let msg = ServerMessage::RoomTimer {
            room_id: "room-1".to_string(),
            kind: TimerKind::Wait,
        };

        match msg {
            ServerMessage::RoomTimer { room_id, kind } => {
                assert_eq!(room_id, "room-1");
                assert_eq!(kind, TimerKind::Wait);
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[tokio::test]
    async fn test_timer_event_reaches_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        let timer_tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = timer_tx.send(ServerMessage::RoomTimer {
                room_id: "room-xyz".to_string(),
                kind: TimerKind::FinalGrace,
            });
        });

        match rx.recv().await {
            Some(ServerMessage::RoomTimer { room_id, kind }) => {
                assert_eq!(room_id, "room-xyz");
                assert_eq!(kind, TimerKind::FinalGrace);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = Server::new("127.0.0.1:0", MatchConfig::default()).await;
        assert!(server.is_ok());
    }

    #[test]
    fn test_malformed_datagram_is_rejected() {
        let garbage = [0xFFu8; 16];
        let result: Result<Packet, _> = deserialize(&garbage);
        assert!(result.is_err());
    }
}
