//! Server network layer handling UDP request/response traffic

use crate::config::ServerConfig;
use crate::error::HighscoreError;
use crate::service::HighscoreService;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ErrorKind, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages queued for the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Stops a running [`Server`] from another task
#[derive(Clone)]
pub struct ShutdownHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// UDP front end of the highscore service.
///
/// One datagram carries one request. Each request is answered from its
/// own task, so a slow request never holds up the receive loop.
pub struct Server {
    socket: Arc<UdpSocket>,
    service: Arc<HighscoreService>,
    stats_interval: Option<Duration>,
    requests_served: Arc<AtomicU64>,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Server {
    pub async fn new(
        config: &ServerConfig,
        service: Arc<HighscoreService>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(config.address()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            service,
            stats_interval: config.stats_interval(),
            requests_served: Arc::new(AtomicU64::new(0)),
            tasks: Vec::new(),
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

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
        }));
    }

    /// Spawns task that drains the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        }));
    }

    /// Spawns task that periodically logs service counters
    fn spawn_stats_reporter(&mut self) {
        let Some(period) = self.stats_interval else {
            return;
        };
        let service = Arc::clone(&self.service);
        let requests_served = Arc::clone(&self.requests_served);

        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                match service.stats() {
                    Ok(stats) => info!(
                        "{} players registered, {} on the leaderboard, {} matches recorded, {} requests served",
                        stats.players,
                        stats.ranked_players,
                        stats.matches,
                        requests_served.load(Ordering::Relaxed)
                    ),
                    Err(e) => error!("Failed to collect stats: {}", e),
                }
            }
        }));
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Answers a request on its own task
    fn handle_packet(&self, packet: Packet, addr: SocketAddr) {
        let service = Arc::clone(&self.service);
        let outbound_tx = self.outbound_tx.clone();
        let requests_served = Arc::clone(&self.requests_served);

        tokio::spawn(async move {
            let response = dispatch(&service, packet, addr);
            requests_served.fetch_add(1, Ordering::Relaxed);

            if let Err(e) = outbound_tx.send(OutboundMessage::SendPacket {
                packet: response,
                addr,
            }) {
                error!("Failed to queue response for {}: {}", addr, e);
            }
        });
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_stats_reporter();

        info!(
            "Server started with {} rows per leaderboard page",
            self.service.page_size()
        );

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr);
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }

        Ok(())
    }
}

/// Turns one request packet into its response packet
pub fn dispatch(service: &HighscoreService, packet: Packet, addr: SocketAddr) -> Packet {
    let request_id = packet.request_id();

    let result = match packet {
        Packet::Hello { client_version, .. } => {
            if client_version != PROTOCOL_VERSION {
                warn!(
                    "Client at {} speaks protocol {} (expected {})",
                    addr, client_version, PROTOCOL_VERSION
                );
                return error_packet(
                    request_id,
                    ErrorKind::UnsupportedVersion,
                    format!(
                        "protocol version {} is not supported, expected {}",
                        client_version, PROTOCOL_VERSION
                    ),
                );
            }
            Ok(Packet::Welcome {
                request_id,
                server_version: PROTOCOL_VERSION,
                page_size: service.page_size(),
            })
        }

        Packet::Register { username, .. } => service
            .register(&username)
            .map(|player| Packet::Registered { request_id, player }),

        Packet::SubmitMatch {
            player_id, score, ..
        } => service
            .submit(player_id, score)
            .map(|outcome| Packet::MatchAccepted {
                request_id,
                accepted: true,
                current_best_score: outcome.current_best_score,
                new_best: outcome.new_best,
            }),

        Packet::GetHighscore { player_id, .. } => service
            .my_highscore(player_id)
            .map(|highscore| Packet::Highscore {
                request_id,
                highscore,
            }),

        Packet::GetLeaderboardSummary { .. } => service
            .leaderboard_summary()
            .map(|summary| Packet::LeaderboardSummary {
                request_id,
                summary,
            }),

        Packet::GetLeaderboardPage { page_index, .. } => service
            .leaderboard_page(page_index)
            .map(|rows| Packet::LeaderboardPage {
                request_id,
                page_index,
                rows,
            }),

        Packet::GetMatchHistory {
            player_id,
            offset,
            limit,
            ..
        } => service
            .match_history(player_id, offset, limit)
            .map(|matches| Packet::MatchHistory {
                request_id,
                matches,
            }),

        Packet::GetPlayer { player_id, .. } => service
            .player(player_id)
            .map(|player| Packet::PlayerInfo { request_id, player }),

        _ => {
            warn!("Unexpected packet type from client at {}", addr);
            return error_packet(
                request_id,
                ErrorKind::Malformed,
                "expected a request packet".to_string(),
            );
        }
    };

    result.unwrap_or_else(|e| service_error(request_id, e, addr))
}

fn service_error(request_id: u32, err: HighscoreError, addr: SocketAddr) -> Packet {
    match &err {
        HighscoreError::Storage(_) => error!("Request from {} failed: {}", addr, err),
        _ => debug!("Request from {} rejected: {}", addr, err),
    }
    error_packet(request_id, err.kind(), err.to_string())
}

fn error_packet(request_id: u32, kind: ErrorKind, message: String) -> Packet {
    Packet::Error {
        request_id,
        kind,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{LeaderboardSummary, DEFAULT_PAGE_SIZE};
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080)
    }

    fn test_service() -> HighscoreService {
        HighscoreService::new(DEFAULT_PAGE_SIZE)
    }

    #[test]
    fn test_hello_returns_page_size() {
        let service = HighscoreService::new(25);
        let response = dispatch(
            &service,
            Packet::Hello {
                request_id: 1,
                client_version: PROTOCOL_VERSION,
            },
            test_addr(),
        );

        assert_eq!(
            response,
            Packet::Welcome {
                request_id: 1,
                server_version: PROTOCOL_VERSION,
                page_size: 25,
            }
        );
    }

    #[test]
    fn test_hello_rejects_other_versions() {
        let response = dispatch(
            &test_service(),
            Packet::Hello {
                request_id: 2,
                client_version: PROTOCOL_VERSION + 1,
            },
            test_addr(),
        );

        match response {
            Packet::Error {
                request_id, kind, ..
            } => {
                assert_eq!(request_id, 2);
                assert_eq!(kind, ErrorKind::UnsupportedVersion);
            }
            other => panic!("Unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_register_and_submit() {
        let service = test_service();

        let player = match dispatch(
            &service,
            Packet::Register {
                request_id: 1,
                username: "test-user-1".to_string(),
            },
            test_addr(),
        ) {
            Packet::Registered { player, .. } => player,
            other => panic!("Unexpected packet: {:?}", other),
        };

        let response = dispatch(
            &service,
            Packet::SubmitMatch {
                request_id: 2,
                player_id: player.id,
                score: 123456,
            },
            test_addr(),
        );
        assert_eq!(
            response,
            Packet::MatchAccepted {
                request_id: 2,
                accepted: true,
                current_best_score: 123456,
                new_best: true,
            }
        );
    }

    #[test]
    fn test_errors_keep_request_id() {
        let service = test_service();

        let cases = vec![
            (
                Packet::SubmitMatch {
                    request_id: 10,
                    player_id: 99,
                    score: 5,
                },
                ErrorKind::NotFound,
            ),
            (
                Packet::GetHighscore {
                    request_id: 11,
                    player_id: 99,
                },
                ErrorKind::NotFound,
            ),
            (
                Packet::Register {
                    request_id: 12,
                    username: String::new(),
                },
                ErrorKind::InvalidInput,
            ),
            (
                Packet::GetPlayer {
                    request_id: 13,
                    player_id: 99,
                },
                ErrorKind::NotFound,
            ),
        ];

        for (packet, expected_kind) in cases {
            let expected_id = packet.request_id();
            match dispatch(&service, packet, test_addr()) {
                Packet::Error {
                    request_id, kind, ..
                } => {
                    assert_eq!(request_id, expected_id);
                    assert_eq!(kind, expected_kind);
                }
                other => panic!("Unexpected packet: {:?}", other),
            }
        }
    }

    #[test]
    fn test_negative_score_is_invalid_input() {
        let service = test_service();
        let player = service.register("alice").unwrap();

        let response = dispatch(
            &service,
            Packet::SubmitMatch {
                request_id: 3,
                player_id: player.id,
                score: -10,
            },
            test_addr(),
        );

        assert!(matches!(
            response,
            Packet::Error {
                kind: ErrorKind::InvalidInput,
                ..
            }
        ));
        assert!(service.match_history(player.id, 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_conflict() {
        let service = test_service();
        service.register("alice").unwrap();

        let response = dispatch(
            &service,
            Packet::Register {
                request_id: 4,
                username: "alice".to_string(),
            },
            test_addr(),
        );

        assert!(matches!(
            response,
            Packet::Error {
                kind: ErrorKind::Conflict,
                ..
            }
        ));
    }

    #[test]
    fn test_response_packets_are_rejected() {
        let response = dispatch(
            &test_service(),
            Packet::LeaderboardSummary {
                request_id: 5,
                summary: LeaderboardSummary::default(),
            },
            test_addr(),
        );

        assert!(matches!(
            response,
            Packet::Error {
                request_id: 5,
                kind: ErrorKind::Malformed,
                ..
            }
        ));
    }

    #[test]
    fn test_leaderboard_requests() {
        let service = test_service();
        let p1 = service.register("P1").unwrap();
        let p2 = service.register("P2").unwrap();
        service.register("P3").unwrap();
        service.submit(p1.id, 4).unwrap();
        service.submit(p2.id, 8).unwrap();

        let summary = dispatch(
            &service,
            Packet::GetLeaderboardSummary { request_id: 6 },
            test_addr(),
        );
        assert_eq!(
            summary,
            Packet::LeaderboardSummary {
                request_id: 6,
                summary: LeaderboardSummary { count: 2, pages: 1 },
            }
        );

        match dispatch(
            &service,
            Packet::GetLeaderboardPage {
                request_id: 7,
                page_index: 0,
            },
            test_addr(),
        ) {
            Packet::LeaderboardPage {
                page_index, rows, ..
            } => {
                assert_eq!(page_index, 0);
                assert_eq!(rows[0].display_name, "P2");
                assert_eq!(rows[1].display_name, "P1");
            }
            other => panic!("Unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let handle = ShutdownHandle { server_tx: tx };

        handle.shutdown();

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Shutdown)));
    }

    #[tokio::test]
    async fn test_server_answers_over_udp() {
        let config = ServerConfig {
            port: 0,
            stats_interval: 0,
            ..ServerConfig::default()
        };
        let service = Arc::new(test_service());
        let mut server = Server::new(&config, Arc::clone(&service)).await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let server_task = tokio::spawn(async move { server.run().await.is_ok() });

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let request = Packet::GetLeaderboardSummary { request_id: 77 };
        socket
            .send_to(&serialize(&request).unwrap(), server_addr)
            .await
            .unwrap();

        let mut buffer = vec![0u8; MAX_PACKET_SIZE];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buffer))
            .await
            .expect("server did not answer")
            .unwrap();
        let response: Packet = deserialize(&buffer[..len]).unwrap();
        assert_eq!(response.request_id(), 77);

        shutdown.shutdown();
        assert!(server_task.await.unwrap());
    }
}
