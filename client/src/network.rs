use crate::error::ClientError;
use bincode::{deserialize, serialize};
use log::{debug, warn};
use shared::{
    LeaderboardRow, LeaderboardSummary, MatchRecord, Packet, Player, PlayerHighscore,
    MAX_PACKET_SIZE, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of a match submission as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitResult {
    pub accepted: bool,
    pub current_best_score: u64,
    pub new_best: bool,
}

/// Request/response client for the highscore server.
///
/// Requests are sent one at a time; responses carrying a different
/// request id (late answers to timed-out requests) are discarded.
pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    next_request_id: u32,
    request_timeout: Duration,
    buffer: Vec<u8>,
}

impl Client {
    pub async fn new(server_addr: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let server_addr = server_addr
            .parse()
            .map_err(|_| ClientError::InvalidAddress(server_addr.to_string()))?;
        let socket = UdpSocket::bind("0.0.0.0:0").await?;

        Ok(Client {
            socket,
            server_addr,
            next_request_id: 0,
            request_timeout,
            buffer: vec![0u8; MAX_PACKET_SIZE],
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    fn allocate_request_id(&mut self) -> u32 {
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.next_request_id
    }

    /// Sends a request built around a fresh request id and waits for its
    /// response. Server-side errors come back as [`ClientError::Server`].
    async fn request(
        &mut self,
        build: impl FnOnce(u32) -> Packet,
    ) -> Result<Packet, ClientError> {
        let request_id = self.allocate_request_id();
        let packet = build(request_id);

        let data = serialize(&packet)?;
        self.socket.send_to(&data, self.server_addr).await?;

        let deadline = Instant::now() + self.request_timeout;
        loop {
            let (len, addr) = timeout_at(deadline, self.socket.recv_from(&mut self.buffer))
                .await
                .map_err(|_| ClientError::Timeout(self.request_timeout))??;

            if addr != self.server_addr {
                warn!("Ignoring datagram from unexpected address {}", addr);
                continue;
            }

            let response: Packet = match deserialize(&self.buffer[..len]) {
                Ok(response) => response,
                Err(e) => {
                    warn!("Failed to deserialize response: {}", e);
                    continue;
                }
            };

            if response.request_id() != request_id {
                debug!(
                    "Dropping stale response {} while waiting for {}",
                    response.request_id(),
                    request_id
                );
                continue;
            }

            return match response {
                Packet::Error { kind, message, .. } => Err(ClientError::Server { kind, message }),
                response => Ok(response),
            };
        }
    }

    /// Checks protocol compatibility and returns the server's page size
    pub async fn hello(&mut self) -> Result<u32, ClientError> {
        match self
            .request(|request_id| Packet::Hello {
                request_id,
                client_version: PROTOCOL_VERSION,
            })
            .await?
        {
            Packet::Welcome { page_size, .. } => Ok(page_size),
            other => Err(ClientError::unexpected("Welcome", &other)),
        }
    }

    pub async fn register(&mut self, username: &str) -> Result<Player, ClientError> {
        let username = username.to_string();
        match self
            .request(|request_id| Packet::Register {
                request_id,
                username,
            })
            .await?
        {
            Packet::Registered { player, .. } => Ok(player),
            other => Err(ClientError::unexpected("Registered", &other)),
        }
    }

    pub async fn submit(&mut self, player_id: u32, score: i64) -> Result<SubmitResult, ClientError> {
        match self
            .request(|request_id| Packet::SubmitMatch {
                request_id,
                player_id,
                score,
            })
            .await?
        {
            Packet::MatchAccepted {
                accepted,
                current_best_score,
                new_best,
                ..
            } => Ok(SubmitResult {
                accepted,
                current_best_score,
                new_best,
            }),
            other => Err(ClientError::unexpected("MatchAccepted", &other)),
        }
    }

    pub async fn my_highscore(&mut self, player_id: u32) -> Result<PlayerHighscore, ClientError> {
        match self
            .request(|request_id| Packet::GetHighscore {
                request_id,
                player_id,
            })
            .await?
        {
            Packet::Highscore { highscore, .. } => Ok(highscore),
            other => Err(ClientError::unexpected("Highscore", &other)),
        }
    }

    pub async fn leaderboard_summary(&mut self) -> Result<LeaderboardSummary, ClientError> {
        match self
            .request(|request_id| Packet::GetLeaderboardSummary { request_id })
            .await?
        {
            Packet::LeaderboardSummary { summary, .. } => Ok(summary),
            other => Err(ClientError::unexpected("LeaderboardSummary", &other)),
        }
    }

    pub async fn leaderboard_page(
        &mut self,
        page_index: u32,
    ) -> Result<Vec<LeaderboardRow>, ClientError> {
        match self
            .request(|request_id| Packet::GetLeaderboardPage {
                request_id,
                page_index,
            })
            .await?
        {
            Packet::LeaderboardPage { rows, .. } => Ok(rows),
            other => Err(ClientError::unexpected("LeaderboardPage", &other)),
        }
    }

    pub async fn match_history(
        &mut self,
        player_id: u32,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<MatchRecord>, ClientError> {
        match self
            .request(|request_id| Packet::GetMatchHistory {
                request_id,
                player_id,
                offset,
                limit,
            })
            .await?
        {
            Packet::MatchHistory { matches, .. } => Ok(matches),
            other => Err(ClientError::unexpected("MatchHistory", &other)),
        }
    }

    pub async fn player(&mut self, player_id: u32) -> Result<Player, ClientError> {
        match self
            .request(|request_id| Packet::GetPlayer {
                request_id,
                player_id,
            })
            .await?
        {
            Packet::PlayerInfo { player, .. } => Ok(player),
            other => Err(ClientError::unexpected("PlayerInfo", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorKind;

    /// Answers each request once with whatever `respond` returns
    async fn fake_server(
        respond: impl Fn(Packet) -> Vec<Packet> + Send + 'static,
    ) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];
            while let Ok((len, from)) = socket.recv_from(&mut buffer).await {
                let request: Packet = deserialize(&buffer[..len]).unwrap();
                for response in respond(request) {
                    let data = serialize(&response).unwrap();
                    socket.send_to(&data, from).await.unwrap();
                }
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let result = Client::new("not an address", DEFAULT_TIMEOUT).await;
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_hello_returns_page_size() {
        let addr = fake_server(|request| {
            vec![Packet::Welcome {
                request_id: request.request_id(),
                server_version: PROTOCOL_VERSION,
                page_size: 10,
            }]
        })
        .await;

        let mut client = Client::new(&addr.to_string(), DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(client.hello().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_stale_responses_are_skipped() {
        let addr = fake_server(|request| {
            let request_id = request.request_id();
            vec![
                Packet::LeaderboardSummary {
                    request_id: request_id.wrapping_sub(1),
                    summary: LeaderboardSummary { count: 99, pages: 99 },
                },
                Packet::LeaderboardSummary {
                    request_id,
                    summary: LeaderboardSummary { count: 2, pages: 1 },
                },
            ]
        })
        .await;

        let mut client = Client::new(&addr.to_string(), DEFAULT_TIMEOUT).await.unwrap();
        let summary = client.leaderboard_summary().await.unwrap();
        assert_eq!(summary, LeaderboardSummary { count: 2, pages: 1 });
    }

    #[tokio::test]
    async fn test_server_error_is_surfaced() {
        let addr = fake_server(|request| {
            vec![Packet::Error {
                request_id: request.request_id(),
                kind: ErrorKind::NotFound,
                message: "no highscore entry for player 9".to_string(),
            }]
        })
        .await;

        let mut client = Client::new(&addr.to_string(), DEFAULT_TIMEOUT).await.unwrap();
        match client.my_highscore(9).await {
            Err(ClientError::Server { kind, .. }) => assert_eq!(kind, ErrorKind::NotFound),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_response() {
        let addr = fake_server(|request| {
            vec![Packet::LeaderboardSummary {
                request_id: request.request_id(),
                summary: LeaderboardSummary::default(),
            }]
        })
        .await;

        let mut client = Client::new(&addr.to_string(), DEFAULT_TIMEOUT).await.unwrap();
        let result = client.submit(1, 5).await;
        assert!(matches!(result, Err(ClientError::UnexpectedResponse { .. })));
    }

    #[tokio::test]
    async fn test_timeout() {
        let addr = fake_server(|_| Vec::new()).await;

        let mut client = Client::new(&addr.to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        let result = client.leaderboard_page(0).await;
        assert!(matches!(result, Err(ClientError::Timeout(_))));
    }
}
