//! Fills a running server with players and random match results

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use rand::Rng;
use shared::{Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to seed
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Number of players to register
    #[arg(long, default_value = "20")]
    players: u32,

    /// Matches submitted per player
    #[arg(long, default_value = "5")]
    matches: u32,

    /// Highest random score
    #[arg(long, default_value = "1000")]
    max_score: i64,

    /// Prefix for generated player names
    #[arg(long, default_value = "seed")]
    prefix: String,
}

struct SeedClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    next_request_id: u32,
    buffer: Vec<u8>,
}

impl SeedClient {
    async fn request(&mut self, packet: Packet) -> Result<Packet, Box<dyn std::error::Error>> {
        self.socket
            .send_to(&serialize(&packet)?, self.server_addr)
            .await?;

        loop {
            let (len, _) =
                timeout(Duration::from_secs(2), self.socket.recv_from(&mut self.buffer)).await??;
            let response: Packet = deserialize(&self.buffer[..len])?;
            if response.request_id() == packet.request_id() {
                return Ok(response);
            }
        }
    }

    fn request_id(&mut self) -> u32 {
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.next_request_id
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut client = SeedClient {
        socket: UdpSocket::bind("0.0.0.0:0").await?,
        server_addr: args.server.parse()?,
        next_request_id: 0,
        buffer: vec![0u8; MAX_PACKET_SIZE],
    };

    let request_id = client.request_id();
    match client
        .request(Packet::Hello {
            request_id,
            client_version: PROTOCOL_VERSION,
        })
        .await?
    {
        Packet::Welcome { page_size, .. } => info!("Connected, server pages hold {} rows", page_size),
        other => return Err(format!("handshake failed: {:?}", other).into()),
    }

    let mut rng = rand::thread_rng();
    let mut submitted = 0;

    for i in 0..args.players {
        let request_id = client.request_id();
        let player = match client
            .request(Packet::Register {
                request_id,
                username: format!("{}-{}", args.prefix, i),
            })
            .await?
        {
            Packet::Registered { player, .. } => player,
            other => {
                warn!("Registration {} refused: {:?}", i, other);
                continue;
            }
        };

        for _ in 0..args.matches {
            let score = rng.gen_range(0..=args.max_score.max(0));
            let request_id = client.request_id();
            match client
                .request(Packet::SubmitMatch {
                    request_id,
                    player_id: player.id,
                    score,
                })
                .await?
            {
                Packet::MatchAccepted { .. } => submitted += 1,
                other => warn!("Match for {} refused: {:?}", player.name, other),
            }
        }
    }

    let request_id = client.request_id();
    if let Packet::LeaderboardSummary { summary, .. } = client
        .request(Packet::GetLeaderboardSummary { request_id })
        .await?
    {
        info!(
            "Submitted {} matches; leaderboard now has {} players over {} pages",
            submitted, summary.count, summary.pages
        );
    }

    Ok(())
}
