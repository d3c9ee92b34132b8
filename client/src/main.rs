use clap::{Parser, Subcommand};
use client::network::Client;
use client::rendering;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Milliseconds to wait for each response
    #[arg(short = 't', long, default_value = "2000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server speaks our protocol
    Hello,
    /// Register a new player
    Register { name: String },
    /// Submit a match score for a player
    Submit {
        player_id: u32,
        #[arg(allow_negative_numbers = true)]
        score: i64,
    },
    /// Show a player's best score and rank
    Me { player_id: u32 },
    /// Show how many players and pages the leaderboard has
    Summary,
    /// Show one leaderboard page (numbered from 1)
    Page {
        #[arg(default_value = "1")]
        page: u32,
    },
    /// Show a player's match history
    History {
        player_id: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show a player's registration details
    Whoami { player_id: u32 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    info!("Using server {}", args.server);

    let mut client = Client::new(&args.server, Duration::from_millis(args.timeout_ms)).await?;

    match args.command {
        Command::Hello => {
            let page_size = client.hello().await?;
            println!(
                "Connected to {} ({} rows per page)",
                client.server_addr(),
                page_size
            );
        }
        Command::Register { name } => {
            let player = client.register(&name).await?;
            print!("{}", rendering::render_player(&player));
        }
        Command::Submit { player_id, score } => {
            let result = client.submit(player_id, score).await?;
            if result.new_best {
                println!("New best score: {}", result.current_best_score);
            } else {
                println!(
                    "Match recorded, best score stays at {}",
                    result.current_best_score
                );
            }
        }
        Command::Me { player_id } => {
            let highscore = client.my_highscore(player_id).await?;
            print!("{}", rendering::render_highscore(&highscore));
        }
        Command::Summary => {
            let summary = client.leaderboard_summary().await?;
            print!("{}", rendering::render_summary(&summary));
        }
        Command::Page { page } => {
            let page_index = page.saturating_sub(1);
            let page_size = client.hello().await?;
            let rows = client.leaderboard_page(page_index).await?;
            print!("{}", rendering::render_page(page_index, page_size, &rows));
        }
        Command::History {
            player_id,
            offset,
            limit,
        } => {
            let matches = client.match_history(player_id, offset, limit).await?;
            print!("{}", rendering::render_history(&matches));
        }
        Command::Whoami { player_id } => {
            let player = client.player(player_id).await?;
            print!("{}", rendering::render_player(&player));
        }
    }

    Ok(())
}
