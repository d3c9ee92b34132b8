use clap::Parser;
use shared::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use std::time::Duration;

/// Command line configuration of the highscore server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on (0 picks a free port)
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Leaderboard rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE,
          value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64))]
    pub page_size: u32,

    /// Seconds between stats log lines, 0 disables them
    #[arg(long, default_value = "30")]
    pub stats_interval: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        if self.stats_interval == 0 {
            None
        } else {
            Some(Duration::from_secs(self.stats_interval))
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            page_size: DEFAULT_PAGE_SIZE,
            stats_interval: 30,
        }
    }
}
