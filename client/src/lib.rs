//! # Highscore Client Library
//!
//! Client-side access to the highscore server. The library wraps the UDP
//! request/response protocol from `shared` in typed async calls and renders
//! the results as plain text for the command line tool.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - Socket management and request id allocation
//! - Matching responses to requests, dropping stale datagrams
//! - Per-request timeouts
//! - One typed method per server operation
//!
//! ### Rendering Module (`rendering`)
//! Terminal output for leaderboard pages, summaries, highscores and match
//! history.
//!
//! ### Error Module (`error`)
//! [`ClientError`] separates transport failures from requests the server
//! answered with an error.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, DEFAULT_TIMEOUT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::ClientError> {
//!     let mut client = Client::new("127.0.0.1:8080", DEFAULT_TIMEOUT).await?;
//!
//!     let player = client.register("test-user-1").await?;
//!     client.submit(player.id, 123456).await?;
//!
//!     let highscore = client.my_highscore(player.id).await?;
//!     print!("{}", client::rendering::render_highscore(&highscore));
//!
//!     let rows = client.leaderboard_page(0).await?;
//!     print!("{}", client::rendering::render_page(0, 10, &rows));
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod network;
pub mod rendering;

pub use error::ClientError;
