//! # Highscore Server Library
//!
//! This library provides the authoritative highscore server. It records every
//! submitted match, keeps one best score per registered player, and serves a
//! ranked, paginated leaderboard to clients over UDP.
//!
//! ## Core Responsibilities
//!
//! ### Best Score Maintenance
//! A player's best score only ever moves up. Every match is logged, but the
//! highscore entry changes only when a strictly higher score arrives. The
//! check and the write happen atomically per player, so two concurrent
//! submissions for the same player can never lose the higher score.
//!
//! ### Ranking
//! A player's rank is one plus the number of players with a strictly higher
//! best score. Tied players share a rank and the following rank is skipped
//! ("1, 2, 2, 4"). Ranks are computed from the ranking index on demand
//! rather than stored.
//!
//! ### Leaderboard Pages
//! Players with a best score above zero are listed highest first in pages
//! of a configured size. Equal scores keep a stable order: whoever reached
//! the score first is listed first. Pages past the end are simply empty.
//!
//! ## Module Organization
//!
//! ### Score Store (`score_store`)
//! The best-score table and its descending index, with per-player locking.
//!
//! ### Rank Index (`rank_index`)
//! Persistent order-statistic tree that backs the ranking snapshots.
//!
//! ### Match Log (`match_log`)
//! Append-only match history, sharded per player.
//!
//! ### Engine (`engine`)
//! The submission rule and rank queries built on the two stores.
//!
//! ### Leaderboard (`leaderboard`)
//! Page, count and page-count queries over the ranked entries.
//!
//! ### Registry (`registry`)
//! Player registration. A player only exists once their zero highscore
//! entry has been created.
//!
//! ### Service (`service`)
//! The operations exposed to clients, wiring the pieces above together.
//!
//! ### Network (`network`)
//! UDP socket handling and packet dispatch.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::service::HighscoreService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let service = Arc::new(HighscoreService::new(config.page_size));
//!
//!     let mut server = Server::new(&config, service).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Each request is answered on its own tokio task. Submissions for
//! different players never wait on each other. Leaderboard reads load an
//! immutable snapshot of the ranking index and take no locks, so a long
//! page scan never holds up a submission. Writers publish a new snapshot
//! after each best-score change.

pub mod config;
pub mod engine;
pub mod error;
pub mod leaderboard;
pub mod match_log;
pub mod network;
pub mod rank_index;
pub mod registry;
pub mod score_store;
pub mod service;
