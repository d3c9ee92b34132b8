//! Append-only history of submitted matches

use crate::error::Result;
use chrono::{DateTime, Utc};
use shared::MatchRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub trait MatchLog: Send + Sync {
    /// Records a match. Only fails on a storage fault.
    fn append(&self, player_id: u32, score: u64, submitted_at: DateTime<Utc>)
        -> Result<MatchRecord>;

    /// Up to `limit` of a player's matches in the order they were
    /// appended, skipping the first `offset`.
    fn list_by_player_range(
        &self,
        player_id: u32,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MatchRecord>>;

    /// All matches of a player in the order they were appended.
    fn list_by_player(&self, player_id: u32) -> Result<Vec<MatchRecord>> {
        self.list_by_player_range(player_id, 0, usize::MAX)
    }

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-memory [`MatchLog`] sharded per player, so appends for different
/// players only share the brief shard lookup.
pub struct MemoryMatchLog {
    shards: RwLock<HashMap<u32, Arc<Mutex<Vec<MatchRecord>>>>>,
    next_match_id: AtomicU64,
}

impl MemoryMatchLog {
    pub fn new() -> Self {
        Self {
            shards: RwLock::new(HashMap::new()),
            next_match_id: AtomicU64::new(1),
        }
    }

    fn shard(&self, player_id: u32) -> Result<Arc<Mutex<Vec<MatchRecord>>>> {
        if let Some(shard) = self.shards.read()?.get(&player_id) {
            return Ok(Arc::clone(shard));
        }

        let mut shards = self.shards.write()?;
        Ok(Arc::clone(shards.entry(player_id).or_default()))
    }
}

impl Default for MemoryMatchLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchLog for MemoryMatchLog {
    fn append(
        &self,
        player_id: u32,
        score: u64,
        submitted_at: DateTime<Utc>,
    ) -> Result<MatchRecord> {
        let shard = self.shard(player_id)?;
        let mut matches = shard.lock()?;

        // Allocated under the shard lock so a player's ids increase with
        // insertion order.
        let record = MatchRecord {
            match_id: self.next_match_id.fetch_add(1, Ordering::Relaxed),
            player_id,
            score,
            submitted_at,
        };
        matches.push(record.clone());
        Ok(record)
    }

    fn list_by_player_range(
        &self,
        player_id: u32,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MatchRecord>> {
        let shard = match self.shards.read()?.get(&player_id) {
            Some(shard) => Arc::clone(shard),
            None => return Ok(Vec::new()),
        };
        let matches = shard.lock()?;

        let start = offset.min(matches.len());
        let end = start.saturating_add(limit).min(matches.len());
        Ok(matches[start..end].to_vec())
    }

    fn len(&self) -> Result<usize> {
        let shards: Vec<_> = self.shards.read()?.values().cloned().collect();
        let mut total = 0;
        for shard in shards {
            total += shard.lock()?.len();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_append_and_list_in_order() {
        let log = MemoryMatchLog::new();
        let now = Utc::now();

        log.append(1, 1, now).unwrap();
        log.append(1, 2, now).unwrap();
        log.append(1, 1, now).unwrap();

        let scores: Vec<u64> = log
            .list_by_player(1)
            .unwrap()
            .iter()
            .map(|m| m.score)
            .collect();
        assert_eq!(scores, vec![1, 2, 1]);
    }

    #[test]
    fn test_players_are_separate() {
        let log = MemoryMatchLog::new();
        let now = Utc::now();

        log.append(1, 10, now).unwrap();
        log.append(2, 20, now).unwrap();

        assert_eq!(log.list_by_player(1).unwrap().len(), 1);
        assert_eq!(log.list_by_player(2).unwrap()[0].score, 20);
        assert!(log.list_by_player(3).unwrap().is_empty());
        assert_eq!(log.len().unwrap(), 2);
    }

    #[test]
    fn test_match_ids_increase() {
        let log = MemoryMatchLog::new();
        let now = Utc::now();

        let first = log.append(1, 5, now).unwrap();
        let second = log.append(2, 5, now).unwrap();
        assert!(second.match_id > first.match_id);
    }

    #[test]
    fn test_records_keep_submission_time() {
        let log = MemoryMatchLog::new();
        let when = Utc::now() - chrono::Duration::seconds(30);

        let record = log.append(4, 99, when).unwrap();
        assert_eq!(record.submitted_at, when);
        assert_eq!(log.list_by_player(4).unwrap()[0], record);
    }

    #[test]
    fn test_list_range() {
        let log = MemoryMatchLog::new();
        let now = Utc::now();
        for score in 1..=6 {
            log.append(1, score, now).unwrap();
        }

        let scores = |offset, limit| -> Vec<u64> {
            log.list_by_player_range(1, offset, limit)
                .unwrap()
                .iter()
                .map(|m| m.score)
                .collect()
        };
        assert_eq!(scores(0, 2), vec![1, 2]);
        assert_eq!(scores(4, 10), vec![5, 6]);
        assert_eq!(scores(2, usize::MAX), vec![3, 4, 5, 6]);
        assert!(scores(6, 3).is_empty());
        assert!(scores(usize::MAX, usize::MAX).is_empty());
        assert!(scores(1, 0).is_empty());
        assert!(log.list_by_player_range(2, 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_log() {
        let log = MemoryMatchLog::new();
        assert!(log.is_empty().unwrap());
    }

    #[test]
    fn test_concurrent_appends() {
        let log = Arc::new(MemoryMatchLog::new());

        let handles: Vec<_> = (1..=4u32)
            .map(|player_id| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for score in 0..250u64 {
                        log.append(player_id, score, Utc::now()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len().unwrap(), 1000);
        for player_id in 1..=4 {
            let history = log.list_by_player(player_id).unwrap();
            assert_eq!(history.len(), 250);
            assert!(history.windows(2).all(|w| w[0].match_id < w[1].match_id));
            assert!(history.windows(2).all(|w| w[0].score < w[1].score));
        }
    }
}
