//! Persistent order-statistic tree behind the leaderboard
//!
//! A [`RankIndex`] is an immutable treap whose nodes know the size of their
//! subtree. Updates return a new index that shares every untouched node with
//! the old one, so an update costs O(log n) fresh nodes and anyone still
//! holding the previous index keeps reading a consistent version of it.
//!
//! Subtree sizes turn "how many keys sort before this one" into a single
//! root-to-leaf walk, and let a page at any offset be reached without
//! visiting the entries in front of it.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

type Link<K, V> = Option<Arc<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    priority: u64,
    size: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

/// Ordered map with O(log n) rank queries and structural sharing
pub struct RankIndex<K, V> {
    root: Link<K, V>,
}

impl<K, V> Clone for RankIndex<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K, V> Default for RankIndex<K, V> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<K, V> RankIndex<K, V>
where
    K: Ord + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Index with `key` mapped to `value`, replacing any previous value
    pub fn insert(&self, key: K, value: V) -> Self {
        let (below, rest) = split(&self.root, &key, false);
        let (_, above) = split(&rest, &key, true);
        let priority = priority_of(&key);
        let single = node(key, value, priority, None, None);
        Self {
            root: merge(merge(below, single), above),
        }
    }

    /// Index without `key`
    pub fn remove(&self, key: &K) -> Self {
        let (below, rest) = split(&self.root, key, false);
        let (_, above) = split(&rest, key, true);
        Self {
            root: merge(below, above),
        }
    }

    /// Number of keys strictly less than `key`
    pub fn count_less(&self, key: &K) -> usize {
        let mut count = 0;
        let mut link = &self.root;
        while let Some(n) = link {
            if n.key < *key {
                count += size(&n.left) + 1;
                link = &n.right;
            } else {
                link = &n.left;
            }
        }
        count
    }

    /// Values in key order, skipping the first `offset` and returning at
    /// most `limit`
    pub fn range(&self, offset: usize, limit: usize) -> Vec<V> {
        let take = limit.min(self.len().saturating_sub(offset));
        let mut out = Vec::with_capacity(take);
        let mut skip = offset;
        collect(&self.root, &mut skip, take, &mut out);
        out
    }
}

fn size<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

fn node<K, V>(key: K, value: V, priority: u64, left: Link<K, V>, right: Link<K, V>) -> Link<K, V> {
    let size = 1 + size(&left) + size(&right);
    Some(Arc::new(Node {
        key,
        value,
        priority,
        size,
        left,
        right,
    }))
}

/// Copy of `n` with new children
fn rebuild<K: Clone, V: Clone>(n: &Node<K, V>, left: Link<K, V>, right: Link<K, V>) -> Link<K, V> {
    node(n.key.clone(), n.value.clone(), n.priority, left, right)
}

fn priority_of<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Splits into keys below `key` and the rest. With `inclusive` set, a key
/// equal to `key` goes to the lower half.
fn split<K, V>(link: &Link<K, V>, key: &K, inclusive: bool) -> (Link<K, V>, Link<K, V>)
where
    K: Ord + Clone,
    V: Clone,
{
    let Some(n) = link else {
        return (None, None);
    };

    let goes_low = match n.key.cmp(key) {
        Ordering::Less => true,
        Ordering::Equal => inclusive,
        Ordering::Greater => false,
    };

    if goes_low {
        let (middle, high) = split(&n.right, key, inclusive);
        (rebuild(n, n.left.clone(), middle), high)
    } else {
        let (low, middle) = split(&n.left, key, inclusive);
        (low, rebuild(n, middle, n.right.clone()))
    }
}

/// Joins two trees where every key of `low` sorts before every key of `high`
fn merge<K, V>(low: Link<K, V>, high: Link<K, V>) -> Link<K, V>
where
    K: Clone,
    V: Clone,
{
    match (low, high) {
        (None, high) => high,
        (low, None) => low,
        (Some(a), Some(b)) => {
            if a.priority >= b.priority {
                rebuild(&a, a.left.clone(), merge(a.right.clone(), Some(b)))
            } else {
                rebuild(&b, merge(Some(a), b.left.clone()), b.right.clone())
            }
        }
    }
}

fn collect<K, V: Clone>(link: &Link<K, V>, skip: &mut usize, limit: usize, out: &mut Vec<V>) {
    let Some(n) = link else {
        return;
    };
    if out.len() >= limit {
        return;
    }
    if *skip >= n.size {
        *skip -= n.size;
        return;
    }

    collect(&n.left, skip, limit, out);
    if out.len() >= limit {
        return;
    }
    if *skip > 0 {
        *skip -= 1;
    } else {
        out.push(n.value.clone());
    }
    collect(&n.right, skip, limit, out);
}
