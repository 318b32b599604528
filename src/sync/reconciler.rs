//! Local collection reconciliation.
//!
//! A [`LiveCollection`] is the in-memory view of one resource under one
//! parent entity. It is seeded from a snapshot read and kept current by
//! applying incremental [`RowChange`]s from the change feed. The feed
//! delivers at-least-once, so Insert is deliberately idempotent: a repeated
//! Insert replaces the existing row instead of duplicating it.

use std::cmp::Ordering;

/// Anything with a unique string key. Collections enforce at most one
/// element per key.
pub trait Keyed {
    /// Unique identifier for this element.
    fn key(&self) -> &str;
}

/// One reconciler operation, derived from a feed event.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange<R> {
    /// Add the row; replaces in place if the key already exists
    Insert(R),
    /// Replace the row with this key; no-op if the key is absent
    Update(R),
    /// Remove the row with this key; no-op if the key is absent
    Delete(String),
}

impl<R: Keyed> RowChange<R> {
    /// The key this change targets.
    pub fn key(&self) -> &str {
        match self {
            Self::Insert(row) | Self::Update(row) => row.key(),
            Self::Delete(key) => key,
        }
    }
}

/// What applying a change actually did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A new row was appended
    Inserted,
    /// An existing row was replaced in place
    Replaced,
    /// A row was removed
    Removed,
    /// The change targeted an absent key and was a no-op
    Ignored,
}

/// Ordering policy for a collection.
///
/// `Arrival` reproduces the observed upstream behavior: snapshot order is
/// kept, inserts append at the end regardless of their sort key, and updates
/// keep their position. `ByKey` re-sorts after every mutating apply for
/// strict display ordering.
pub enum OrderPolicy<R> {
    /// Keep arrival order (append on insert, in-place replace on update)
    Arrival,
    /// Keep the collection sorted by the given comparator
    ByKey(fn(&R, &R) -> Ordering),
}

// Manual impls: a derive would bound R, but the comparator is a plain fn
// pointer and copies regardless of R.
impl<R> Clone for OrderPolicy<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for OrderPolicy<R> {}

impl<R> std::fmt::Debug for OrderPolicy<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arrival => write!(f, "Arrival"),
            Self::ByKey(_) => write!(f, "ByKey"),
        }
    }
}

/// An ordered, key-unique collection of rows.
#[derive(Debug)]
pub struct LiveCollection<R: Keyed> {
    rows: Vec<R>,
    order: OrderPolicy<R>,
}

impl<R: Keyed> Default for LiveCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Keyed> LiveCollection<R> {
    /// Create an empty collection with arrival ordering.
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            order: OrderPolicy::Arrival,
        }
    }

    /// Create an empty collection with the given ordering policy.
    pub fn with_order(order: OrderPolicy<R>) -> Self {
        Self {
            rows: Vec::new(),
            order,
        }
    }

    /// Replace the entire contents with a snapshot. The previous contents
    /// are discarded; ordering policy is re-applied.
    pub fn replace_all(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.dedup_keep_last();
        self.resort();
    }

    /// Apply one change. Returns what actually happened, which differs from
    /// the change kind under at-least-once delivery (an Insert for a present
    /// key reports `Replaced`).
    pub fn apply(&mut self, change: RowChange<R>) -> Applied {
        let applied = match change {
            RowChange::Insert(row) => match self.position(row.key()) {
                Some(idx) => {
                    self.rows[idx] = row;
                    Applied::Replaced
                },
                None => {
                    self.rows.push(row);
                    Applied::Inserted
                },
            },
            RowChange::Update(row) => match self.position(row.key()) {
                Some(idx) => {
                    self.rows[idx] = row;
                    Applied::Replaced
                },
                None => Applied::Ignored,
            },
            RowChange::Delete(key) => match self.position(&key) {
                Some(idx) => {
                    self.rows.remove(idx);
                    Applied::Removed
                },
                None => Applied::Ignored,
            },
        };
        if applied != Applied::Ignored {
            self.resort();
        }
        applied
    }

    /// Current rows, in collection order.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Look up a row by key.
    pub fn get(&self, key: &str) -> Option<&R> {
        self.position(key).map(|idx| &self.rows[idx])
    }

    /// Returns true if a row with this key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop all rows, keeping the ordering policy.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Consume the collection, yielding its rows.
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.key() == key)
    }

    fn resort(&mut self) {
        if let OrderPolicy::ByKey(cmp) = self.order {
            self.rows.sort_by(cmp);
        }
    }

    /// A snapshot should never contain duplicate keys, but the collection
    /// invariant must hold even if the backend misbehaves: keep the last
    /// occurrence, matching replace-on-insert semantics.
    fn dedup_keep_last(&mut self) {
        let mut seen = std::collections::HashSet::new();
        let mut keep = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..).rev() {
            if seen.insert(row.key().to_string()) {
                keep.push(row);
            }
        }
        keep.reverse();
        self.rows = keep;
    }
}
