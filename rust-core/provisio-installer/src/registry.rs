// SPDX-License-Identifier: PMPL-1.0-or-later
//! Table handles captured at connect time.
//!
//! A [`TableRegistry`] is a point-in-time snapshot: it maps every table that
//! existed when it was captured to a [`TableHandle`]. Nothing refreshes it
//! behind the caller's back.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;

/// Reference to a named table under a configuration.
///
/// Owns no connection and holds no live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    name: String,
    config: Arc<Config>,
}

impl TableHandle {
    /// Handle for table `name` under `config`.
    pub fn new(name: impl Into<String>, config: Arc<Config>) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database the table lives in.
    pub fn db(&self) -> &str {
        self.config.db()
    }

    /// Configuration the handle was captured under.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// `db.table`, the form the store uses in messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.config.db(), self.name)
    }
}

/// Snapshot of table handles, keyed by table name.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    tables: BTreeMap<String, TableHandle>,
    captured_at: DateTime<Utc>,
}

impl TableRegistry {
    /// Build a snapshot from the table names listed at `captured_at`.
    pub fn capture<I, S>(config: &Arc<Config>, names: I, captured_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = names
            .into_iter()
            .map(|name| {
                let handle = TableHandle::new(name, Arc::clone(config));
                (handle.name.clone(), handle)
            })
            .collect();

        Self {
            tables,
            captured_at,
        }
    }

    /// Handle for `name`, if it existed when the snapshot was taken.
    pub fn get(&self, name: &str) -> Option<&TableHandle> {
        self.tables.get(name)
    }

    /// Whether `name` existed when the snapshot was taken.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Handles in name order.
    pub fn iter(&self) -> btree_map::Values<'_, String, TableHandle> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// When the snapshot was taken.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl<'a> IntoIterator for &'a TableRegistry {
    type Item = &'a TableHandle;
    type IntoIter = btree_map::Values<'a, String, TableHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
