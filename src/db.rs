//! # Store API
//!
//! This module provides the high-level [`Kv`] facade, binding the
//! copy-on-write tree to the memory-mapped pager behind a small dictionary
//! interface.
//!
//! ## Write path
//!
//! ```text
//! set(key, val)
//!     │
//!     ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ 1. VALIDATE: size limits, before any mutation        │
//! └──────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ 2. REBUILD: tree insert stages a new root-to-leaf    │
//! │    path in the pager (old pages untouched)           │
//! └──────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ 3. COMMIT: flush copies staged pages into the file,  │
//! │    syncs, republishes the master page, syncs again   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation commits before returning, so a `set` or `del` that came
//! back `Ok` survives a crash. Reads never touch the disk state.
//!
//! ## Concurrency
//!
//! `Kv` assumes a single writer and offers no internal synchronization;
//! wrap it in a lock if readers and the writer share it.

use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};

use crate::btree;
use crate::config::{MAX_KEY_SIZE, MAX_VAL_SIZE};
use crate::storage::Pager;

/// A persistent ordered key-value store over a single file.
#[derive(Debug)]
pub struct Kv {
    path: PathBuf,
    pager: Pager,
    root: u64,
}

impl Kv {
    /// Opens or creates the store at `path`. Refuses files that do not
    /// carry a valid signature and master page.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (pager, root) = Pager::open(&path)?;
        Ok(Kv { path, pager, root })
    }

    /// Closes the store, releasing the file handle and the mappings.
    /// Dropping the store has the same effect; every committed mutation is
    /// already durable.
    pub fn close(self) {}

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up `key`. Keys outside the allowed sizes cannot exist, so
    /// they answer `None` without touching the tree; in particular the
    /// empty key never reaches the internal sentinel entry.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if key.is_empty() || key.len() > MAX_KEY_SIZE {
            return None;
        }
        btree::lookup(&self.pager, self.root, key)
    }

    /// Inserts or updates `key`, committing before returning.
    pub fn set(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
        ensure!(!key.is_empty(), "key must not be empty");
        ensure!(
            key.len() <= MAX_KEY_SIZE,
            "key of {} bytes exceeds the {} byte limit",
            key.len(),
            MAX_KEY_SIZE
        );
        ensure!(!val.is_empty(), "value must not be empty");
        ensure!(
            val.len() <= MAX_VAL_SIZE,
            "value of {} bytes exceeds the {} byte limit",
            val.len(),
            MAX_VAL_SIZE
        );

        self.root = btree::insert(&mut self.pager, self.root, key, val);
        self.pager
            .flush(self.root)
            .wrap_err_with(|| format!("failed to commit set to '{}'", self.path.display()))
    }

    /// Removes `key`, committing before returning. Answers whether a key
    /// was actually removed; keys outside the allowed sizes cannot exist.
    pub fn del(&mut self, key: &[u8]) -> Result<bool> {
        if key.is_empty() || key.len() > MAX_KEY_SIZE {
            return Ok(false);
        }

        let removed = btree::remove(&mut self.pager, self.root, key);
        if let Some(root) = removed {
            self.root = root;
        }
        self.pager
            .flush(self.root)
            .wrap_err_with(|| format!("failed to commit del to '{}'", self.path.display()))?;
        Ok(removed.is_some())
    }
}
