//! # FernDB - Embedded Ordered Key-Value Store
//!
//! FernDB is a persistent dictionary built on a copy-on-write B+tree whose
//! nodes are fixed-size pages in a memory-mapped file. It prioritizes:
//!
//! - **Durability without a log**: every mutation rebuilds its root-to-leaf
//!   path into fresh pages and commits by rewriting one 32-byte master
//!   record between two fsyncs
//! - **A small surface**: point `get`, `set`, `del` over byte keys and
//!   values
//! - **Simple recovery**: opening a file is reading one page and
//!   validating it
//!
//! ## Quick Start
//!
//! ```ignore
//! use ferndb::Kv;
//!
//! let mut kv = Kv::open("./my.db")?;
//! kv.set(b"language", b"rust")?;
//! assert_eq!(kv.get(b"language"), Some(b"rust".to_vec()));
//! kv.del(b"language")?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │          Public API (Kv)            │
//! ├─────────────────────────────────────┤
//! │   B+Tree (copy-on-write, split 3,   │
//! │        merge, root collapse)        │
//! ├─────────────────────────────────────┤
//! │      Node Codec (page layout)       │
//! ├─────────────────────────────────────┤
//! │  Page Manager (mmap chunks, staging │
//! │     buffer, master-page commit)     │
//! └─────────────────────────────────────┘
//! ```
//!
//! The tree talks to its pages through the
//! [`PageStore`](btree::PageStore) capability: fetch by id, register under
//! a fresh id, retire. The mmap-backed [`Pager`](storage::Pager) and the
//! in-memory [`MemPageStore`](storage::MemPageStore) both implement it.
//!
//! ## Limits
//!
//! Keys up to 1000 bytes, values up to 3000 bytes, both non-empty; the
//! bounds guarantee any single pair fits one 4 KiB page. One writer at a
//! time; the store does not synchronize internally.
//!
//! ## Module Overview
//!
//! - [`btree`]: node codec and copy-on-write tree algorithms
//! - [`storage`]: mmap pager, master page, in-memory store, blob helpers
//! - [`db`]: the `Kv` facade
//! - [`cli`]: interactive REPL used by the `ferndb` binary
//! - [`config`]: page geometry and size-limit constants

pub mod btree;
pub mod cli;
pub mod config;
pub mod db;
pub mod storage;

pub use db::Kv;
