//! # Storage Layer
//!
//! Everything that puts tree nodes on disk and gets them back:
//!
//! - [`Pager`]: the memory-mapped page manager. Implements the tree's
//!   [`PageStore`](crate::btree::PageStore) capability over a single store
//!   file and owns the commit sequence that makes mutations durable.
//! - [`MasterPage`]: the 32-byte commit record in page 0. Its rewrite is
//!   the linearization point of a mutation; its validation is what stands
//!   between a torn file and a corrupted tree.
//! - [`MemPageStore`]: the same capability backed by a hash map, for
//!   ephemeral stores and for tests that want a strict copy-on-write
//!   referee.
//! - blob helpers: one-shot atomic/durable whole-file saves, independent
//!   of the page store.
//!
//! ## File format
//!
//! A store is one file whose size is a multiple of the page size. Page 0
//! holds the master record; pages 1.. hold B+tree nodes. Pages past the
//! master's used count are zero or stale and are ignored on recovery.
//!
//! ## Crash safety
//!
//! The pager never overwrites a committed node (the tree is copy-on-write
//! down to page granularity), and it syncs data pages before the master
//! page references them. Whatever the crash point, the file the next open
//! sees contains a fully intact tree: either the old root or the new one.

mod blob;
mod master;
mod mem;
mod pager;

pub use blob::{append_durable, save_data, save_data_atomic, save_data_durable};
pub use master::{MasterPage, FILE_SIG, MASTER_SIZE};
pub use mem::MemPageStore;
pub use pager::Pager;
