//! # B+Tree
//!
//! The ordered heart of the store: a copy-on-write B+tree over fixed-size
//! pages.
//!
//! ## Layering
//!
//! - [`node`]: the page-layout codec. A [`BNode`] is one tree node encoded
//!   in a page buffer: 4-byte header, child pointer array, offset table,
//!   then length-prefixed key-value pairs. Pure bytes, no I/O.
//! - [`tree`]: the algorithms. Lookup descends by largest-key-`<=`;
//!   insert rebuilds the path to the touched leaf and splits oversized
//!   nodes into up to three pages; delete merges undersized children back
//!   into their siblings. All of it runs against the [`PageStore`]
//!   capability, so the same code serves the mmap-backed pager and the
//!   in-memory store.
//!
//! ## Why copy-on-write
//!
//! Every parent-to-child reference is a page id, never a live pointer, and
//! a mutation allocates new pages for the whole root-to-leaf path. The old
//! tree remains intact until the master page stops referencing it, which
//! is what makes the pager's two-fsync commit sequence crash-safe without
//! a write-ahead log.

pub mod node;
pub mod tree;

pub use node::{BNode, NodeType};
pub use tree::{insert, lookup, remove, PageStore};
