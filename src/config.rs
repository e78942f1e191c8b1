//! # FernDB Configuration Constants
//!
//! Page geometry and size limits, centralized so interdependent values live
//! next to the compile-time assertions that keep them honest.
//!
//! ## Relationships
//!
//! ```text
//! PAGE_SIZE (4096 bytes)
//!       │
//!       ├─> HEADER_SIZE (4 bytes: node type + key count)
//!       │
//!       ├─> MAX_KEY_SIZE / MAX_VAL_SIZE
//!       │     Sized so one maximal key-value pair, plus its child pointer,
//!       │     offset slot and length prefixes, always fits a single page.
//!       │
//!       └─> INITIAL_MMAP_SIZE (must be a multiple of PAGE_SIZE)
//! ```
//!
//! A node being rebuilt during an insert may temporarily occupy up to
//! `2 * PAGE_SIZE` before it is cut down by a split, so the per-pair offset
//! arithmetic must stay representable in `u16` over a double page.

/// Size of one on-disk page. Every persisted B+tree node occupies exactly
/// one page; page ids are zero-based page indexes within the file.
pub const PAGE_SIZE: usize = 4096;

/// Size of the node header: 2 bytes of node type, 2 bytes of key count.
pub const HEADER_SIZE: usize = 4;

/// Maximum length of a key, in bytes.
pub const MAX_KEY_SIZE: usize = 1000;

/// Maximum length of a value, in bytes.
pub const MAX_VAL_SIZE: usize = 3000;

/// Size of the initial memory mapping (64 MiB). The mapping is extended by
/// doubling whenever the file outgrows it, so most stores never remap.
pub const INITIAL_MMAP_SIZE: usize = 64 << 20;

const _: () = assert!(
    HEADER_SIZE + 8 + 2 + 4 + MAX_KEY_SIZE + MAX_VAL_SIZE <= PAGE_SIZE,
    "one maximal key-value pair must fit in a single page"
);

const _: () = assert!(
    2 * PAGE_SIZE <= u16::MAX as usize + 1,
    "offsets within a transient double page must fit in u16"
);

const _: () = assert!(
    INITIAL_MMAP_SIZE % PAGE_SIZE == 0,
    "the initial mapping must cover a whole number of pages"
);
