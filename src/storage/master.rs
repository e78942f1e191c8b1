//! # Master Page
//!
//! Page 0 of a store file is the master page: the single durable commit
//! record. It names the current root and the number of used pages, and its
//! in-place rewrite is the linearization point of every mutation.
//!
//! ## Layout
//!
//! ```text
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 16   | ASCII signature                        |
//! | 16     | 8    | root page id (LE)                      |
//! | 24     | 8    | used page count incl. master (LE)      |
//! | 32     | ...  | zero-filled to the end of the page     |
//! ```
//!
//! ## Validation
//!
//! Loading refuses a file whose signature does not match, whose used-page
//! count falls outside `1..=file_pages`, or whose root is not below the
//! used count. A failed load means the file is not ours or the master was
//! torn, and the caller must not write to it.

use eyre::{ensure, Result};
use zerocopy::little_endian::U64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Signature identifying a store file; the first 16 bytes of page 0.
pub const FILE_SIG: &[u8; 16] = b"BuildYourOwnDB05";

/// Encoded size of the master record. The rest of page 0 is reserved and
/// zero. A write of this size, aligned at offset 0, is assumed atomic at
/// the device level.
pub const MASTER_SIZE: usize = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MasterPage {
    sig: [u8; 16],
    root: U64,
    used: U64,
}

const _: () = assert!(std::mem::size_of::<MasterPage>() == MASTER_SIZE);

impl MasterPage {
    pub fn new(root: u64, used: u64) -> Self {
        MasterPage {
            sig: *FILE_SIG,
            root: U64::new(root),
            used: U64::new(used),
        }
    }

    /// Parses and validates the master record against the actual number of
    /// pages in the file.
    pub fn load(bytes: &[u8], file_pages: u64) -> Result<&Self> {
        ensure!(
            bytes.len() >= MASTER_SIZE,
            "buffer too small for master page: {} < {}",
            bytes.len(),
            MASTER_SIZE
        );

        let master = Self::ref_from_bytes(&bytes[..MASTER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse master page: {:?}", e))?;

        ensure!(&master.sig == FILE_SIG, "bad signature");

        let used = master.used.get();
        ensure!(
            1 <= used && used <= file_pages,
            "bad master page: used count {} outside 1..={}",
            used,
            file_pages
        );
        ensure!(
            master.root.get() < used,
            "bad master page: root {} not below used count {}",
            master.root.get(),
            used
        );

        Ok(master)
    }

    pub fn root(&self) -> u64 {
        self.root.get()
    }

    pub fn used(&self) -> u64 {
        self.used.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_load() {
        let master = MasterPage::new(3, 7);
        let bytes = master.as_bytes();
        assert_eq!(bytes.len(), MASTER_SIZE);
        assert_eq!(&bytes[..16], FILE_SIG);

        let loaded = MasterPage::load(bytes, 8).unwrap();
        assert_eq!(loaded.root(), 3);
        assert_eq!(loaded.used(), 7);
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let master = MasterPage::new(1, 2);
        let mut bytes = master.as_bytes().to_vec();
        bytes[0] ^= 0xff;

        let err = MasterPage::load(&bytes, 4).unwrap_err();
        assert!(err.to_string().contains("bad signature"));
    }

    #[test]
    fn used_count_must_cover_the_master_slot() {
        let master = MasterPage::new(0, 0);
        let err = MasterPage::load(master.as_bytes(), 4).unwrap_err();
        assert!(err.to_string().contains("used count"));
    }

    #[test]
    fn used_count_must_fit_the_file() {
        let master = MasterPage::new(1, 9);
        let err = MasterPage::load(master.as_bytes(), 4).unwrap_err();
        assert!(err.to_string().contains("used count"));
    }

    #[test]
    fn root_must_be_below_used() {
        let master = MasterPage::new(5, 5);
        let err = MasterPage::load(master.as_bytes(), 8).unwrap_err();
        assert!(err.to_string().contains("not below"));
    }
}
