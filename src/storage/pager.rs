//! # Memory-Mapped Page Manager
//!
//! `Pager` backs the tree's [`PageStore`] capability with a single store
//! file. Committed pages are read through a memory mapping; freshly built
//! pages sit in a staging buffer until [`flush`](Pager::flush) writes them
//! out and republishes the master page.
//!
//! ## Mapping strategy
//!
//! The file is mapped up front with a generous window (64 MiB) so the
//! common case never remaps. When the file outgrows the window, a new
//! chunk of the current total size is mapped at the old-total offset and
//! the total doubles, repeating until the window covers the file. The
//! mapping is therefore a list of chunks that need not be contiguous in
//! the address space, and a page id is resolved by walking the list.
//! Established chunks are never moved or unmapped mid-run, so page reads
//! stay valid across growth.
//!
//! ## Commit sequence
//!
//! ```text
//! extend file (geometric) -> extend mapping -> copy staged pages
//!   -> sync -> rewrite master page (positional write) -> sync
//! ```
//!
//! Data pages are durable before the master page can reference them, so a
//! crash before the master rewrite leaves the previous root fully intact;
//! the new pages are simply unreferenced garbage. The master rewrite is a
//! single 32-byte aligned positional write through the file descriptor,
//! never through the mapping, and is assumed atomic at the device level.
//! Media without sector-atomicity guarantees would want a double-buffered
//! master on top of this.
//!
//! ## Page ids
//!
//! `create` hands out `flushed + staged` ids: monotonically increasing,
//! contiguous, never reused within a run. `retire` records intent only;
//! retired pages are not reclaimed and the file grows monotonically. A
//! free list is the natural follow-up here.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::{MmapMut, MmapOptions};
use zerocopy::IntoBytes;

use super::master::{MasterPage, MASTER_SIZE};
use crate::btree::{BNode, PageStore};
use crate::config::{INITIAL_MMAP_SIZE, PAGE_SIZE};

#[derive(Debug)]
pub struct Pager {
    file: File,
    /// Current file size in bytes; may exceed `flushed * PAGE_SIZE`.
    file_size: u64,
    /// Total bytes covered by `chunks`; may exceed the file size.
    mmap_total: usize,
    chunks: Vec<MmapMut>,
    /// Pages durably written, including the master slot.
    flushed: u64,
    /// Newly built pages awaiting the next flush.
    staged: Vec<BNode>,
}

impl Pager {
    /// Opens or creates the store file and loads the master page.
    /// Returns the pager and the committed root id (0 for a fresh file).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, u64)> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open store file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "store file '{}' size {} is not a multiple of page size {}",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        let mut mmap_total = INITIAL_MMAP_SIZE;
        while (mmap_total as u64) < file_size {
            mmap_total *= 2;
        }

        // SAFETY: mapping a file we hold open read-write. This is sound
        // because:
        // 1. Store files are single-writer by contract; no other process
        //    mutates them while we hold the handle.
        // 2. The window may extend past the end of the file, but reads go
        //    through `page()` which only touches flushed pages, all of
        //    which lie within the file.
        // 3. The chunk's lifetime is tied to the Pager, which outlives
        //    every `BNode` copied out of it.
        let chunk = unsafe {
            MmapOptions::new()
                .len(mmap_total)
                .map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let mut pager = Pager {
            file,
            file_size,
            mmap_total,
            chunks: vec![chunk],
            flushed: 1, // page 0 is reserved for the master page
            staged: Vec::new(),
        };

        let root = if file_size == 0 {
            // Fresh file: the master page is created by the first flush.
            0
        } else {
            let master = MasterPage::load(
                &pager.chunks[0][..MASTER_SIZE],
                file_size / PAGE_SIZE as u64,
            )
            .wrap_err_with(|| format!("failed to load master page of '{}'", path.display()))?;
            pager.flushed = master.used();
            master.root()
        };

        Ok((pager, root))
    }

    /// Pages durably on disk, including the master slot.
    pub fn flushed_pages(&self) -> u64 {
        self.flushed
    }

    /// Pages staged for the next flush.
    pub fn staged_pages(&self) -> usize {
        self.staged.len()
    }

    /// Commits every staged page, then republishes the master page naming
    /// `root` as the tree root. On return the staged state is durable.
    pub fn flush(&mut self, root: u64) -> Result<()> {
        let npages = self.flushed + self.staged.len() as u64;
        self.extend_file(npages)?;
        self.extend_mmap(npages)?;

        for i in 0..self.staged.len() {
            let pid = self.flushed + i as u64;
            let (ci, offset) = self.locate(pid);
            self.chunks[ci][offset..offset + PAGE_SIZE]
                .copy_from_slice(self.staged[i].as_bytes());
        }

        // Data pages must hit the disk before the master references them.
        for chunk in &self.chunks {
            chunk.flush().wrap_err("failed to sync mapped pages")?;
        }
        self.file.sync_all().wrap_err("fsync before master update")?;

        self.flushed = npages;
        self.staged.clear();

        let master = MasterPage::new(root, self.flushed);
        self.file
            .write_all_at(master.as_bytes(), 0)
            .wrap_err("write master page")?;
        self.file.sync_all().wrap_err("fsync after master update")?;

        Ok(())
    }

    /// Grows the file to hold at least `npages`, in exponential steps of
    /// at least 1/8 so updates do not extend the file every time.
    fn extend_file(&mut self, npages: u64) -> Result<()> {
        let mut file_pages = self.file_size / PAGE_SIZE as u64;
        if file_pages >= npages {
            return Ok(());
        }
        while file_pages < npages {
            file_pages += (file_pages / 8).max(1);
        }

        let file_size = file_pages * PAGE_SIZE as u64;
        self.file
            .set_len(file_size)
            .wrap_err_with(|| format!("failed to extend store file to {} bytes", file_size))?;
        self.file_size = file_size;
        Ok(())
    }

    /// Extends the mapping until it covers `npages`, doubling the covered
    /// total with a new chunk mapped at the old-total offset each round.
    fn extend_mmap(&mut self, npages: u64) -> Result<()> {
        while (self.mmap_total as u64) < npages * PAGE_SIZE as u64 {
            // SAFETY: same single-writer reasoning as the initial mapping
            // in `open`; the new chunk covers [total, 2 * total), which
            // the file already spans after `extend_file`.
            let chunk = unsafe {
                MmapOptions::new()
                    .offset(self.mmap_total as u64)
                    .len(self.mmap_total)
                    .map_mut(&self.file)
                    .wrap_err("failed to extend memory mapping")?
            };
            self.mmap_total *= 2;
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Resolves a flushed page id to its chunk index and byte offset.
    fn locate(&self, pid: u64) -> (usize, usize) {
        let mut start = 0u64;
        for (ci, chunk) in self.chunks.iter().enumerate() {
            let end = start + (chunk.len() / PAGE_SIZE) as u64;
            if pid < end {
                return (ci, (pid - start) as usize * PAGE_SIZE);
            }
            start = end;
        }
        panic!("bad page id {pid}");
    }
}

impl PageStore for Pager {
    fn page(&self, pid: u64) -> BNode {
        if pid >= self.flushed {
            // Staged bytes stay valid until the next flush, so ids handed
            // out by `create` are readable immediately.
            let i = (pid - self.flushed) as usize;
            match self.staged.get(i) {
                Some(node) => return node.clone(),
                None => panic!("bad page id {pid}"),
            }
        }
        let (ci, offset) = self.locate(pid);
        BNode::from_bytes(&self.chunks[ci][offset..offset + PAGE_SIZE])
    }

    fn create(&mut self, node: BNode) -> u64 {
        assert!(
            node.as_bytes().len() == PAGE_SIZE,
            "page buffer of {} bytes handed to the pager",
            node.as_bytes().len()
        );
        assert!(
            node.nbytes() <= PAGE_SIZE,
            "node of {} bytes does not fit a page",
            node.nbytes()
        );
        let pid = self.flushed + self.staged.len() as u64;
        self.staged.push(node);
        pid
    }

    fn retire(&mut self, _pid: u64) {
        // Intent only: pages are not reclaimed and the file grows
        // monotonically. A free list would slot in here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::NodeType;
    use tempfile::tempdir;

    fn leaf(key: &[u8], val: &[u8]) -> BNode {
        let mut node = BNode::new(PAGE_SIZE);
        node.set_header(NodeType::Leaf, 1);
        node.append_kv(0, 0, key, val);
        node
    }

    #[test]
    fn fresh_file_reserves_the_master_slot() {
        let dir = tempdir().unwrap();
        let (pager, root) = Pager::open(dir.path().join("store.db")).unwrap();

        assert_eq!(root, 0);
        assert_eq!(pager.flushed_pages(), 1);
        assert_eq!(pager.staged_pages(), 0);
    }

    #[test]
    fn created_ids_are_monotone_and_contiguous() {
        let dir = tempdir().unwrap();
        let (mut pager, _) = Pager::open(dir.path().join("store.db")).unwrap();

        let a = pager.create(leaf(b"a", b"1"));
        let b = pager.create(leaf(b"b", b"2"));
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        pager.flush(a).unwrap();
        let c = pager.create(leaf(b"c", b"3"));
        assert_eq!(c, 3);
    }

    #[test]
    fn staged_pages_are_readable_before_flush() {
        let dir = tempdir().unwrap();
        let (mut pager, _) = Pager::open(dir.path().join("store.db")).unwrap();

        let pid = pager.create(leaf(b"pending", b"yes"));
        let node = pager.page(pid);
        assert_eq!(node.get_key(0), b"pending");
    }

    #[test]
    fn flush_then_reopen_reads_the_same_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let (mut pager, _) = Pager::open(&path).unwrap();
            let a = pager.create(leaf(b"alpha", b"1"));
            let b = pager.create(leaf(b"bravo", b"2"));
            pager.flush(b).unwrap();
            assert_eq!(pager.flushed_pages(), 3);
            assert_eq!(pager.staged_pages(), 0);
            let _ = a;
        }

        let (pager, root) = Pager::open(&path).unwrap();
        assert_eq!(root, 2);
        assert_eq!(pager.flushed_pages(), 3);
        assert_eq!(pager.page(1).get_key(0), b"alpha");
        assert_eq!(pager.page(2).get_key(0), b"bravo");
    }

    #[test]
    fn file_size_stays_page_aligned_and_covers_flushed_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let (mut pager, _) = Pager::open(&path).unwrap();

        for i in 0..20u8 {
            pager.create(leaf(&[b'k', i], b"v"));
        }
        pager.flush(1).unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len % PAGE_SIZE as u64, 0);
        assert!(len >= pager.flushed_pages() * PAGE_SIZE as u64);
    }

    #[test]
    fn repeated_flushes_grow_the_file_geometrically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let (mut pager, _) = Pager::open(&path).unwrap();

        let mut last_len = 0;
        for round in 0..40u8 {
            for i in 0..4u8 {
                pager.create(leaf(&[b'r', round, i], b"v"));
            }
            pager.flush(1).unwrap();
            let len = std::fs::metadata(&path).unwrap().len();
            assert!(len >= last_len, "file must never shrink");
            last_len = len;
        }
        assert!(last_len as usize >= 161 * PAGE_SIZE);
    }

    #[test]
    fn open_rejects_a_torn_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 100]).unwrap();

        let err = Pager::open(&path).unwrap_err();
        assert!(err.to_string().contains("not a multiple"));
    }

    #[test]
    #[should_panic(expected = "bad page id")]
    fn unknown_page_id_panics() {
        let dir = tempdir().unwrap();
        let (pager, _) = Pager::open(dir.path().join("store.db")).unwrap();
        pager.page(5);
    }
}
