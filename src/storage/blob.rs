//! Whole-file save helpers.
//!
//! Small standalone utilities for persisting a single blob, in increasing
//! order of durability. They are independent of the page store and useful
//! for sidecar state (exports, config snapshots):
//!
//! * [`save_data`] — truncate and write in place. A crash mid-write leaves
//!   a half-written file.
//! * [`save_data_atomic`] — write a temp file, then rename over the
//!   target. Readers see either the old or the new content, never a mix,
//!   but the new content may not have reached the disk yet.
//! * [`save_data_durable`] — like the atomic variant, with an fsync of the
//!   temp file before the rename, so the content survives power loss.
//! * [`append_durable`] — append to an open log file and fsync.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use eyre::{Result, WrapErr};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".tmp.{}.{}", process::id(), n));
    name.into()
}

/// Overwrites `path` with `data` in place.
pub fn save_data<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .wrap_err_with(|| format!("failed to open '{}'", path.display()))?;
    file.write_all(data)
        .wrap_err_with(|| format!("failed to write '{}'", path.display()))
}

/// Replaces `path` with `data` via a temp file and rename, so a reader
/// never observes a partial write.
pub fn save_data_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .wrap_err_with(|| format!("failed to open '{}'", tmp.display()))?;
        file.write_all(data)
            .wrap_err_with(|| format!("failed to write '{}'", tmp.display()))?;
        fs::rename(&tmp, path)
            .wrap_err_with(|| format!("failed to rename into '{}'", path.display()))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Like [`save_data_atomic`], but fsyncs the temp file before the rename
/// so the new content is durable once this returns.
pub fn save_data_durable<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .wrap_err_with(|| format!("failed to open '{}'", tmp.display()))?;
        file.write_all(data)
            .wrap_err_with(|| format!("failed to write '{}'", tmp.display()))?;
        file.sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", tmp.display()))?;
        fs::rename(&tmp, path)
            .wrap_err_with(|| format!("failed to rename into '{}'", path.display()))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Appends `data` to an open log file and fsyncs.
pub fn append_durable(file: &mut File, data: &[u8]) -> Result<()> {
    file.write_all(data).wrap_err("failed to append")?;
    file.sync_all().wrap_err("failed to sync after append")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_overwrites_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob");

        save_data(&path, b"first version, rather long").unwrap();
        save_data(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn atomic_save_replaces_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob");

        save_data_atomic(&path, b"old").unwrap();
        save_data_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec!["blob"]);
    }

    #[test]
    fn durable_save_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob");

        save_data_durable(&path, b"durable bytes").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"durable bytes");
    }

    #[test]
    fn append_accumulates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .unwrap();

        append_durable(&mut file, b"one\n").unwrap();
        append_durable(&mut file, b"two\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"one\ntwo\n");
    }
}
