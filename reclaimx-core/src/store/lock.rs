//! Per-table lock domains.
//!
//! Lock strategy:
//! - An in-process `RwLock` per table, shared by every store opened on the
//!   same canonical path.
//! - An advisory OS file lock (flock) on a sidecar `.<table>.lock` file so
//!   separate processes serialize too. Writers take it exclusive, readers
//!   shared.
//!
//! The in-process lock is always taken first. flock locks belong to the open
//! file description, so two handles in one process would not exclude each
//! other without it.

use crate::error::Result;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

#[cfg(unix)]
use std::os::fd::AsRawFd;

fn registry() -> &'static Mutex<HashMap<PathBuf, Arc<RwLock<()>>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Lock domain for one table file.
#[derive(Debug)]
pub(crate) struct TableLock {
    local: Arc<RwLock<()>>,
    sidecar: PathBuf,
}

/// Held while reading; other readers may hold one concurrently.
pub(crate) struct ReadGuard<'a> {
    _file: FileLock,
    _local: RwLockReadGuard<'a, ()>,
}

/// Held while writing; excludes every other reader and writer.
pub(crate) struct WriteGuard<'a> {
    _file: FileLock,
    _local: RwLockWriteGuard<'a, ()>,
}

impl TableLock {
    /// Returns the lock domain for `table_path`, which must be canonical.
    pub(crate) fn for_table(table_path: &Path) -> Self {
        let local = registry()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table_path.to_path_buf())
            .or_default()
            .clone();

        Self {
            local,
            sidecar: sidecar_path(table_path),
        }
    }

    pub(crate) fn read(&self) -> Result<ReadGuard<'_>> {
        let local = self.local.read().unwrap_or_else(PoisonError::into_inner);
        let file = FileLock::acquire(&self.sidecar, LockMode::Shared)?;
        Ok(ReadGuard {
            _file: file,
            _local: local,
        })
    }

    pub(crate) fn write(&self) -> Result<WriteGuard<'_>> {
        let local = self.local.write().unwrap_or_else(PoisonError::into_inner);
        let file = FileLock::acquire(&self.sidecar, LockMode::Exclusive)?;
        Ok(WriteGuard {
            _file: file,
            _local: local,
        })
    }
}

fn sidecar_path(table_path: &Path) -> PathBuf {
    let name = table_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    table_path.with_file_name(format!(".{name}.lock"))
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// OS-level lock on the sidecar file. The file itself is never removed:
/// unlinking a lock file another process is waiting on splits the domain.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path, mode: LockMode) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        lock_file(&file, mode)?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = unlock_file(&self.file);
    }
}

#[cfg(unix)]
fn lock_file(file: &File, mode: LockMode) -> io::Result<()> {
    const LOCK_SH: i32 = 1;
    const LOCK_EX: i32 = 2;
    let operation = match mode {
        LockMode::Shared => LOCK_SH,
        LockMode::Exclusive => LOCK_EX,
    };
    let fd = file.as_raw_fd();
    loop {
        // SAFETY: flock is called with a valid file descriptor and constant flags.
        let rc = unsafe { flock(fd, operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> io::Result<()> {
    const LOCK_UN: i32 = 8;
    let fd = file.as_raw_fd();
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(fd, LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

// Without flock only the in-process lock applies.
#[cfg(not(unix))]
fn lock_file(_file: &File, _mode: LockMode) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock_file(_file: &File) -> io::Result<()> {
    Ok(())
}
