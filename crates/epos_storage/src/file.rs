//! File-based storage backend for persistent storage.
//!
//! A database lives in one directory:
//!
//! ```text
//! <dir>/
//! ├─ LOCK        # Advisory lock, held while the backend is open
//! └─ data.log    # Append-only log of framed records
//! ```
//!
//! Every `put` and `delete` appends a frame (see the `log` module). On open
//! the log is replayed front to back into an in-memory index of live
//! records, so reads cost one positioned read each.
//!
//! Replay keeps a record whose payload fails its checksum in the index;
//! reading it reports corruption for that record alone. Only damage that
//! hides where the next frame starts, with intact frames after it, fails
//! the open.

use crate::backend::{BackendKind, RecordIds, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::log::{encode_frame, next_frame_after, read_frame, Frame, FrameKind, ReadFrame};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "data.log";
const COMPACT_TEMP: &str = "data.log.compact";

/// Options for [`FileBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Fsync after every appended frame.
    ///
    /// When false, writes reach the OS immediately but only `flush` and
    /// `close` force them to disk.
    pub sync_writes: bool,
}

impl FileOptions {
    /// Sets whether every write is synced to disk.
    #[must_use]
    pub const fn sync_writes(mut self, enabled: bool) -> Self {
        self.sync_writes = enabled;
        self
    }
}

/// Location of a live record's frame in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    offset: u64,
    len: usize,
}

#[derive(Debug, Default)]
struct LogCollection {
    live: BTreeMap<u64, Slot>,
    high_water: u64,
}

impl LogCollection {
    fn apply(&mut self, frame: &Frame<'_>, slot: Slot) {
        self.high_water = self.high_water.max(frame.id);
        match frame.kind {
            FrameKind::Put => {
                self.live.insert(frame.id, slot);
            }
            FrameKind::Delete => {
                self.live.remove(&frame.id);
            }
            FrameKind::Watermark => {}
        }
    }
}

#[derive(Debug)]
struct LogState {
    lock: File,
    log: Mutex<File>,
    size: u64,
    index: HashMap<String, LogCollection>,
}

impl LogState {
    fn append(&mut self, frame: &[u8], sync: bool) -> StorageResult<Slot> {
        let log = self.log.get_mut();
        let offset = log.seek(SeekFrom::End(0))?;
        if let Err(e) = log.write_all(frame) {
            // Drop the partial frame so the log stays replayable.
            let _ = log.set_len(offset);
            return Err(e.into());
        }
        if sync {
            log.sync_data()?;
        }
        self.size = offset + frame.len() as u64;
        Ok(Slot {
            offset,
            len: frame.len(),
        })
    }

    fn read_slot(&self, slot: Slot) -> StorageResult<Vec<u8>> {
        let mut buf = vec![0u8; slot.len];
        let mut log = self.log.lock();
        log.seek(SeekFrom::Start(slot.offset))?;
        log.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn is_live(&self, collection: &str, id: u64) -> bool {
        self.index
            .get(collection)
            .is_some_and(|c| c.live.contains_key(&id))
    }

    fn record_count(&self) -> usize {
        self.index.values().map(|c| c.live.len()).sum()
    }
}

/// A durable storage backend backed by an append-only log file.
///
/// # Durability
///
/// - every write is appended to `data.log` before the call returns
/// - `flush()` calls `File::sync_all()`; after it returns, accepted writes
///   survive a reopen
/// - a frame torn by a crash at the end of the log is dropped on reopen
/// - a record with a damaged payload stays addressable and reads back as
///   corruption
/// - a damaged frame header followed by intact frames fails the open
///
/// # Thread Safety
///
/// Writes take an exclusive lock on the index; reads share it. The
/// directory's `LOCK` file keeps other handles, in this process or
/// another, from opening the same database.
///
/// # Example
///
/// ```no_run
/// use epos_storage::{FileBackend, FileOptions, StorageBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("my_db.epos"), FileOptions::default()).unwrap();
/// backend.put("users", 1, b"persistent data").unwrap();
/// backend.flush().unwrap(); // Ensure data is durable
/// ```
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    options: FileOptions,
    state: RwLock<Option<LogState>>,
}

impl FileBackend {
    /// Opens or creates a database directory and replays its log.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory cannot be created or the log cannot be opened
    /// - another handle holds the lock ([`StorageError::Locked`])
    /// - a frame header before the end of the log is damaged
    pub fn open(dir: &Path, options: FileOptions) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: dir.to_path_buf(),
            });
        }

        let mut log = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOG_FILE))?;
        let mut data = Vec::new();
        log.read_to_end(&mut data)?;

        let (index, valid_len) = replay(&data)?;
        if valid_len < data.len() as u64 {
            warn!(
                path = %dir.display(),
                valid_len,
                dropped = data.len() as u64 - valid_len,
                "truncating torn frame at end of log"
            );
            log.set_len(valid_len)?;
            log.sync_all()?;
        }

        let state = LogState {
            lock,
            log: Mutex::new(log),
            size: valid_len,
            index,
        };
        info!(
            path = %dir.display(),
            collections = state.index.len(),
            records = state.record_count(),
            log_bytes = valid_len,
            "replayed record log"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            options,
            state: RwLock::new(Some(state)),
        })
    }

    /// Returns the database directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] if the backend is closed.
    pub fn log_size(&self) -> StorageResult<u64> {
        self.state
            .read()
            .as_ref()
            .map(|s| s.size)
            .ok_or(StorageError::Closed)
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}

/// Rebuilds the index from raw log bytes.
///
/// Returns the index and the length of the log prefix worth keeping. A
/// torn final frame is outside that prefix.
fn replay(data: &[u8]) -> StorageResult<(HashMap<String, LogCollection>, u64)> {
    let mut index: HashMap<String, LogCollection> = HashMap::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let offset = pos as u64;
        let (frame, len) = match read_frame(&data[pos..], offset)? {
            ReadFrame::Complete(frame, len) => (frame, len),
            ReadFrame::DamagedPayload {
                frame,
                len,
                stored,
                computed,
            } => {
                warn!(
                    offset,
                    collection = frame.collection,
                    id = frame.id,
                    stored,
                    computed,
                    "record payload failed its checksum"
                );
                (frame, len)
            }
            ReadFrame::Truncated => break,
            ReadFrame::BadHeader => {
                if let Some(next) = next_frame_after(data, pos) {
                    return Err(StorageError::corrupted(
                        offset,
                        format!("damaged frame header, intact frames resume at offset {next}"),
                    ));
                }
                break;
            }
        };

        let slot = Slot { offset, len };
        match index.get_mut(frame.collection) {
            Some(collection) => collection.apply(&frame, slot),
            None => index
                .entry(frame.collection.to_string())
                .or_default()
                .apply(&frame, slot),
        }
        pos += len;
    }
    Ok((index, pos as u64))
}

impl StorageBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Durable
    }

    fn put(&self, collection: &str, id: u64, record: &[u8]) -> StorageResult<()> {
        let frame = encode_frame(FrameKind::Put, collection, id, record)?;
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(StorageError::Closed)?;
        let slot = state.append(&frame, self.options.sync_writes)?;
        state
            .index
            .entry(collection.to_string())
            .or_default()
            .apply(
                &Frame {
                    kind: FrameKind::Put,
                    collection,
                    id,
                    payload: record,
                },
                slot,
            );
        Ok(())
    }

    fn get(&self, collection: &str, id: u64) -> StorageResult<Option<Vec<u8>>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        let Some(slot) = state
            .index
            .get(collection)
            .and_then(|c| c.live.get(&id))
            .copied()
        else {
            return Ok(None);
        };

        let bytes = state.read_slot(slot)?;
        match read_frame(&bytes, slot.offset)? {
            ReadFrame::Complete(frame, _)
                if frame.kind == FrameKind::Put
                    && frame.id == id
                    && frame.collection == collection =>
            {
                Ok(Some(frame.payload.to_vec()))
            }
            ReadFrame::Complete(..) => Err(StorageError::corrupted(
                slot.offset,
                format!("frame does not hold record {id} of {collection:?}"),
            )),
            ReadFrame::DamagedPayload {
                stored, computed, ..
            } => Err(StorageError::ChecksumMismatch {
                offset: slot.offset,
                stored,
                computed,
            }),
            ReadFrame::Truncated | ReadFrame::BadHeader => {
                Err(StorageError::corrupted(slot.offset, "record frame unreadable"))
            }
        }
    }

    fn contains(&self, collection: &str, id: u64) -> StorageResult<bool> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        Ok(state.is_live(collection, id))
    }

    fn delete(&self, collection: &str, id: u64) -> StorageResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(StorageError::Closed)?;
        if !state.is_live(collection, id) {
            return Err(StorageError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }

        let frame = encode_frame(FrameKind::Delete, collection, id, &[])?;
        state.append(&frame, self.options.sync_writes)?;
        if let Some(c) = state.index.get_mut(collection) {
            c.live.remove(&id);
        }
        Ok(())
    }

    fn ids(&self, collection: &str) -> StorageResult<RecordIds> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        Ok(state.index.get(collection).map_or_else(RecordIds::empty, |c| {
            RecordIds::new(c.live.keys().copied().collect())
        }))
    }

    fn high_water_mark(&self, collection: &str) -> Option<u64> {
        self.state
            .read()
            .as_ref()?
            .index
            .get(collection)
            .map(|c| c.high_water)
            .filter(|&hw| hw > 0)
    }

    fn collections(&self) -> StorageResult<Vec<String>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        let mut names: Vec<String> = state.index.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn flush(&self) -> StorageResult<()> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(StorageError::Closed)?;
        state.log.lock().sync_all()?;
        Ok(())
    }

    fn compact(&self) -> StorageResult<()> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(StorageError::Closed)?;
        let before = state.size;

        let temp_path = self.dir.join(COMPACT_TEMP);
        let mut temp = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        let mut names: Vec<&String> = state.index.keys().collect();
        names.sort();

        let mut size = 0u64;
        let mut index: HashMap<String, LogCollection> = HashMap::with_capacity(names.len());
        for name in names {
            let old = &state.index[name];
            let mut fresh = LogCollection {
                live: BTreeMap::new(),
                high_water: old.high_water,
            };

            // The watermark keeps deleted ids retired once their frames are gone.
            let mark = encode_frame(FrameKind::Watermark, name, old.high_water, &[])?;
            temp.write_all(&mark)?;
            size += mark.len() as u64;

            for (&id, &slot) in &old.live {
                let bytes = state.read_slot(slot)?;
                temp.write_all(&bytes)?;
                fresh.live.insert(
                    id,
                    Slot {
                        offset: size,
                        len: slot.len,
                    },
                );
                size += slot.len as u64;
            }
            index.insert(name.clone(), fresh);
        }
        temp.sync_all()?;

        if let Err(e) = fs::rename(&temp_path, self.dir.join(LOG_FILE)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        // The renamed handle is the log from here on, even if the directory
        // sync below fails.
        state.log = Mutex::new(temp);
        state.size = size;
        state.index = index;
        self.sync_directory()?;

        info!(
            path = %self.dir.display(),
            before_bytes = before,
            after_bytes = size,
            "compacted record log"
        );
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        let Some(state) = self.state.write().take() else {
            return Ok(());
        };
        let result = state.log.into_inner().sync_all();
        let _ = FileExt::unlock(&state.lock);
        debug!(path = %self.dir.display(), "closed record log");
        result.map_err(StorageError::from)
    }

    fn destroy(&self) -> StorageResult<()> {
        drop(self.state.write().take());
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
