//! Engine Module
//!
//! The core storage engine: a fixed-size memory-mapped region, an append
//! cursor, and the offset index, all behind one exclusive lock.
//!
//! ## Responsibilities
//! - Map the backing file and rebuild the index on open
//! - SET / GET / DEL / EXPIRE with per-key TTLs
//! - Lazy expiration: expired keys are evicted when next read
//! - Capacity enforcement against the fixed region size
//!
//! Every operation validates its input, then takes the lock for the rest of
//! its work, so callers observe each operation as atomic. GET holds the same
//! exclusive lock as the writers because evicting an expired key mutates the
//! index.

use std::fs::OpenOptions;
use std::path::Path;

use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;

use crate::error::{KvError, Result};
use crate::store::{self, now_ms, FILE_SIZE};
use crate::store::Index;

/// The mapped region, cursor, and index; everything the lock guards.
struct State {
    map: MmapMut,
    index: Index,
    write_offset: usize,
}

/// Append-only key-value engine over a memory-mapped file
pub struct Engine {
    state: Mutex<State>,
}

impl Engine {
    /// Open the store at `path`, creating the file if absent, and rebuild
    /// the index from its contents.
    ///
    /// The file is grown to `FILE_SIZE` bytes if shorter; the first
    /// `FILE_SIZE` bytes are mapped read-write and the mapping never grows.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        if file.metadata()?.len() < FILE_SIZE as u64 {
            file.set_len(FILE_SIZE as u64)?;
        }

        // Safety: the engine is the only writer to this file, and the
        // mapping is sized within the file's length set above.
        let map = unsafe { MmapOptions::new().len(FILE_SIZE).map_mut(&file)? };

        let scan = store::scan(&map);
        tracing::debug!(
            path = %path.display(),
            live_keys = scan.index.len(),
            records_scanned = scan.records_scanned,
            records_expired = scan.records_expired,
            write_offset = scan.write_offset,
            "store opened"
        );

        Ok(Self {
            state: Mutex::new(State {
                map,
                index: scan.index,
                write_offset: scan.write_offset,
            }),
        })
    }

    /// Set `key` to `value`.
    ///
    /// A positive `ttl_ms` sets an absolute expiry that far in the future;
    /// zero or negative means the key never expires. Overwriting appends a
    /// new record and repoints the index; the old record stays on disk
    /// unreferenced.
    pub fn set(&self, key: &str, value: &str, ttl_ms: i64) -> Result<()> {
        check_key(key)?;
        let expire_ts = if ttl_ms > 0 { now_ms() + ttl_ms } else { 0 };

        let mut state = self.state.lock();
        let at = state.write_offset;
        let next = append(&mut state, key, value, expire_ts)?;
        state.index.put(key.to_owned(), at);
        state.write_offset = next;
        Ok(())
    }

    /// Look up `key`. Returns `None` for missing or expired keys; an
    /// expired key is evicted from the index on the way out.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;

        let mut state = self.state.lock();
        let at = match state.index.get(key) {
            Some(at) => at,
            None => return Ok(None),
        };
        let (value, expire_ts) = read_indexed(&state.map, at)?;

        if expire_ts != 0 && expire_ts < now_ms() {
            state.index.remove(key);
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Remove `key` from the index. Returns whether it was present.
    /// The record's bytes stay on disk untouched.
    pub fn del(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        Ok(self.state.lock().index.remove(key))
    }

    /// Re-time `key`: append a fresh record carrying its current value and
    /// a new expiry, and repoint the index.
    ///
    /// `ttl_ms` of zero clears the expiry; negative is rejected. Returns
    /// `false` without side effects when the key is not indexed.
    pub fn expire(&self, key: &str, ttl_ms: i64) -> Result<bool> {
        check_key(key)?;
        if ttl_ms < 0 {
            return Err(KvError::NegativeTtl(ttl_ms));
        }

        let mut state = self.state.lock();
        let at = match state.index.get(key) {
            Some(at) => at,
            None => return Ok(false),
        };
        let (value, _) = read_indexed(&state.map, at)?;
        let expire_ts = if ttl_ms > 0 { now_ms() + ttl_ms } else { 0 };

        let new_at = state.write_offset;
        let next = append(&mut state, key, &value, expire_ts)?;
        state.index.put(key.to_owned(), new_at);
        state.write_offset = next;
        Ok(true)
    }
}

/// Encode a record at the cursor after checking capacity. Returns the new
/// cursor without advancing it; the caller commits cursor and index
/// together.
fn append(state: &mut State, key: &str, value: &str, expire_ts: i64) -> Result<usize> {
    let needed = store::encoded_len(key, value);
    let remaining = FILE_SIZE - state.write_offset;
    if needed > remaining {
        return Err(KvError::StoreFull { needed, remaining });
    }
    Ok(store::encode(
        &mut state.map,
        state.write_offset,
        key,
        value,
        expire_ts,
    ))
}

/// Read value and expiry at an offset the index vouches for.
fn read_indexed(map: &MmapMut, at: usize) -> Result<(String, i64)> {
    store::peek_value(map, at).ok_or_else(|| KvError::Corruption {
        offset: at,
        reason: "indexed record does not parse".to_string(),
    })
}

/// Reject blank keys: empty or whitespace-only.
fn check_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(KvError::BlankKey);
    }
    Ok(())
}
