//! Index recovery
//!
//! Rebuilds the offset index by scanning the mapped region forward from
//! offset zero at open time.
//!
//! The scan walks complete records until the bytes at the cursor no longer
//! parse (a zeroed region, a record truncated by a crash mid-write, or
//! garbage). That position becomes the write cursor, so the next append
//! overwrites the partial tail. Records whose expiry has already passed are
//! skipped; everything else is indexed in write order, which makes the last
//! write for a key win across restarts.

use super::index::Index;
use super::record;

/// Outcome of an index scan
#[derive(Debug)]
pub struct ScanResult {
    /// Rebuilt key → offset index
    pub index: Index,

    /// Offset just past the last complete record
    pub write_offset: usize,

    /// Number of complete records walked (including dead ones)
    pub records_scanned: usize,

    /// Records skipped because their expiry had already passed
    pub records_expired: usize,
}

/// Scan `buf` from offset zero and rebuild the index.
///
/// Infallible over content: an unparseable tail terminates the scan rather
/// than raising.
pub fn scan(buf: &[u8]) -> ScanResult {
    let now = record::now_ms();

    let mut index = Index::new();
    let mut pos = 0;
    let mut records_scanned = 0;
    let mut records_expired = 0;

    while let Some((rec, next)) = record::decode(buf, pos) {
        records_scanned += 1;
        if rec.expire_ts == 0 || rec.expire_ts > now {
            index.put(rec.key, pos);
        } else {
            records_expired += 1;
        }
        // The cursor advances past dead records too
        pos = next;
    }

    ScanResult {
        index,
        write_offset: pos,
        records_scanned,
        records_expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::{encode, now_ms};

    #[test]
    fn test_scan_empty_region() {
        let buf = vec![0u8; 1024];
        let result = scan(&buf);

        assert!(result.index.is_empty());
        assert_eq!(result.write_offset, 0);
        assert_eq!(result.records_scanned, 0);
    }

    #[test]
    fn test_scan_indexes_records_at_their_offsets() {
        let mut buf = vec![0u8; 1024];
        let first_end = encode(&mut buf, 0, "a", "1", 0);
        let second_end = encode(&mut buf, first_end, "b", "2", 0);

        let result = scan(&buf);

        assert_eq!(result.index.get("a"), Some(0));
        assert_eq!(result.index.get("b"), Some(first_end));
        assert_eq!(result.write_offset, second_end);
        assert_eq!(result.records_scanned, 2);
    }

    #[test]
    fn test_scan_last_write_wins() {
        let mut buf = vec![0u8; 1024];
        let mid = encode(&mut buf, 0, "k", "old", 0);
        let end = encode(&mut buf, mid, "k", "new", 0);

        let result = scan(&buf);

        assert_eq!(result.index.get("k"), Some(mid));
        assert_eq!(result.index.len(), 1);
        assert_eq!(result.write_offset, end);
    }

    #[test]
    fn test_scan_skips_expired_records() {
        let mut buf = vec![0u8; 1024];
        let mid = encode(&mut buf, 0, "dead", "x", now_ms() - 1000);
        let end = encode(&mut buf, mid, "live", "y", now_ms() + 60_000);

        let result = scan(&buf);

        assert_eq!(result.index.get("dead"), None);
        assert_eq!(result.index.get("live"), Some(mid));
        // Cursor still moves past the expired record
        assert_eq!(result.write_offset, end);
        assert_eq!(result.records_expired, 1);
    }

    #[test]
    fn test_scan_stops_at_truncated_tail() {
        let mut buf = vec![0u8; 1024];
        let good_end = encode(&mut buf, 0, "whole", "record", 0);

        // Simulate a crash mid-write: a key length promising more bytes
        // than the region holds.
        buf[good_end..good_end + 4].copy_from_slice(&5000i32.to_be_bytes());
        buf[good_end + 4..good_end + 9].copy_from_slice(b"parti");

        let result = scan(&buf);

        assert_eq!(result.index.get("whole"), Some(0));
        assert_eq!(result.index.len(), 1);
        assert_eq!(result.write_offset, good_end);
    }
}
