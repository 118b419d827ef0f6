//! Store Module
//!
//! The on-disk representation: record codec, offset index, and the
//! open-time scan that rebuilds the index from the mapped region.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Record 1                                            │
//! │ ┌─────────┬─────┬─────────┬─────┬────────────────┐  │
//! │ │KeyLen(4)│ Key │ValLen(4)│ Val │ ExpireTs (8)   │  │
//! │ └─────────┴─────┴─────────┴─────┴────────────────┘  │
//! ├─────────────────────────────────────────────────────┤
//! │ Record 2                                            │
//! │ ┌─────────┬─────┬─────────┬─────┬────────────────┐  │
//! │ │KeyLen(4)│ Key │ValLen(4)│ Val │ ExpireTs (8)   │  │
//! │ └─────────┴─────┴─────────┴─────┴────────────────┘  │
//! ├─────────────────────────────────────────────────────┤
//! │ ... free space up to FILE_SIZE ...                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian signed two's complement, so files written on
//! one platform are readable on any other. `ExpireTs` is an absolute
//! wall-clock expiry in Unix milliseconds; 0 means the record never expires.
//!
//! The log is append-only: overwrites and TTL updates write a new record and
//! repoint the index, deletes drop the index entry only. Dead records stay
//! on disk until the file is discarded.

mod index;
mod record;
mod recovery;

pub use index::Index;
pub use record::{now_ms, Record, HEADER_SIZE};
pub use recovery::{scan, ScanResult};

pub(crate) use record::{encode, encoded_len, peek_value};

/// Size of the mapped region in bytes. The backing file is sized to this on
/// open and never grows.
pub const FILE_SIZE: usize = 1024 * 1024;
