//! The binary tree format the game engine actually loads.
//!
//! Layout (all integers little-endian, unprefixed fields 32-bit unsigned):
//!
//! ```text
//! version = 1
//! string_count
//! string_count × { string_id, utf16_unit_count, utf16_unit_count × u16 }
//! node: { name_id, attr_count, attr_count × attribute, child_count,
//!         child_count × node }
//! attribute: { name_id, type_tag, payload }
//! ```
//!
//! Payload width depends on the tag: 32 bits for INT/UINT/BOOL/STRING/
//! TRANSLATE and FLOAT, 64 bits for INT64 and DOUBLE. String counts are in
//! UTF-16 code units, not bytes.
//!
//! Byte-exact compatibility with the engine's reader is a hard requirement;
//! the writer has a pinned-bytes test to hold it in place.

mod error;
mod read;
mod write;

pub use error::{AdmError, AdmWarning};
pub use read::{read, read_file, Loaded};
pub use write::{write, write_file};

/// The only format version ever shipped.
pub const VERSION: u32 = 1;
