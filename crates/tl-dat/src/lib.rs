//! The textual tree format.
//!
//! A DAT file is a line-oriented nesting of `[SECTION]` … `[/SECTION]`
//! blocks carrying `<TYPE>name:value` attributes. The format predates any
//! single encoding: files arrive as UTF-8 or UTF-16 in either byte order,
//! so parsing starts with encoding detection (see
//! [`tl_utils::unicode::Encoding::sniff`]).
//!
//! Parsing is strict about structure (unbalanced sections, attributes
//! outside a section, a second root) and tolerant about noise: any line
//! that is not a section or attribute statement is skipped, because mods in
//! the wild "comment out" lines with `//`, `x[SECTION]`, and worse.

mod dump;
mod error;
mod parse;

pub use dump::{dump, dump_file};
pub use error::{DatError, DatWarning};
pub use parse::{parse, parse_file, Loaded, ParseFlags};
