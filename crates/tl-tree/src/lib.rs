//! The in-memory tree shared by every loader, writer, and merger.
//!
//! An asset tree is an ordered n-ary tree of named nodes, each carrying an
//! ordered multimap of typed attributes. All strings (node names, attribute
//! names, string-valued payloads) live in a per-tree interner and are
//! referenced by [`StrId`]. Trees are fully independent: moving data between
//! two trees means translating every id through the destination's interner,
//! which is exactly what the [merge engine](Tree::merge_from) does.

mod intern;
mod merge;
mod tree;
mod value;

pub use intern::{StrId, StringTable};
pub use merge::MergeMode;
pub use tree::{NodeId, Tree};
pub use value::Value;
