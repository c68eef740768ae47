//! Binary ADM encoding.

use std::fs;
use std::io;
use std::path::Path;

use tl_tree::{NodeId, Tree, Value};
use tl_utils::unicode::utf32_to_utf16;

use crate::VERSION;

/// Encode `tree` as a binary ADM buffer.
pub fn write(tree: &Tree) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&VERSION.to_le_bytes());

    write_strings(&mut buf, tree);
    write_nodes(&mut buf, tree);

    buf
}

/// Write `tree` as binary ADM to `path`, truncating any existing file.
pub fn write_file(path: impl AsRef<Path>, tree: &Tree) -> io::Result<()> {
    fs::write(path, write(tree))
}

fn write_strings(buf: &mut Vec<u8>, tree: &Tree) {
    let strings = tree.strings();
    buf.extend_from_slice(&(strings.len() as u32).to_le_bytes());

    let mut units: Vec<u16> = Vec::new();
    for (id, s) in strings.iter() {
        units.clear();
        let mut pair = [0u16; 2];
        for c in s.chars() {
            let n = utf32_to_utf16(u32::from(c), &mut pair);
            units.extend_from_slice(&pair[..n]);
        }

        buf.extend_from_slice(&id.as_u32().to_le_bytes());
        buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
        for u in &units {
            buf.extend_from_slice(&u.to_le_bytes());
        }
    }
}

fn write_nodes(buf: &mut Vec<u8>, tree: &Tree) {
    // Preorder with children pushed in reverse: each node's header (name,
    // attributes, child count) is followed by its children in order, which
    // is exactly the nesting the reader expects.
    let mut stack: Vec<NodeId> = vec![tree.root()];

    while let Some(node) = stack.pop() {
        buf.extend_from_slice(&tree.name(node).as_u32().to_le_bytes());
        write_attrs(buf, tree, node);
        let children = tree.children(node);
        buf.extend_from_slice(&(children.len() as u32).to_le_bytes());
        stack.extend(children.iter().rev());
    }
}

fn write_attrs(buf: &mut Vec<u8>, tree: &Tree, node: NodeId) {
    let attrs = tree.attrs(node);
    buf.extend_from_slice(&(attrs.len() as u32).to_le_bytes());

    for &(name, value) in attrs {
        buf.extend_from_slice(&name.as_u32().to_le_bytes());
        buf.extend_from_slice(&value.tag().to_le_bytes());

        match value {
            Value::Int(v) => buf.extend_from_slice(&(v as u32).to_le_bytes()),
            Value::UInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Bool(v) => buf.extend_from_slice(&u32::from(v).to_le_bytes()),
            Value::Str(id) | Value::Translate(id) => {
                buf.extend_from_slice(&id.as_u32().to_le_bytes())
            }
            Value::Float(v) => buf.extend_from_slice(&v.to_bits().to_le_bytes()),
            Value::Int64(v) => buf.extend_from_slice(&(v as u64).to_le_bytes()),
            Value::Double(v) => buf.extend_from_slice(&v.to_bits().to_le_bytes()),
        }
    }
}
