//! DAT text output.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use tl_tree::{NodeId, Tree, Value};

/// Render a tree as DAT text.
///
/// One line per section open, attribute, and section close, each
/// newline-terminated. Floats print in shortest round-trip notation, so the
/// output re-parses to an equivalent tree.
pub fn dump(tree: &Tree) -> String {
    struct Frame {
        node: NodeId,
        next_child: usize,
    }

    let mut out = String::new();
    let mut stack = vec![Frame {
        node: tree.root(),
        next_child: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let node = frame.node;

        if frame.next_child == 0 {
            let _ = writeln!(out, "[{}]", tree.name_str(node));
            dump_attrs(&mut out, tree, node);
        }

        match tree.children(node).get(frame.next_child) {
            Some(&child) => {
                frame.next_child += 1;
                stack.push(Frame {
                    node: child,
                    next_child: 0,
                });
            }
            None => {
                let _ = writeln!(out, "[/{}]", tree.name_str(node));
                stack.pop();
            }
        }
    }

    out
}

/// Write `tree` as DAT text to `path`, truncating any existing file.
pub fn dump_file(path: impl AsRef<Path>, tree: &Tree) -> io::Result<()> {
    fs::write(path, dump(tree))
}

fn dump_attrs(out: &mut String, tree: &Tree, node: NodeId) {
    for &(name, value) in tree.attrs(node) {
        let name = tree.resolve(name);
        let _ = match value {
            Value::Int(v) => writeln!(out, "<INTEGER>{name}:{v}"),
            Value::Float(v) => writeln!(out, "<FLOAT>{name}:{v}"),
            Value::Double(v) => writeln!(out, "<DOUBLE>{name}:{v}"),
            Value::UInt(v) => writeln!(out, "<UNSIGNED INT>{name}:{v}"),
            Value::Str(id) => writeln!(out, "<STRING>{name}:{}", tree.resolve(id)),
            Value::Bool(v) => writeln!(out, "<BOOL>{name}:{}", if v { "true" } else { "false" }),
            Value::Int64(v) => writeln!(out, "<INTEGER64>{name}:{v}"),
            Value::Translate(id) => writeln!(out, "<TRANSLATE>{name}:{}", tree.resolve(id)),
        };
    }
}
