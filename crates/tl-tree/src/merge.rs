//! Cross-tree node merging.

use crate::intern::StrId;
use crate::tree::{NodeId, Tree};
use crate::value::Value;

/// How attributes already present on a destination node are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Every copied attribute collapses duplicates (`set_attr`).
    Replace,
    /// `set_attr` at the node the merge was invoked on, `insert_attr`
    /// below it. This is what base-file resolution wants: a derived file
    /// overrides root attributes while deeper nodes accumulate.
    ReplaceAtRoot,
    /// Every copied attribute is appended (`insert_attr`).
    DontReplace,
}

impl Tree {
    /// Merge `src_node` of `src` into `dst_node` of this tree.
    ///
    /// Attributes are copied with their names (and `Str`/`Translate`
    /// payloads) re-interned here. Each source subnode becomes a *new*
    /// child of the destination, in source order. There is no structural
    /// matching by name, so merging the same tree twice doubles its
    /// subnode content. Layering picks a single winning file per logical
    /// path precisely so that each merge runs once.
    pub fn merge_from(
        &mut self,
        dst_node: NodeId,
        src: &Tree,
        src_node: NodeId,
        mode: MergeMode,
    ) {
        struct SrcFrame {
            node: NodeId,
            next_child: usize,
        }

        let mut src_stack = vec![SrcFrame {
            node: src_node,
            next_child: 0,
        }];
        let mut dst_stack = vec![dst_node];

        while let Some(frame) = src_stack.last_mut() {
            let dst = *dst_stack.last().expect("stacks move in lockstep");

            if frame.next_child == 0 {
                let replace = match mode {
                    MergeMode::Replace => true,
                    MergeMode::DontReplace => false,
                    MergeMode::ReplaceAtRoot => dst_stack.len() == 1,
                };
                let node = frame.node;
                self.merge_attrs(dst, src, node, replace);
            }

            match src.children(frame.node).get(frame.next_child) {
                Some(&child) => {
                    frame.next_child += 1;
                    let name = self.intern(src.name_str(child));
                    let new_child = self.add_child(dst, name);
                    dst_stack.push(new_child);
                    src_stack.push(SrcFrame {
                        node: child,
                        next_child: 0,
                    });
                }
                None => {
                    src_stack.pop();
                    dst_stack.pop();
                }
            }
        }
    }

    fn merge_attrs(&mut self, dst: NodeId, src: &Tree, src_node: NodeId, replace: bool) {
        for &(src_name, src_value) in src.attrs(src_node) {
            let name = self.intern(src.resolve(src_name));
            let value = self.translate_value_ids(src, src_value);

            if replace {
                self.set_attr(dst, name, value);
            } else {
                self.insert_attr(dst, name, value);
            }
        }
    }

    /// Re-intern the string payload of a value coming from another tree.
    fn translate_value_ids(&mut self, src: &Tree, value: Value) -> Value {
        match value {
            Value::Str(id) => {
                let id: StrId = self.intern(src.resolve(id));
                Value::Str(id)
            }
            Value::Translate(id) => {
                let id: StrId = self.intern(src.resolve(id));
                Value::Translate(id)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source: root R { a=1 (int), b=2.0 (float) } with one child C.
    fn source() -> Tree {
        let mut t = Tree::new("R");
        let root = t.root();
        let a = t.intern("a");
        let b = t.intern("b");
        t.insert_attr(root, a, Value::Int(1));
        t.insert_attr(root, b, Value::Float(2.0));
        let c = t.intern("C");
        t.add_child(root, c);
        t
    }

    /// Destination: root R2 { a=9 (int), c="x" (string) }.
    fn destination() -> Tree {
        let mut t = Tree::new("R2");
        let root = t.root();
        let a = t.intern("a");
        t.insert_attr(root, a, Value::Int(9));
        let c = t.intern("c");
        let v = t.string_value("x");
        t.insert_attr(root, c, v);
        t
    }

    #[test]
    fn replace_overwrites_existing_attributes() {
        let src = source();
        let mut dst = destination();
        let root = dst.root();

        dst.merge_from(root, &src, src.root(), MergeMode::Replace);

        assert_eq!(dst.find_attr(root, "a"), Some(&Value::Int(1)));
        assert_eq!(dst.find_attr(root, "b"), Some(&Value::Float(2.0)));
        assert_eq!(
            dst.find_attr(root, "c").and_then(|v| dst.str_value(v)),
            Some("x")
        );
        assert_eq!(dst.children(root).len(), 1);
        assert_eq!(dst.name_str(dst.children(root)[0]), "C");
    }

    #[test]
    fn dont_replace_keeps_both_values() {
        let src = source();
        let mut dst = destination();
        let root = dst.root();

        dst.merge_from(root, &src, src.root(), MergeMode::DontReplace);

        let a = dst.find_str("a").unwrap();
        let values: Vec<&Value> = dst
            .attrs(root)
            .iter()
            .filter(|(k, _)| *k == a)
            .map(|(_, v)| v)
            .collect();
        assert_eq!(values, [&Value::Int(9), &Value::Int(1)]);
        assert!(dst.find_attr(root, "b").is_some());
        assert!(dst.find_attr(root, "c").is_some());
        assert_eq!(dst.children(root).len(), 1);
    }

    #[test]
    fn replace_at_root_only_touches_the_top() {
        // Source: R { lvl=2 } with child C { hp=5 }
        let mut src = Tree::new("R");
        let sroot = src.root();
        let lvl = src.intern("lvl");
        src.insert_attr(sroot, lvl, Value::Int(2));
        let cname = src.intern("C");
        let sc = src.add_child(sroot, cname);
        let hp = src.intern("hp");
        src.insert_attr(sc, hp, Value::Int(5));

        // Destination root already has lvl=1.
        let mut dst = Tree::new("R");
        let droot = dst.root();
        let dlvl = dst.intern("lvl");
        dst.insert_attr(droot, dlvl, Value::Int(1));

        dst.merge_from(droot, &src, sroot, MergeMode::ReplaceAtRoot);

        // Root attribute replaced, not duplicated.
        let lvl_count = dst
            .attrs(droot)
            .iter()
            .filter(|(k, _)| *k == dlvl)
            .count();
        assert_eq!(lvl_count, 1);
        assert_eq!(dst.attr(droot, dlvl), Some(&Value::Int(2)));

        // The child was appended and its attributes inserted.
        let c = dst.children(droot)[0];
        assert_eq!(dst.find_attr(c, "hp"), Some(&Value::Int(5)));
    }

    #[test]
    fn merge_into_empty_destination_copies_everything_in_order() {
        let mut src = Tree::new("R");
        let sroot = src.root();
        for name in ["one", "two", "three"] {
            let id = src.intern(name);
            src.add_child(sroot, id);
        }

        let mut dst = Tree::new("R");
        dst.merge_from(dst.root(), &src, sroot, MergeMode::DontReplace);

        let names: Vec<&str> = dst
            .children(dst.root())
            .iter()
            .map(|&c| dst.name_str(c))
            .collect();
        assert_eq!(names, ["one", "two", "three"]);
        assert!(dst.equivalent(&src));
    }

    #[test]
    fn merging_twice_doubles_subnodes() {
        let src = source();
        let mut dst = Tree::new("R");
        dst.merge_from(dst.root(), &src, src.root(), MergeMode::Replace);
        dst.merge_from(dst.root(), &src, src.root(), MergeMode::Replace);
        assert_eq!(dst.children(dst.root()).len(), 2);
    }

    #[test]
    fn string_payloads_are_reinterned() {
        let mut src = Tree::new("R");
        let sroot = src.root();
        let k = src.intern("k");
        let v = src.translate_value("Horse");
        src.insert_attr(sroot, k, v);

        let mut dst = Tree::new("R");
        dst.merge_from(dst.root(), &src, sroot, MergeMode::Replace);

        let got = dst.find_attr(dst.root(), "k").unwrap();
        assert!(matches!(got, Value::Translate(_)));
        assert_eq!(dst.str_value(got), Some("Horse"));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        // Deeper than any sane thread stack would tolerate if the merge
        // were recursive.
        let mut src = Tree::new("R");
        let name = src.intern("N");
        let mut cur = src.root();
        for _ in 0..100_000 {
            cur = src.add_child(cur, name);
        }

        let mut dst = Tree::new("R");
        dst.merge_from(dst.root(), &src, src.root(), MergeMode::Replace);

        let mut depth = 0;
        let mut n = dst.root();
        while let Some(&c) = dst.children(n).first() {
            depth += 1;
            n = c;
        }
        assert_eq!(depth, 100_000);
    }
}
