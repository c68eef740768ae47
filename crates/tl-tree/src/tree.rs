//! Arena-backed tree of named, attributed nodes.

use std::collections::BTreeMap;

use crate::intern::{StrId, StringTable};
use crate::value::Value;

/// Index of a node within its [`Tree`]'s arena.
///
/// Node 0 is always the root. Ids are never reused; a node detached with
/// [`Tree::remove_child`] simply becomes unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: StrId,
    /// Ordered primarily by name id; insertion order is preserved among
    /// attributes sharing a name. The serializers rely on this order.
    attrs: Vec<(StrId, Value)>,
    children: Vec<NodeId>,
}

/// An attributed tree bundled with its private string interner.
///
/// Real mod files nest deeply enough to overflow a default thread stack, so
/// every traversal in this crate (and its consumers) uses an explicit work
/// stack instead of recursion.
#[derive(Debug, Clone)]
pub struct Tree {
    strings: StringTable,
    nodes: Vec<Node>,
}

impl Tree {
    /// A tree whose root carries `root_name`.
    pub fn new(root_name: &str) -> Tree {
        let mut strings = StringTable::new();
        let name = strings.intern(root_name);
        Tree {
            strings,
            nodes: vec![Node {
                name,
                attrs: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    /// A tree whose root is not yet named: the name resolves to the empty
    /// string until [`set_name`](Tree::set_name) is called. Used by loaders
    /// that discover the root name mid-stream, without polluting the
    /// interner with an empty-string entry.
    pub fn unnamed() -> Tree {
        Tree {
            strings: StringTable::new(),
            nodes: vec![Node {
                name: StrId::from_u32(0),
                attrs: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // ---- strings ----

    pub fn intern(&mut self, s: &str) -> StrId {
        self.strings.intern(s)
    }

    pub fn find_str(&self, s: &str) -> Option<StrId> {
        self.strings.find(s)
    }

    pub fn resolve(&self, id: StrId) -> &str {
        self.strings.resolve(id)
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// A `Str` value holding `s`, interning it first.
    pub fn string_value(&mut self, s: &str) -> Value {
        Value::Str(self.intern(s))
    }

    /// A `Translate` value holding `s`, interning it first.
    pub fn translate_value(&mut self, s: &str) -> Value {
        Value::Translate(self.intern(s))
    }

    // ---- nodes ----

    pub fn name(&self, node: NodeId) -> StrId {
        self.nodes[node.index()].name
    }

    pub fn name_str(&self, node: NodeId) -> &str {
        self.strings.resolve(self.nodes[node.index()].name)
    }

    pub fn set_name(&mut self, node: NodeId, name: StrId) {
        self.nodes[node.index()].name = name;
    }

    /// Append a new empty child to `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: StrId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    /// Detach the first occurrence of `child` from `parent`'s child list.
    /// The node's storage is not reclaimed.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let children = &mut self.nodes[parent.index()].children;
        if let Some(pos) = children.iter().position(|&c| c == child) {
            children.remove(pos);
        }
    }

    // ---- attributes ----

    pub fn attrs(&self, node: NodeId) -> &[(StrId, Value)] {
        &self.nodes[node.index()].attrs
    }

    /// Insert an attribute, preserving any existing attributes of the same
    /// name. The new entry lands after them.
    pub fn insert_attr(&mut self, node: NodeId, name: StrId, value: Value) {
        let attrs = &mut self.nodes[node.index()].attrs;
        let at = attrs.partition_point(|(k, _)| *k <= name);
        attrs.insert(at, (name, value));
    }

    /// Set an attribute, leaving exactly one entry with `name`.
    pub fn set_attr(&mut self, node: NodeId, name: StrId, value: Value) {
        let attrs = &mut self.nodes[node.index()].attrs;
        let at = attrs.partition_point(|(k, _)| *k < name);

        if at < attrs.len() && attrs[at].0 == name {
            attrs[at].1 = value;
            let mut excess = at + 1;
            while excess < attrs.len() && attrs[excess].0 == name {
                excess += 1;
            }
            attrs.drain(at + 1..excess);
        } else {
            attrs.insert(at, (name, value));
        }
    }

    /// The first attribute with the given name id.
    pub fn attr(&self, node: NodeId, name: StrId) -> Option<&Value> {
        self.nodes[node.index()]
            .attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// The first attribute whose name is `name`. Does not intern: a name
    /// absent from the table cannot be attached to any node.
    pub fn find_attr(&self, node: NodeId, name: &str) -> Option<&Value> {
        let id = self.strings.find(name)?;
        self.attr(node, id)
    }

    /// The text of a `Str`/`Translate` value, resolved in this tree.
    pub fn str_value(&self, value: &Value) -> Option<&str> {
        value.str_id().map(|id| self.strings.resolve(id))
    }

    // ---- comparison ----

    /// Structural equality modulo string-id renumbering.
    ///
    /// Node names and string payloads are compared by their resolved text.
    /// Children are compared positionally; attributes are compared per name
    /// (order among a shared name is significant, order across names is an
    /// id-numbering artifact and is not).
    pub fn equivalent(&self, other: &Tree) -> bool {
        let mut stack = vec![(self.root(), other.root())];

        while let Some((a, b)) = stack.pop() {
            if self.name_str(a) != other.name_str(b) {
                return false;
            }
            if !self.attrs_equivalent(a, other, b) {
                return false;
            }

            let ca = self.children(a);
            let cb = other.children(b);
            if ca.len() != cb.len() {
                return false;
            }
            stack.extend(ca.iter().copied().zip(cb.iter().copied()));
        }

        true
    }

    fn attrs_equivalent(&self, node: NodeId, other: &Tree, other_node: NodeId) -> bool {
        let mine = self.attr_groups(node);
        let theirs = other.attr_groups(other_node);

        if mine.len() != theirs.len() {
            return false;
        }
        mine.iter().all(|(name, values)| {
            theirs.get(name).is_some_and(|vs| {
                values.len() == vs.len()
                    && values
                        .iter()
                        .zip(vs.iter())
                        .all(|(a, b)| value_equivalent(self, a, other, b))
            })
        })
    }

    fn attr_groups(&self, node: NodeId) -> BTreeMap<&str, Vec<&Value>> {
        let mut groups: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();
        for (name, value) in self.attrs(node) {
            groups
                .entry(self.strings.resolve(*name))
                .or_default()
                .push(value);
        }
        groups
    }
}

fn value_equivalent(ta: &Tree, a: &Value, tb: &Tree, b: &Value) -> bool {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => ta.resolve(*x) == tb.resolve(*y),
        (Value::Translate(x), Value::Translate(y)) => ta.resolve(*x) == tb.resolve(*y),
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_node_zero() {
        let t = Tree::new("ROOT");
        assert_eq!(t.name_str(t.root()), "ROOT");
        assert!(t.children(t.root()).is_empty());
    }

    #[test]
    fn unnamed_root_resolves_empty_without_interning() {
        let t = Tree::unnamed();
        assert_eq!(t.name_str(t.root()), "");
        assert_eq!(t.strings().len(), 0);
    }

    #[test]
    fn insert_attr_keeps_duplicates_in_insertion_order() {
        let mut t = Tree::new("R");
        let b = t.intern("B");
        let a = t.intern("A");
        let root = t.root();

        t.insert_attr(root, a, Value::Int(1));
        t.insert_attr(root, b, Value::Int(2));
        t.insert_attr(root, a, Value::Int(3));

        // B interned first, so it sorts first; the two A entries keep their
        // insertion order after it.
        let got: Vec<(StrId, Value)> = t.attrs(root).to_vec();
        assert_eq!(got, vec![(b, Value::Int(2)), (a, Value::Int(1)), (a, Value::Int(3))]);
    }

    #[test]
    fn set_attr_collapses_to_one() {
        let mut t = Tree::new("R");
        let a = t.intern("A");
        let root = t.root();

        t.insert_attr(root, a, Value::Int(1));
        t.insert_attr(root, a, Value::Int(2));
        t.set_attr(root, a, Value::Int(9));

        assert_eq!(t.attrs(root), &[(a, Value::Int(9))]);
    }

    #[test]
    fn set_attr_inserts_when_absent() {
        let mut t = Tree::new("R");
        let a = t.intern("A");
        let root = t.root();
        t.set_attr(root, a, Value::Bool(true));
        assert_eq!(t.attr(root, a), Some(&Value::Bool(true)));
    }

    #[test]
    fn children_preserve_insertion_order() {
        let mut t = Tree::new("R");
        let root = t.root();
        let z = t.intern("Z");
        let a = t.intern("A");
        let c1 = t.add_child(root, z);
        let c2 = t.add_child(root, a);
        assert_eq!(t.children(root), &[c1, c2]);
    }

    #[test]
    fn remove_child_detaches_only_the_given_node() {
        let mut t = Tree::new("R");
        let root = t.root();
        let n = t.intern("N");
        let c1 = t.add_child(root, n);
        let c2 = t.add_child(root, n);
        t.remove_child(root, c1);
        assert_eq!(t.children(root), &[c2]);
    }

    #[test]
    fn equivalent_ignores_id_numbering() {
        let mut a = Tree::new("R");
        let mut b = Tree::new("R");

        // Intern order differs between the two trees.
        let (a_x, a_y) = (a.intern("X"), a.intern("Y"));
        let (b_y, b_x) = (b.intern("Y"), b.intern("X"));

        let ra = a.root();
        let rb = b.root();
        a.insert_attr(ra, a_x, Value::Int(1));
        a.insert_attr(ra, a_y, Value::Int(2));
        b.insert_attr(rb, b_y, Value::Int(2));
        b.insert_attr(rb, b_x, Value::Int(1));

        let va = a.string_value("hello");
        a.insert_attr(ra, a_x, va);
        let vb = b.string_value("hello");
        b.insert_attr(rb, b_x, vb);

        assert!(a.equivalent(&b));
        assert!(b.equivalent(&a));
    }

    #[test]
    fn equivalent_detects_value_difference() {
        let mut a = Tree::new("R");
        let mut b = Tree::new("R");
        let ka = a.intern("K");
        let kb = b.intern("K");
        a.insert_attr(a.root(), ka, Value::Int(1));
        b.insert_attr(b.root(), kb, Value::Int(2));
        assert!(!a.equivalent(&b));
    }

    #[test]
    fn equivalent_distinguishes_str_from_translate() {
        let mut a = Tree::new("R");
        let mut b = Tree::new("R");
        let ka = a.intern("K");
        let kb = b.intern("K");
        let va = a.string_value("x");
        let vb = b.translate_value("x");
        a.insert_attr(a.root(), ka, va);
        b.insert_attr(b.root(), kb, vb);
        assert!(!a.equivalent(&b));
    }
}
