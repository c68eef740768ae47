//! The `MASTERRESOURCEUNITS` aggregate catalogue.
//!
//! The engine discovers units (items, monsters, players, props) through
//! this tree rather than by scanning directories. Each unit file (after
//! base-file resolution) is appended under a node named for its resource
//! group and stamped with the bookkeeping attributes the engine expects.

use tl_tree::{MergeMode, StrId, Tree, Value};
use tl_utils::{ascii_upper, ModPath};

/// The four unit groups. The discriminant is the `RESOURCEGROUP` number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceGroup {
    Items = 0,
    Monsters = 1,
    Players = 2,
    Props = 3,
}

impl ResourceGroup {
    /// Classify a unit file by its upper-cased in-mod directory.
    pub fn from_dir(dir_upper: &ModPath) -> Option<ResourceGroup> {
        if dir_upper.starts_with_dir("MEDIA/UNITS/ITEMS") {
            Some(ResourceGroup::Items)
        } else if dir_upper.starts_with_dir("MEDIA/UNITS/MONSTERS") {
            Some(ResourceGroup::Monsters)
        } else if dir_upper.starts_with_dir("MEDIA/UNITS/PLAYERS") {
            Some(ResourceGroup::Players)
        } else if dir_upper.starts_with_dir("MEDIA/UNITS/PROPS") {
            Some(ResourceGroup::Props)
        } else {
            None
        }
    }

    pub fn node_name(self) -> &'static str {
        match self {
            ResourceGroup::Items => "ITEMS",
            ResourceGroup::Monsters => "MONSTERS",
            ResourceGroup::Players => "PLAYERS",
            ResourceGroup::Props => "PROPS",
        }
    }
}

/// Builder for the `UNITS` tree written to
/// `media/MASTERRESOURCEUNITS.DAT.ADM`.
#[derive(Debug)]
pub struct MasterResourceUnits {
    tree: Tree,
    dontcreate: StrId,
    resourcegroup: StrId,
    datafile: StrId,
    fileitem: StrId,
    group_names: [StrId; 4],
}

impl Default for MasterResourceUnits {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterResourceUnits {
    pub fn new() -> Self {
        let mut tree = Tree::new("UNITS");
        let dontcreate = tree.intern("DONTCREATE");
        let resourcegroup = tree.intern("RESOURCEGROUP");
        let datafile = tree.intern("DATAFILE");
        let fileitem = tree.intern("FILEITEM");
        let group_names = [
            ResourceGroup::Items,
            ResourceGroup::Monsters,
            ResourceGroup::Players,
            ResourceGroup::Props,
        ]
        .map(|g| tree.intern(g.node_name()));

        MasterResourceUnits {
            tree,
            dontcreate,
            resourcegroup,
            datafile,
            fileitem,
            group_names,
        }
    }

    /// Append one resolved unit tree.
    ///
    /// `file_name` is the logical file name; `dir_upper` its upper-cased
    /// in-mod directory. The merged copy always gets `DONTCREATE=false`,
    /// its group number, and the full path the engine should associate
    /// with it.
    pub fn add_unit(
        &mut self,
        group: ResourceGroup,
        file_name: &str,
        dir_upper: &ModPath,
        src: &Tree,
    ) {
        let file_upper = ascii_upper(file_name);
        let node = self
            .tree
            .add_child(self.tree.root(), self.group_names[group as usize]);
        self.tree
            .merge_from(node, src, src.root(), MergeMode::DontReplace);

        let datafile = self.tree.string_value(dir_upper.join(&file_upper).as_str());
        let fileitem = self.tree.string_value(&file_upper);
        self.tree.set_attr(node, self.dontcreate, Value::Bool(false));
        self.tree
            .set_attr(node, self.resourcegroup, Value::UInt(group as u32));
        self.tree.set_attr(node, self.datafile, datafile);
        self.tree.set_attr(node, self.fileitem, fileitem);
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}
