//! The `MASSFILE` aggregate manifest.
//!
//! The engine loads most of its data from one concatenated tree rather than
//! thousands of individual files. Every whitelisted data file contributes a
//! subnode named with its full upper-cased in-mod path.

use tl_tree::{MergeMode, Tree};
use tl_utils::ModPath;

/// Directory prefixes whose `.dat`/`.animation` content goes into the mass
/// file. The check is prefix-closed: anything below a listed directory
/// qualifies.
const WHITELIST: [&str; 19] = [
    "MEDIA/AFFIXES",
    "MEDIA/CINEMATICS",
    "MEDIA/DUNGEONS",
    "MEDIA/FORMATIONS",
    "MEDIA/GRAPHS",
    "MEDIA/LAYOUTS",
    "MEDIA/LEVELSETS",
    "MEDIA/PARTICLES",
    "MEDIA/PERKS",
    "MEDIA/QUESTS",
    "MEDIA/RECIPES",
    "MEDIA/SETS",
    "MEDIA/SKILLS",
    "MEDIA/SOUNDS",
    "MEDIA/SPAWNCLASSES",
    "MEDIA/TRANSLATIONS",
    "MEDIA/UNITTHEMES",
    "MEDIA/MODELS",
    "MEDIA/UI",
];

/// Builder for the `MAINDATA` tree written to `media/MASSFILE.DAT.ADM`.
#[derive(Debug)]
pub struct MassFile {
    tree: Tree,
}

impl Default for MassFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MassFile {
    pub fn new() -> Self {
        MassFile {
            tree: Tree::new("MAINDATA"),
        }
    }

    /// Whether files in `dir_upper` (an upper-cased in-mod directory)
    /// belong in the mass file.
    pub fn is_whitelisted(dir_upper: &ModPath) -> bool {
        WHITELIST.iter().any(|w| dir_upper.starts_with_dir(w))
    }

    /// Append `src` under a subnode named `path_upper` (the full
    /// upper-cased in-mod path of the contributing file).
    pub fn add(&mut self, src: &Tree, path_upper: &str) {
        let name = self.tree.intern(path_upper);
        let node = self.tree.add_child(self.tree.root(), name);
        self.tree.merge_from(node, src, src.root(), MergeMode::DontReplace);
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}
