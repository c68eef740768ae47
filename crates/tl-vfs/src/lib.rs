//! The virtual mod directory.
//!
//! Mod layering works on a single in-memory directory tree assembled from
//! many on-disk source trees: the original game data first, then each mod
//! in priority order. Names compare case-insensitively (ASCII fold, the
//! engine's own convention), and every logical file keeps a *priority
//! chain* of the on-disk paths that provided it: the front is the current
//! winner, the tail is retained history that base-file resolution and
//! wardrobe scavenging still read.

mod walk;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use tl_utils::ascii_upper;

pub use walk::VfsError;

/// One logical file and its priority chain of on-disk sources.
#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    name: String,
    sources: VecDeque<PathBuf>,
}

impl FileEntry {
    /// The logical in-mod file name, with the spelling it was first seen
    /// under (`.ADM` suffix already stripped).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The winning on-disk path.
    pub fn front(&self) -> &Path {
        &self.sources[0]
    }

    /// The whole chain, winner first.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(PathBuf::as_path)
    }

    /// Overridden sources only, most recent first.
    pub fn older_sources(&self) -> impl Iterator<Item = &Path> {
        self.sources().skip(1)
    }
}

#[derive(Debug, Clone, Default)]
struct DirEntry {
    name: String,
    dir: ModDirectory,
}

/// A directory in the virtual tree.
///
/// Both maps are keyed by the upper-folded name; entries remember the
/// spelling they were first seen under, which is what the output tree uses.
#[derive(Debug, Clone, Default)]
pub struct ModDirectory {
    files: BTreeMap<String, FileEntry>,
    dirs: BTreeMap<String, DirEntry>,
}

/// A name collision between a file and a directory. The kind seen later
/// always wins; the loser is dropped from the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfsWarning {
    FileReplacesDir { name: String },
    DirReplacesFile { name: String },
}

impl fmt::Display for VfsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsWarning::FileReplacesDir { name } => {
                write!(f, "file \"{name}\" conflicts with a directory of the same name, replacing")
            }
            VfsWarning::DirReplacesFile { name } => {
                write!(f, "directory \"{name}\" conflicts with a file of the same name, replacing")
            }
        }
    }
}

impl ModDirectory {
    pub fn new() -> Self {
        ModDirectory::default()
    }

    /// Files of this directory in case-insensitive name order.
    pub fn file_entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.values()
    }

    /// Subdirectories in case-insensitive name order, with their stored
    /// spelling.
    pub fn dir_entries(&self) -> impl Iterator<Item = (&str, &ModDirectory)> {
        self.dirs.values().map(|e| (e.name.as_str(), &e.dir))
    }

    /// A direct child file by (case-insensitive) name.
    pub fn file_entry(&self, name: &str) -> Option<&FileEntry> {
        self.files.get(&ascii_upper(name))
    }

    /// A direct child directory by (case-insensitive) name, with its stored
    /// spelling.
    pub fn dir_entry(&self, name: &str) -> Option<(&str, &ModDirectory)> {
        self.dirs
            .get(&ascii_upper(name))
            .map(|e| (e.name.as_str(), &e.dir))
    }

    /// Resolve a `/`-separated path to a file. Consecutive and leading
    /// slashes are skipped; a trailing slash names no file.
    pub fn lookup_file(&self, path: &str) -> Option<&FileEntry> {
        if path.ends_with('/') {
            return None;
        }

        let mut dir = self;
        let mut components = path.split('/').filter(|c| !c.is_empty());
        let mut current = components.next()?;

        for next in components {
            dir = &dir.dirs.get(&ascii_upper(current))?.dir;
            current = next;
        }
        dir.files.get(&ascii_upper(current))
    }

    /// Resolve a `/`-separated path to a directory. The empty path resolves
    /// to this directory.
    pub fn lookup_dir(&self, path: &str) -> Option<&ModDirectory> {
        let mut dir = self;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            dir = &dir.dirs.get(&ascii_upper(component))?.dir;
        }
        Some(dir)
    }

    /// Overlay `src` onto this tree. `src` is the later (higher-priority)
    /// side: its priority chains are spliced in front of the existing ones,
    /// and on a file/directory kind conflict the source kind wins.
    pub fn overlay(&mut self, src: ModDirectory, warnings: &mut Vec<VfsWarning>) {
        let mut work: Vec<(Vec<String>, ModDirectory)> = vec![(Vec::new(), src)];

        while let Some((at, src_dir)) = work.pop() {
            let dst = self.dir_at_mut(&at);

            for (key, src_file) in src_dir.files {
                if dst.dirs.remove(&key).is_some() {
                    warnings.push(VfsWarning::FileReplacesDir {
                        name: src_file.name.clone(),
                    });
                }

                let entry = dst.files.entry(key).or_insert_with(|| FileEntry {
                    name: src_file.name.clone(),
                    sources: VecDeque::new(),
                });
                // Splice the source chain in front of the destination's.
                let older = std::mem::replace(&mut entry.sources, src_file.sources);
                entry.sources.extend(older);
            }

            for (key, src_sub) in src_dir.dirs {
                if dst.files.remove(&key).is_some() {
                    warnings.push(VfsWarning::DirReplacesFile {
                        name: src_sub.name.clone(),
                    });
                }

                dst.dirs.entry(key.clone()).or_insert_with(|| DirEntry {
                    name: src_sub.name,
                    dir: ModDirectory::new(),
                });

                let mut sub_at = at.clone();
                sub_at.push(key);
                work.push((sub_at, src_sub.dir));
            }
        }
    }

    /// Walk down pre-folded keys. Callers only pass keys of entries they
    /// just created, so the path always resolves.
    fn dir_at_mut(&mut self, keys: &[String]) -> &mut ModDirectory {
        let mut dir = self;
        for key in keys {
            dir = &mut dir
                .dirs
                .get_mut(key)
                .expect("virtual path created before descent")
                .dir;
        }
        dir
    }

    pub(crate) fn ensure_subdir(
        &mut self,
        name: &str,
        warnings: &mut Vec<VfsWarning>,
    ) -> String {
        let key = ascii_upper(name);
        if self.files.remove(&key).is_some() {
            warnings.push(VfsWarning::DirReplacesFile {
                name: name.to_string(),
            });
        }
        self.dirs.entry(key.clone()).or_insert_with(|| DirEntry {
            name: name.to_string(),
            dir: ModDirectory::new(),
        });
        key
    }

    pub(crate) fn add_disk_file(
        &mut self,
        disk_name: &str,
        disk_path: PathBuf,
        warnings: &mut Vec<VfsWarning>,
    ) {
        if self.dirs.remove(&ascii_upper(disk_name)).is_some() {
            warnings.push(VfsWarning::FileReplacesDir {
                name: disk_name.to_string(),
            });
        }

        // `X.ADM` collapses onto the logical entry for `X`.
        let mut ext = ascii_upper(tl_utils::path::extension(disk_name));
        let is_adm = ext == "ADM";
        let logical = if is_adm {
            let stripped = tl_utils::path::strip_extension(disk_name);
            ext = ascii_upper(tl_utils::path::extension(stripped));
            stripped
        } else {
            disk_name
        };
        let is_data = matches!(ext.as_str(), "DAT" | "ANIMATION" | "LAYOUT");

        let entry = self
            .files
            .entry(ascii_upper(logical))
            .or_insert_with(|| FileEntry {
                name: logical.to_string(),
                sources: VecDeque::new(),
            });

        // Within one source directory the textual form wins over the
        // compiled form; across directories the newer source goes in front.
        if (is_adm || is_data) && !entry.sources.is_empty() {
            if entry.sources[0].parent() == disk_path.parent() {
                if is_data {
                    entry.sources[0] = disk_path;
                }
            } else {
                entry.sources.push_front(disk_path);
            }
        } else {
            entry.sources.push_front(disk_path);
        }
    }
}
