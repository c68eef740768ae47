//! Loading a virtual tree from an on-disk mod directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tl_utils::ascii_upper;

use crate::{ModDirectory, VfsWarning};

/// Errors while walking a source directory on disk.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("cannot open directory {path}: {source}")]
    OpenDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Compiler outputs that must never be picked up as inputs when they sit
/// directly inside `media/`.
const GENERATED: [&str; 4] = [
    "MASSFILE.DAT",
    "MASSFILE.DAT.ADM",
    "MASTERRESOURCEUNITS.DAT",
    "MASTERRESOURCEUNITS.DAT.ADM",
];

impl ModDirectory {
    /// Load the mod rooted at `path` into this virtual tree.
    ///
    /// Only the top-level `media` directory (any case) is considered; it is
    /// stored lower-case because the engine is case-sensitive about this one
    /// path. Root-level files and other root-level directories are ignored.
    /// Entries that cannot be inspected are skipped, as are symlinks.
    pub fn load_dir(
        &mut self,
        path: &Path,
        warnings: &mut Vec<VfsWarning>,
    ) -> Result<(), VfsError> {
        // (disk directory, folded virtual path down from the mod root)
        let mut work: Vec<(PathBuf, Vec<String>)> = vec![(path.to_path_buf(), Vec::new())];

        while let Some((disk_dir, at)) = work.pop() {
            let entries = read_dir_sorted(&disk_dir)?;
            let depth = at.len();

            // Files first: a directory of the same name seen in the same
            // scan replaces the file, never the other way around.
            for (name, path) in &entries.files {
                if depth == 0 {
                    continue;
                }
                if depth == 1 && GENERATED.contains(&ascii_upper(name).as_str()) {
                    continue;
                }
                self.dir_at_mut(&at)
                    .add_disk_file(name, path.clone(), warnings);
            }

            for (name, path) in &entries.dirs {
                if depth == 0 && ascii_upper(name) != "MEDIA" {
                    continue;
                }
                let virtual_name = if depth == 0 { "media" } else { name.as_str() };

                let key = self.dir_at_mut(&at).ensure_subdir(virtual_name, warnings);
                let mut sub_at = at.clone();
                sub_at.push(key);
                work.push((path.clone(), sub_at));
            }
        }

        Ok(())
    }
}

struct DirListing {
    files: Vec<(String, PathBuf)>,
    dirs: Vec<(String, PathBuf)>,
}

fn read_dir_sorted(dir: &Path) -> Result<DirListing, VfsError> {
    let open_err = |source| VfsError::OpenDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut listing = DirListing {
        files: Vec::new(),
        dirs: Vec::new(),
    };

    for entry in fs::read_dir(dir).map_err(open_err)? {
        let entry = entry.map_err(open_err)?;
        // Like the stat step of the walk: anything uninspectable is skipped,
        // and symlinks are not followed.
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();

        if file_type.is_file() {
            listing.files.push((name, entry.path()));
        } else if file_type.is_dir() {
            listing.dirs.push((name, entry.path()));
        }
    }

    Ok(listing)
}
