//! Loading a tree from either on-disk form.
//!
//! There are exactly two loader shapes, textual and binary, dispatched on
//! the file extension. No trait: a third implementation is not coming.

use std::fmt;
use std::path::{Path, PathBuf};

use tl_dat::{DatWarning, ParseFlags};
use tl_adm::AdmWarning;
use tl_tree::Tree;
use tl_utils::ascii_upper;
use tl_utils::path::extension;

/// Extensions carrying the textual format.
const TEXT_EXTENSIONS: [&str; 4] = ["DAT", "LAYOUT", "ANIMATION", "HIE"];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Dat(#[from] tl_dat::DatError),

    #[error(transparent)]
    Adm(#[from] tl_adm::AdmError),

    #[error("no loader for the extension of {path}")]
    UnknownExtension { path: PathBuf },
}

/// A warning from either loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileWarning {
    Dat(DatWarning),
    Adm(AdmWarning),
}

impl fmt::Display for FileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileWarning::Dat(w) => w.fmt(f),
            FileWarning::Adm(w) => w.fmt(f),
        }
    }
}

/// Load `path` as a tree, picking the codec from the extension.
pub fn load_tree(path: &Path) -> Result<(Tree, Vec<FileWarning>), LoadError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let ext = ascii_upper(extension(&name));

    if ext == "ADM" {
        let loaded = tl_adm::read_file(path)?;
        let warnings = loaded.warnings.into_iter().map(FileWarning::Adm).collect();
        Ok((loaded.tree, warnings))
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        let loaded = tl_dat::parse_file(path, ParseFlags::default())?;
        let warnings = loaded.warnings.into_iter().map(FileWarning::Dat).collect();
        Ok((loaded.tree, warnings))
    } else {
        Err(LoadError::UnknownExtension {
            path: path.to_path_buf(),
        })
    }
}
