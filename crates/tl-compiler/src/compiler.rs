//! The compile orchestrator.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tl_tree::{MergeMode, Tree};
use tl_utils::path::{backslashes_to_slashes, extension};
use tl_utils::{ascii_upper, ModPath};
use tl_vfs::{FileEntry, ModDirectory, VfsError, VfsWarning};

use crate::charcreate;
use crate::load::{load_tree, FileWarning, LoadError};
use crate::massfile::MassFile;
use crate::units::{MasterResourceUnits, ResourceGroup};

/// Longest accepted `BASEFILE` chain. Real data stays in single digits;
/// anything near this bound is a reference cycle.
const MAX_BASE_CHAIN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error("cannot load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("cannot find base file {base} needed by {needed_by}")]
    MissingBaseFile { base: String, needed_by: String },

    #[error("base file chain of {path} exceeds {limit} links, is it cyclic?")]
    BaseFileChainTooDeep { path: String, limit: usize },

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything the compiler wants the operator to see without stopping.
#[derive(Debug)]
pub enum CompileWarning {
    Overlay(VfsWarning),
    File {
        path: PathBuf,
        warning: FileWarning,
    },
    /// A unit file that belongs to none of the four resource groups; it is
    /// compiled but not catalogued.
    UnknownResourceGroup { path: String },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::Overlay(w) => w.fmt(f),
            CompileWarning::File { path, warning } => {
                write!(f, "{}: {warning}", path.display())
            }
            CompileWarning::UnknownResourceGroup { path } => {
                write!(f, "no resource group for {path}, not catalogued")
            }
        }
    }
}

/// Which of the compiled-file categories a logical file falls into.
struct ExtInfo {
    is_dat: bool,
    is_animation: bool,
    is_layout: bool,
    /// Whether the winning on-disk source is the compiled form.
    is_adm: bool,
}

/// Owns the virtual directory, the aggregate manifests, and the class/pet
/// registries for one compilation.
pub struct ModCompiler {
    files: ModDirectory,
    massfile: MassFile,
    units: MasterResourceUnits,
    classes: BTreeMap<String, String>,
    pets: BTreeMap<String, String>,
    output_dir: PathBuf,
    merge_classes: bool,
    warnings: Vec<CompileWarning>,
}

impl ModCompiler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ModCompiler {
            files: ModDirectory::new(),
            massfile: MassFile::new(),
            units: MasterResourceUnits::new(),
            classes: BTreeMap::new(),
            pets: BTreeMap::new(),
            output_dir: output_dir.into(),
            merge_classes: false,
            warnings: Vec::new(),
        }
    }

    /// Enable the character-select stub generation.
    pub fn set_merge_classes(&mut self, merge: bool) {
        self.merge_classes = merge;
    }

    /// Layer the mod at `path` over everything added so far. Call in
    /// ascending priority order: the last layer added wins.
    pub fn add_mod(&mut self, path: &Path) -> Result<(), VfsError> {
        let mut layer = ModDirectory::new();
        let mut overlay_warnings = Vec::new();
        layer.load_dir(path, &mut overlay_warnings)?;
        self.files.overlay(layer, &mut overlay_warnings);
        self.warnings
            .extend(overlay_warnings.into_iter().map(CompileWarning::Overlay));
        Ok(())
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// Class registry (name → display name), populated by `compile`.
    pub fn classes(&self) -> &BTreeMap<String, String> {
        &self.classes
    }

    /// Pet registry (name → display name), populated by `compile`.
    pub fn pets(&self) -> &BTreeMap<String, String> {
        &self.pets
    }

    /// Compile the layered tree into the output directory.
    pub fn compile(&mut self) -> Result<(), CompileError> {
        // The walk reads the virtual tree while the manifests and
        // registries grow; taking it out keeps the borrows disjoint.
        let files = std::mem::take(&mut self.files);
        let result = self.run(&files);
        self.files = files;
        result
    }

    fn run(&mut self, files: &ModDirectory) -> Result<(), CompileError> {
        self.scan_classes(files);

        create_dir(&self.output_dir)?;

        struct Frame<'a> {
            dir: &'a ModDirectory,
            out: PathBuf,
            mod_dir: ModPath,
            upper: ModPath,
        }

        let mut stack = vec![Frame {
            dir: files,
            out: self.output_dir.clone(),
            mod_dir: ModPath::default(),
            upper: ModPath::default(),
        }];

        while let Some(frame) = stack.pop() {
            for entry in frame.dir.file_entries() {
                self.process_file(files, entry, &frame.out, &frame.mod_dir, &frame.upper)?;
            }

            // Reversed push so the depth-first order follows the map order.
            let subdirs: Vec<_> = frame.dir.dir_entries().collect();
            for (name, dir) in subdirs.into_iter().rev() {
                let out = frame.out.join(name);
                create_dir(&out)?;
                stack.push(Frame {
                    dir,
                    out,
                    mod_dir: frame.mod_dir.join(name),
                    upper: frame.upper.join(&ascii_upper(name)),
                });
            }
        }

        let path = self.output_dir.join("media/MASSFILE.DAT.ADM");
        tl_adm::write_file(&path, self.massfile.tree())
            .map_err(|source| CompileError::WriteOutput { path, source })?;

        let path = self.output_dir.join("media/MASTERRESOURCEUNITS.DAT.ADM");
        tl_adm::write_file(&path, self.units.tree())
            .map_err(|source| CompileError::WriteOutput { path, source })?;

        if self.merge_classes {
            self.write_charcreate(files)?;
        }

        Ok(())
    }

    /// Populate the class registry from `MEDIA/UNITS/PLAYERS/<x>/<x>.dat`
    /// files. A player file that fails to load or lacks the expected shape
    /// is skipped: classes are a convenience, not a compile input.
    fn scan_classes(&mut self, files: &ModDirectory) {
        let Some(players) = files.lookup_dir("MEDIA/UNITS/PLAYERS") else {
            return;
        };

        for (dir_name, dir) in players.dir_entries() {
            let Some(entry) = dir.file_entry(&format!("{dir_name}.dat")) else {
                continue;
            };
            let Ok((tree, _)) = load_tree(entry.front()) else {
                continue;
            };

            let root = tree.root();
            if tree.find_str("UNIT") != Some(tree.name(root)) {
                continue;
            }
            let Some(name) = tree.find_attr(root, "NAME").and_then(|v| v.plain_str_id())
            else {
                continue;
            };
            let name = tree.resolve(name).to_string();
            let display = tree
                .find_attr(root, "DISPLAYNAME")
                .and_then(|v| v.str_id())
                .map(|id| tree.resolve(id).to_string())
                .unwrap_or_else(|| name.clone());

            self.classes.insert(name, display);
        }
    }

    fn process_file(
        &mut self,
        files: &ModDirectory,
        entry: &FileEntry,
        out_dir: &Path,
        mod_dir: &ModPath,
        upper: &ModPath,
    ) -> Result<(), CompileError> {
        let logical = entry.name();
        let ext = ascii_upper(extension(logical));
        let front_name = entry
            .front()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut info = ExtInfo {
            is_dat: ext == "DAT",
            is_animation: ext == "ANIMATION",
            is_layout: ext == "LAYOUT",
            is_adm: ascii_upper(extension(&front_name)) == "ADM",
        };

        // UI layouts are read by the engine in source form; a textual one
        // is passed through instead of compiled.
        if info.is_layout && !info.is_adm && upper.starts_with_dir("MEDIA/UI") {
            info.is_layout = false;
        }

        if info.is_dat || info.is_animation || info.is_layout {
            self.process_dat(files, entry, out_dir, mod_dir, upper, &info)
        } else {
            copy_file(entry.front(), &out_dir.join(logical))
        }
    }

    fn process_dat(
        &mut self,
        files: &ModDirectory,
        entry: &FileEntry,
        out_dir: &Path,
        mod_dir: &ModPath,
        upper: &ModPath,
        info: &ExtInfo,
    ) -> Result<(), CompileError> {
        let logical = entry.name();
        let source = entry.front();

        let (mut tree, file_warnings) =
            load_tree(source).map_err(|source_err| CompileError::Load {
                path: source.to_path_buf(),
                source: source_err,
            })?;
        self.note_file_warnings(source, file_warnings);

        // Layouts keep their textual original next to the compiled form.
        if info.is_layout && !info.is_adm {
            copy_file(source, &out_dir.join(logical))?;
        }

        if (info.is_dat || info.is_animation) && MassFile::is_whitelisted(upper) {
            self.massfile
                .add(&tree, upper.join(&ascii_upper(logical)).as_str());
        } else if info.is_dat && upper.starts_with_dir("MEDIA/UNITS") {
            self.add_to_units(files, entry, mod_dir, upper, &mut tree)?;
        }

        let path = out_dir.join(format!("{logical}.adm"));
        tl_adm::write_file(&path, &tree)
            .map_err(|source| CompileError::WriteOutput { path, source })
    }

    /// Resolve the base-file chain, run the per-group extras, and append
    /// the unit to the catalogue. `tree` ends up as the fully merged unit,
    /// which is also what gets written to the output.
    fn add_to_units(
        &mut self,
        files: &ModDirectory,
        entry: &FileEntry,
        mod_dir: &ModPath,
        upper: &ModPath,
        tree: &mut Tree,
    ) -> Result<(), CompileError> {
        if tree
            .find_attr(tree.root(), "DONTCREATE")
            .and_then(|v| v.as_bool())
            == Some(true)
        {
            return Ok(());
        }

        // Follow BASEFILE links, stacking each derived tree, until a file
        // without one. The stack then unwinds youngest-base-first: root
        // attributes of derived files overwrite, deeper nodes accumulate.
        let mut derived: Vec<Tree> = Vec::new();
        loop {
            let Some(base) = tree
                .find_attr(tree.root(), "BASEFILE")
                .and_then(|v| v.plain_str_id())
            else {
                break;
            };
            let base_path = backslashes_to_slashes(tree.resolve(base));

            if derived.len() >= MAX_BASE_CHAIN {
                return Err(CompileError::BaseFileChainTooDeep {
                    path: mod_dir.join(entry.name()).as_str().to_string(),
                    limit: MAX_BASE_CHAIN,
                });
            }

            let Some(base_entry) = files.lookup_file(&base_path) else {
                return Err(CompileError::MissingBaseFile {
                    base: base_path,
                    needed_by: mod_dir.join(entry.name()).as_str().to_string(),
                });
            };

            let (base_tree, file_warnings) =
                load_tree(base_entry.front()).map_err(|source| CompileError::Load {
                    path: base_entry.front().to_path_buf(),
                    source,
                })?;
            self.note_file_warnings(base_entry.front(), file_warnings);

            derived.push(std::mem::replace(tree, base_tree));
        }
        while let Some(d) = derived.pop() {
            let root = tree.root();
            tree.merge_from(root, &d, d.root(), MergeMode::ReplaceAtRoot);
        }

        if upper.starts_with_dir("MEDIA/UNITS/ITEMS") {
            self.merge_wardrobes(entry, tree);
        } else if upper.starts_with_dir("MEDIA/UNITS/MONSTERS") {
            try_add_pet(tree, &mut self.pets);
        }

        match ResourceGroup::from_dir(upper) {
            Some(group) => self.units.add_unit(group, entry.name(), upper, tree),
            None => self.warnings.push(CompileWarning::UnknownResourceGroup {
                path: mod_dir.join(entry.name()).as_str().to_string(),
            }),
        }

        Ok(())
    }

    /// Per-class wardrobe recovery for item files.
    ///
    /// Within the current tree, `WARDROBE` subnodes deduplicate by
    /// upper-cased `CLASS` (first wins). Then every overridden version of
    /// the file is re-read, and wardrobes for classes the current file does
    /// not know are appended: a file-level override must not strip another
    /// mod's class of its item rendering. Older files that no longer parse
    /// are skipped; the current file stays authoritative.
    fn merge_wardrobes(&mut self, entry: &FileEntry, tree: &mut Tree) {
        let root = tree.root();
        let mut seen: HashSet<String> = HashSet::new();

        if let (Some(wardrobe), Some(class)) = (tree.find_str("WARDROBE"), tree.find_str("CLASS"))
        {
            let mut duplicates = Vec::new();
            for &child in tree.children(root) {
                if tree.name(child) != wardrobe {
                    continue;
                }
                let Some(class_id) = tree.attr(child, class).and_then(|v| v.plain_str_id())
                else {
                    continue;
                };
                if !seen.insert(ascii_upper(tree.resolve(class_id))) {
                    duplicates.push(child);
                }
            }
            for child in duplicates {
                tree.remove_child(root, child);
            }
        }

        for older in entry.older_sources() {
            let Ok((prev, _)) = load_tree(older) else {
                continue;
            };
            let (Some(wardrobe), Some(class)) = (prev.find_str("WARDROBE"), prev.find_str("CLASS"))
            else {
                continue;
            };

            for &node in prev.children(prev.root()) {
                if prev.name(node) != wardrobe {
                    continue;
                }
                let Some(class_id) = prev.attr(node, class).and_then(|v| v.plain_str_id())
                else {
                    continue;
                };
                let key = ascii_upper(prev.resolve(class_id));
                if !seen.insert(key) {
                    continue;
                }

                let name = tree.intern("WARDROBE");
                let new_node = tree.add_child(root, name);
                tree.merge_from(new_node, &prev, node, MergeMode::DontReplace);
            }
        }
    }

    fn write_charcreate(&mut self, files: &ModDirectory) -> Result<(), CompileError> {
        let Some((media_name, media)) = files.dir_entry("media") else {
            return Ok(());
        };
        let mut path = self.output_dir.join(media_name);

        match media.dir_entry("UI") {
            Some((ui_name, ui_dir)) => {
                path.push(ui_name);
                let file_name = ui_dir
                    .file_entry("charactercreate.layout")
                    .map(|e| e.name().to_string())
                    .unwrap_or_else(|| "charactercreate.layout".to_string());
                path.push(file_name);
            }
            None => {
                path.push("UI");
                create_dir(&path)?;
                path.push("charactercreate.layout");
            }
        }

        fs::write(&path, charcreate::render(&self.classes, &self.pets))
            .map_err(|source| CompileError::WriteOutput { path, source })
    }

    fn note_file_warnings(&mut self, path: &Path, warnings: Vec<FileWarning>) {
        self.warnings
            .extend(warnings.into_iter().map(|warning| CompileWarning::File {
                path: path.to_path_buf(),
                warning,
            }));
    }
}

/// Pet detection for monster files: root `UNIT` with `UNITTYPE` equal to
/// the interned string `PET` and a plain-string `NAME`. The display name
/// falls back to the name itself.
fn try_add_pet(tree: &Tree, pets: &mut BTreeMap<String, String>) {
    let root = tree.root();
    if tree.find_str("UNIT") != Some(tree.name(root)) {
        return;
    }
    let Some(pet) = tree.find_str("PET") else {
        return;
    };
    if tree
        .find_attr(root, "UNITTYPE")
        .and_then(|v| v.plain_str_id())
        != Some(pet)
    {
        return;
    }
    let Some(name) = tree.find_attr(root, "NAME").and_then(|v| v.plain_str_id()) else {
        return;
    };

    let name = tree.resolve(name).to_string();
    let display = tree
        .find_attr(root, "DISPLAYNAME")
        .and_then(|v| v.str_id())
        .map(|id| tree.resolve(id).to_string())
        .unwrap_or_else(|| name.clone());

    pets.insert(name, display);
}

fn create_dir(path: &Path) -> Result<(), CompileError> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }

    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(CompileError::CreateDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), CompileError> {
    fs::copy(from, to).map(|_| ()).map_err(|source| CompileError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
