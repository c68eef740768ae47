//! The `tlmodder.cfg` configuration file.
//!
//! The tool's own configuration is a DAT tree with root `TLMODDER`.
//! Recognized names are coerced with warn-and-default semantics: a type
//! mismatch or an unknown name is reported and ignored, never fatal.

use std::fmt;
use std::path::{Path, PathBuf};

use tl_dat::{DatError, ParseFlags};
use tl_tree::Value;

/// One `MOD` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModConfig {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
}

/// Compiler configuration with its defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub mod_dir: PathBuf,
    pub original_game_data: PathBuf,
    pub output_dir: PathBuf,
    pub merge_class_mods: bool,
    pub look_for_new: bool,
    pub mods: Vec<ModConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mod_dir: PathBuf::from("./mods"),
            original_game_data: PathBuf::from("./original"),
            output_dir: PathBuf::from("./output"),
            merge_class_mods: false,
            look_for_new: true,
            mods: Vec::new(),
        }
    }
}

/// Recoverable configuration oddities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    WrongRootName { found: String },
    TypeMismatch { attribute: String, expected: &'static str },
    UnknownAttribute { name: String },
    UnknownNode { name: String },
    DuplicateMod { name: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::WrongRootName { found } => {
                write!(f, "configuration file root node should be called TLMODDER, found \"{found}\"")
            }
            ConfigWarning::TypeMismatch { attribute, expected } => {
                write!(f, "attribute {attribute} should be of type {expected}")
            }
            ConfigWarning::UnknownAttribute { name } => {
                write!(f, "ignoring unknown attribute {name}")
            }
            ConfigWarning::UnknownNode { name } => {
                write!(f, "skipping unknown node {name}")
            }
            ConfigWarning::DuplicateMod { name } => {
                write!(f, "mod {name} listed more than once, using the first settings")
            }
        }
    }
}

impl Config {
    /// Load a configuration file. A file that cannot be read or parsed is
    /// an error; the caller decides whether to fall back to defaults.
    pub fn load(path: &Path, warnings: &mut Vec<ConfigWarning>) -> Result<Config, DatError> {
        let loaded = tl_dat::parse_file(path, ParseFlags::default())?;
        let tree = loaded.tree;
        let root = tree.root();
        let mut config = Config::default();

        if tree.name_str(root) != "TLMODDER" {
            warnings.push(ConfigWarning::WrongRootName {
                found: tree.name_str(root).to_string(),
            });
        }

        for &(name, value) in tree.attrs(root) {
            let name = tree.resolve(name);
            match name {
                "MOD_DIR" => match plain_str(&tree, &value) {
                    Some(v) => config.mod_dir = PathBuf::from(v),
                    None => warnings.push(mismatch(name, "STRING")),
                },
                "ORIGINAL_GAME_DATA" => match plain_str(&tree, &value) {
                    Some(v) => config.original_game_data = PathBuf::from(v),
                    None => warnings.push(mismatch(name, "STRING")),
                },
                "OUTPUT_DIR" => match plain_str(&tree, &value) {
                    Some(v) => config.output_dir = PathBuf::from(v),
                    None => warnings.push(mismatch(name, "STRING")),
                },
                "MERGE_CLASS_MODS" => match value.as_bool() {
                    Some(v) => config.merge_class_mods = v,
                    None => warnings.push(mismatch(name, "BOOL")),
                },
                "LOOK_FOR_NEW" => match value.as_bool() {
                    Some(v) => config.look_for_new = v,
                    None => warnings.push(mismatch(name, "BOOL")),
                },
                other => warnings.push(ConfigWarning::UnknownAttribute {
                    name: other.to_string(),
                }),
            }
        }

        for &node in tree.children(root) {
            if tree.name_str(node) != "MOD" {
                warnings.push(ConfigWarning::UnknownNode {
                    name: tree.name_str(node).to_string(),
                });
                continue;
            }

            let mut mod_config = ModConfig {
                name: String::new(),
                priority: 0,
                enabled: true,
            };

            for &(name, value) in tree.attrs(node) {
                let name = tree.resolve(name);
                match name {
                    "NAME" => match plain_str(&tree, &value) {
                        Some(v) => mod_config.name = v.to_string(),
                        None => warnings.push(mismatch(name, "STRING")),
                    },
                    "PRIORITY" => match value.as_i32() {
                        Some(v) => mod_config.priority = v,
                        None => warnings.push(mismatch(name, "INTEGER")),
                    },
                    "ENABLED" => match value.as_bool() {
                        Some(v) => mod_config.enabled = v,
                        None => warnings.push(mismatch(name, "BOOL")),
                    },
                    other => warnings.push(ConfigWarning::UnknownAttribute {
                        name: other.to_string(),
                    }),
                }
            }

            if mod_config.name.is_empty() {
                continue;
            }
            if config.mods.iter().any(|m| m.name == mod_config.name) {
                warnings.push(ConfigWarning::DuplicateMod {
                    name: mod_config.name,
                });
                continue;
            }
            config.mods.push(mod_config);
        }

        Ok(config)
    }

    /// Configured mods plus `discovered` directory names not already
    /// configured (at minimum priority), in ascending (priority, name)
    /// order, which is the order they must be layered in.
    pub fn ordered_mods(&self, discovered: impl IntoIterator<Item = String>) -> Vec<ModConfig> {
        let mut mods = self.mods.clone();
        for name in discovered {
            if !self.mods.iter().any(|m| m.name == name) {
                mods.push(ModConfig {
                    name,
                    priority: i32::MIN,
                    enabled: true,
                });
            }
        }
        mods.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));
        mods
    }
}

fn mismatch(attribute: &str, expected: &'static str) -> ConfigWarning {
    ConfigWarning::TypeMismatch {
        attribute: attribute.to_string(),
        expected,
    }
}

/// The payload text of a plain `STRING` value (`TRANSLATE` does not count
/// for configuration).
fn plain_str<'t>(tree: &'t tl_tree::Tree, value: &Value) -> Option<&'t str> {
    value.plain_str_id().map(|id| tree.resolve(id))
}
