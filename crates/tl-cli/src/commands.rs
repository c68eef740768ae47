use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tl_compiler::{Config, ModCompiler};
use tl_dat::ParseFlags;

/// `tlmod compile [config]`.
pub fn compile(config_path: &Path) -> Result<i32> {
    let mut config_warnings = Vec::new();
    let config = match Config::load(config_path, &mut config_warnings) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: could not load configuration file ({e}), using defaults");
            Config::default()
        }
    };
    for w in &config_warnings {
        eprintln!("warning: {w}");
    }

    let mut compiler = ModCompiler::new(&config.output_dir);
    compiler.set_merge_classes(config.merge_class_mods);
    let mut printed_warnings = 0;

    eprintln!("Loading original game data");
    if let Err(e) = compiler.add_mod(&config.original_game_data) {
        eprintln!("error: could not load original game data: {e}");
        return Ok(1);
    }

    let mut had_warning = false;
    let discovered = if config.look_for_new {
        discover_mods(&config.mod_dir, &mut had_warning)
    } else {
        Vec::new()
    };

    for mod_config in config.ordered_mods(discovered) {
        if !mod_config.enabled {
            continue;
        }
        eprintln!("Loading mod {}", mod_config.name);
        if let Err(e) = compiler.add_mod(&config.mod_dir.join(&mod_config.name)) {
            eprintln!("warning: could not load mod {}: {e}", mod_config.name);
            eprintln!("warning: mod {} skipped", mod_config.name);
            had_warning = true;
        }
    }
    print_new_warnings(&compiler, &mut printed_warnings);

    if had_warning && !confirm_continue()? {
        return Ok(1);
    }

    compiler.compile().context("compilation failed")?;
    print_new_warnings(&compiler, &mut printed_warnings);

    eprintln!();
    eprintln!(
        "Done! Now pack the 'media' directory in {} into a ZIP archive called \
         'pak.zip' and replace the one in the game directory.",
        config.output_dir.display()
    );
    eprintln!("Don't forget to back up your save files first.");

    Ok(0)
}

/// `tlmod dat2adm in [out]`.
pub fn dat2adm(input: &Path, output: Option<&Path>) -> Result<()> {
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| {
        let mut path = input.as_os_str().to_owned();
        path.push(".adm");
        PathBuf::from(path)
    });

    let loaded = tl_dat::parse_file(input, ParseFlags::default())
        .with_context(|| format!("cannot parse {}", input.display()))?;
    for w in &loaded.warnings {
        eprintln!("warning: {w}");
    }

    tl_adm::write_file(&output, &loaded.tree)
        .with_context(|| format!("cannot write {}", output.display()))
}

/// `tlmod adm2dat in [out]`.
pub fn adm2dat(input: &Path, output: Option<&Path>) -> Result<()> {
    let loaded =
        tl_adm::read_file(input).with_context(|| format!("cannot read {}", input.display()))?;
    for w in &loaded.warnings {
        eprintln!("warning: {w}");
    }

    match output {
        Some(path) => tl_dat::dump_file(path, &loaded.tree)
            .with_context(|| format!("cannot write {}", path.display())),
        None => {
            print!("{}", tl_dat::dump(&loaded.tree));
            Ok(())
        }
    }
}

/// Subdirectories of the mod directory, for `LOOK_FOR_NEW`.
fn discover_mods(mod_dir: &Path, had_warning: &mut bool) -> Vec<String> {
    match fs::read_dir(mod_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            eprintln!("warning: cannot open mod directory: {e}");
            *had_warning = true;
            Vec::new()
        }
    }
}

fn print_new_warnings(compiler: &ModCompiler, printed: &mut usize) {
    for w in &compiler.warnings()[*printed..] {
        eprintln!("warning: {w}");
    }
    *printed = compiler.warnings().len();
}

/// Ask the operator whether to continue after load warnings. Only an
/// explicit `y`/`Y` continues.
fn confirm_continue() -> Result<bool> {
    eprint!(
        "There were warnings while loading mods. Continue and risk game \
         crashes and corrupted save data? [y/N]: "
    );

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y"))
}
