mod commands;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tlmod", about = "A mod compiler for DAT/ADM asset trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the original game data and all enabled mods
    Compile {
        /// Path to the configuration file
        #[arg(default_value = "./tlmodder.cfg")]
        config: PathBuf,
    },

    /// Compile one textual file to its binary form
    Dat2adm {
        input: PathBuf,
        /// Defaults to the input path with ".adm" appended
        output: Option<PathBuf>,
    },

    /// Dump one binary file as text
    Adm2dat {
        input: PathBuf,
        /// Defaults to standard output
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Compile { config } => commands::compile(&config),
        Commands::Dat2adm { input, output } => {
            commands::dat2adm(&input, output.as_deref())?;
            Ok(0)
        }
        Commands::Adm2dat { input, output } => {
            commands::adm2dat(&input, output.as_deref())?;
            Ok(0)
        }
    }
}
