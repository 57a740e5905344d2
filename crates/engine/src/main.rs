//! fs-engine
//!
//! Command-line front end for the file-system engine.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::config::Config;
use engine::model::{Directory, File, Metadata, RootItem};
use engine::Engine;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// fs-engine - permission-checked file-system operations.
#[derive(Parser, Debug)]
#[command(name = "fs-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List subdirectories
    Ls {
        /// Directory to list
        path: String,

        /// Include hidden entries
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// List files in a directory
    Files {
        /// Directory to list
        path: String,

        /// Include hidden entries
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Show a file or directory
    Info {
        /// Path to inspect
        path: String,
    },

    /// Create a directory
    Mkdir {
        /// Parent directory
        parent: String,

        /// Name of the new directory
        name: String,
    },

    /// Copy a file or directory
    Cp {
        /// Source path
        source: String,

        /// Destination path
        destination: String,

        /// Replace an existing destination instead of picking a copy name
        #[arg(short, long)]
        force: bool,
    },

    /// Move a file or directory
    Mv {
        /// Source path
        source: String,

        /// Destination path
        destination: String,

        /// Replace (file) or merge into (directory) an existing destination
        #[arg(short, long)]
        force: bool,
    },

    /// Rename a file or directory in place
    Rename {
        /// Path to rename
        path: String,

        /// New name
        name: String,
    },

    /// Delete a file or directory
    Rm {
        /// Path to delete
        path: String,
    },

    /// List drives
    Drives,

    /// Split a path into segments
    Parse {
        /// Path to parse
        path: String,
    },

    /// Print the parent directory of a path
    Up {
        /// Path to navigate from
        path: String,
    },

    /// Detect the image type of a file
    Type {
        /// File to inspect
        path: String,
    },

    /// Generate a thumbnail
    Thumb {
        /// Image file
        path: String,

        /// Encoder quality (1-100); defaults to the configured value
        #[arg(short, long)]
        quality: Option<u8>,

        /// Write the thumbnail here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Initialize tracing; logs go to stderr so stdout stays parseable
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.engine.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(config_path) = &cli.config {
        tracing::debug!("Using config file: {:?}", config_path);
    }

    let include_hidden_default = config.listing.include_hidden;
    let default_quality = config.thumbnail.default_quality;
    let engine = Engine::new(config)?;
    let json = cli.json;

    match cli.command {
        Commands::Ls { path, all } => {
            let dirs = engine
                .directories()
                .get_subdirectories(path.as_str(), all || include_hidden_default)?;
            emit(json, &dirs, |dirs| dirs.iter().for_each(print_directory))?;
        }
        Commands::Files { path, all } => {
            let files = engine
                .files()
                .get_files(path.as_str(), all || include_hidden_default)?;
            emit(json, &files, |files| files.iter().for_each(print_file))?;
        }
        Commands::Info { path } => {
            if engine.directories().directory_exists(path.as_str()) {
                let dir = engine.directories().get_directory(path.as_str())?;
                emit(json, &dir, print_directory)?;
            } else {
                let file = engine.files().get_file(path.as_str())?;
                emit(json, &file, print_file)?;
            }
        }
        Commands::Mkdir { parent, name } => {
            let dir = engine
                .directories()
                .create_directory(parent.as_str(), &name)?;
            emit(json, &dir, print_directory)?;
        }
        Commands::Cp {
            source,
            destination,
            force,
        } => {
            if engine.directories().directory_exists(source.as_str()) {
                let dir = engine.directories().copy_directory(
                    source.as_str(),
                    destination.as_str(),
                    force,
                )?;
                emit(json, &dir, print_directory)?;
            } else {
                let file =
                    engine
                        .files()
                        .copy_file(source.as_str(), destination.as_str(), force)?;
                emit(json, &file, print_file)?;
            }
        }
        Commands::Mv {
            source,
            destination,
            force,
        } => {
            if engine.directories().directory_exists(source.as_str()) {
                let dir = engine.directories().move_directory(
                    source.as_str(),
                    destination.as_str(),
                    force,
                )?;
                emit(json, &dir, print_directory)?;
            } else {
                let file =
                    engine
                        .files()
                        .move_file(source.as_str(), destination.as_str(), force)?;
                emit(json, &file, print_file)?;
            }
        }
        Commands::Rename { path, name } => {
            if engine.directories().directory_exists(path.as_str()) {
                let dir = engine
                    .directories()
                    .rename_directory(path.as_str(), &name)?;
                emit(json, &dir, print_directory)?;
            } else {
                let file = engine.files().rename_file(path.as_str(), &name)?;
                emit(json, &file, print_file)?;
            }
        }
        Commands::Rm { path } => {
            if engine.directories().directory_exists(path.as_str()) {
                engine.directories().delete_directory(path.as_str())?;
            } else {
                engine.files().delete_file(path.as_str())?;
            }
            tracing::info!("Deleted {}", path);
        }
        Commands::Drives => {
            let drives = engine.drives().get_drives()?;
            emit(json, &drives, |drives| drives.iter().for_each(print_root))?;
        }
        Commands::Parse { path } => {
            let segments = engine.paths().parse_path(path.as_str())?;
            emit(json, &segments, |segments| {
                for segment in segments {
                    let kind = if segment.is_drive {
                        "root"
                    } else if segment.is_directory {
                        "dir"
                    } else {
                        "file"
                    };
                    println!("{:<5} {}", kind, segment.name);
                }
            })?;
        }
        Commands::Up { path } => {
            let parent = engine.paths().go_up_one_level(path.as_str())?;
            emit(json, &parent, |parent| println!("{}", parent))?;
        }
        Commands::Type { path } => {
            let cancel = cancel_on_ctrl_c();
            let image_type = engine
                .file_types()
                .get_image_type(path.as_str(), &cancel)
                .await?;
            emit(json, &image_type, |ty| println!("{}", ty))?;
        }
        Commands::Thumb {
            path,
            quality,
            output,
        } => {
            let cancel = cancel_on_ctrl_c();
            let thumbnail = engine
                .thumbnails()
                .get_thumbnail(path.as_str(), quality.unwrap_or(default_quality), &cancel)
                .await?;

            match output {
                Some(out) => {
                    std::fs::write(&out, &thumbnail.bytes).with_context(|| {
                        format!("Failed to write thumbnail: {}", out.display())
                    })?;
                    println!(
                        "{} thumbnail of {} ({} bytes) written to {}",
                        thumbnail.format.mime_type(),
                        thumbnail.image_type,
                        thumbnail.bytes.len(),
                        out.display()
                    );
                }
                None => {
                    println!(
                        "{} thumbnail of {} ({} bytes)",
                        thumbnail.format.mime_type(),
                        thumbnail.image_type,
                        thumbnail.bytes.len()
                    );
                }
            }
        }
    }

    Ok(())
}

/// Token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            child.cancel();
        }
    });
    token
}

/// Print `value` as JSON, or with `human` otherwise.
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{}", out);
    } else {
        human(value);
    }
    Ok(())
}

fn print_directory(dir: &Directory) {
    match &dir.metadata {
        Metadata::Accessible(_) => println!("{}/\t{}", dir.name, dir.id),
        Metadata::Inaccessible => println!("{}/\t{}\t(inaccessible)", dir.name, dir.id),
    }
}

fn print_file(file: &File) {
    match file.size() {
        Some(size) => println!("{}\t{}\t{} bytes", file.name, file.id, size),
        None => println!("{}\t{}\t(inaccessible)", file.name, file.id),
    }
}

fn print_root(root: &RootItem) {
    match root {
        RootItem::Unix { directory } => println!("{}", directory.id),
        RootItem::Windows { drive, directory } => {
            println!("{}\t{}", drive.root, directory.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ls_command() {
        let cli = Cli::try_parse_from(["fs-engine", "ls", "/tmp", "-a"]).unwrap();
        match cli.command {
            Commands::Ls { path, all } => {
                assert_eq!(path, "/tmp");
                assert!(all);
            }
            _ => panic!("Expected Ls command"),
        }
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fs-engine",
            "drives",
            "--json",
            "--verbose",
            "--config",
            "/etc/fs-engine.toml",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/fs-engine.toml")));
        assert!(matches!(cli.command, Commands::Drives));
    }

    #[test]
    fn test_cp_force() {
        let cli = Cli::try_parse_from(["fs-engine", "cp", "/a", "/b", "--force"]).unwrap();
        match cli.command {
            Commands::Cp {
                source,
                destination,
                force,
            } => {
                assert_eq!(source, "/a");
                assert_eq!(destination, "/b");
                assert!(force);
            }
            _ => panic!("Expected Cp command"),
        }
    }

    #[test]
    fn test_thumb_options() {
        let cli = Cli::try_parse_from([
            "fs-engine", "thumb", "/p.png", "-q", "60", "-o", "/tmp/t.jpg",
        ])
        .unwrap();
        match cli.command {
            Commands::Thumb {
                path,
                quality,
                output,
            } => {
                assert_eq!(path, "/p.png");
                assert_eq!(quality, Some(60));
                assert_eq!(output, Some(PathBuf::from("/tmp/t.jpg")));
            }
            _ => panic!("Expected Thumb command"),
        }
    }

    #[test]
    fn test_missing_argument_rejected() {
        assert!(Cli::try_parse_from(["fs-engine", "rename", "/a"]).is_err());
        assert!(Cli::try_parse_from(["fs-engine", "mkdir"]).is_err());
    }
}
