// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Content catalog tool: packs RON manifests, inspects catalog blobs and
// loads objects from disk through the runtime content manager.

mod commands;
mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use khora_content_core::ContentConfig;

#[derive(Parser, Debug)]
#[command(
    name = "khora-content-runtime",
    about = "Pack, inspect and load Khora content catalogs",
    version
)]
struct Cli {
    /// RON file overriding the default content configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a catalog blob from a RON manifest.
    Pack {
        manifest: PathBuf,
        /// Where to write the catalog.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the content of a catalog blob.
    Inspect {
        catalog: PathBuf,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Load objects from disk, report them and release them.
    Load {
        catalog: PathBuf,
        /// Object to load, as UUID text or name. Repeatable.
        #[arg(long = "object", required = true)]
        objects: Vec<String>,
        /// Per-object wait, in milliseconds. Zero waits forever.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn load_config(path: Option<&Path>) -> Result<ContentConfig> {
    let Some(path) = path else {
        return Ok(ContentConfig::default());
    };
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ContentConfig = ron::de::from_str(&source)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Pack { manifest, output } => commands::pack::run(&manifest, &output),
        Command::Inspect { catalog, json } => commands::inspect::run(&catalog, json),
        Command::Load {
            catalog,
            objects,
            timeout_ms,
        } => commands::load::run(config, &catalog, &objects, timeout_ms),
    }
}
