//! unity-texswap: extract and replace textures in Unity asset files.
//!
//! ```bash
//! # web front end
//! unity-texswap serve --port 8080
//!
//! # one-shot operations
//! unity-texswap list sharedassets0.assets
//! unity-texswap extract sharedassets0.assets -o out/
//! unity-texswap replace sharedassets0.assets -1234 new.png patched.assets
//! unity-texswap dump sharedassets0.assets 42
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use unity_texswap::config::Config;
use unity_texswap::handler::output_name;
use unity_texswap::replace::{extract_image, replace_image};
use unity_texswap::{web, Env};

#[derive(Parser)]
#[command(name = "unity-texswap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract and replace Texture2D/Sprite images in Unity asset files", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web front end
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding uploads/, extracted/ and modified/
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Write every texture and sprite as PNG
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, default_value = "extracted")]
        output: PathBuf,
    },

    /// Replace one image and write the patched file
    Replace {
        #[arg(value_name = "ASSETS")]
        assets: PathBuf,

        #[arg(value_name = "PATH_ID", allow_negative_numbers = true)]
        path_id: i64,

        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// List objects with class, path id and name
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print an object's fields as JSON
    Dump {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "PATH_ID", allow_negative_numbers = true)]
        path_id: i64,
    },
}

fn load(file: &Path) -> Result<Env> {
    let mut env = Env::new();
    env.load_file(file).with_context(|| format!("failed to load {}", file.display()))?;
    Ok(env)
}

fn serve(mut config: Config, host: Option<String>, port: Option<u16>, data_dir: Option<PathBuf>) -> Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    runtime
        .block_on(web::serve(&config))
        .with_context(|| format!("server on {} failed", config.address()))
}

fn extract(file: &Path, output: &Path) -> Result<()> {
    let env = load(file)?;
    fs::create_dir_all(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut used = HashSet::new();
    let mut count = 0;
    for object in env.objects().filter(|o| o.class().is_image()) {
        let type_ = object.class().name();
        let image = match extract_image(&object) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("skipping {type_} {}: {e}", object.path_id());
                continue;
            }
        };
        let (name, file) = output_name(&mut used, object.name(), &type_, object.path_id());
        let path = output.join(&file);
        image.save(&path).with_context(|| format!("failed to write {}", path.display()))?;
        println!("{type_:<10} {:>20}  {name}", object.path_id());
        count += 1;
    }
    log::info!("wrote {count} image(s) to {}", output.display());
    Ok(())
}

fn replace(assets: &Path, path_id: i64, image: &Path, output: &Path) -> Result<()> {
    let mut env = load(assets)?;
    let replacement = image::open(image)
        .with_context(|| format!("failed to open {}", image.display()))?
        .to_rgba8();
    let report = replace_image(&mut env, path_id, &replacement)?;
    let data = env.save().context("failed to serialize the patched file")?;
    fs::write(output, &data).with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "replaced {:?} {} ({}x{}) as {:?}{}",
        report.class,
        report.name,
        report.original_size.0,
        report.original_size.1,
        report.format,
        if report.fallback { " (fallback)" } else { "" }
    );
    Ok(())
}

fn list(file: &Path) -> Result<()> {
    let env = load(file)?;
    for object in env.objects() {
        println!(
            "{:<20} {:>20}  {}",
            object.class().name(),
            object.path_id(),
            object.name().unwrap_or_default()
        );
    }
    Ok(())
}

fn dump(file: &Path, path_id: i64) -> Result<()> {
    let env = load(file)?;
    let Some(object) = env.find_object(path_id) else {
        bail!("no object with path id {path_id} in {}", file.display());
    };
    let value = object.read_value().with_context(|| format!("failed to read {:?} {path_id}", object.class()))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    log::debug!("{config:?}");

    match cli.command {
        Commands::Serve { host, port, data_dir } => serve(config, host, port, data_dir),
        Commands::Extract { file, output } => extract(&file, &output),
        Commands::Replace { assets, path_id, image, output } => replace(&assets, path_id, &image, &output),
        Commands::List { file } => list(&file),
        Commands::Dump { file, path_id } => dump(&file, path_id),
    }
}
