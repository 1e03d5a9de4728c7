use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use fdmgen::{
    fdm::engine::Engine,
    parameters::{parse_str, to_toml_string},
    render::thrust_tables,
};
use log::info;

/// Generates flight dynamics model engine tables from an aircraft description.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Aircraft description (toml)
    model: PathBuf,

    /// Output directory
    #[arg(short = 'd', long, default_value = ".")]
    dir: PathBuf,

    /// Engine output directory [default: DIR/Engines]
    #[arg(long)]
    engines_dir: Option<PathBuf>,

    /// Print the parsed description and exit
    #[arg(long)]
    dump_model: bool,
}

fn main() -> Result<()> {
    // Default log level to "info"
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    pretty_env_logger::init();

    let args = Args::parse();

    let toml_str = fs::read_to_string(&args.model)
        .with_context(|| format!("Cannot read '{}'", args.model.display()))?;
    let mut description = parse_str(&toml_str)
        .with_context(|| format!("Cannot load '{}'", args.model.display()))?;

    if args.dump_model {
        print!("{}", to_toml_string(&description)?);
        return Ok(());
    }

    let engines_dir = args
        .engines_dir
        .unwrap_or_else(|| args.dir.join("Engines"));
    fs::create_dir_all(&engines_dir)
        .with_context(|| format!("Cannot create '{}'", engines_dir.display()))?;

    let grid = description.generate.clone();
    for engine in description.airplane.engines_to_generate() {
        let name = engine.name().unwrap_or_default().to_string();

        let tables = match engine {
            Engine::Jet(jet) => thrust_tables(&name, &jet.thrust_model()?, &grid)?,
        };

        let path = engines_dir.join(format!("{name}.tables"));
        fs::write(&path, tables).with_context(|| format!("Cannot write '{}'", path.display()))?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}
