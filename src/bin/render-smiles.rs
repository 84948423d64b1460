use anyhow::{Context, Result};
use clap::Parser;
use molsynth::{init_logging, render_smiles, DrawOptions};
use std::path::PathBuf;

/// Renders a single SMILES string to a clean PNG.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    smiles: String,

    #[arg(short, long, default_value = "molecule.png")]
    output: PathBuf,

    /// Width and height in pixels
    #[arg(long, default_value_t = 256)]
    size: u32,

    #[arg(long, default_value_t = 2.0)]
    bond_width: f32,

    #[arg(long)]
    monochrome: bool,
}

fn main() -> Result<()> {
    init_logging("warn");
    let args = Args::parse();

    let options = DrawOptions {
        bond_width: args.bond_width,
        atom_colors: !args.monochrome,
        ..DrawOptions::with_size(args.size)
    };
    let image = render_smiles(&args.smiles, &options)
        .with_context(|| format!("Failed to render {}", args.smiles))?;
    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("{} -> {}", args.smiles, args.output.display());
    Ok(())
}
