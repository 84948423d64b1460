use anyhow::{bail, Context, Result};
use clap::Parser;
use molsynth::output::{DatasetLayout, Split};
use molsynth::pipeline::{run, GeneratorConfig, InvalidPolicy};
use molsynth::init_logging;
use std::path::PathBuf;
use tracing::info;

/// Generates a dataset of hand-drawn-looking chemical structure images from
/// a file of SMILES strings.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text file with one SMILES per line; only the first field is used
    input: PathBuf,

    /// Directory of .png background textures
    #[arg(short, long, default_value = "../backgrounds")]
    backgrounds: PathBuf,

    /// Dataset root directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Dataset size label, the first directory level under the root
    #[arg(long, default_value = "temp")]
    size: String,

    #[arg(long, value_enum, default_value_t = Split::Train)]
    split: Split,

    /// Share of the background in the composite, between 0 and 1
    #[arg(long, default_value_t = 0.3)]
    blend_weight: f32,

    /// Width and height of the output images in pixels
    #[arg(long, default_value_t = 256)]
    image_size: u32,

    #[arg(long, default_value_t = 1.0)]
    bond_width_min: f32,

    #[arg(long, default_value_t = 7.0)]
    bond_width_max: f32,

    /// Seed for reproducible runs; drawn at random when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Index given to the first descriptor
    #[arg(long, default_value_t = 0)]
    start_index: u64,

    /// What to do with descriptors that cannot be rendered
    #[arg(long, value_enum, default_value_t = InvalidPolicy::Skip)]
    on_invalid: InvalidPolicy,

    /// Do not write <split>_labels.csv
    #[arg(long)]
    no_labels: bool,

    /// Skip augmentation and degradation; backgrounds are only resized
    #[arg(long)]
    no_augment: bool,

    /// Draw heteroatoms in black
    #[arg(long)]
    monochrome: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> GeneratorConfig {
        GeneratorConfig {
            blend_weight: self.blend_weight,
            image_size: self.image_size,
            bond_width: (self.bond_width_min, self.bond_width_max),
            seed: self.seed,
            start_index: self.start_index,
            on_invalid: self.on_invalid,
            write_labels: !self.no_labels,
            augment: !self.no_augment,
            atom_colors: !self.monochrome,
            ..GeneratorConfig::new(DatasetLayout::new(
                &self.output,
                self.size.clone(),
                self.split,
            ))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let report = run(args.config(), &args.input, &args.backgrounds)
        .with_context(|| format!("Dataset generation from {} failed", args.input.display()))?;

    info!(
        seed = report.seed,
        written = report.written.len(),
        skipped = report.skipped.len(),
        "done"
    );
    for item in &report.skipped {
        println!("skipped {} ({}): {}", item.index, item.descriptor, item.reason);
    }
    if !report.write_failures.is_empty() {
        bail!(
            "{} of {} images could not be written",
            report.write_failures.len(),
            report.attempted()
        );
    }
    Ok(())
}
