//! Dataset generation: render, augment, composite, degrade and write one item
//! per descriptor.

use crate::augment::{Augment, BackgroundAugmenter, Degrader, Identity, MoleculeAugmenter};
use crate::background::BackgroundPool;
use crate::composite::composite;
use crate::input::read_descriptors;
use crate::output::{write_image, DatasetLayout, LabelWriter};
use crate::visualize::{render_smiles, DrawOptions};
use crate::{GenerateError, ItemError};
use clap::ValueEnum;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// What to do with a descriptor that cannot be turned into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InvalidPolicy {
    /// Log it, record it in the report and carry on.
    #[default]
    Skip,
    /// Fail the whole run.
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub layout: DatasetLayout,
    /// Share of the background in the composite.
    pub blend_weight: f32,
    /// Width and height of every output image.
    pub image_size: u32,
    /// Bond line widths are drawn uniformly from this range for each item.
    pub bond_width: (f32, f32),
    pub seed: Option<u64>,
    /// Index of the first descriptor.
    pub start_index: u64,
    pub on_invalid: InvalidPolicy,
    pub write_labels: bool,
    pub augment: bool,
    pub atom_colors: bool,
}

impl GeneratorConfig {
    pub fn new(layout: DatasetLayout) -> Self {
        Self {
            layout,
            blend_weight: 0.3,
            image_size: 256,
            bond_width: (1.0, 7.0),
            seed: None,
            start_index: 0,
            on_invalid: InvalidPolicy::Skip,
            write_labels: true,
            augment: true,
            atom_colors: true,
        }
    }

    pub fn validate(&self) -> Result<(), GenerateError> {
        if !(0.0..=1.0).contains(&self.blend_weight) {
            return Err(GenerateError::Config(format!(
                "blend weight {} must be within [0, 1]",
                self.blend_weight
            )));
        }
        if self.image_size == 0 {
            return Err(GenerateError::Config("image size must be positive".into()));
        }
        let (low, high) = self.bond_width;
        if !(low.is_finite() && high.is_finite() && low > 0.0 && low <= high) {
            return Err(GenerateError::Config(format!(
                "bond width range {low}..{high} must be positive and ordered"
            )));
        }
        if self.layout.size.trim().is_empty() {
            return Err(GenerateError::Config("dataset size label must not be empty".into()));
        }
        Ok(())
    }
}

/// A descriptor that produced no image, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub index: u64,
    pub descriptor: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub seed: u64,
    pub written: Vec<PathBuf>,
    /// Descriptors that failed to render or composite.
    pub skipped: Vec<FailedItem>,
    /// Items that were synthesized but could not be saved.
    pub write_failures: Vec<FailedItem>,
    pub cancelled: bool,
}

impl GenerationReport {
    pub fn attempted(&self) -> usize {
        self.written.len() + self.skipped.len() + self.write_failures.len()
    }
}

/// Seed for one item, derived from the run seed so items can be regenerated
/// on their own.
pub fn item_seed(seed: u64, index: u64) -> u64 {
    // splitmix64 finalizer
    let mut z = seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub struct Generator {
    config: GeneratorConfig,
    seed: u64,
    cancel: Arc<AtomicBool>,
    molecule: Box<dyn Augment>,
    background: Box<dyn Augment>,
    degrader: Box<dyn Augment>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        config.validate()?;
        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed: u64 = rand::thread_rng().gen();
                info!(seed, "no seed given, drew one");
                seed
            }
        };
        let size = config.image_size;
        let (molecule, background, degrader): (Box<dyn Augment>, Box<dyn Augment>, Box<dyn Augment>) =
            if config.augment {
                (
                    Box::new(MoleculeAugmenter::default()),
                    Box::new(BackgroundAugmenter::new(size)),
                    Box::new(Degrader::default()),
                )
            } else {
                (
                    Box::new(Identity),
                    Box::new(BackgroundAugmenter::fit_only(size)),
                    Box::new(Identity),
                )
            };
        Ok(Self {
            config,
            seed,
            cancel: Arc::new(AtomicBool::new(false)),
            molecule,
            background,
            degrader,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Setting the flag stops the run before the next item.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn item_rng(&self, index: u64) -> StdRng {
        StdRng::seed_from_u64(item_seed(self.seed, index))
    }

    fn draw_options(&self, rng: &mut StdRng) -> DrawOptions {
        let (low, high) = self.config.bond_width;
        let bond_width = if high > low { rng.gen_range(low..=high) } else { low };
        DrawOptions {
            bond_width,
            atom_colors: self.config.atom_colors,
            ..DrawOptions::with_size(self.config.image_size)
        }
    }

    /// Builds the final image for one descriptor.
    pub fn synthesize(
        &self,
        descriptor: &str,
        pool: &BackgroundPool,
        rng: &mut StdRng,
    ) -> Result<RgbImage, ItemError> {
        let options = self.draw_options(rng);
        let structure = render_smiles(descriptor, &options)?;
        let structure = self.molecule.apply(&structure, rng);
        let background = self.background.apply(pool.choose(rng), rng);
        let blended = composite(&background, &structure, self.config.blend_weight)?;
        Ok(self.degrader.apply(&blended, rng))
    }

    /// Processes `descriptors` in order, one output per valid descriptor.
    #[instrument(skip_all, fields(seed = self.seed, count = descriptors.len()))]
    pub fn generate(
        &self,
        descriptors: &[String],
        pool: &BackgroundPool,
    ) -> Result<GenerationReport, GenerateError> {
        let layout = &self.config.layout;
        let mut labels = if self.config.write_labels {
            Some(LabelWriter::create(&layout.labels_path()).map_err(GenerateError::Labels)?)
        } else {
            None
        };
        let mut report = GenerationReport {
            seed: self.seed,
            ..GenerationReport::default()
        };
        info!(dir = %layout.images_dir().display(), "generating dataset");

        for (position, descriptor) in descriptors.iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                warn!(remaining = descriptors.len() - position, "generation cancelled");
                report.cancelled = true;
                break;
            }
            let index = self.config.start_index + position as u64;
            let mut rng = self.item_rng(index);

            let image = match self.synthesize(descriptor, pool, &mut rng) {
                Ok(image) => image,
                Err(err) => {
                    self.fail(index, descriptor, err, &mut report.skipped)?;
                    continue;
                }
            };
            match write_image(&layout.image_path(index), &image) {
                Ok(path) => {
                    debug!(index, descriptor = %descriptor, path = %path.display(), "wrote item");
                    report.written.push(path);
                }
                Err(err) => {
                    self.fail(index, descriptor, err.into(), &mut report.write_failures)?;
                    continue;
                }
            }
            if let Some(labels) = labels.as_mut() {
                labels.record(index, descriptor).map_err(GenerateError::Labels)?;
            }
        }

        if let Some(labels) = labels {
            labels.finish().map_err(GenerateError::Labels)?;
        }
        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            write_failures = report.write_failures.len(),
            cancelled = report.cancelled,
            "generation finished"
        );
        Ok(report)
    }

    /// Applies the invalid-item policy to a failed item.
    fn fail(
        &self,
        index: u64,
        descriptor: &str,
        err: ItemError,
        failures: &mut Vec<FailedItem>,
    ) -> Result<(), GenerateError> {
        error!(index, descriptor = %descriptor, "{err}");
        match self.config.on_invalid {
            InvalidPolicy::Skip => {
                failures.push(FailedItem {
                    index,
                    descriptor: descriptor.to_string(),
                    reason: err.to_string(),
                });
                Ok(())
            }
            InvalidPolicy::Abort => Err(GenerateError::Item {
                index,
                descriptor: descriptor.to_string(),
                source: err,
            }),
        }
    }
}

/// Validates the settings, loads descriptors and backgrounds, then generates
/// the dataset.
pub fn run(
    config: GeneratorConfig,
    input: &Path,
    backgrounds: &Path,
) -> Result<GenerationReport, GenerateError> {
    let generator = Generator::new(config)?;
    let descriptors = read_descriptors(input)?;
    let pool = BackgroundPool::load(backgrounds)?;
    generator.generate(&descriptors, &pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Split;
    use crate::{InputError, RenderError, ResourceError};
    use image::Rgb;

    fn gray_pool(size: u32) -> BackgroundPool {
        BackgroundPool::from_images(vec![RgbImage::from_pixel(size, size, Rgb([128, 128, 128]))])
            .unwrap()
    }

    fn plain_config(root: &Path) -> GeneratorConfig {
        GeneratorConfig {
            seed: Some(42),
            augment: false,
            bond_width: (2.0, 2.0),
            ..GeneratorConfig::new(DatasetLayout::new(root, "temp", Split::Train))
        }
    }

    fn descriptors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ethanol_on_gray_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = plain_config(dir.path());
        let generator = Generator::new(config.clone()).unwrap();
        let pool = gray_pool(256);
        let report = generator.generate(&descriptors(&["CCO"]), &pool).unwrap();

        let path = config.layout.image_path(0);
        assert_eq!(report.written, vec![path.clone()]);
        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (256, 256));

        let options = DrawOptions {
            bond_width: 2.0,
            ..DrawOptions::with_size(256)
        };
        let structure = render_smiles("CCO", &options).unwrap();
        let expected = composite(&pool.images()[0], &structure, 0.3).unwrap();
        assert_eq!(written, expected);
        assert_ne!(written, structure);
        assert_ne!(&written, &pool.images()[0]);
    }

    #[test]
    fn invalid_descriptors_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = plain_config(dir.path());
        let generator = Generator::new(config.clone()).unwrap();
        let report = generator
            .generate(&descriptors(&["CCO", "C1CC", "c1ccccc1", "Xx"]), &gray_pool(64))
            .unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[0].descriptor, "C1CC");
        assert_eq!(report.attempted(), 4);

        let images = config.layout.images_dir();
        assert!(images.join("0.png").exists());
        assert!(!images.join("1.png").exists());
        assert!(images.join("2.png").exists());

        let mut reader = csv::Reader::from_path(config.layout.labels_path()).unwrap();
        let rows: Vec<(u64, String)> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![(0, "CCO".to_string()), (2, "c1ccccc1".to_string())]);
    }

    #[test]
    fn abort_policy_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            on_invalid: InvalidPolicy::Abort,
            ..plain_config(dir.path())
        };
        let generator = Generator::new(config).unwrap();
        let err = generator
            .generate(&descriptors(&["CCO", "C(C", "CC"]), &gray_pool(64))
            .unwrap_err();
        match err {
            GenerateError::Item {
                index,
                descriptor,
                source: ItemError::Render(RenderError::Parse(_)),
            } => {
                assert_eq!(index, 1);
                assert_eq!(descriptor, "C(C");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn start_index_and_no_labels() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            start_index: 10,
            write_labels: false,
            ..plain_config(dir.path())
        };
        let generator = Generator::new(config.clone()).unwrap();
        generator.generate(&descriptors(&["C", "N"]), &gray_pool(32)).unwrap();
        assert!(config.layout.image_path(10).exists());
        assert!(config.layout.image_path(11).exists());
        assert!(!config.layout.labels_path().exists());
    }

    #[test]
    fn augmented_runs_are_reproducible() {
        let pool = BackgroundPool::from_images(vec![
            RgbImage::from_fn(300, 280, |x, y| Rgb([(x % 200) as u8, (y % 200) as u8, 90])),
            RgbImage::from_pixel(256, 256, Rgb([200, 190, 180])),
        ])
        .unwrap();
        let before = pool.images().to_vec();
        let config = GeneratorConfig {
            seed: Some(7),
            ..GeneratorConfig::new(DatasetLayout::new("unused", "temp", Split::Test))
        };
        let a = Generator::new(config.clone()).unwrap();
        let b = Generator::new(config).unwrap();
        let first = a.synthesize("CC(=O)Oc1ccccc1C(=O)O", &pool, &mut a.item_rng(3)).unwrap();
        let second = b.synthesize("CC(=O)Oc1ccccc1C(=O)O", &pool, &mut b.item_rng(3)).unwrap();
        assert_eq!(first.dimensions(), (256, 256));
        assert_eq!(first, second);
        assert_eq!(pool.images(), before.as_slice());
    }

    #[test]
    fn item_seeds_differ() {
        assert_ne!(item_seed(1, 0), item_seed(1, 1));
        assert_ne!(item_seed(1, 0), item_seed(2, 0));
        assert_eq!(item_seed(5, 9), item_seed(5, 9));
    }

    #[test]
    fn cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(plain_config(dir.path())).unwrap();
        generator.cancel_handle().store(true, Ordering::Relaxed);
        let report = generator.generate(&descriptors(&["CCO"]), &gray_pool(64)).unwrap();
        assert!(report.cancelled);
        assert!(report.written.is_empty());
    }

    #[test]
    fn config_validation() {
        let base = GeneratorConfig::new(DatasetLayout::new(".", "temp", Split::Train));
        assert!(base.validate().is_ok());
        for bad in [
            GeneratorConfig { blend_weight: 1.5, ..base.clone() },
            GeneratorConfig { blend_weight: f32::NAN, ..base.clone() },
            GeneratorConfig { image_size: 0, ..base.clone() },
            GeneratorConfig { bond_width: (3.0, 1.0), ..base.clone() },
            GeneratorConfig { bond_width: (0.0, 1.0), ..base.clone() },
            GeneratorConfig {
                layout: DatasetLayout::new(".", " ", Split::Train),
                ..base.clone()
            },
        ] {
            assert!(matches!(Generator::new(bad), Err(GenerateError::Config(_))));
        }
    }

    #[test]
    fn run_reports_missing_resources_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("smiles.txt");
        std::fs::write(&input, "CCO\n").unwrap();
        let empty = dir.path().join("backgrounds");
        std::fs::create_dir(&empty).unwrap();

        let err = run(plain_config(dir.path()), &input, &empty).unwrap_err();
        assert!(matches!(err, GenerateError::Resource(ResourceError::EmptyPool(_))));
        assert!(!dir.path().join("temp").exists());

        let err = run(plain_config(dir.path()), &dir.path().join("missing.txt"), &empty).unwrap_err();
        assert!(matches!(err, GenerateError::Input(InputError::Read { .. })));

        let bad = GeneratorConfig {
            blend_weight: 2.0,
            ..plain_config(dir.path())
        };
        let err = run(bad, &dir.path().join("missing.txt"), &empty).unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)));
    }
}
