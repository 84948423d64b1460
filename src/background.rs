use crate::ResourceError;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::Rng;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Background textures loaded once per run. Never empty.
#[derive(Debug, Clone)]
pub struct BackgroundPool {
    images: Vec<RgbImage>,
}

impl BackgroundPool {
    /// Decodes every `.png` directly inside `dir`, in file name order.
    pub fn load(dir: &Path) -> Result<Self, ResourceError> {
        if !dir.is_dir() {
            return Err(ResourceError::MissingDirectory(dir.to_path_buf()));
        }
        let mut images = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|source| ResourceError::Scan {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() || !is_png(entry.path()) {
                continue;
            }
            let image = image::open(entry.path()).map_err(|source| ResourceError::Decode {
                path: entry.path().to_path_buf(),
                source,
            })?;
            debug!(path = %entry.path().display(), "loaded background");
            images.push(image.to_rgb8());
        }
        if images.is_empty() {
            return Err(ResourceError::EmptyPool(dir.to_path_buf()));
        }
        info!(count = images.len(), dir = %dir.display(), "loaded backgrounds");
        Ok(Self { images })
    }

    /// A pool from images already in memory; `None` when there are none.
    pub fn from_images(images: Vec<RgbImage>) -> Option<Self> {
        (!images.is_empty()).then_some(Self { images })
    }

    /// Uniformly random member.
    pub fn choose(&self, rng: &mut StdRng) -> &RgbImage {
        &self.images[rng.gen_range(0..self.images.len())]
    }

    pub fn images(&self) -> &[RgbImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}
