//! Dataset layout on disk: `<root>/<size>/<split>_images/<index>.png` plus a
//! `<root>/<size>/<split>_labels.csv` index-to-SMILES table.

use crate::WriteError;
use clap::ValueEnum;
use image::RgbImage;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Split {
    #[default]
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub root: PathBuf,
    pub size: String,
    pub split: Split,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, size: impl Into<String>, split: Split) -> Self {
        Self {
            root: root.into(),
            size: size.into(),
            split,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root
            .join(&self.size)
            .join(format!("{}_images", self.split))
    }

    pub fn labels_path(&self) -> PathBuf {
        self.root
            .join(&self.size)
            .join(format!("{}_labels.csv", self.split))
    }

    pub fn image_path(&self, index: u64) -> PathBuf {
        self.images_dir().join(format!("{index}.png"))
    }
}

fn create_dir(dir: &Path) -> Result<(), WriteError> {
    std::fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes `image` as a PNG at `path`, creating the parent directory if
/// needed. An existing file is replaced.
pub fn write_image(path: &Path, image: &RgbImage) -> Result<PathBuf, WriteError> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    let path = path.to_path_buf();
    if path.exists() {
        warn!(path = %path.display(), "overwriting existing image");
    }
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|source| WriteError::Image {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// `index,smiles` rows for every image written.
pub struct LabelWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl LabelWriter {
    pub fn create(path: &Path) -> Result<Self, WriteError> {
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }
        let labels_error = |source| WriteError::Labels {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(labels_error)?;
        writer.write_record(["index", "smiles"]).map_err(labels_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn record(&mut self, index: u64, smiles: &str) -> Result<(), WriteError> {
        self.writer
            .write_record([index.to_string().as_str(), smiles])
            .map_err(|source| WriteError::Labels {
                path: self.path.clone(),
                source,
            })
    }

    pub fn finish(mut self) -> Result<(), WriteError> {
        self.writer.flush().map_err(|source| WriteError::Labels {
            path: self.path.clone(),
            source: source.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn layout_paths() {
        let layout = DatasetLayout::new("/data", "temp", Split::Val);
        assert_eq!(layout.images_dir(), PathBuf::from("/data/temp/val_images"));
        assert_eq!(layout.labels_path(), PathBuf::from("/data/temp/val_labels.csv"));
        assert_eq!(layout.image_path(12), PathBuf::from("/data/temp/val_images/12.png"));
    }

    #[test]
    fn split_names() {
        assert_eq!(Split::default(), Split::Train);
        assert_eq!(Split::Test.to_string(), "test");
        assert_eq!(Split::from_str("val", true), Ok(Split::Val));
    }

    #[test]
    fn writes_and_overwrites_images() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path(), "temp", Split::Train);
        let first = RgbImage::from_pixel(3, 3, Rgb([1, 1, 1]));
        let path = write_image(&layout.image_path(0), &first).unwrap();
        assert_eq!(path, dir.path().join("temp").join("train_images").join("0.png"));

        let second = RgbImage::from_pixel(3, 3, Rgb([200, 200, 200]));
        write_image(&path, &second).unwrap();
        let read = image::open(&path).unwrap().to_rgb8();
        assert_eq!(read, second);
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("images").join("0.png");
        let err = write_image(&path, &RgbImage::new(1, 1)).unwrap_err();
        assert!(matches!(err, WriteError::CreateDir { .. }));
    }

    #[test]
    fn label_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp").join("train_labels.csv");
        let mut labels = LabelWriter::create(&path).unwrap();
        labels.record(0, "CCO").unwrap();
        labels.record(2, "C(=O)O").unwrap();
        labels.finish().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<(u64, String)> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![(0, "CCO".to_string()), (2, "C(=O)O".to_string())]);
    }
}
