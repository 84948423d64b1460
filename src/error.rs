use crate::SmilesError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read descriptor file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no descriptors found in {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("background directory {0} does not exist or is not a directory")]
    MissingDirectory(PathBuf),
    #[error("failed to scan background directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to decode background image {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no .png backgrounds found in {0}")]
    EmptyPool(PathBuf),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid SMILES: {0}")]
    Parse(#[from] SmilesError),
    #[error("molecule has no atoms")]
    EmptyMolecule,
    #[error("invalid draw options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositeError {
    #[error("background is {background:?} but the structure image is {structure:?}")]
    DimensionMismatch {
        background: (u32, u32),
        structure: (u32, u32),
    },
    #[error("blend weight {0} is outside [0, 1]")]
    InvalidWeight(f32),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write labels {path}: {source}")]
    Labels { path: PathBuf, source: csv::Error },
}

/// Everything that can go wrong while synthesizing a single dataset item.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Errors that end a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("item {index} ({descriptor}) failed: {source}")]
    Item {
        index: u64,
        descriptor: String,
        source: ItemError,
    },
    #[error("label file: {0}")]
    Labels(WriteError),
}
