//! Error types for bank persistence, configuration and PDF handling
//!
//! Parsing anomalies (unclassifiable pages, missing halves) are not errors
//! and never show up here. Everything in this module is fatal for the
//! operation that produced it.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to read PDF {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Failed to extract text from {path}: {message}")]
    TextExtraction { path: PathBuf, message: String },

    #[error("PDF has no usable page tree: {0}")]
    PageTree(String),

    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },

    #[error("Failed to write PDF {path}: {message}")]
    Save { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum BankError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Unknown exam preset: {0}")]
    UnknownPreset(String),

    #[error(transparent)]
    Pdf(#[from] PdfError),
}

impl BankError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        BankError::Io { path: path.to_path_buf(), source }
    }

    pub fn schema(path: &Path, source: serde_json::Error) -> Self {
        BankError::Schema { path: path.to_path_buf(), source }
    }
}

pub type Result<T> = std::result::Result<T, BankError>;
