//! Core Paradox decoding module.
//!
//! Bytes go in, typed structures come out: the submodules each own one
//! on-disk structure family and the facade here routes a file to the
//! right decoder based on its inferred (or supplied) format.

pub mod binary;
pub mod blob;
pub mod family;
pub mod index;
pub mod numeric;
pub mod reader;
pub mod table;
pub mod text;
pub mod types;
pub mod view;

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use binary::GenericBinary;
use family::ParadoxFamilyFile;
use index::{IndexKind, ParadoxIndex, ParadoxSecondaryIndexData};
use table::ParadoxTable;
use text::TextEncoding;
use types::error::{ParadoxError, Result};
use types::filetypes::ParadoxFormat;
use view::ParadoxTableView;

/// A `.QBE` query decoded as raw text.
#[derive(Debug, Clone)]
pub struct QueryText {
    pub text: String,
    pub encoding_used: TextEncoding,
}

/// The decoded content of one file, tagged by what it turned out to be.
#[derive(Debug)]
pub enum FileDetails {
    Table(ParadoxTable),
    Query(QueryText),
    TableView(ParadoxTableView),
    Family(ParadoxFamilyFile),
    Index(ParadoxIndex),
    SecondaryIndexData(ParadoxSecondaryIndexData),
    /// Formats without a dedicated decoder: reports, scripts,
    /// spreadsheets, snapshots, and anything unrecognized.
    Binary(GenericBinary),
}

/// One loaded file: where it came from, what it was taken for, and the
/// decoded details.
#[derive(Debug)]
pub struct ParadoxFile {
    pub path: Option<PathBuf>,
    pub format: ParadoxFormat,
    pub size: usize,
    pub details: FileDetails,
}

/// Read a file, infer its format from the extension, and decode it.
///
/// Tables loaded this way can resolve blob fields: the containing
/// directory is searched for companion `.MB` files.
pub fn load(path: impl AsRef<Path>) -> Result<ParadoxFile> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ParadoxError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = ParadoxFormat::infer(path);
    info!(
        "loading {} ({} bytes) as {format}",
        path.display(),
        bytes.len()
    );
    dispatch(bytes, format, Some(path))
}

/// Decode an in-memory buffer as the given format, skipping inference.
/// Blob fields can only produce their inline leaders without a path.
pub fn load_bytes(bytes: Vec<u8>, format: ParadoxFormat) -> Result<ParadoxFile> {
    dispatch(bytes, format, None)
}

fn dispatch(bytes: Vec<u8>, format: ParadoxFormat, path: Option<&Path>) -> Result<ParadoxFile> {
    let size = bytes.len();
    let details = match format {
        ParadoxFormat::Table => FileDetails::Table(ParadoxTable::parse(&bytes, path)?),
        ParadoxFormat::Query => {
            let (text, encoding_used) = text::recover(&bytes, TextEncoding::default());
            FileDetails::Query(QueryText { text, encoding_used })
        }
        ParadoxFormat::TableView => FileDetails::TableView(view::parse(&bytes)?),
        ParadoxFormat::Family => FileDetails::Family(family::parse(&bytes)),
        ParadoxFormat::PrimaryIndex => {
            FileDetails::Index(index::parse(&bytes, IndexKind::Primary)?)
        }
        ParadoxFormat::SecondaryIndex => {
            FileDetails::Index(index::parse(&bytes, IndexKind::Secondary)?)
        }
        ParadoxFormat::SecondaryIndexData => {
            FileDetails::SecondaryIndexData(index::parse_secondary_data(&bytes, path)?)
        }
        ParadoxFormat::Report
        | ParadoxFormat::Script
        | ParadoxFormat::Spreadsheet
        | ParadoxFormat::Snapshot
        | ParadoxFormat::Unknown => FileDetails::Binary(GenericBinary::new(bytes)),
    };
    Ok(ParadoxFile {
        path: path.map(Path::to_path_buf),
        format,
        size,
        details,
    })
}
