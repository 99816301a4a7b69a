//! # paradox-reader
//!
//! A reader for the on-disk file family written by Borland Paradox for
//! DOS/Windows: `.DB` tables, `.MB` memo/blob stores, `.PX`/`.Xnn`/`.Ynn`
//! indexes, `.TV` table views, `.FAM` family manifests, and `.QBE` saved
//! queries. The target is archival data where the original software is
//! gone; decoding favors maximum recovery: header damage fails the file,
//! but a malformed field only nulls that field.
//!
//! ## Example
//!
//! ```no_run
//! use paradox_reader::{load, FileDetails, TextEncoding};
//!
//! let file = load("data/CUSTOMER.DB")?;
//! if let FileDetails::Table(table) = &file.details {
//!     println!("{:?}", table.field_display_names());
//!     for record in &table.records {
//!         println!("{:?}", record.formatted_values(TextEncoding::default()));
//!     }
//! }
//! # Ok::<(), paradox_reader::ParadoxError>(())
//! ```

pub mod paradox;

pub use paradox::binary::GenericBinary;
pub use paradox::blob::{BlobPointer, BlobStore};
pub use paradox::family::{FamilyReference, FamilyReferenceKind, ParadoxFamilyFile};
pub use paradox::index::{
    IndexBlock, IndexHeader, IndexKind, IndexRecord, ParadoxIndex, ParadoxSecondaryIndexData,
};
pub use paradox::table::{FieldValue, ParadoxRecord, ParadoxTable};
pub use paradox::text::TextEncoding;
pub use paradox::types::error::{ParadoxError, Result};
pub use paradox::types::filetypes::ParadoxFormat;
pub use paradox::types::models::{
    FieldDescriptor, FieldType, FileTypeCode, ParadoxValue, TableHeader, TableVersion,
};
pub use paradox::view::ParadoxTableView;
pub use paradox::{load, load_bytes, FileDetails, ParadoxFile, QueryText};
