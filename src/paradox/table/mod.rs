//! `.DB` table decoding: header, field descriptors, records, and values.

pub mod header;
pub(crate) mod records;

use std::path::Path;
use std::sync::Arc;

use log::info;

use super::blob::BlobStore;
use super::text::TextEncoding;
use super::types::error::Result;
use super::types::models::{FieldDescriptor, ParadoxValue, TableHeader};

/// One decoded field of one record: the descriptor it was sliced by and
/// the value, `None` when the field is null.
#[derive(Debug, Clone)]
pub struct FieldValue {
    pub descriptor: FieldDescriptor,
    pub value: Option<ParadoxValue>,
}

/// A single row: the raw slot bytes plus shared descriptors and, when the
/// table was loaded from a path, the table's blob store. Records are never
/// separated from their store; blob fields decode through it lazily.
#[derive(Debug, Clone)]
pub struct ParadoxRecord {
    row: Vec<u8>,
    fields: Arc<Vec<FieldDescriptor>>,
    blobs: Option<Arc<BlobStore>>,
}

impl ParadoxRecord {
    fn new(row: Vec<u8>, fields: Arc<Vec<FieldDescriptor>>, blobs: Option<Arc<BlobStore>>) -> Self {
        Self { row, fields, blobs }
    }

    /// The undecoded slot bytes.
    pub fn raw(&self) -> &[u8] {
        &self.row
    }

    /// Decode every field in descriptor order. The result always has
    /// exactly one entry per field; fields past the end of a short row
    /// are null.
    pub fn values(&self, encoding: TextEncoding) -> Vec<FieldValue> {
        let mut offset = 0usize;
        self.fields
            .iter()
            .map(|descriptor| {
                let width = records::field_byte_width(descriptor);
                let start = offset.min(self.row.len());
                let end = (offset + width).min(self.row.len());
                offset += width;
                FieldValue {
                    descriptor: descriptor.clone(),
                    value: records::decode_field(
                        descriptor,
                        &self.row[start..end],
                        encoding,
                        self.blobs.as_deref(),
                    ),
                }
            })
            .collect()
    }

    /// Display renderings in descriptor order; null fields render empty.
    pub fn formatted_values(&self, encoding: TextEncoding) -> Vec<String> {
        self.values(encoding)
            .into_iter()
            .map(|fv| {
                fv.value
                    .map(|v| v.formatted_string(None, None))
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Look up one field by name, case-insensitively.
    pub fn value(&self, name: &str, encoding: TextEncoding) -> Option<ParadoxValue> {
        self.values(encoding)
            .into_iter()
            .find(|fv| fv.descriptor.name.eq_ignore_ascii_case(name))
            .and_then(|fv| fv.value)
    }
}

/// A fully decoded `.DB` table.
#[derive(Debug)]
pub struct ParadoxTable {
    pub header: TableHeader,
    pub fields: Arc<Vec<FieldDescriptor>>,
    pub records: Vec<ParadoxRecord>,
    /// The name declared inside the header, when present.
    pub table_name: Option<String>,
    pub sort_order: Option<String>,
    blobs: Option<Arc<BlobStore>>,
}

impl ParadoxTable {
    /// Parse a table from its full file bytes. When `path` is given, the
    /// containing directory is searched for companion `.MB` files so blob
    /// fields can resolve.
    pub fn parse(data: &[u8], path: Option<&Path>) -> Result<Self> {
        let (table, _) = Self::parse_with_structure(data, path)?;
        Ok(table)
    }

    /// As [`parse`](Self::parse), additionally returning the header-area
    /// cursor just past the field-name run for decoders that read
    /// trailing metadata (`.Xnn`).
    pub(crate) fn parse_with_structure(data: &[u8], path: Option<&Path>) -> Result<(Self, usize)> {
        let structure = header::parse(data, TextEncoding::default())?;
        let blobs = path.map(|p| Arc::new(BlobStore::discover(p, structure.table_name.as_deref())));
        let fields = Arc::new(structure.fields);
        let records: Vec<ParadoxRecord> = records::collect_rows(data, &structure.header)
            .into_iter()
            .map(|row| ParadoxRecord::new(row, Arc::clone(&fields), blobs.clone()))
            .collect();
        info!(
            "parsed table {:?}: {} fields, {} records",
            structure.table_name,
            fields.len(),
            records.len()
        );
        let table = Self {
            header: structure.header,
            fields,
            records,
            table_name: structure.table_name,
            sort_order: structure.sort_order,
            blobs,
        };
        Ok((table, structure.names_end))
    }

    pub(crate) fn set_sort_order(&mut self, sort_order: Option<String>) {
        self.sort_order = sort_order;
    }

    /// Field names in declaration order, as stored.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Field names with the `"Field {n}"` fallback applied.
    pub fn field_display_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.display_name()).collect()
    }

    /// The header's code-page identifier, when declared.
    pub fn code_page_identifier(&self) -> Option<u16> {
        (self.header.code_page != 0).then_some(self.header.code_page)
    }

    /// The overlapping seed read at 0x49, when non-zero.
    pub fn auto_increment_seed(&self) -> Option<u32> {
        self.header.auto_increment_seed
    }

    /// Display renderings for the first `sample_count` records.
    pub fn formatted_records(
        &self,
        sample_count: usize,
        encoding: TextEncoding,
    ) -> Vec<Vec<String>> {
        self.records
            .iter()
            .take(sample_count)
            .map(|r| r.formatted_values(encoding))
            .collect()
    }
}
