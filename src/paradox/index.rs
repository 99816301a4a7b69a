//! `.PX` / `.Ynn` B-tree index decoding, and `.Xnn` secondary-index data.
//!
//! Index files share the table family's numeric conventions: block links
//! are plain little-endian, but the three shorts in each record tail use
//! the sign-bit inversion of the scalar decoders. `.Xnn` files are regular
//! tables with extra metadata after the field-name run.

use std::path::Path;

use log::{debug, trace};

use super::numeric;
use super::reader::{peek_u16_le, ByteReader};
use super::table::ParadoxTable;
use super::text::{self, TextEncoding};
use super::types::error::{ParadoxError, Result};
use super::types::filetypes::ParadoxFormat;
use super::types::models::FileTypeCode;

/// Minimum file size for an index header.
pub const INDEX_HEADER_LEN: usize = 2048;

/// Walk no further than this many blocks, and this many records per
/// block; damaged trees can claim absurd geometry.
const MAX_BLOCKS: usize = 64;
const MAX_RECORDS_PER_BLOCK: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Secondary,
}

/// Fixed geometry from the first 2048 bytes of an index file.
#[derive(Debug, Clone)]
pub struct IndexHeader {
    pub record_length: usize,
    pub header_length: usize,
    pub file_type: FileTypeCode,
    /// Block size in KiB units.
    pub block_size_code: u8,
    pub record_count: u32,
    pub blocks_in_use: u16,
    pub total_blocks: u16,
    pub first_data_block: u16,
    pub last_block: u16,
    pub root_block: u16,
    pub level_count: u8,
    pub field_count: u8,
}

impl IndexHeader {
    pub fn block_size(&self) -> usize {
        self.block_size_code as usize * 1024
    }

    /// Key bytes per record; the remaining 6 bytes are the record tail.
    pub fn key_length(&self) -> usize {
        self.record_length.saturating_sub(6)
    }
}

/// One record of an index block: the key and its sign-bit-decoded tail.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub key: Vec<u8>,
    pub child_block: i16,
    pub statistics: i16,
    pub reserved: i16,
}

impl IndexRecord {
    /// The key rendered as space-separated uppercase hex, for display.
    pub fn key_hex(&self) -> String {
        self.key
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One B-tree block: sibling links and the records the walker kept.
#[derive(Debug, Clone)]
pub struct IndexBlock {
    /// 1-based position in the block array.
    pub id: usize,
    pub next_block: u16,
    pub prev_block: u16,
    /// Count derived from `last_offset`; the `records` list is capped
    /// separately.
    pub record_count: usize,
    pub records: Vec<IndexRecord>,
}

/// A parsed `.PX` or `.Ynn` index file.
#[derive(Debug)]
pub struct ParadoxIndex {
    pub kind: IndexKind,
    pub header: IndexHeader,
    pub blocks: Vec<IndexBlock>,
    /// Blocks present in the data area, including any past the walking
    /// cap; `blocks.len()` can be smaller.
    pub total_blocks_reported: usize,
}

/// Parse an index file.
pub fn parse(data: &[u8], kind: IndexKind) -> Result<ParadoxIndex> {
    if data.len() < INDEX_HEADER_LEN {
        return Err(ParadoxError::TooSmall {
            format: match kind {
                IndexKind::Primary => ParadoxFormat::PrimaryIndex,
                IndexKind::Secondary => ParadoxFormat::SecondaryIndex,
            },
            got: data.len(),
            minimum: INDEX_HEADER_LEN,
        });
    }

    let mut r = ByteReader::new(data);
    let record_length = r.read_u16()? as usize;
    let header_length = r.read_u16()? as usize;
    let file_type = FileTypeCode::from_code(r.read_u8()?);
    let block_size_code = r.read_u8()?;
    let record_count = r.read_u32()?;
    r.seek(0x0A)?;
    let blocks_in_use = r.read_u16()?;
    let total_blocks = r.read_u16()?;
    let first_data_block = r.read_u16()?;
    let last_block = r.read_u16()?;
    r.seek(0x1E)?;
    let root_block = r.read_u16()?;
    let level_count = r.read_u8()?;
    let field_count = r.read_u8()?;

    let header = IndexHeader {
        record_length,
        header_length,
        file_type,
        block_size_code,
        record_count,
        blocks_in_use,
        total_blocks,
        first_data_block,
        last_block,
        root_block,
        level_count,
        field_count,
    };
    debug!(
        "index header ({kind:?}): root={} levels={} records={} blocks_in_use={}",
        header.root_block, header.level_count, header.record_count, header.blocks_in_use
    );

    let block_size = header.block_size();
    let mut blocks = Vec::new();
    let mut total_present = 0usize;
    if block_size > 6 && header.header_length < data.len() {
        let area = &data[header.header_length..];
        total_present = area.len().div_ceil(block_size);
        for (i, chunk) in area.chunks(block_size).take(MAX_BLOCKS).enumerate() {
            if let Some(block) = parse_block(chunk, i + 1, &header) {
                blocks.push(block);
            }
        }
    }
    if total_present > blocks.len() {
        debug!("index walk capped: {} of {total_present} blocks kept", blocks.len());
    }

    Ok(ParadoxIndex {
        kind,
        header,
        blocks,
        total_blocks_reported: total_present,
    })
}

fn parse_block(chunk: &[u8], id: usize, header: &IndexHeader) -> Option<IndexBlock> {
    let mut r = ByteReader::new(chunk);
    let next_block = r.read_u16().ok()?;
    let prev_block = r.read_u16().ok()?;
    let last_offset = r.read_i16().ok()?;

    let record_count = if last_offset < 0 || header.record_length == 0 {
        0
    } else {
        last_offset as usize / header.record_length + 1
    };
    trace!("index block {id}: last_offset={last_offset} record_count={record_count}");

    let key_length = header.key_length();
    let mut records = Vec::new();
    if header.record_length > 6 {
        for slot in 0..record_count.min(MAX_RECORDS_PER_BLOCK) {
            let start = 6 + slot * header.record_length;
            let Some(bytes) = chunk.get(start..start + header.record_length) else {
                break;
            };
            let tail = &bytes[key_length..];
            records.push(IndexRecord {
                key: bytes[..key_length].to_vec(),
                child_block: decode_index_short(&tail[0..2]),
                statistics: decode_index_short(&tail[2..4]),
                reserved: decode_index_short(&tail[4..6]),
            });
        }
    }

    Some(IndexBlock {
        id,
        next_block,
        prev_block,
        record_count,
        records,
    })
}

/// The 2-byte short used in record tails: sign-bit inversion rule, with
/// the stored null decoding to 0.
fn decode_index_short(bytes: &[u8]) -> i16 {
    numeric::decode_signed(bytes).unwrap_or(0) as i16
}

/// A `.Xnn` secondary-index data file: a regular table plus the trailing
/// references back into the base table.
#[derive(Debug)]
pub struct ParadoxSecondaryIndexData {
    pub table: ParadoxTable,
    /// Field numbers of the indexed columns in the base table.
    pub field_references: Vec<u16>,
    pub sort_order: Option<String>,
    pub index_label: Option<String>,
}

/// Parse a `.Xnn` file: table first, then the index metadata that follows
/// the field names.
pub fn parse_secondary_data(data: &[u8], path: Option<&Path>) -> Result<ParadoxSecondaryIndexData> {
    let (mut table, names_end) = ParadoxTable::parse_with_structure(data, path)?;
    let header_area = table.header.header_length.min(data.len());
    let area = &data[..header_area];

    let mut pos = names_end;
    let mut field_references = Vec::with_capacity(table.header.field_count);
    for _ in 0..table.header.field_count {
        match peek_u16_le(area, pos) {
            Some(value) => {
                field_references.push(value);
                pos += 2;
            }
            None => break,
        }
    }

    let encoding = TextEncoding::default();
    let sort_raw = text::take_c_string(area, &mut pos);
    let sort_order =
        (!sort_raw.is_empty()).then(|| text::decode_bytes(sort_raw, encoding));
    let label_raw = text::take_c_string(area, &mut pos);
    let index_label =
        (!label_raw.is_empty()).then(|| text::decode_bytes(label_raw, encoding));

    table.set_sort_order(sort_order.clone());
    Ok(ParadoxSecondaryIndexData {
        table,
        field_references,
        sort_order,
        index_label,
    })
}
