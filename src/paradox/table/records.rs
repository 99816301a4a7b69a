//! Data-block walking and per-field value decoding.

use log::trace;

use crate::paradox::blob::{self, BlobStore};
use crate::paradox::numeric;
use crate::paradox::text::{self, TextEncoding};
use crate::paradox::types::models::{FieldDescriptor, FieldType, ParadoxValue, TableHeader};

/// The fixed per-block prefix this decoder skips over.
const BLOCK_HEADER_LEN: usize = 6;

/// Bytes a field occupies inside a record. BCD descriptors declare their
/// decimal count, not their width; the slot is always 17 bytes.
pub(crate) fn field_byte_width(descriptor: &FieldDescriptor) -> usize {
    match descriptor.field_type {
        FieldType::Bcd => 17,
        _ => descriptor.length,
    }
}

/// Walk the data blocks and collect raw record slots.
///
/// Blocks are `block_size` bytes starting at `header_length`; each holds a
/// 6-byte header and then fixed-size record slots. All-zero slots are
/// tombstones and are skipped. Emission stops at the header's declared
/// `row_count` when non-zero, otherwise when the data area is exhausted.
/// A truncated final block yields only the slots it actually contains.
pub(crate) fn collect_rows(data: &[u8], header: &TableHeader) -> Vec<Vec<u8>> {
    let block_size = header.block_size();
    let record_size = header.record_size;
    let mut rows = Vec::new();
    if block_size <= BLOCK_HEADER_LEN || record_size == 0 || header.header_length >= data.len() {
        return rows;
    }
    let declared = header.row_count as usize;
    let slots_per_block = (block_size - BLOCK_HEADER_LEN) / record_size;

    let mut block_start = header.header_length;
    let mut block_index = 0usize;
    while block_start < data.len() {
        let block_end = (block_start + block_size).min(data.len());
        let block = &data[block_start..block_end];
        if block.len() <= BLOCK_HEADER_LEN {
            break;
        }
        let slots = &block[BLOCK_HEADER_LEN..];
        let available = (slots.len() / record_size).min(slots_per_block);
        trace!("data block {block_index}: {available} record slots");
        for slot in 0..available {
            if declared > 0 && rows.len() >= declared {
                return rows;
            }
            let record = &slots[slot * record_size..(slot + 1) * record_size];
            if record.iter().all(|&b| b == 0) {
                continue;
            }
            rows.push(record.to_vec());
        }
        block_start += block_size;
        block_index += 1;
    }
    rows
}

/// Decode one field slice into a typed value.
///
/// An empty slice is null. Malformed content degrades to null (or raw
/// bytes for unknown type codes); it never aborts the record.
pub(crate) fn decode_field(
    descriptor: &FieldDescriptor,
    bytes: &[u8],
    encoding: TextEncoding,
    blobs: Option<&BlobStore>,
) -> Option<ParadoxValue> {
    if bytes.is_empty() {
        return None;
    }
    match descriptor.field_type {
        FieldType::Alpha => Some(ParadoxValue::Text(text::decode_alpha(bytes, encoding))),
        FieldType::Date => numeric::decode_date(bytes).map(ParadoxValue::Date),
        // An all-zero Short/Long slot decodes as zero, not null.
        FieldType::Short | FieldType::Long | FieldType::AutoIncrement => {
            Some(ParadoxValue::Integer(numeric::decode_signed(bytes).unwrap_or(0)))
        }
        FieldType::Currency | FieldType::Number => {
            numeric::decode_double(bytes).map(ParadoxValue::Double)
        }
        FieldType::Logical => numeric::decode_logical(bytes[0]).map(ParadoxValue::Bool),
        FieldType::Time => numeric::decode_time(bytes).map(ParadoxValue::Time),
        FieldType::Timestamp => numeric::decode_timestamp(bytes).map(ParadoxValue::Timestamp),
        FieldType::Bcd => numeric::decode_bcd(bytes, descriptor.length).map(ParadoxValue::Decimal),
        FieldType::Bytes => Some(ParadoxValue::Bytes(bytes.to_vec())),
        FieldType::Memo
        | FieldType::FormattedMemo
        | FieldType::Binary
        | FieldType::Ole
        | FieldType::Graphic => blob::resolve_blob_field(blobs, bytes, descriptor.field_type, encoding),
        FieldType::Unknown(_) => {
            if bytes.iter().all(|&b| b == 0 || b >= 0x20) {
                Some(ParadoxValue::Text(text::decode_alpha(bytes, encoding)))
            } else {
                Some(ParadoxValue::Raw(bytes.to_vec()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paradox::types::models::{FileTypeCode, TableVersion};

    fn header(record_size: usize, row_count: u32, factor: u8, header_length: usize) -> TableHeader {
        TableHeader {
            record_size,
            header_length,
            file_type: FileTypeCode::IndexedTable,
            max_table_size_factor: factor,
            row_count,
            field_count: 1,
            key_field_count: 0,
            auto_increment_value: 0,
            auto_increment_seed: None,
            file_version_id: 0x0C,
            version: TableVersion::V70,
            code_page: 1252,
        }
    }

    #[test]
    fn tombstones_are_skipped_and_count_capped() {
        // One 1 KiB block: 6-byte header then 4-byte slots.
        let mut data = vec![0u8; 0x78 + 1024];
        let base = 0x78 + BLOCK_HEADER_LEN;
        data[base..base + 4].copy_from_slice(b"AAAA");
        // slot 1 left all-zero (tombstone)
        data[base + 8..base + 12].copy_from_slice(b"CCCC");
        data[base + 12..base + 16].copy_from_slice(b"DDDD");

        let rows = collect_rows(&data, &header(4, 2, 1, 0x78));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], b"AAAA");
        assert_eq!(rows[1], b"CCCC");
    }

    #[test]
    fn truncated_final_block_yields_partial_slots() {
        let mut data = vec![0u8; 0x78 + BLOCK_HEADER_LEN + 10];
        let base = 0x78 + BLOCK_HEADER_LEN;
        data[base..base + 4].copy_from_slice(b"AAAA");
        data[base + 4..base + 8].copy_from_slice(b"BBBB");
        // Two whole slots fit; the trailing 2 bytes are dropped.
        let rows = collect_rows(&data, &header(4, 0, 1, 0x78));
        assert_eq!(rows, vec![b"AAAA".to_vec(), b"BBBB".to_vec()]);
    }

    #[test]
    fn all_zero_slices_null_dates_but_zero_integers() {
        let mut desc = FieldDescriptor {
            index: 0,
            length: 4,
            type_code: 0x03,
            field_type: FieldType::Short,
            name: String::new(),
        };
        desc.length = 2;
        assert_eq!(
            decode_field(&desc, &[0, 0], TextEncoding::default(), None),
            Some(ParadoxValue::Integer(0))
        );
        desc.type_code = 0x04;
        desc.field_type = FieldType::Long;
        desc.length = 4;
        assert_eq!(
            decode_field(&desc, &[0; 4], TextEncoding::default(), None),
            Some(ParadoxValue::Integer(0))
        );
        desc.type_code = 0x02;
        desc.field_type = FieldType::Date;
        assert_eq!(decode_field(&desc, &[0; 4], TextEncoding::default(), None), None);
        desc.type_code = 0x14;
        desc.field_type = FieldType::Time;
        assert_eq!(decode_field(&desc, &[0; 4], TextEncoding::default(), None), None);
    }

    #[test]
    fn unknown_type_heuristic() {
        let desc = FieldDescriptor {
            index: 0,
            length: 4,
            type_code: 0x42,
            field_type: FieldType::Unknown(0x42),
            name: String::new(),
        };
        assert_eq!(
            decode_field(&desc, b"ABC\0", TextEncoding::default(), None),
            Some(ParadoxValue::Text("ABC".to_string()))
        );
        assert_eq!(
            decode_field(&desc, &[0x01, 0x02, b'A', 0x00], TextEncoding::default(), None),
            Some(ParadoxValue::Raw(vec![0x01, 0x02, b'A', 0x00]))
        );
        assert_eq!(decode_field(&desc, &[], TextEncoding::default(), None), None);
    }
}
