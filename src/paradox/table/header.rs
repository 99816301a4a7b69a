//! `.DB` header and field-descriptor parsing.

use log::{debug, trace};

use crate::paradox::reader::ByteReader;
use crate::paradox::text::{self, TextEncoding};
use crate::paradox::types::error::{ParadoxError, Result};
use crate::paradox::types::filetypes::ParadoxFormat;
use crate::paradox::types::models::{FieldDescriptor, FieldType, FileTypeCode, TableHeader, TableVersion};

/// Minimum bytes for the fixed header prefix.
pub const HEADER_PREFIX_LEN: usize = 128;

/// Everything recovered from the header area of a table file.
#[derive(Debug)]
pub struct TableStructure {
    pub header: TableHeader,
    pub fields: Vec<FieldDescriptor>,
    pub table_name: Option<String>,
    pub sort_order: Option<String>,
    /// Cursor just past the field-name run. Secondary-index data files
    /// continue reading their trailing metadata here.
    pub(crate) names_end: usize,
}

/// Parse the 128-byte prefix plus the extended header sections.
pub fn parse(data: &[u8], encoding: TextEncoding) -> Result<TableStructure> {
    if data.len() < HEADER_PREFIX_LEN {
        return Err(ParadoxError::TooSmall {
            format: ParadoxFormat::Table,
            got: data.len(),
            minimum: HEADER_PREFIX_LEN,
        });
    }

    let mut r = ByteReader::new(data);
    let record_size = r.read_u16()? as usize;
    let header_length = r.read_u16()? as usize;
    let file_type = FileTypeCode::from_code(r.read_u8()?);
    let max_table_size_factor = r.read_u8()?;
    let row_count = r.read_u32()?;

    r.seek(0x21)?;
    let field_count = r.read_u16()? as usize;
    let key_field_count = r.read_u16()? as usize;

    r.seek(0x39)?;
    let file_version_id = r.read_u8()?;

    // The two auto-increment reads overlap; both are surfaced so callers
    // can cross-check against known-good files.
    r.seek(0x48)?;
    let auto_increment_value = r.read_u32()?;
    r.seek(0x49)?;
    let seed_raw = r.read_u32()?;

    r.seek(0x6A)?;
    let code_page = r.read_u16()?;

    if record_size == 0 {
        return Err(ParadoxError::InvalidRecordSize);
    }

    let header = TableHeader {
        record_size,
        header_length,
        file_type,
        max_table_size_factor,
        row_count,
        field_count,
        key_field_count,
        auto_increment_value,
        auto_increment_seed: (seed_raw != 0).then_some(seed_raw),
        file_version_id,
        version: TableVersion::from_id(file_version_id),
        code_page,
    };
    debug!(
        "table header: type={:?} version={} fields={} rows={} record_size={}",
        header.file_type,
        header.version.number(),
        header.field_count,
        header.row_count,
        header.record_size
    );

    let header_area = header.header_length.min(data.len()).max(HEADER_PREFIX_LEN);
    let info_offset = header.field_info_offset();
    let info_end = info_offset + 2 * field_count;
    if info_end > header_area {
        return Err(ParadoxError::MissingFieldDescriptors);
    }

    let mut fields = Vec::with_capacity(field_count);
    for index in 0..field_count {
        let type_code = data[info_offset + 2 * index];
        let length = data[info_offset + 2 * index + 1] as usize;
        fields.push(FieldDescriptor {
            index,
            length,
            type_code,
            field_type: FieldType::from_code(type_code),
            name: String::new(),
        });
    }

    // Skip the opaque pointer section and the field-number section.
    let mut pos = info_end + (4 + 4 * field_count) + 2 * field_count;
    let area = &data[..header_area];

    let table_name = take_padded_run(area, &mut pos).map(|b| text::decode_bytes(b, encoding));
    trace!("table name: {:?} (names start at {:#x})", table_name, pos);

    for field in fields.iter_mut() {
        let raw = text::take_c_string(area, &mut pos);
        field.name = text::decode_bytes(raw, encoding);
    }
    let names_end = pos;

    let sort_order = take_padded_run(area, &mut pos).map(|b| text::decode_bytes(b, encoding));

    Ok(TableStructure {
        header,
        fields,
        table_name,
        sort_order,
        names_end,
    })
}

/// Take the next run of non-zero bytes, skipping NUL padding on both
/// sides. Returns `None` when only padding remains.
fn take_padded_run<'a>(data: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let mut start = (*pos).min(data.len());
    while start < data.len() && data[start] == 0 {
        start += 1;
    }
    let mut end = start;
    while end < data.len() && data[end] != 0 {
        end += 1;
    }
    // Leave the cursor on the first byte after the run's padding.
    let mut next = end;
    while next < data.len() && data[next] == 0 {
        next += 1;
    }
    *pos = next;
    (end > start).then(|| &data[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        let err = parse(&[0u8; 64], TextEncoding::default()).unwrap_err();
        assert!(matches!(
            err,
            ParadoxError::TooSmall { minimum: 128, got: 64, .. }
        ));
    }

    #[test]
    fn rejects_zero_record_size() {
        let mut data = vec![0u8; 256];
        data[0x02] = 0x00;
        data[0x03] = 0x01; // header_length = 256
        let err = parse(&data, TextEncoding::default()).unwrap_err();
        assert!(matches!(err, ParadoxError::InvalidRecordSize));
    }

    #[test]
    fn rejects_descriptors_past_header_area() {
        let mut data = vec![0u8; 128];
        data[0x00] = 10; // record_size
        data[0x02] = 0x80; // header_length = 128
        data[0x21] = 40; // field_count: 40 pairs cannot fit before 0x80
        let err = parse(&data, TextEncoding::default()).unwrap_err();
        assert!(matches!(err, ParadoxError::MissingFieldDescriptors));
    }

    #[test]
    fn padded_run_scanning() {
        let data = b"\0\0NAME\0\0\0NEXT";
        let mut pos = 0;
        assert_eq!(take_padded_run(data, &mut pos), Some(&b"NAME"[..]));
        assert_eq!(take_padded_run(data, &mut pos), Some(&b"NEXT"[..]));
        assert_eq!(take_padded_run(data, &mut pos), None);
    }
}
