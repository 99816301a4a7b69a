use std::fs;

use chrono::NaiveDate;
use paradox_reader::{
    load, load_bytes, FileDetails, IndexKind, ParadoxFormat, ParadoxValue, TextEncoding,
};
use tempfile::TempDir;

const HEADER_LEN: usize = 0x0800;
const BLOCK_FACTOR: u8 = 1; // 1 KiB data blocks

/// Build a `.DB` byte image: fixed prefix, descriptors, skipped sections,
/// name runs, then one run of data blocks holding the given rows.
///
/// `names_tail` lands directly after the field-name run: the sort-order
/// label for plain tables, the reference/sort/label metadata for `.Xnn`.
fn build_table(
    fields: &[(u8, u8, &str)],
    table_name: &str,
    names_tail: &[u8],
    rows: &[Vec<u8>],
    row_count: u32,
) -> Vec<u8> {
    let record_size: usize = fields.iter().map(|&(_, len, _)| len as usize).sum();
    let mut data = vec![0u8; HEADER_LEN];

    data[0x00..0x02].copy_from_slice(&(record_size as u16).to_le_bytes());
    data[0x02..0x04].copy_from_slice(&(HEADER_LEN as u16).to_le_bytes());
    data[0x04] = 0x00; // indexed table
    data[0x05] = BLOCK_FACTOR;
    data[0x06..0x0A].copy_from_slice(&row_count.to_le_bytes());
    data[0x21..0x23].copy_from_slice(&(fields.len() as u16).to_le_bytes());
    data[0x39] = 0x0C; // Paradox 7 => extended data header, field info at 0x78
    data[0x6A..0x6C].copy_from_slice(&1252u16.to_le_bytes());

    let mut pos = 0x78;
    for &(type_code, length, _) in fields {
        data[pos] = type_code;
        data[pos + 1] = length;
        pos += 2;
    }
    pos += 4 + 4 * fields.len(); // pointer section
    pos += 2 * fields.len(); // field-number section

    data[pos..pos + table_name.len()].copy_from_slice(table_name.as_bytes());
    pos += table_name.len() + 1;
    for &(_, _, name) in fields {
        data[pos..pos + name.len()].copy_from_slice(name.as_bytes());
        pos += name.len() + 1;
    }
    data[pos..pos + names_tail.len()].copy_from_slice(names_tail);

    let block_size = BLOCK_FACTOR as usize * 1024;
    let slots_per_block = (block_size - 6) / record_size;
    for chunk in rows.chunks(slots_per_block.max(1)) {
        let mut block = vec![0u8; block_size];
        let mut at = 6;
        for row in chunk {
            assert_eq!(row.len(), record_size, "fixture row width mismatch");
            block[at..at + record_size].copy_from_slice(row);
            at += record_size;
        }
        data.extend_from_slice(&block);
    }
    data
}

// --- On-disk scalar encodings (the inverse of the decoders) ---

fn encode_i16(v: i16) -> [u8; 2] {
    let mut b = v.to_be_bytes();
    if v >= 0 {
        b[0] |= 0x80;
    } else {
        b[0] &= 0x7F;
    }
    b
}

fn encode_i32(v: i32) -> [u8; 4] {
    let mut b = v.to_be_bytes();
    if v >= 0 {
        b[0] |= 0x80;
    } else {
        b[0] &= 0x7F;
    }
    b
}

fn encode_f64(v: f64) -> [u8; 8] {
    let mut b = v.to_be_bytes();
    if b[0] & 0x80 == 0 {
        b[0] |= 0x80;
    } else {
        for byte in &mut b {
            *byte = !*byte;
        }
    }
    b
}

fn encode_time_millis(ms: u32) -> [u8; 4] {
    let mut b = ms.to_be_bytes();
    b[0] |= 0x80;
    b
}

fn day_number(date: NaiveDate) -> i64 {
    date.signed_duration_since(NaiveDate::from_ymd_opt(1, 1, 1).unwrap())
        .num_days()
        + 1
}

fn encode_pointer(offset: u32, length: u32, modification: u16) -> [u8; 10] {
    let mut b = [0u8; 10];
    b[..4].copy_from_slice(&offset.to_le_bytes());
    b[4..8].copy_from_slice(&length.to_le_bytes());
    b[8..].copy_from_slice(&modification.to_le_bytes());
    b
}

fn table_of(file: &paradox_reader::ParadoxFile) -> &paradox_reader::ParadoxTable {
    match &file.details {
        FileDetails::Table(table) => table,
        other => panic!("expected table details, got {other:?}"),
    }
}

#[test]
fn s1_alpha_table_decodes_fields_and_rows() {
    let fields = [(0x01u8, 4u8, "CODE"), (0x01, 6, "DESC")];
    let rows = vec![b"A001Widget".to_vec(), b"A002Flange".to_vec()];
    let bytes = build_table(&fields, "MOCK.DB", b"", &rows, 2);

    let file = load_bytes(bytes, ParadoxFormat::Table).expect("parse table");
    let table = table_of(&file);

    assert_eq!(table.fields.len(), 2);
    assert_eq!(table.fields[0].name, "CODE");
    assert_eq!(table.fields[1].name, "DESC");
    assert_eq!(table.table_name.as_deref(), Some("MOCK.DB"));
    assert_eq!(table.header.record_size, 10);
    assert_eq!(table.records.len(), 2);
    assert_eq!(table.code_page_identifier(), Some(1252));

    let values = table.records[0].values(TextEncoding::default());
    assert_eq!(values[0].value, Some(ParadoxValue::Text("A001".to_string())));
    assert_eq!(values[1].value, Some(ParadoxValue::Text("Widget".to_string())));
    let second = table.records[1].values(TextEncoding::default());
    assert_eq!(second[1].value, Some(ParadoxValue::Text("Flange".to_string())));

    // Case-insensitive lookup by field name.
    assert_eq!(
        table.records[0].value("code", TextEncoding::default()),
        Some(ParadoxValue::Text("A001".to_string()))
    );
}

#[test]
fn s2_numeric_table_round_trips_every_scalar() {
    let fields = [
        (0x03u8, 2u8, "SHORT"),
        (0x04, 4, "LONG"),
        (0x06, 8, "NUMBER"),
        (0x09, 1, "FLAG"),
        (0x02, 4, "WHEN"),
        (0x14, 4, "AT"),
        (0x15, 8, "STAMP"),
    ];
    let date = NaiveDate::from_ymd_opt(2023, 4, 15).unwrap();
    let mut row = Vec::new();
    row.extend_from_slice(&encode_i16(25));
    row.extend_from_slice(&encode_i32(123_456));
    row.extend_from_slice(&encode_f64(3.14159));
    row.push(0x81); // true
    row.extend_from_slice(&encode_i32(day_number(date) as i32));
    row.extend_from_slice(&encode_time_millis(30_600_000));
    row.extend_from_slice(&encode_f64(day_number(date) as f64 + 36_930.0 / 86_400.0));

    let bytes = build_table(&fields, "NUMS.DB", b"", &[row], 1);
    let file = load_bytes(bytes, ParadoxFormat::Table).expect("parse table");
    let table = table_of(&file);

    let values = table.records[0].values(TextEncoding::default());
    assert_eq!(values[0].value, Some(ParadoxValue::Integer(25)));
    assert_eq!(values[1].value, Some(ParadoxValue::Integer(123_456)));
    match values[2].value {
        Some(ParadoxValue::Double(v)) => assert!((v - 3.14159).abs() < 1e-5),
        ref other => panic!("expected double, got {other:?}"),
    }
    assert_eq!(values[3].value, Some(ParadoxValue::Bool(true)));
    assert_eq!(values[4].value, Some(ParadoxValue::Date(date)));
    assert_eq!(values[5].value, Some(ParadoxValue::Time(30_600.0)));
    assert_eq!(
        values[6].value,
        Some(ParadoxValue::Timestamp(
            date.and_hms_opt(10, 15, 30).unwrap().and_utc()
        ))
    );

    let formatted = table.records[0].formatted_values(TextEncoding::default());
    assert_eq!(formatted.len(), fields.len());
    assert_eq!(formatted[4], "2023-04-15");
    assert_eq!(formatted[5], "08:30:00");
    assert_eq!(formatted[6], "2023-04-15 10:15:30");
}

/// A type-0x03 sub-blob directory holding one payload at the given index.
fn build_sub_blob_mb(block_offset: usize, index: u8, payload: &[u8]) -> Vec<u8> {
    let data_chunk = 21; // directory (12 + 63*5 = 327 bytes) ends before chunk 21
    let data_offset = data_chunk * 16;
    let mut mb = vec![0u8; block_offset + data_offset + payload.len().next_multiple_of(16)];
    mb[block_offset] = 0x03;
    let entry = block_offset + 12 + index as usize * 5;
    mb[entry] = data_chunk as u8;
    mb[entry + 1] = 1; // one 16-byte chunk
    mb[entry + 4] = (payload.len() % 16) as u8;
    mb[block_offset + data_offset..block_offset + data_offset + payload.len()]
        .copy_from_slice(payload);
    mb
}

#[test]
fn s3_memo_blob_resolves_through_discovered_companion() {
    let memo_text = b"Memo blob text!";
    let fields = [(0x01u8, 4u8, "CODE"), (0x0C, 11, "NOTE")];
    let mut row = b"A001".to_vec();
    row.push(b'M'); // 1-byte leader
    row.extend_from_slice(&encode_pointer(0x1000 | 0x3F, memo_text.len() as u32, 1));
    let db = build_table(&fields, "Sample.DB", b"", &[row], 1);

    let dir = TempDir::new().expect("temp dir");
    // Discovery must see through the "Copy of" prefix on the table file.
    let db_path = dir.path().join("Copy of Sample.DB");
    fs::write(&db_path, &db).expect("write db");
    fs::write(
        dir.path().join("Sample.MB"),
        build_sub_blob_mb(0x1000, 0x3F, memo_text),
    )
    .expect("write mb");

    let file = load(&db_path).expect("load table");
    let table = table_of(&file);
    let values = table.records[0].values(TextEncoding::default());
    assert_eq!(
        values[1].value,
        Some(ParadoxValue::Text("Memo blob text!".to_string()))
    );
}

#[test]
fn s4_graphic_blob_returns_exact_image_bytes() {
    let png: Vec<u8> = {
        let mut p = b"\x89PNG\r\n\x1a\n".to_vec();
        p.extend_from_slice(&[0, 0, 0, 13]);
        p.extend_from_slice(b"IHDR");
        p.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]);
        p
    };
    let fields = [(0x01u8, 4u8, "CODE"), (0x10, 11, "PIC")];
    let mut row = b"A001".to_vec();
    row.push(0x00); // 1-byte indicator leader
    row.extend_from_slice(&encode_pointer(0x1000 | 0xFF, png.len() as u32, 0));
    let db = build_table(&fields, "Pics.DB", b"", &[row], 1);

    // Type-0x02 single-blob block: chunk count, declared length, payload.
    let mut mb = vec![0u8; 0x2000];
    mb[0x1000] = 0x02;
    mb[0x1001..0x1003].copy_from_slice(&1u16.to_le_bytes());
    mb[0x1003..0x1007].copy_from_slice(&(png.len() as u32).to_le_bytes());
    mb[0x1009..0x1009 + png.len()].copy_from_slice(&png);

    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("Pics.DB");
    fs::write(&db_path, &db).expect("write db");
    fs::write(dir.path().join("Pics.MB"), &mb).expect("write mb");

    let file = load(&db_path).expect("load table");
    let table = table_of(&file);
    let values = table.records[0].values(TextEncoding::default());
    assert_eq!(values[1].value, Some(ParadoxValue::Image(png)));
}

#[test]
fn s5_table_view_header_and_strings() {
    let mut tv = b"Borland Standard File".to_vec();
    tv.push(0);
    tv.extend_from_slice(&1u16.to_le_bytes()); // version
    tv.extend_from_slice(&0x0020u16.to_le_bytes()); // flags
    tv.extend_from_slice(&1024u32.to_le_bytes()); // declared length
    tv.extend_from_slice(&0x00A0u16.to_le_bytes()); // first block offset
    tv.extend_from_slice(&[0, 0]); // padding
    tv.extend_from_slice(b"WORK:DATA\\CUS\0");
    tv.extend_from_slice(b"SAMPLE.DB\0");
    tv.extend_from_slice(b"\0"); // empty label, skipped
    tv.extend_from_slice(b"Form Title\0");
    let size = tv.len();

    let file = load_bytes(tv, ParadoxFormat::TableView).expect("parse tv");
    assert_eq!(file.size, size);
    let view = match &file.details {
        FileDetails::TableView(view) => view,
        other => panic!("expected table view, got {other:?}"),
    };
    assert_eq!(view.signature, "Borland Standard File");
    assert_eq!(view.version, 1);
    assert_eq!(view.flags, 0x0020);
    assert_eq!(view.declared_length, 1024);
    assert_eq!(view.first_block_offset, 0x00A0);
    assert_eq!(view.directory_hint, "WORK:DATA\\CUS");
    assert_eq!(view.table_filename, "SAMPLE.DB");
    assert_eq!(view.labels, vec!["Form Title".to_string()]);
    assert_eq!(
        view.resolved_table_reference().as_deref(),
        Some("WORK:DATA\\CUS\\SAMPLE.DB")
    );
}

#[test]
fn s6_query_decodes_as_raw_text() {
    let source = b"SELECT * FROM CUSTOMER;".to_vec();
    let file = load_bytes(source.clone(), ParadoxFormat::Query).expect("decode query");
    match &file.details {
        FileDetails::Query(query) => {
            assert_eq!(query.text.as_bytes(), &source[..]);
            assert_eq!(query.encoding_used.name(), "Windows-1252");
        }
        other => panic!("expected query, got {other:?}"),
    }
}

#[test]
fn display_names_and_value_counts_match_field_count() {
    // Second field name left empty: display falls back to its position.
    let fields = [(0x01u8, 4u8, "CODE"), (0x03, 2, "")];
    let mut row = b"A001".to_vec();
    row.extend_from_slice(&encode_i16(7));
    let bytes = build_table(&fields, "T.DB", b"", &[row], 1);

    let file = load_bytes(bytes, ParadoxFormat::Table).expect("parse table");
    let table = table_of(&file);

    let display = table.field_display_names();
    assert_eq!(display.len(), table.header.field_count);
    assert_eq!(display, vec!["CODE".to_string(), "Field 2".to_string()]);
    for record in &table.records {
        assert_eq!(
            record.values(TextEncoding::default()).len(),
            table.header.field_count
        );
        assert_eq!(
            record.formatted_values(TextEncoding::default()).len(),
            table.fields.len()
        );
    }
}

#[test]
fn emission_stops_at_declared_row_count() {
    let fields = [(0x01u8, 4u8, "CODE")];
    let rows: Vec<Vec<u8>> = (0..5).map(|i| format!("A{i:03}").into_bytes()).collect();
    // Header claims 3 rows; the trailing two slots must not be emitted.
    let bytes = build_table(&fields, "CAP.DB", b"", &rows, 3);
    let file = load_bytes(bytes, ParadoxFormat::Table).expect("parse table");
    assert_eq!(table_of(&file).records.len(), 3);
}

#[test]
fn secondary_index_data_reads_trailing_metadata() {
    let fields = [(0x01u8, 4u8, "NAME"), (0x03, 2, "KEY")];
    let mut tail = Vec::new();
    tail.extend_from_slice(&2u16.to_le_bytes()); // base-table field numbers
    tail.extend_from_slice(&1u16.to_le_bytes());
    tail.extend_from_slice(b"ASCII\0");
    tail.extend_from_slice(b"ByName\0");
    let mut row = b"ACME".to_vec();
    row.extend_from_slice(&encode_i16(1));
    let bytes = build_table(&fields, "CUST.X02", &tail, &[row], 1);

    let file =
        load_bytes(bytes, ParadoxFormat::SecondaryIndexData).expect("parse secondary index data");
    let data = match &file.details {
        FileDetails::SecondaryIndexData(data) => data,
        other => panic!("expected secondary index data, got {other:?}"),
    };
    assert_eq!(data.field_references, vec![2, 1]);
    assert_eq!(data.sort_order.as_deref(), Some("ASCII"));
    assert_eq!(data.index_label.as_deref(), Some("ByName"));
    assert_eq!(data.table.sort_order.as_deref(), Some("ASCII"));
    assert_eq!(data.table.records.len(), 1);
}

#[test]
fn primary_index_blocks_through_the_facade() {
    let mut px = vec![0u8; 2048 + 1024];
    px[0x00..0x02].copy_from_slice(&10u16.to_le_bytes()); // record length
    px[0x02..0x04].copy_from_slice(&2048u16.to_le_bytes());
    px[0x04] = 0x01;
    px[0x05] = 1;
    px[0x06..0x0A].copy_from_slice(&2u32.to_le_bytes());
    px[0x1E..0x20].copy_from_slice(&1u16.to_le_bytes()); // root block
    px[0x20] = 1;
    px[0x21] = 1;
    // One block, two records: last_offset = record_length.
    px[2048 + 4..2048 + 6].copy_from_slice(&10i16.to_le_bytes());
    px[2048 + 6..2048 + 10].copy_from_slice(b"AAA\0");
    px[2048 + 10..2048 + 12].copy_from_slice(&encode_i16(2));
    px[2048 + 16..2048 + 20].copy_from_slice(b"BBB\0");
    px[2048 + 20..2048 + 22].copy_from_slice(&encode_i16(3));

    let file = load_bytes(px, ParadoxFormat::PrimaryIndex).expect("parse index");
    let index = match &file.details {
        FileDetails::Index(index) => index,
        other => panic!("expected index, got {other:?}"),
    };
    assert_eq!(index.kind, IndexKind::Primary);
    assert_eq!(index.header.root_block, 1);
    assert_eq!(index.total_blocks_reported, 1);
    let block = &index.blocks[0];
    assert_eq!(block.record_count, 2);
    assert_eq!(block.records[0].child_block, 2);
    assert_eq!(block.records[0].key_hex(), "41 41 41 00");
}

#[test]
fn family_manifest_via_facade_and_binary_fallback() {
    let fam = b"CUSTOMER.DB\0CUSTOMER.MB\0CUSTOMER.Y01\0".to_vec();
    let file = load_bytes(fam, ParadoxFormat::Family).expect("parse family");
    match &file.details {
        FileDetails::Family(family) => {
            assert_eq!(family.references.len(), 3);
        }
        other => panic!("expected family, got {other:?}"),
    }

    let report = load_bytes(b"not a decodable format".to_vec(), ParadoxFormat::Report)
        .expect("binary fallback");
    match &report.details {
        FileDetails::Binary(bin) => {
            assert_eq!(bin.size(), 22);
            assert!(bin.ascii_segments(4).iter().any(|s| s.contains("decodable")));
        }
        other => panic!("expected binary fallback, got {other:?}"),
    }
}
