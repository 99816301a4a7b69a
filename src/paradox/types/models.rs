//! Data structures representing Paradox format components.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, NaiveDate, Utc};

/// Paradox scalar field types, decoded from the one-byte descriptor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 0x01: fixed-width text, code-paged and padded.
    Alpha,
    /// 0x02: days since 0001-01-01 (day 1 inclusive).
    Date,
    /// 0x03: signed 16-bit integer.
    Short,
    /// 0x04: signed 32-bit integer.
    Long,
    /// 0x05: currency, stored as a double.
    Currency,
    /// 0x06: IEEE-754 double.
    Number,
    /// 0x07 / 0x09: boolean.
    Logical,
    /// 0x08 / 0x0C: memo text resolved through the blob store.
    Memo,
    /// 0x0E: formatted memo text, also blob-backed.
    FormattedMemo,
    /// 0x0D: binary blob.
    Binary,
    /// 0x0F: OLE object blob.
    Ole,
    /// 0x10: graphic blob.
    Graphic,
    /// 0x14: milliseconds since midnight.
    Time,
    /// 0x15: timestamp instant.
    Timestamp,
    /// 0x16: auto-incrementing signed 32-bit integer.
    AutoIncrement,
    /// 0x17: fixed-point BCD decimal.
    Bcd,
    /// 0x18: raw in-row byte sequence.
    Bytes,
    /// Any code this decoder does not recognize.
    Unknown(u8),
}

impl FieldType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Alpha,
            0x02 => Self::Date,
            0x03 => Self::Short,
            0x04 => Self::Long,
            0x05 => Self::Currency,
            0x06 => Self::Number,
            0x07 | 0x09 => Self::Logical,
            0x08 | 0x0C => Self::Memo,
            0x0E => Self::FormattedMemo,
            0x0D => Self::Binary,
            0x0F => Self::Ole,
            0x10 => Self::Graphic,
            0x14 => Self::Time,
            0x15 => Self::Timestamp,
            0x16 => Self::AutoIncrement,
            0x17 => Self::Bcd,
            0x18 => Self::Bytes,
            other => Self::Unknown(other),
        }
    }

    /// True for types whose in-row bytes are a leader plus a 10-byte pointer
    /// into the companion `.MB` file.
    pub fn is_blob_backed(&self) -> bool {
        matches!(
            self,
            Self::Memo | Self::FormattedMemo | Self::Binary | Self::Ole | Self::Graphic
        )
    }

    /// Human-readable type name for schema listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Alpha => "Alpha",
            Self::Date => "Date",
            Self::Short => "Short",
            Self::Long => "Long",
            Self::Currency => "Currency",
            Self::Number => "Number",
            Self::Logical => "Logical",
            Self::Memo => "Memo",
            Self::FormattedMemo => "Formatted Memo",
            Self::Binary => "Binary",
            Self::Ole => "OLE",
            Self::Graphic => "Graphic",
            Self::Time => "Time",
            Self::Timestamp => "Timestamp",
            Self::AutoIncrement => "AutoInc",
            Self::Bcd => "BCD",
            Self::Bytes => "Bytes",
            Self::Unknown(_) => "Unknown",
        }
    }
}

/// One field of a table: position, declared width, type, and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Zero-based declaration order.
    pub index: usize,
    /// Width of the field's slice within a record, in bytes.
    pub length: usize,
    /// The raw on-disk type code.
    pub type_code: u8,
    pub field_type: FieldType,
    pub name: String,
}

impl FieldDescriptor {
    /// The field name, or `"Field {n}"` (1-based) when the name is empty
    /// or whitespace-only.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Field {}", self.index + 1)
        } else {
            self.name.clone()
        }
    }
}

/// The table-file kind declared at header offset 0x04.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTypeCode {
    /// 0x00: keyed `.DB` table.
    IndexedTable,
    /// 0x01: `.PX` primary index.
    PrimaryIndex,
    /// 0x02: keyless `.DB` table.
    UnindexedTable,
    /// 0x03: non-incrementing secondary index data (`.Xnn`).
    NonIncrementingSecondaryIndex,
    /// 0x04: secondary index B-tree (`.Ynn`).
    SecondaryIndex,
    /// 0x05: incrementing secondary index data (`.Xnn`).
    IncrementingSecondaryIndex,
    /// 0x06: group secondary index.
    GroupSecondaryIndex,
    Unknown(u8),
}

impl FileTypeCode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::IndexedTable,
            0x01 => Self::PrimaryIndex,
            0x02 => Self::UnindexedTable,
            0x03 => Self::NonIncrementingSecondaryIndex,
            0x04 => Self::SecondaryIndex,
            0x05 => Self::IncrementingSecondaryIndex,
            0x06 => Self::GroupSecondaryIndex,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::IndexedTable => 0x00,
            Self::PrimaryIndex => 0x01,
            Self::UnindexedTable => 0x02,
            Self::NonIncrementingSecondaryIndex => 0x03,
            Self::SecondaryIndex => 0x04,
            Self::IncrementingSecondaryIndex => 0x05,
            Self::GroupSecondaryIndex => 0x06,
            Self::Unknown(c) => *c,
        }
    }
}

/// Paradox release normalized from the raw `file_version_id` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableVersion {
    V30,
    V35,
    V40,
    V50,
    V70,
}

impl TableVersion {
    pub fn from_id(id: u8) -> Self {
        match id {
            0..=0x03 => Self::V30,
            0x04 => Self::V35,
            0x05..=0x09 => Self::V40,
            0x0A | 0x0B => Self::V50,
            _ => Self::V70,
        }
    }

    /// The normalized two-digit version number (30, 35, 40, 50, 70).
    pub fn number(&self) -> u16 {
        match self {
            Self::V30 => 30,
            Self::V35 => 35,
            Self::V40 => 40,
            Self::V50 => 50,
            Self::V70 => 70,
        }
    }
}

/// Fixed metadata from the first 128+ bytes of a `.DB` file.
#[derive(Debug, Clone)]
pub struct TableHeader {
    /// Bytes per row.
    pub record_size: usize,
    /// Offset where the data-block area begins.
    pub header_length: usize,
    pub file_type: FileTypeCode,
    /// Data block size in KiB units (1–32).
    pub max_table_size_factor: u8,
    pub row_count: u32,
    pub field_count: usize,
    pub key_field_count: usize,
    /// Live auto-increment counter (u32 at 0x48).
    pub auto_increment_value: u32,
    /// Overlapping u32 at 0x49, surfaced separately; `None` when zero.
    pub auto_increment_seed: Option<u32>,
    /// Raw version byte at 0x39.
    pub file_version_id: u8,
    pub version: TableVersion,
    /// Code-page identifier at 0x6A (Windows-1252 in practice).
    pub code_page: u16,
}

impl TableHeader {
    /// Data block size in bytes.
    pub fn block_size(&self) -> usize {
        self.max_table_size_factor as usize * 1024
    }

    /// Whether the extended data header is present, pushing the field-info
    /// section from 0x58 to 0x78.
    pub fn includes_data_header(&self) -> bool {
        matches!(self.file_type.code(), 0x00 | 0x02 | 0x03 | 0x05)
            && self.version >= TableVersion::V40
    }

    pub fn field_info_offset(&self) -> usize {
        if self.includes_data_header() {
            0x78
        } else {
            0x58
        }
    }
}

/// A decoded field value: the closed sum over every shape a Paradox
/// scalar can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ParadoxValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Decimal(BigDecimal),
    Bool(bool),
    Date(NaiveDate),
    /// Seconds since midnight, millisecond precision.
    Time(f64),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    /// Undecodable bytes kept verbatim.
    Raw(Vec<u8>),
    Image(Vec<u8>),
}

impl ParadoxValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical display rendering.
    ///
    /// Integers and doubles use a locale-neutral decimal form with up to 6
    /// fraction digits; decimals keep between 2 and 6; dates render as
    /// `yyyy-MM-dd` and timestamps as `yyyy-MM-dd HH:mm:ss`, both UTC,
    /// unless custom chrono format strings are supplied.
    pub fn formatted_string(
        &self,
        date_format: Option<&str>,
        timestamp_format: Option<&str>,
    ) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(v) => v.to_string(),
            Self::Double(v) => format_double(*v),
            Self::Decimal(v) => format_decimal(v),
            Self::Bool(v) => if *v { "true" } else { "false" }.to_string(),
            Self::Date(d) => d.format(date_format.unwrap_or("%Y-%m-%d")).to_string(),
            Self::Time(secs) => format_time(*secs),
            Self::Timestamp(ts) => ts
                .format(timestamp_format.unwrap_or("%Y-%m-%d %H:%M:%S"))
                .to_string(),
            Self::Bytes(b) | Self::Raw(b) => format_hex(b),
            Self::Image(_) => "[Image]".to_string(),
        }
    }
}

fn format_double(v: f64) -> String {
    let mut s = format!("{:.6}", v);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

fn format_decimal(v: &BigDecimal) -> String {
    let mut s = v.with_scale_round(6, RoundingMode::HalfUp).to_string();
    if let Some(dot) = s.find('.') {
        let keep_at_least = dot + 1 + 2;
        while s.len() > keep_at_least && s.ends_with('0') {
            s.pop();
        }
    } else {
        s.push_str(".00");
    }
    s
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
