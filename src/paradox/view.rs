//! `.TV` table-view container parsing.
//!
//! Table views open with the ASCII signature `Borland Standard File`,
//! a small fixed header, and a run of NUL-terminated strings naming the
//! directory and table the view was built over. Whatever follows the
//! strings is undocumented and preserved as opaque bytes.

use log::debug;

use super::reader::ByteReader;
use super::text::{self, TextEncoding};
use super::types::error::{ParadoxError, Result};
use super::types::filetypes::ParadoxFormat;

/// The exact 21-byte signature, without a trailing NUL.
pub const TV_SIGNATURE: &str = "Borland Standard File";

/// Minimum bytes for the signature plus the fixed header fields.
pub const TV_MIN_LEN: usize = 32;

const MAX_LABELS: usize = 4;

/// A parsed `.TV` container.
#[derive(Debug, Clone)]
pub struct ParadoxTableView {
    pub signature: String,
    pub version: u16,
    pub flags: u16,
    pub declared_length: u32,
    pub first_block_offset: u16,
    /// Directory the referenced table lived in, as recorded at save time.
    pub directory_hint: String,
    pub table_filename: String,
    /// Up to four further non-empty labels (form titles and the like).
    pub labels: Vec<String>,
    /// Undocumented remainder, kept verbatim.
    pub payload: Vec<u8>,
}

impl ParadoxTableView {
    /// Join the directory hint and table filename with a backslash,
    /// unless the hint already ends in a path separator.
    pub fn resolved_table_reference(&self) -> Option<String> {
        if self.table_filename.is_empty() {
            return None;
        }
        if self.directory_hint.is_empty() {
            return Some(self.table_filename.clone());
        }
        if self.directory_hint.ends_with('/') || self.directory_hint.ends_with('\\') {
            Some(format!("{}{}", self.directory_hint, self.table_filename))
        } else {
            Some(format!("{}\\{}", self.directory_hint, self.table_filename))
        }
    }
}

/// Parse a table-view file.
pub fn parse(data: &[u8]) -> Result<ParadoxTableView> {
    if data.len() < TV_MIN_LEN {
        return Err(ParadoxError::TooSmall {
            format: ParadoxFormat::TableView,
            got: data.len(),
            minimum: TV_MIN_LEN,
        });
    }
    let signature_bytes = &data[..TV_SIGNATURE.len()];
    if signature_bytes != TV_SIGNATURE.as_bytes() {
        return Err(ParadoxError::InvalidSignature {
            expected: TV_SIGNATURE.to_string(),
            found: String::from_utf8_lossy(signature_bytes).into_owned(),
        });
    }

    let mut pos = TV_SIGNATURE.len();
    skip_nul_padding(data, &mut pos);

    let mut r = ByteReader::new(data);
    r.seek(pos)?;
    let version = r.read_u16()?;
    let flags = r.read_u16()?;
    let declared_length = r.read_u32()?;
    let first_block_offset = r.read_u16()?;
    pos = r.position();
    skip_nul_padding(data, &mut pos);

    let encoding = TextEncoding::default();
    let directory_hint = text::decode_bytes(text::take_c_string(data, &mut pos), encoding);
    let table_filename = text::decode_bytes(text::take_c_string(data, &mut pos), encoding);

    let mut labels = Vec::new();
    while labels.len() < MAX_LABELS && pos < data.len() {
        let raw = text::take_c_string(data, &mut pos);
        if !raw.is_empty() {
            labels.push(text::decode_bytes(raw, encoding));
        }
    }
    let payload = data[pos.min(data.len())..].to_vec();

    debug!(
        "table view: version={version} table={table_filename:?} labels={} payload={} bytes",
        labels.len(),
        payload.len()
    );
    Ok(ParadoxTableView {
        signature: TV_SIGNATURE.to_string(),
        version,
        flags,
        declared_length,
        first_block_offset,
        directory_hint,
        table_filename,
        labels,
        payload,
    })
}

fn skip_nul_padding(data: &[u8], pos: &mut usize) {
    while *pos < data.len() && data[*pos] == 0 {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_signature() {
        let mut data = vec![0u8; 64];
        data[..21].copy_from_slice(b"Borland Substandard F");
        let err = parse(&data).unwrap_err();
        assert!(matches!(err, ParadoxError::InvalidSignature { .. }));
    }

    #[test]
    fn rejects_short_buffers() {
        let err = parse(b"Borland Standard File").unwrap_err();
        assert!(matches!(err, ParadoxError::TooSmall { minimum: 32, .. }));
    }

    #[test]
    fn separator_rules_for_resolved_reference() {
        let view = ParadoxTableView {
            signature: TV_SIGNATURE.to_string(),
            version: 1,
            flags: 0,
            declared_length: 0,
            first_block_offset: 0,
            directory_hint: "WORK:DATA\\CUS\\".to_string(),
            table_filename: "SAMPLE.DB".to_string(),
            labels: Vec::new(),
            payload: Vec::new(),
        };
        assert_eq!(
            view.resolved_table_reference().as_deref(),
            Some("WORK:DATA\\CUS\\SAMPLE.DB")
        );
    }
}
