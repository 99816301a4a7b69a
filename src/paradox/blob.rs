//! Memo/binary/graphic blob resolution against the companion `.MB` file.
//!
//! A blob-typed field carries a small inline "leader" followed by a 10-byte
//! pointer into the `.MB`. Two block layouts exist there: type 0x02 holds a
//! single large blob, type 0x03 holds a directory of up to 63 sub-blobs.
//! Resolution is deliberately forgiving: any failure falls back to the
//! leader bytes, and a missing `.MB` just means every blob field shows its
//! leader.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, trace};
use regex::Regex;

use super::reader::{peek_u16_le, peek_u32_le};
use super::text::{self, TextEncoding};
use super::types::models::{FieldType, ParadoxValue};

/// The 10-byte trailer of a blob-typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobPointer {
    pub offset_raw: u32,
    pub length_raw: u32,
    pub modification_number: u16,
}

impl BlobPointer {
    /// Sub-blob index: the low 8 bits of the raw offset.
    pub fn index(&self) -> u8 {
        (self.offset_raw & 0xFF) as u8
    }

    /// Byte offset of the containing block in the `.MB` file.
    pub fn block_offset(&self) -> u32 {
        self.offset_raw & !0xFF
    }
}

/// Split a field's in-row bytes into leader and pointer. Fields shorter
/// than 10 bytes have no pointer; everything is leader.
pub fn split_pointer(field: &[u8]) -> (&[u8], Option<BlobPointer>) {
    if field.len() < 10 {
        return (field, None);
    }
    let (leader, tail) = field.split_at(field.len() - 10);
    let pointer = BlobPointer {
        offset_raw: peek_u32_le(tail, 0).unwrap_or(0),
        length_raw: peek_u32_le(tail, 4).unwrap_or(0),
        modification_number: peek_u16_le(tail, 8).unwrap_or(0),
    };
    (leader, Some(pointer))
}

/// Lazily-loaded cache of candidate `.MB` files for one table.
///
/// Single-consumer per table: the cache lock is never contended in the
/// supported usage, and a poisoned lock simply counts as a resolution
/// failure.
#[derive(Debug, Default)]
pub struct BlobStore {
    candidates: Vec<PathBuf>,
    cache: Mutex<HashMap<PathBuf, Option<Arc<Vec<u8>>>>>,
}

impl BlobStore {
    /// Locate candidate `.MB` files next to a table.
    ///
    /// Candidate base names come from the table file's stem and the
    /// declared in-header table name, each also stripped of a trailing
    /// `" (N)"` disambiguator and a leading `"Copy of "` prefix. If no
    /// candidate matches a directory entry, every `.MB` in the directory
    /// is tried.
    pub fn discover(table_path: &Path, table_name: Option<&str>) -> Self {
        let dir = table_path.parent().unwrap_or_else(|| Path::new("."));
        let mb_files: Vec<PathBuf> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| e.eq_ignore_ascii_case("mb"))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut bases: Vec<String> = Vec::new();
        let mut push_unique = |name: String, bases: &mut Vec<String>| {
            if !name.is_empty() && !bases.iter().any(|b| b.eq_ignore_ascii_case(&name)) {
                bases.push(name);
            }
        };
        let stems = [
            table_path.file_stem().and_then(|s| s.to_str()).map(str::to_string),
            table_name.map(|n| {
                Path::new(n)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(n)
                    .to_string()
            }),
        ];
        for stem in stems.into_iter().flatten() {
            for variant in base_variants(&stem) {
                push_unique(variant, &mut bases);
            }
        }

        let mut candidates: Vec<PathBuf> = bases
            .iter()
            .flat_map(|base| {
                mb_files.iter().filter(move |p| {
                    p.file_stem()
                        .and_then(|s| s.to_str())
                        .is_some_and(|s| s.eq_ignore_ascii_case(base))
                })
            })
            .cloned()
            .collect();
        candidates.dedup();
        if candidates.is_empty() {
            candidates = mb_files;
        }
        debug!("blob store candidates: {candidates:?}");
        Self {
            candidates,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a blob-typed field to its payload value.
    pub fn resolve(
        &self,
        field: &[u8],
        kind: FieldType,
        encoding: TextEncoding,
    ) -> Option<ParadoxValue> {
        let (leader, pointer) = split_pointer(field);
        let Some(pointer) = pointer else {
            return payload_value(leader, kind, encoding);
        };
        // offset_raw of zero means the whole value is stored inline.
        if pointer.offset_raw == 0 {
            return payload_value(leader, kind, encoding);
        }
        for candidate in &self.candidates {
            let Some(data) = self.load(candidate) else {
                continue;
            };
            if let Some(payload) = read_blob(&data, &pointer) {
                trace!(
                    "resolved {} byte blob at {:#x}[{}] from {}",
                    payload.len(),
                    pointer.block_offset(),
                    pointer.index(),
                    candidate.display()
                );
                return payload_value(&payload, kind, encoding);
            }
        }
        payload_value(leader, kind, encoding)
    }

    fn load(&self, path: &Path) -> Option<Arc<Vec<u8>>> {
        let mut cache = self.cache.lock().ok()?;
        cache
            .entry(path.to_path_buf())
            .or_insert_with(|| match fs::read(path) {
                Ok(bytes) => Some(Arc::new(bytes)),
                Err(err) => {
                    debug!("failed to read {}: {err}", path.display());
                    None
                }
            })
            .clone()
    }
}

/// Resolve a blob field through an optional store. Without a store (table
/// loaded from bytes alone) only inline leaders can be produced.
pub(crate) fn resolve_blob_field(
    store: Option<&BlobStore>,
    field: &[u8],
    kind: FieldType,
    encoding: TextEncoding,
) -> Option<ParadoxValue> {
    match store {
        Some(store) => store.resolve(field, kind, encoding),
        None => {
            let (leader, _) = split_pointer(field);
            payload_value(leader, kind, encoding)
        }
    }
}

/// Read a blob payload out of `.MB` bytes. `None` is a resolution failure;
/// the caller falls back to the next candidate or the leader.
fn read_blob(data: &[u8], pointer: &BlobPointer) -> Option<Vec<u8>> {
    let base = pointer.block_offset() as usize;
    let block_type = *data.get(base)?;
    match block_type {
        // Single large blob; the pointer's index byte is 0xFF.
        0x02 if pointer.index() == 0xFF => {
            let chunk_count = peek_u16_le(data, base + 1)? as usize;
            let block_length = chunk_count * 0x1000;
            if block_length < 9 {
                return None;
            }
            let declared = peek_u32_le(data, base + 3)? as usize;
            let length = if declared > 0 {
                declared
            } else {
                pointer.length_raw as usize
            }
            .min(block_length - 9);
            slice_payload(data, base + 9, length)
        }
        // Sub-blob directory; 5-byte entries from offset 12.
        0x03 if pointer.index() < 0xFF => {
            let entry_at = base + 12 + pointer.index() as usize * 5;
            let entry = data.get(entry_at..entry_at + 5)?;
            if entry.iter().all(|&b| b == 0) {
                return None;
            }
            let offset_chunks = entry[0] as usize;
            let chunk_count = entry[1] as usize;
            let remainder = entry[4] as usize;
            let entry_length = chunk_count.saturating_sub(1) * 16
                + if remainder == 0 && chunk_count > 0 {
                    16
                } else {
                    remainder
                };
            let length = if pointer.length_raw > 0 {
                (pointer.length_raw as usize).min(entry_length)
            } else {
                entry_length
            };
            slice_payload(data, base + offset_chunks * 16, length)
        }
        _ => None,
    }
}

fn slice_payload(data: &[u8], start: usize, length: usize) -> Option<Vec<u8>> {
    let end = start.checked_add(length)?.min(data.len());
    (start <= data.len()).then(|| data[start.min(data.len())..end].to_vec())
}

/// Interpret payload (or leader) bytes for the field's kind. Empty
/// payloads are null.
fn payload_value(payload: &[u8], kind: FieldType, encoding: TextEncoding) -> Option<ParadoxValue> {
    if payload.is_empty() {
        return None;
    }
    match kind {
        FieldType::Memo | FieldType::FormattedMemo => {
            let end = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            Some(ParadoxValue::Text(text::decode_bytes(&payload[..end], encoding)))
        }
        FieldType::Graphic => Some(ParadoxValue::Image(payload.to_vec())),
        _ => Some(ParadoxValue::Bytes(payload.to_vec())),
    }
}

/// Base-name variants for `.MB` discovery: the stem itself, the stem
/// without a trailing `" (N)"`, and each of those without a leading
/// `"Copy of "`.
fn base_variants(stem: &str) -> Vec<String> {
    static DISAMBIGUATOR: OnceLock<Regex> = OnceLock::new();
    let re = DISAMBIGUATOR
        .get_or_init(|| Regex::new(r"\s*\(\d+\)\s*$").expect("disambiguator pattern is valid"));

    let mut variants = vec![stem.to_string()];
    let stripped = re.replace(stem, "").into_owned();
    if stripped != stem {
        variants.push(stripped);
    }
    for i in 0..variants.len() {
        let lower = variants[i].to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("copy of ") {
            let original = variants[i][variants[i].len() - rest.len()..].to_string();
            variants.push(original);
        }
    }
    variants
}
