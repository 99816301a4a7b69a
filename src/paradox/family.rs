//! `.FAM` family manifest parsing.
//!
//! A family file is a loose Windows-1252 text manifest naming every
//! auxiliary file that belongs to one table. Parsing never fails: bytes
//! that cannot be text become spaces and the reference list may simply
//! come out empty.

use std::sync::OnceLock;

use encoding_rs::WINDOWS_1252;
use log::debug;
use regex::Regex;

/// What a manifest entry refers to, classified by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyReferenceKind {
    Table,
    PrimaryIndex,
    SecondaryIndex,
    Memo,
    Validity,
    Query,
    TableView,
    Report,
    Script,
    Family,
    Image,
    Other,
}

impl FamilyReferenceKind {
    fn classify(extension: &str) -> Self {
        let ext = extension.to_ascii_lowercase();
        match ext.as_str() {
            "db" => Self::Table,
            "px" => Self::PrimaryIndex,
            "mb" => Self::Memo,
            "val" => Self::Validity,
            "qbe" => Self::Query,
            "tv" => Self::TableView,
            "rsl" => Self::Report,
            "ssl" | "sdl" => Self::Script,
            "fam" => Self::Family,
            "bmp" | "pcx" | "gif" | "tif" | "png" | "jpg" => Self::Image,
            _ if ext.len() == 3 && (ext.starts_with('x') || ext.starts_with('y')) => {
                Self::SecondaryIndex
            }
            _ => Self::Other,
        }
    }
}

/// One filename token recovered from the manifest.
#[derive(Debug, Clone)]
pub struct FamilyReference {
    pub name: String,
    pub kind: FamilyReferenceKind,
    /// 1-based line of the recovered text the token appeared on.
    pub line_number: usize,
    /// The containing line, trimmed.
    pub context: String,
}

/// The recovered manifest: its readable text and the references found.
#[derive(Debug, Clone)]
pub struct ParadoxFamilyFile {
    pub text: String,
    pub references: Vec<FamilyReference>,
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[A-Z0-9_\-]+\.[A-Z0-9]{1,4}").expect("filename pattern is valid")
    })
}

/// Parse a family manifest. Embedded NULs act as line breaks and
/// non-printable, non-whitespace bytes become spaces before decoding.
pub fn parse(bytes: &[u8]) -> ParadoxFamilyFile {
    let cleaned: Vec<u8> = bytes
        .iter()
        .map(|&b| match b {
            0 => b'\n',
            b'\t' | b'\r' | b'\n' => b,
            0x01..=0x1F | 0x7F => b' ',
            _ => b,
        })
        .collect();
    let (text, _, _) = WINDOWS_1252.decode(&cleaned);
    let text = text.into_owned();

    let mut references: Vec<FamilyReference> = Vec::new();
    for m in filename_pattern().find_iter(&text) {
        let name = m.as_str().to_string();
        let upper = name.to_ascii_uppercase();
        if references
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(&upper))
        {
            continue;
        }
        let line_number = text[..m.start()].matches('\n').count() + 1;
        let line_start = text[..m.start()].rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[m.start()..]
            .find('\n')
            .map_or(text.len(), |i| m.start() + i);
        let extension = name.rsplit('.').next().unwrap_or("");
        references.push(FamilyReference {
            kind: FamilyReferenceKind::classify(extension),
            context: text[line_start..line_end].trim().to_string(),
            line_number,
            name,
        });
    }
    debug!("family manifest: {} references", references.len());
    ParadoxFamilyFile { text, references }
}
