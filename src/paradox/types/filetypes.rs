//! The Paradox file-format family and extension-based inference.

use std::fmt;
use std::path::Path;

/// The kinds of on-disk artifact a Paradox table family can contain.
///
/// Inference is purely extension-based; the decoders themselves validate
/// the actual content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParadoxFormat {
    /// `.DB`: a table file (header, field descriptors, data blocks).
    Table,
    /// `.QBE`: a saved query; decoded as raw text only.
    Query,
    /// `.RSL`: a report layout.
    Report,
    /// `.TV`: a table-view container ("Borland Standard File").
    TableView,
    /// `.FAM`: the loose text manifest listing a table's companions.
    Family,
    /// `.PX`: the primary index B-tree.
    PrimaryIndex,
    /// `.Xnn`: secondary index data, structurally a regular table.
    SecondaryIndexData,
    /// `.Ynn`: a secondary index B-tree.
    SecondaryIndex,
    /// `.SSL` / `.SDL`: ObjectPAL scripts.
    Script,
    /// `.XLS` / `.XLSX`: spreadsheets exported alongside the database.
    Spreadsheet,
    /// `.BAK` / `.TMP`: backup and scratch copies.
    Snapshot,
    /// Anything else.
    Unknown,
}

impl ParadoxFormat {
    /// Infer the format from a path's extension, lowercased.
    ///
    /// Exact extensions are matched first; the `X*`/`Y*` secondary-index
    /// patterns apply only after `xls`/`xlsx` have been ruled out.
    pub fn infer(path: impl AsRef<Path>) -> Self {
        let ext = match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_ascii_lowercase(),
            None => return Self::Unknown,
        };
        match ext.as_str() {
            "db" => Self::Table,
            "qbe" => Self::Query,
            "rsl" => Self::Report,
            "tv" => Self::TableView,
            "fam" => Self::Family,
            "px" => Self::PrimaryIndex,
            "ssl" | "sdl" => Self::Script,
            "xls" | "xlsx" => Self::Spreadsheet,
            "bak" | "tmp" => Self::Snapshot,
            _ if ext.starts_with('x') => Self::SecondaryIndexData,
            _ if ext.starts_with('y') => Self::SecondaryIndex,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ParadoxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Query => "query",
            Self::Report => "report",
            Self::TableView => "table view",
            Self::Family => "family",
            Self::PrimaryIndex => "primary index",
            Self::SecondaryIndexData => "secondary index data",
            Self::SecondaryIndex => "secondary index",
            Self::Script => "script",
            Self::Spreadsheet => "spreadsheet",
            Self::Snapshot => "snapshot",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
