//! LUN backstore identification.
//!
//! Every LUN directory under a target portal group links to the storage
//! object backing it in `target/core/<kind>_<n>/<object>`.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::collector::traits::FileSystem;
use crate::parse::{ParseError, decompose_link_target, resolve_single_link};

/// Storage backends LIO can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackstoreKind {
    Fileio,
    Iblock,
    Rbd,
    RdMcp,
}

impl BackstoreKind {
    /// Maps the directory tag used by configfs.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fileio" => Some(BackstoreKind::Fileio),
            "iblock" => Some(BackstoreKind::Iblock),
            "rbd" => Some(BackstoreKind::Rbd),
            "rd_mcp" => Some(BackstoreKind::RdMcp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackstoreKind::Fileio => "fileio",
            BackstoreKind::Iblock => "iblock",
            BackstoreKind::Rbd => "rbd",
            BackstoreKind::RdMcp => "rd_mcp",
        }
    }
}

impl fmt::Display for BackstoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage object a LUN exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackstoreEntry {
    pub kind: BackstoreKind,
    pub instance: u32,
    pub object_name: String,
}

impl BackstoreEntry {
    /// Directory of the storage object relative to `target/core`.
    pub fn core_dir(&self) -> String {
        format!("{}_{}/{}", self.kind, self.instance, self.object_name)
    }
}

/// Resolves the backstore of the LUN at `lun_dir`.
pub fn resolve_backstore<F: FileSystem>(
    fs: &F,
    lun_dir: &Path,
) -> Result<BackstoreEntry, ParseError> {
    let target = resolve_single_link(fs, lun_dir)?;
    let parts = decompose_link_target(&target)?;
    let kind = BackstoreKind::from_tag(&parts.kind).ok_or_else(|| {
        ParseError::resolution(&target, format!("unknown backstore kind {:?}", parts.kind))
    })?;

    Ok(BackstoreEntry {
        kind,
        instance: parts.instance,
        object_name: parts.object,
    })
}
