//! Resolution of configfs-style trees where an object is identified by the
//! single symbolic link inside a directory.
//!
//! A target LUN directory holds exactly one link pointing at its backstore,
//! e.g. `../../../../../../target/core/iblock_0/disk0`. The second-to-last
//! segment names the backstore kind and instance, the last one the object.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::error::ParseError;
use crate::collector::traits::FileSystem;

/// The parts of a backstore link target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTarget {
    /// Kind tag, e.g. `iblock` or `rd_mcp`.
    pub kind: String,
    pub instance: u32,
    /// Name of the storage object inside the backstore.
    pub object: String,
}

/// Finds the one symlink among the entries of `dir` and returns its raw
/// target.
pub fn resolve_single_link<F: FileSystem>(fs: &F, dir: &Path) -> Result<PathBuf, ParseError> {
    let entries = fs
        .read_dir(dir)
        .map_err(|e| ParseError::resolution(dir, format!("cannot list directory: {e}")))?;

    let mut links = entries.into_iter().filter(|p| fs.is_symlink(p));
    let Some(link) = links.next() else {
        return Err(ParseError::resolution(dir, "no symlink found"));
    };
    if links.next().is_some() {
        return Err(ParseError::resolution(dir, "more than one symlink found"));
    }

    fs.read_link(&link)
        .map_err(|e| ParseError::resolution(&link, format!("cannot read link: {e}")))
}

/// Splits a link target into kind, instance and object name.
///
/// The parent segment is split on `_`: `iblock_3` gives kind `iblock`,
/// `rd_mcp_7` gives kind `rd_mcp`. Any other shape is rejected.
pub fn decompose_link_target(target: &Path) -> Result<LinkTarget, ParseError> {
    let segments: Vec<&str> = target
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_str()),
            _ => None,
        })
        .collect::<Option<_>>()
        .ok_or_else(|| ParseError::resolution(target, "link target is not valid UTF-8"))?;

    let [.., parent, object] = segments.as_slice() else {
        return Err(ParseError::resolution(
            target,
            "link target has fewer than two segments",
        ));
    };

    let malformed = || ParseError::resolution(target, format!("malformed backstore name {parent:?}"));

    let parts: Vec<&str> = parent.split('_').collect();
    let (kind, instance) = match parts.as_slice() {
        [kind, instance] => (kind.to_string(), *instance),
        [first, second, instance] => (format!("{first}_{second}"), *instance),
        _ => return Err(malformed()),
    };
    if kind.is_empty() || kind.starts_with('_') || kind.ends_with('_') {
        return Err(malformed());
    }
    let instance = instance.parse::<u32>().map_err(|_| malformed())?;

    Ok(LinkTarget {
        kind,
        instance,
        object: object.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn lun_dir() -> MockFs {
        let mut fs = MockFs::new();
        fs.add_dir("/lun_0/statistics");
        fs.add_file("/lun_0/alua_tg_pt_gp", "default_tg_pt_gp\n");
        fs
    }

    #[test]
    fn test_resolve_single_link() {
        let mut fs = lun_dir();
        fs.add_symlink("/lun_0/a7c3e1", "../../../../../../target/core/iblock_0/disk0");

        let target = resolve_single_link(&fs, Path::new("/lun_0")).unwrap();
        assert_eq!(
            target,
            PathBuf::from("../../../../../../target/core/iblock_0/disk0")
        );
    }

    #[test]
    fn test_resolve_no_link() {
        let fs = lun_dir();
        let err = resolve_single_link(&fs, Path::new("/lun_0")).unwrap_err();
        assert!(matches!(err, ParseError::Resolution { .. }));
        assert!(err.to_string().contains("no symlink"));
    }

    #[test]
    fn test_resolve_two_links() {
        let mut fs = lun_dir();
        fs.add_symlink("/lun_0/a", "../core/iblock_0/disk0");
        fs.add_symlink("/lun_0/b", "../core/iblock_1/disk1");
        let err = resolve_single_link(&fs, Path::new("/lun_0")).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn test_resolve_missing_dir() {
        let fs = MockFs::new();
        let err = resolve_single_link(&fs, Path::new("/lun_9")).unwrap_err();
        assert!(matches!(err, ParseError::Resolution { .. }));
    }

    #[test]
    fn test_decompose_two_part_name() {
        let parts = decompose_link_target(Path::new("../../core/iblock_3/vol")).unwrap();
        assert_eq!(
            parts,
            LinkTarget {
                kind: "iblock".to_string(),
                instance: 3,
                object: "vol".to_string(),
            }
        );
    }

    #[test]
    fn test_decompose_three_part_name() {
        let parts = decompose_link_target(Path::new("/target/core/rd_mcp_7/ramdisk")).unwrap();
        assert_eq!(parts.kind, "rd_mcp");
        assert_eq!(parts.instance, 7);
        assert_eq!(parts.object, "ramdisk");
    }

    #[test]
    fn test_decompose_too_short() {
        let err = decompose_link_target(Path::new("iblock_0")).unwrap_err();
        assert!(err.to_string().contains("fewer than two"));
        assert!(decompose_link_target(Path::new("../..")).is_err());
    }

    #[test]
    fn test_decompose_malformed_names() {
        for target in [
            "core/iblock/disk",
            "core/a_b_c_1/disk",
            "core/iblock_x/disk",
            "core/_3/disk",
            "core/iblock_/disk",
        ] {
            let err = decompose_link_target(Path::new(target)).unwrap_err();
            assert!(
                matches!(err, ParseError::Resolution { .. }),
                "{target}: {err}"
            );
        }
    }
}
