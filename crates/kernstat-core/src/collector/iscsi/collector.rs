//! iSCSI target collector over the LIO configfs tree.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::collector::traits::FileSystem;
use crate::parse::{ParseError, SkippedUnit, parse_u64};

use super::backstore::{BackstoreEntry, BackstoreKind, resolve_backstore};

/// One exported logical unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lun {
    pub name: String,
    pub path: PathBuf,
    pub backstore: BackstoreEntry,
}

/// A target portal group (`tpgt_N`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tpgt {
    pub name: String,
    pub path: PathBuf,
    pub enabled: bool,
    /// Empty when the group is disabled.
    pub luns: Vec<Lun>,
    /// LUNs whose backstore could not be resolved.
    pub lun_errors: Vec<SkippedUnit>,
}

/// An iSCSI target, named by its IQN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IscsiTarget {
    pub name: String,
    pub path: PathBuf,
    pub tpgts: Vec<Tpgt>,
}

/// Per-LUN traffic counters from `statistics/scsi_tgt_port`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LunIo {
    pub read_mbytes: u64,
    pub write_mbytes: u64,
    /// SCSI commands received.
    pub in_cmds: u64,
}

/// A file-backed or block-backed object and the device path it was
/// created on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UdevBackstore {
    pub instance: u32,
    pub object_name: String,
    pub udev_path: String,
}

/// A mapped Ceph RBD image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RbdDevice {
    /// Number of the `/sys/devices/rbd/<n>` entry (and of `/dev/rbd<n>`).
    pub device: u32,
    pub pool: String,
    pub image: String,
}

/// A RAM-disk object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RdMcpBackstore {
    pub instance: u32,
    pub object_name: String,
    pub path: PathBuf,
}

/// Detail about a backstore found outside the LUN directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackstoreDetail {
    Fileio(UdevBackstore),
    Iblock(UdevBackstore),
    Rbd(RbdDevice),
    RdMcp(RdMcpBackstore),
}

/// Collector for iSCSI targets exported through LIO.
pub struct IscsiCollector<F: FileSystem> {
    fs: F,
    configfs_path: PathBuf,
    sys_path: PathBuf,
}

impl<F: FileSystem> IscsiCollector<F> {
    /// Creates a new IscsiCollector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation
    /// * `configfs_path` - configfs mount point (e.g., "/sys/kernel/config")
    /// * `sys_path` - sysfs mount point, for RBD lookups (e.g., "/sys")
    pub fn new(fs: F, configfs_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            configfs_path: configfs_path.into(),
            sys_path: sys_path.into(),
        }
    }

    fn iscsi_dir(&self) -> PathBuf {
        self.configfs_path.join("target/iscsi")
    }

    fn core_dir(&self) -> PathBuf {
        self.configfs_path.join("target/core")
    }

    /// Collects every target under `target/iscsi`.
    pub fn collect(&self) -> Result<Vec<IscsiTarget>, ParseError> {
        let targets = sorted_entries(&self.fs, &self.iscsi_dir(), "iqn")?;
        targets
            .into_iter()
            .map(|(name, path)| self.collect_target(&path, name))
            .collect()
    }

    /// Collects one target directory.
    pub fn collect_target(&self, path: &Path, name: String) -> Result<IscsiTarget, ParseError> {
        let mut tpgts = Vec::new();
        for (tpgt_name, tpgt_path) in sorted_entries(&self.fs, path, "tpgt_")? {
            tpgts.push(self.collect_tpgt(tpgt_path, tpgt_name)?);
        }
        debug!(target = %name, tpgts = tpgts.len(), "collected iscsi target");
        Ok(IscsiTarget {
            name,
            path: path.to_path_buf(),
            tpgts,
        })
    }

    fn collect_tpgt(&self, path: PathBuf, name: String) -> Result<Tpgt, ParseError> {
        let enable = self.fs.read_to_string(&path.join("enable"))?;
        let enabled = match enable.trim() {
            "1" => true,
            "0" => false,
            other => return Err(ParseError::structural("tpgt enable flag", other)),
        };

        let mut tpgt = Tpgt {
            name,
            path,
            enabled,
            luns: Vec::new(),
            lun_errors: Vec::new(),
        };
        if !enabled {
            return Ok(tpgt);
        }

        let lun_root = tpgt.path.join("lun");
        for (lun_name, lun_path) in sorted_entries(&self.fs, &lun_root, "lun_")? {
            match resolve_backstore(&self.fs, &lun_path) {
                Ok(backstore) => tpgt.luns.push(Lun {
                    name: lun_name,
                    path: lun_path,
                    backstore,
                }),
                Err(e) => {
                    warn!(path = %lun_path.display(), error = %e, "skipping lun");
                    tpgt.lun_errors.push(SkippedUnit::new(&lun_path, &e));
                }
            }
        }
        Ok(tpgt)
    }

    /// Reads the traffic counters of `lun`.
    pub fn lun_io(&self, lun: &Lun) -> Result<LunIo, ParseError> {
        let stats = lun.path.join("statistics/scsi_tgt_port");
        let read = |file: &str| -> Result<u64, ParseError> {
            let content = self.fs.read_to_string(&stats.join(file))?;
            Ok(parse_u64(content.trim())?)
        };
        Ok(LunIo {
            read_mbytes: read("read_mbytes")?,
            write_mbytes: read("write_mbytes")?,
            in_cmds: read("in_cmds")?,
        })
    }

    /// Reads `udev_path` of a file-backed object.
    pub fn fileio_udev(&self, instance: u32, object_name: &str) -> Result<UdevBackstore, ParseError> {
        self.udev_backstore(BackstoreKind::Fileio, instance, object_name)
    }

    /// Reads `udev_path` of a block-backed object.
    pub fn iblock_udev(&self, instance: u32, object_name: &str) -> Result<UdevBackstore, ParseError> {
        self.udev_backstore(BackstoreKind::Iblock, instance, object_name)
    }

    fn udev_backstore(
        &self,
        kind: BackstoreKind,
        instance: u32,
        object_name: &str,
    ) -> Result<UdevBackstore, ParseError> {
        let path = self
            .core_dir()
            .join(format!("{kind}_{instance}"))
            .join(object_name)
            .join("udev_path");
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| ParseError::resolution(&path, e.to_string()))?;
        Ok(UdevBackstore {
            instance,
            object_name: object_name.to_string(),
            udev_path: content.trim().to_string(),
        })
    }

    /// Checks that a RAM-disk object directory exists.
    pub fn rd_mcp_path(&self, instance: u32, object_name: &str) -> Result<RdMcpBackstore, ParseError> {
        let path = self
            .core_dir()
            .join(format!("{}_{instance}", BackstoreKind::RdMcp))
            .join(object_name);
        if !self.fs.exists(&path) {
            return Err(ParseError::resolution(&path, "ram disk object not found"));
        }
        Ok(RdMcpBackstore {
            instance,
            object_name: object_name.to_string(),
            path,
        })
    }

    /// Finds the mapped RBD device whose `<pool>-<image>` equals
    /// `pool_image`.
    ///
    /// Returns `Ok(None)` when no device matches, including when the rbd
    /// module is not loaded.
    pub fn find_rbd_device(&self, pool_image: &str) -> Result<Option<RbdDevice>, ParseError> {
        let rbd_dir = self.sys_path.join("devices/rbd");
        if !self.fs.exists(&rbd_dir) {
            return Ok(None);
        }

        let mut devices: Vec<(u32, PathBuf)> = self
            .fs
            .read_dir(&rbd_dir)?
            .into_iter()
            .filter_map(|p| {
                let n = p.file_name()?.to_str()?.parse::<u32>().ok()?;
                Some((n, p))
            })
            .collect();
        devices.sort();

        for (device, path) in devices {
            let (Some(pool), Some(image)) = (
                self.read_rbd_attr(&path, "pool")?,
                self.read_rbd_attr(&path, "name")?,
            ) else {
                debug!(path = %path.display(), "rbd device not fully attached");
                continue;
            };
            let (pool, image) = (pool.trim(), image.trim());
            if format!("{pool}-{image}") == pool_image {
                return Ok(Some(RbdDevice {
                    device,
                    pool: pool.to_string(),
                    image: image.to_string(),
                }));
            }
        }
        Ok(None)
    }

    /// A device being attached or detached may lack its attribute files.
    fn read_rbd_attr(&self, dir: &Path, name: &str) -> Result<Option<String>, ParseError> {
        match self.fs.read_to_string(&dir.join(name)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up the companion information for a resolved backstore.
    pub fn backstore_detail(
        &self,
        entry: &BackstoreEntry,
    ) -> Result<Option<BackstoreDetail>, ParseError> {
        let detail = match entry.kind {
            BackstoreKind::Fileio => Some(BackstoreDetail::Fileio(
                self.fileio_udev(entry.instance, &entry.object_name)?,
            )),
            BackstoreKind::Iblock => Some(BackstoreDetail::Iblock(
                self.iblock_udev(entry.instance, &entry.object_name)?,
            )),
            BackstoreKind::Rbd => self
                .find_rbd_device(&entry.object_name)?
                .map(BackstoreDetail::Rbd),
            BackstoreKind::RdMcp => Some(BackstoreDetail::RdMcp(
                self.rd_mcp_path(entry.instance, &entry.object_name)?,
            )),
        };
        Ok(detail)
    }
}

/// Entries of `dir` whose name starts with `prefix`, sorted by name.
fn sorted_entries<F: FileSystem>(
    fs: &F,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<(String, PathBuf)>, ParseError> {
    let mut entries: Vec<(String, PathBuf)> = fs
        .read_dir(dir)?
        .into_iter()
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            name.starts_with(prefix).then_some((name, p))
        })
        .collect();
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    const CONFIGFS: &str = "/sys/kernel/config";
    const SYS: &str = "/sys";

    fn collector(fs: MockFs) -> IscsiCollector<MockFs> {
        IscsiCollector::new(fs, CONFIGFS, SYS)
    }

    fn find<'a>(targets: &'a [IscsiTarget], suffix: &str) -> &'a IscsiTarget {
        targets
            .iter()
            .find(|t| t.name.ends_with(suffix))
            .unwrap()
    }

    #[test]
    fn test_collect_targets() {
        let targets = collector(MockFs::iscsi_target()).collect().unwrap();
        assert_eq!(targets.len(), 4);

        let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let ramdisk = find(&targets, "sn.8888bbbbddd0");
        assert_eq!(ramdisk.tpgts.len(), 2);
        let tpgt = &ramdisk.tpgts[0];
        assert_eq!(tpgt.name, "tpgt_1");
        assert!(tpgt.enabled);
        assert_eq!(tpgt.luns.len(), 1);
        assert_eq!(tpgt.luns[0].name, "lun_0");
        assert_eq!(
            tpgt.luns[0].backstore,
            BackstoreEntry {
                kind: BackstoreKind::RdMcp,
                instance: 119,
                object_name: "ramdisk_lio_1G".to_string(),
            }
        );

        let disabled = &ramdisk.tpgts[1];
        assert_eq!(disabled.name, "tpgt_2");
        assert!(!disabled.enabled);
        assert!(disabled.luns.is_empty());

        let iblock = find(&targets, "sn.abcd1abcd2ab");
        assert_eq!(iblock.tpgts[0].luns[0].backstore.kind, BackstoreKind::Iblock);

        let rbd = find(&targets, "dev.rbd0");
        assert_eq!(rbd.tpgts[0].luns[0].backstore.kind, BackstoreKind::Rbd);
        assert_eq!(
            rbd.tpgts[0].luns[0].backstore.object_name,
            "iscsi-images-demo"
        );

        let fileio = find(&targets, "dev.fileio1");
        assert_eq!(fileio.tpgts[0].luns[0].backstore.kind, BackstoreKind::Fileio);
    }

    #[test]
    fn test_lun_without_link_is_isolated() {
        let mut fs = MockFs::iscsi_target();
        let tpgt = format!(
            "{CONFIGFS}/target/iscsi/iqn.2003-01.org.linux-iscsi.osd1.x8664:sn.8888bbbbddd0/tpgt_1"
        );
        fs.add_dir(format!("{tpgt}/lun/lun_1/statistics"));

        let targets = collector(fs).collect().unwrap();
        let tpgt = &find(&targets, "sn.8888bbbbddd0").tpgts[0];
        assert_eq!(tpgt.luns.len(), 1);
        assert_eq!(tpgt.luns[0].name, "lun_0");
        assert_eq!(tpgt.lun_errors.len(), 1);
        assert!(tpgt.lun_errors[0].path.ends_with("lun_1"));
        assert!(tpgt.lun_errors[0].reason.contains("no symlink"));
    }

    #[test]
    fn test_bad_enable_flag() {
        let mut fs = MockFs::new();
        fs.add_file(
            format!("{CONFIGFS}/target/iscsi/iqn.2020-01.test:t/tpgt_1/enable"),
            "yes\n",
        );
        let err = collector(fs).collect().unwrap_err();
        assert!(matches!(err, ParseError::Structural { .. }));
    }

    #[test]
    fn test_lun_io() {
        let collector = collector(MockFs::iscsi_target());
        let targets = collector.collect().unwrap();
        let lun = &find(&targets, "sn.8888bbbbddd0").tpgts[0].luns[0];
        assert_eq!(
            collector.lun_io(lun).unwrap(),
            LunIo {
                read_mbytes: 10325,
                write_mbytes: 40325,
                in_cmds: 204950,
            }
        );
    }

    #[test]
    fn test_udev_lookups() {
        let collector = collector(MockFs::iscsi_target());
        let fileio = collector.fileio_udev(1, "file_lio_1G").unwrap();
        assert_eq!(fileio.udev_path, "/home/iscsi/file_back_1G");

        let iblock = collector.iblock_udev(0, "block_lio_rbd1").unwrap();
        assert_eq!(iblock.udev_path, "/dev/rbd1");

        let err = collector.iblock_udev(9, "missing").unwrap_err();
        assert!(matches!(err, ParseError::Resolution { .. }));
    }

    #[test]
    fn test_rd_mcp_path() {
        let collector = collector(MockFs::iscsi_target());
        let rd = collector.rd_mcp_path(119, "ramdisk_lio_1G").unwrap();
        assert!(rd.path.ends_with("target/core/rd_mcp_119/ramdisk_lio_1G"));
        assert!(collector.rd_mcp_path(1, "ramdisk_lio_1G").is_err());
    }

    #[test]
    fn test_find_rbd_device() {
        let collector = collector(MockFs::iscsi_target());
        let device = collector.find_rbd_device("iscsi-images-demo").unwrap();
        assert_eq!(
            device,
            Some(RbdDevice {
                device: 0,
                pool: "iscsi-images".to_string(),
                image: "demo".to_string(),
            })
        );
        assert_eq!(collector.find_rbd_device("iscsi-images-other").unwrap(), None);
    }

    #[test]
    fn test_find_rbd_device_skips_half_attached() {
        let mut fs = MockFs::new();
        fs.add_dir("/sys/devices/rbd/0");
        fs.add_file("/sys/devices/rbd/1/pool", "iscsi-images\n");
        fs.add_file("/sys/devices/rbd/2/pool", "rbd\n");
        fs.add_file("/sys/devices/rbd/3/pool", "iscsi-images\n");
        fs.add_file("/sys/devices/rbd/3/name", "demo\n");

        let device = collector(fs).find_rbd_device("iscsi-images-demo").unwrap();
        assert_eq!(
            device,
            Some(RbdDevice {
                device: 3,
                pool: "iscsi-images".to_string(),
                image: "demo".to_string(),
            })
        );
    }

    #[test]
    fn test_find_rbd_device_without_rbd_module() {
        let collector = collector(MockFs::new());
        assert_eq!(collector.find_rbd_device("rbd-image").unwrap(), None);
    }

    #[test]
    fn test_backstore_detail() {
        let collector = collector(MockFs::iscsi_target());
        for target in collector.collect().unwrap() {
            for lun in target.tpgts.iter().flat_map(|t| &t.luns) {
                let detail = collector.backstore_detail(&lun.backstore).unwrap();
                match (lun.backstore.kind, detail) {
                    (BackstoreKind::Fileio, Some(BackstoreDetail::Fileio(_)))
                    | (BackstoreKind::Iblock, Some(BackstoreDetail::Iblock(_)))
                    | (BackstoreKind::Rbd, Some(BackstoreDetail::Rbd(_)))
                    | (BackstoreKind::RdMcp, Some(BackstoreDetail::RdMcp(_))) => {}
                    (kind, other) => panic!("{kind}: unexpected {other:?}"),
                }
            }
        }
    }
}
