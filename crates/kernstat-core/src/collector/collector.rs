//! Main collector that combines the per-source collectors.
//!
//! The `Collector` struct owns one filesystem and the mount points of the
//! pseudo-filesystems, and hands out typed records for every source.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::collector::bcache::{BcacheCollector, BcacheReport};
use crate::collector::cifs::{self, CifsStats};
use crate::collector::iscsi::{IscsiCollector, IscsiTarget};
use crate::collector::nfs::{
    ClientRpcStats, ServerRpcStats, parse_client_rpc_stats, parse_server_rpc_stats,
};
use crate::collector::selinux::{AvcStats, SelinuxCollector};
use crate::collector::traits::FileSystem;
use crate::parse::{ParseError, SkippedUnit};

/// Mount points of the pseudo-filesystems read by the collectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPaths {
    pub proc: PathBuf,
    pub sys: PathBuf,
    pub configfs: PathBuf,
}

impl Default for MountPaths {
    fn default() -> Self {
        Self {
            proc: PathBuf::from("/proc"),
            sys: PathBuf::from("/sys"),
            configfs: PathBuf::from("/sys/kernel/config"),
        }
    }
}

impl MountPaths {
    /// Overrides the procfs mount point (e.g., "/host/proc").
    pub fn with_proc(mut self, proc: impl Into<PathBuf>) -> Self {
        self.proc = proc.into();
        self
    }

    /// Overrides the sysfs mount point.
    pub fn with_sys(mut self, sys: impl Into<PathBuf>) -> Self {
        self.sys = sys.into();
        self
    }

    /// Overrides the configfs mount point.
    pub fn with_configfs(mut self, configfs: impl Into<PathBuf>) -> Self {
        self.configfs = configfs.into();
        self
    }

    pub fn cifs_stats(&self) -> PathBuf {
        self.proc.join("fs/cifs/Stats")
    }

    pub fn nfs_client_stats(&self) -> PathBuf {
        self.proc.join("net/rpc/nfs")
    }

    pub fn nfs_server_stats(&self) -> PathBuf {
        self.proc.join("net/rpc/nfsd")
    }

    pub fn bcache(&self) -> PathBuf {
        self.sys.join("fs/bcache")
    }

    pub fn selinux_avc(&self) -> PathBuf {
        self.sys.join("fs/selinux/avc")
    }
}

/// Records from every source that could be read in one pass.
///
/// A source whose file or directory is missing (module not loaded,
/// filesystem not mounted) is left as `None` without an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KernelReport {
    pub bcache: Option<BcacheReport>,
    pub cifs: Option<CifsStats>,
    pub nfs_client: Option<ClientRpcStats>,
    pub nfs_server: Option<ServerRpcStats>,
    pub selinux: Option<AvcStats>,
    pub iscsi: Option<Vec<IscsiTarget>>,
    /// Sources that were present but failed to parse.
    pub failed: Vec<SkippedUnit>,
}

/// Collector for every supported kernel source.
pub struct Collector<F: FileSystem + Clone> {
    fs: F,
    paths: MountPaths,
    bcache_collector: BcacheCollector<F>,
    selinux_collector: SelinuxCollector<F>,
    iscsi_collector: IscsiCollector<F>,
}

impl<F: FileSystem + Clone> Collector<F> {
    /// Creates a new collector reading the default mount points.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    pub fn new(fs: F) -> Self {
        Self::with_paths(fs, MountPaths::default())
    }

    /// Creates a new collector reading the given mount points.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `paths` - Mount points of procfs, sysfs and configfs
    pub fn with_paths(fs: F, paths: MountPaths) -> Self {
        Self {
            bcache_collector: BcacheCollector::new(fs.clone(), paths.bcache()),
            selinux_collector: SelinuxCollector::new(fs.clone(), paths.selinux_avc()),
            iscsi_collector: IscsiCollector::new(fs.clone(), &paths.configfs, &paths.sys),
            fs,
            paths,
        }
    }

    pub fn paths(&self) -> &MountPaths {
        &self.paths
    }

    /// The iSCSI collector, for per-LUN counters and backstore lookups.
    pub fn iscsi_collector(&self) -> &IscsiCollector<F> {
        &self.iscsi_collector
    }

    pub fn bcache(&self) -> Result<BcacheReport, ParseError> {
        self.bcache_collector.collect()
    }

    pub fn cifs(&self) -> Result<CifsStats, ParseError> {
        let content = self.fs.read_to_string(&self.paths.cifs_stats())?;
        cifs::parse_stats(content.as_bytes())
    }

    pub fn nfs_client(&self) -> Result<ClientRpcStats, ParseError> {
        let content = self.fs.read_to_string(&self.paths.nfs_client_stats())?;
        parse_client_rpc_stats(content.as_bytes())
    }

    pub fn nfs_server(&self) -> Result<ServerRpcStats, ParseError> {
        let content = self.fs.read_to_string(&self.paths.nfs_server_stats())?;
        parse_server_rpc_stats(content.as_bytes())
    }

    pub fn selinux(&self) -> Result<AvcStats, ParseError> {
        self.selinux_collector.collect()
    }

    pub fn iscsi(&self) -> Result<Vec<IscsiTarget>, ParseError> {
        self.iscsi_collector.collect()
    }

    /// Collects every source present on the host.
    ///
    /// Failures are logged and listed in `failed`; they never stop the
    /// remaining sources from being read.
    pub fn collect_all(&self) -> KernelReport {
        let mut report = KernelReport::default();
        let mut failed = Vec::new();

        report.bcache = self.optional(&self.paths.bcache(), &mut failed, || self.bcache());
        report.cifs = self.optional(&self.paths.cifs_stats(), &mut failed, || self.cifs());
        report.nfs_client =
            self.optional(&self.paths.nfs_client_stats(), &mut failed, || self.nfs_client());
        report.nfs_server =
            self.optional(&self.paths.nfs_server_stats(), &mut failed, || self.nfs_server());
        report.selinux =
            self.optional(&self.paths.selinux_avc(), &mut failed, || self.selinux());
        report.iscsi = self.optional(
            &self.paths.configfs.join("target/iscsi"),
            &mut failed,
            || self.iscsi(),
        );

        report.failed = failed;
        report
    }

    fn optional<T>(
        &self,
        root: &Path,
        failed: &mut Vec<SkippedUnit>,
        collect: impl FnOnce() -> Result<T, ParseError>,
    ) -> Option<T> {
        if !self.fs.exists(root) {
            debug!(path = %root.display(), "source not present");
            return None;
        }
        match collect() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %root.display(), error = %e, "source collection failed");
                failed.push(SkippedUnit::new(root, &e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    #[test]
    fn test_mount_paths_default() {
        let paths = MountPaths::default();
        assert_eq!(paths.cifs_stats(), PathBuf::from("/proc/fs/cifs/Stats"));
        assert_eq!(paths.nfs_server_stats(), PathBuf::from("/proc/net/rpc/nfsd"));
        assert_eq!(paths.bcache(), PathBuf::from("/sys/fs/bcache"));
        assert_eq!(paths.configfs, PathBuf::from("/sys/kernel/config"));
    }

    #[test]
    fn test_mount_paths_overrides() {
        let paths = MountPaths::default()
            .with_proc("/host/proc")
            .with_sys("/host/sys")
            .with_configfs("/host/config");
        assert_eq!(paths.nfs_client_stats(), PathBuf::from("/host/proc/net/rpc/nfs"));
        assert_eq!(paths.selinux_avc(), PathBuf::from("/host/sys/fs/selinux/avc"));
        assert_eq!(paths.configfs, PathBuf::from("/host/config"));
    }

    #[test]
    fn test_line_sources() {
        let collector = Collector::new(MockFs::network_fs_host());

        let cifs = collector.cifs().unwrap();
        assert_eq!(cifs.header.get("sessions"), Some(1));
        assert_eq!(cifs.sessions.len(), 1);
        assert_eq!(cifs.sessions[0].server, "fileserver");
        assert_eq!(cifs.sessions[0].counters.get("creates_failed"), Some(1));

        let client = collector.nfs_client().unwrap();
        assert_eq!(client.client_rpc.unwrap().rpc_count, 70);
        assert_eq!(client.v3_stats.unwrap().get_attr, 6);
        assert!(client.client_v4_stats.is_none());

        let server = collector.nfs_server().unwrap();
        assert_eq!(server.reply_cache.unwrap().nocache, 18622);
        assert_eq!(server.server_v4_stats.unwrap().compound, 10853);
        assert!(server.v4_ops.is_none());
    }

    #[test]
    fn test_collect_all_skips_absent_sources() {
        let collector = Collector::new(MockFs::network_fs_host());
        let report = collector.collect_all();

        assert!(report.cifs.is_some());
        assert!(report.nfs_client.is_some());
        assert!(report.nfs_server.is_some());
        assert!(report.bcache.is_none());
        assert!(report.selinux.is_none());
        assert!(report.iscsi.is_none());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_collect_all_records_failures() {
        let mut fs = MockFs::selinux_avc();
        fs.add_file("/proc/net/rpc/nfsd", "rpc 1 2\n");

        let report = Collector::new(fs).collect_all();
        assert!(report.selinux.is_some());
        assert!(report.nfs_server.is_none());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, PathBuf::from("/proc/net/rpc/nfsd"));
    }

    #[test]
    fn test_sys_sources_with_custom_root() {
        let mut fs = MockFs::new();
        for (path, content) in [
            ("cache_threshold", "512\n"),
            ("cache_stats", "lookups hits misses allocations reclaims frees\n1 1 0 0 0 0\n"),
            ("hash_stats", "entries: 1\n"),
        ] {
            fs.add_file(format!("/host/sys/fs/selinux/avc/{path}"), content);
        }

        let collector = Collector::with_paths(fs, MountPaths::default().with_sys("/host/sys"));
        let stats = collector.selinux().unwrap();
        assert_eq!(stats.cache.lookups, 1);
        assert_eq!(stats.hash.entries, 1);
    }

    #[test]
    fn test_iscsi_through_facade() {
        let collector = Collector::new(MockFs::iscsi_target());
        let targets = collector.iscsi().unwrap();
        let lun = &targets[0].tpgts[0].luns[0];
        let io = collector.iscsi_collector().lun_io(lun).unwrap();
        assert!(io.in_cmds > 0);
    }
}
