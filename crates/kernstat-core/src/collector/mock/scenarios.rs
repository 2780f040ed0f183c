//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios reproduce the sysfs, configfs and procfs trees of real
//! hosts, mounted at their usual locations.

use super::filesystem::MockFs;

const BCACHE_SET: &str = "/sys/fs/bcache/deaddd54-c735-46d5-868e-f331c5fd7c74";

const PERIODS: [&str; 4] = ["stats_five_minute", "stats_hour", "stats_day", "stats_total"];

const ISCSI_ROOT: &str = "/sys/kernel/config/target/iscsi";
const CORE_ROOT: &str = "/sys/kernel/config/target/core";

/// Relative path from a LUN link back to the configfs root.
const LUN_TO_CONFIGFS: &str = "../../../../../../..";

impl MockFs {
    /// Creates a host with one bcache set: a single backing device in
    /// writeback mode and a single cache device.
    pub fn bcache_system() -> Self {
        let mut fs = Self::new();
        let set = BCACHE_SET;

        fs.add_file("/sys/fs/bcache/register", "");
        fs.add_file("/sys/fs/bcache/register_quiet", "");

        fs.add_file(format!("{set}/average_key_size"), "0\n");
        fs.add_file(format!("{set}/btree_cache_size"), "0\n");
        fs.add_file(format!("{set}/cache_available_percent"), "100\n");
        fs.add_file(format!("{set}/congested"), "0\n");
        fs.add_file(format!("{set}/root_usage_percent"), "0\n");
        fs.add_file(format!("{set}/tree_depth"), "0\n");

        fs.add_file(format!("{set}/internal/active_journal_entries"), "1\n");
        fs.add_file(format!("{set}/internal/btree_nodes"), "2\n");
        fs.add_file(format!("{set}/internal/btree_read_average_duration_us"), "1305\n");
        fs.add_file(format!("{set}/internal/cache_read_races"), "0\n");

        fs.add_periods(set, |period| match period {
            "stats_total" => [("bypassed", "542k"), ("cache_hits", "546"), ("cache_misses", "1")],
            _ => [("bypassed", "0"), ("cache_hits", "0"), ("cache_misses", "0")],
        });

        let bdev = format!("{set}/bdev0");
        fs.add_file(format!("{bdev}/dirty_data"), "0\n");
        fs.add_file(
            format!("{bdev}/writeback_rate_debug"),
            "\
rate:\t\t1.1M/sec
dirty:\t\t0.0k
target:\t\t20.4G
proportional:\t-427.5k
integral:\t0.0k
change:\t\t0.0k/sec
next io:\t-1ms
",
        );
        fs.add_periods(&bdev, |period| match period {
            "stats_total" => [("bypassed", "542k"), ("cache_hits", "546"), ("cache_misses", "1")],
            _ => [("bypassed", "0"), ("cache_hits", "0"), ("cache_misses", "0")],
        });

        let cache = format!("{set}/cache0");
        fs.add_file(format!("{cache}/io_errors"), "0\n");
        fs.add_file(format!("{cache}/metadata_written"), "512.0k\n");
        fs.add_file(format!("{cache}/written"), "0\n");
        fs.add_file(
            format!("{cache}/priority_stats"),
            "\
Unused:\t\t99%
Clean:\t\t0%
Dirty:\t\t0%
Metadata:\t0%
Average:\t10473
Sectors per Q:\t36288
Quantiles:\t[0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0]
",
        );
        fs.add_periods(&cache, |_| {
            [("bypassed", "0"), ("cache_hits", "0"), ("cache_misses", "0")]
        });

        fs
    }

    /// Writes the four `stats_*` directories under `dir`. Counters not
    /// returned by `values` are zero.
    fn add_periods<V>(&mut self, dir: &str, values: V)
    where
        V: Fn(&str) -> [(&'static str, &'static str); 3],
    {
        for period in PERIODS {
            for counter in [
                "cache_bypass_hits",
                "cache_bypass_misses",
                "cache_miss_collisions",
                "cache_readaheads",
            ] {
                self.add_file(format!("{dir}/{period}/{counter}"), "0\n");
            }
            for (counter, value) in values(period) {
                self.add_file(format!("{dir}/{period}/{counter}"), format!("{value}\n"));
            }
        }
    }

    /// Creates an SELinux AVC directory on a two-CPU host.
    pub fn selinux_avc() -> Self {
        let mut fs = Self::new();
        let avc = "/sys/fs/selinux/avc";

        fs.add_file(format!("{avc}/cache_threshold"), "512\n");
        fs.add_file(
            format!("{avc}/cache_stats"),
            "\
lookups hits misses allocations reclaims frees
2196 2155 41 41 0 0
1063 1040 23 23 0 0
",
        );
        fs.add_file(
            format!("{avc}/hash_stats"),
            "\
entries: 503
buckets used: 269/512
longest chain: 4
",
        );
        fs
    }

    /// Creates an LIO target host exporting one LUN of each backstore kind.
    ///
    /// The RAM-disk target has a second, disabled portal group. The RBD
    /// image `iscsi-images/demo` is mapped as `/dev/rbd0`.
    pub fn iscsi_target() -> Self {
        let mut fs = Self::new();

        let ramdisk = "iqn.2003-01.org.linux-iscsi.osd1.x8664:sn.8888bbbbddd0";
        fs.add_lun(ramdisk, "tpgt_1", "7f4a4eb56d", "rd_mcp_119/ramdisk_lio_1G", [10325, 40325, 204950]);
        fs.add_file(format!("{ISCSI_ROOT}/{ramdisk}/tpgt_2/enable"), "0\n");
        fs.add_dir(format!("{ISCSI_ROOT}/{ramdisk}/tpgt_2/lun"));
        fs.add_dir(format!("{CORE_ROOT}/rd_mcp_119/ramdisk_lio_1G"));

        let iblock = "iqn.2003-01.org.linux-iscsi.osd1.x8664:sn.abcd1abcd2ab";
        fs.add_lun(iblock, "tpgt_1", "e0c4ea1e2f", "iblock_0/block_lio_rbd1", [512, 0, 1024]);
        fs.add_file(format!("{CORE_ROOT}/iblock_0/block_lio_rbd1/udev_path"), "/dev/rbd1\n");

        let rbd = "iqn.2016-11.org.linux-iscsi.igw.x86:dev.rbd0";
        fs.add_lun(rbd, "tpgt_1", "2a9b1d0c47", "rbd_0/iscsi-images-demo", [7, 3, 88]);
        fs.add_file("/sys/devices/rbd/0/pool", "iscsi-images\n");
        fs.add_file("/sys/devices/rbd/0/name", "demo\n");
        fs.add_file("/sys/devices/rbd/1/pool", "rbd\n");
        fs.add_file("/sys/devices/rbd/1/name", "block_lio_rbd1\n");

        let fileio = "iqn.2016-11.org.linux-iscsi.igw.x86:dev.fileio1";
        fs.add_lun(fileio, "tpgt_1", "8d6c3b9f01", "fileio_1/file_lio_1G", [0, 0, 12]);
        fs.add_file(
            format!("{CORE_ROOT}/fileio_1/file_lio_1G/udev_path"),
            "/home/iscsi/file_back_1G\n",
        );

        fs
    }

    /// Adds an enabled portal group with `lun_0` linked to `core_object`
    /// (`<kind>_<n>/<object>` under `target/core`).
    fn add_lun(&mut self, iqn: &str, tpgt: &str, link: &str, core_object: &str, io: [u64; 3]) {
        let tpgt_dir = format!("{ISCSI_ROOT}/{iqn}/{tpgt}");
        self.add_file(format!("{tpgt_dir}/enable"), "1\n");

        let lun = format!("{tpgt_dir}/lun/lun_0");
        self.add_symlink(
            format!("{lun}/{link}"),
            format!("{LUN_TO_CONFIGFS}/target/core/{core_object}"),
        );

        let stats = format!("{lun}/statistics/scsi_tgt_port");
        let [read, write, cmds] = io;
        self.add_file(format!("{stats}/read_mbytes"), format!("{read}\n"));
        self.add_file(format!("{stats}/write_mbytes"), format!("{write}\n"));
        self.add_file(format!("{stats}/in_cmds"), format!("{cmds}\n"));
    }

    /// Creates an NFS client and server host that also mounts one SMB3
    /// share.
    pub fn network_fs_host() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/net/rpc/nfs",
            "\
net 70 70 0 0
rpc 70 0 70
proc2 18 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
proc3 22 0 6 0 3 11 0 0 0 0 0 0 0 0 0 0 0 2 0 1 1 0 0
",
        );
        fs.add_file(
            "/proc/net/rpc/nfsd",
            "\
rc 0 6 18622
fh 0 0 0 0 0
io 157286400 72864
th 8 0 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000 0.000
net 18628 0 18628 6
rpc 18628 0 0 0 0
proc3 22 2 112 0 2719 111 0 0 0 0 0 0 0 0 0 0 0 27 216 0 2 1 0
proc4 2 2 10853
",
        );
        fs.add_file(
            "/proc/fs/cifs/Stats",
            r"Resources in use
CIFS Session: 1
Share (unique mount targets): 2
SMB Request/Response Buffer: 1 Pool size: 5
SMB Small Req/Resp Buffer: 1 Pool size: 30
Operations (MIDs): 0

0 session 0 share reconnects
Total vfs operations: 43 maximum at one time: 2

Max requests in flight: 2
1) \\fileserver\projects
SMBs: 31
Negotiates: 0 sent 0 failed
SessionSetups: 0 sent 0 failed
Logoffs: 0 sent 0 failed
TreeConnects: 1 sent 0 failed
TreeDisconnects: 0 sent 0 failed
Creates: 9 sent 1 failed
Closes: 8 sent 0 failed
Flushes: 0 sent 0 failed
Reads: 5 sent 0 failed
Writes: 2 sent 0 failed
Locks: 0 sent 0 failed
IOCTLs: 1 sent 0 failed
Cancels: 0 sent 0 failed
Echos: 0 sent 0 failed
QueryDirectories: 1 sent 0 failed
ChangeNotifies: 0 sent 0 failed
QueryInfos: 4 sent 0 failed
SetInfos: 0 sent 0 failed
OplockBreaks: 0 sent 0 failed
",
        );
        fs
    }
}
