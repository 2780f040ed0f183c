use std::error::Error;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{Level, debug, warn};
use tracing_subscriber::EnvFilter;

use kernstat_core::collector::cifs;
use kernstat_core::collector::iscsi::{BackstoreDetail, BackstoreEntry, LunIo};
use kernstat_core::collector::nfs::{parse_client_rpc_stats, parse_server_rpc_stats};
use kernstat_core::collector::{Collector, MountPaths, RealFs};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// bcache sets under <sys>/fs/bcache
    Bcache,
    /// CIFS client statistics (<proc>/fs/cifs/Stats)
    Cifs,
    /// NFS client RPC counters (<proc>/net/rpc/nfs)
    Nfs,
    /// NFS server RPC counters (<proc>/net/rpc/nfsd)
    Nfsd,
    /// SELinux AVC cache statistics
    Selinux,
    /// LIO iSCSI targets under configfs
    Iscsi,
    /// Every source present on the host
    All,
}

#[derive(Parser)]
#[command(
    name = "kernstat-dump",
    about = "Print kernel pseudo-filesystem statistics as typed records",
    version
)]
struct Args {
    /// Source to read.
    #[arg(value_enum)]
    source: Source,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to /sys filesystem.
    #[arg(long, default_value = "/sys")]
    sys_path: PathBuf,

    /// Path to configfs.
    #[arg(long, default_value = "/sys/kernel/config")]
    configfs_path: PathBuf,

    /// Parse a captured copy of the file instead of the live one
    /// (cifs, nfs and nfsd only).
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn mount_paths(&self) -> MountPaths {
        MountPaths::default()
            .with_proc(&self.proc_path)
            .with_sys(&self.sys_path)
            .with_configfs(&self.configfs_path)
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for crate_name in ["kernstat_dump", "kernstat_core"] {
        match format!("{crate_name}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ignoring log directive for {crate_name}: {e}"),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

// ── iSCSI view ───────────────────────────────────────────────────────────────

/// One exported LUN with its counters and backstore companion details.
#[derive(Debug, Serialize)]
struct LunView {
    target: String,
    tpgt: String,
    lun: String,
    backstore: BackstoreEntry,
    io: Option<LunIo>,
    detail: Option<BackstoreDetail>,
}

fn iscsi_view(collector: &Collector<RealFs>) -> Result<Vec<LunView>, Box<dyn Error>> {
    let iscsi = collector.iscsi_collector();
    let mut views = Vec::new();

    for target in collector.iscsi()? {
        for tpgt in &target.tpgts {
            for skipped in &tpgt.lun_errors {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "lun skipped");
            }
            for lun in &tpgt.luns {
                let io = iscsi
                    .lun_io(lun)
                    .inspect_err(|e| {
                        debug!(lun = %lun.path.display(), error = %e, "no lun counters")
                    })
                    .ok();
                let detail = iscsi
                    .backstore_detail(&lun.backstore)
                    .inspect_err(|e| {
                        warn!(
                            backstore = %lun.backstore.core_dir(),
                            error = %e,
                            "backstore lookup failed"
                        )
                    })
                    .ok()
                    .flatten();
                views.push(LunView {
                    target: target.name.clone(),
                    tpgt: tpgt.name.clone(),
                    lun: lun.name.clone(),
                    backstore: lun.backstore.clone(),
                    io,
                    detail,
                });
            }
        }
    }
    Ok(views)
}

// ── Output ───────────────────────────────────────────────────────────────────

fn emit<T: Serialize + Debug>(value: &T, json: bool) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{value:#?}")?;
    }
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>, Box<dyn Error>> {
    let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(BufReader::new(file))
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    if let Some(file) = &args.file {
        debug!(path = %file.display(), "parsing captured file");
        return match args.source {
            Source::Cifs => emit(&cifs::parse_stats(open(file)?)?, args.json),
            Source::Nfs => emit(&parse_client_rpc_stats(open(file)?)?, args.json),
            Source::Nfsd => emit(&parse_server_rpc_stats(open(file)?)?, args.json),
            other => Err(format!("--file is not supported for {other:?}").into()),
        };
    }

    let collector = Collector::with_paths(RealFs::new(), args.mount_paths());
    match args.source {
        Source::Bcache => emit(&collector.bcache()?, args.json),
        Source::Cifs => emit(&collector.cifs()?, args.json),
        Source::Nfs => emit(&collector.nfs_client()?, args.json),
        Source::Nfsd => emit(&collector.nfs_server()?, args.json),
        Source::Selinux => emit(&collector.selinux()?, args.json),
        Source::Iscsi => emit(&iscsi_view(&collector)?, args.json),
        Source::All => emit(&collector.collect_all(), args.json),
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
