//! Collectors for kernel statistics exposed through pseudo-filesystems.
//!
//! Every collector reads through the [`FileSystem`] trait, so the same code
//! runs against the live kernel ([`RealFs`]) and against fixtures
//! ([`MockFs`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Collector                           │
//! │  ┌──────────────┐ ┌──────────────┐ ┌───────────────────────┐ │
//! │  │ /proc        │ │ /sys         │ │ configfs              │ │
//! │  │ - cifs       │ │ - bcache     │ │ - iscsi targets       │ │
//! │  │ - nfs, nfsd  │ │ - selinux    │ │ - backstores, rbd     │ │
//! │  └──────┬───────┘ └──────┬───────┘ └───────────┬───────────┘ │
//! │         └────────────────┼─────────────────────┘             │
//! │                   ┌──────▼──────┐                            │
//! │                   │  FileSystem │ (trait)                    │
//! │                   └──────┬──────┘                            │
//! └──────────────────────────┼───────────────────────────────────┘
//!              ┌─────────────┼─────────────┐
//!       ┌──────▼──────┐ ┌────▼────────┐ ┌──▼──────────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kernstat_core::collector::{Collector, RealFs};
//!
//! let collector = Collector::new(RealFs::new());
//! let report = collector.collect_all();
//! ```
//!
//! ```
//! use kernstat_core::collector::{Collector, MockFs};
//!
//! let collector = Collector::new(MockFs::bcache_system());
//! let report = collector.bcache().unwrap();
//! assert_eq!(report.sets.len(), 1);
//! ```

pub mod bcache;
pub mod cifs;
#[allow(clippy::module_inception)]
mod collector;
pub mod iscsi;
pub mod mock;
pub mod nfs;
pub mod selinux;
pub mod traits;

pub use collector::{Collector, KernelReport, MountPaths};
pub use mock::MockFs;
pub use traits::{FileSystem, RealFs};
