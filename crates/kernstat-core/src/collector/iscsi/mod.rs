//! iSCSI targets exported through LIO configfs.

mod backstore;
mod collector;

pub use backstore::{BackstoreEntry, BackstoreKind, resolve_backstore};
pub use collector::{
    BackstoreDetail, IscsiCollector, IscsiTarget, Lun, LunIo, RbdDevice, RdMcpBackstore, Tpgt,
    UdevBackstore,
};
