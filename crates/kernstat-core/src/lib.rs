//! kernstat-core: typed readers for kernel statistics pseudo-files.
//!
//! Provides:
//! - `parse`: the parsing engine: numeric tokens, line patterns, block
//!   segmentation, self-describing counter arrays and configfs symlinks
//! - `collector`: per-source parsers and collectors (bcache, CIFS, NFS,
//!   SELinux AVC, iSCSI) over a mockable filesystem

pub mod collector;
pub mod parse;
