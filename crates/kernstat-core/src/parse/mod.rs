//! Parsing engine shared by every kernel source.
//!
//! - `numeric`: single-token decoders (plain, humanized, pseudo-float)
//! - `pattern`: ordered template dispatch for single lines
//! - `segment`: header + repeated block segmentation of whole files
//! - `counted`: keyword lines carrying counter vectors
//! - `tree`: symlink-identified objects in configfs trees

pub mod counted;
pub mod error;
pub mod fields;
pub mod numeric;
pub mod pattern;
pub mod segment;
pub mod tree;

pub use counted::{CountedRecord, Layout, Schema};
pub use error::{DecodeError, DecodeErrorKind, ParseError, SkippedUnit};
pub use fields::{FieldSet, Value};
pub use numeric::{dehumanize, dehumanize_signed, parse_pseudo_float, parse_u64, parse_u64s};
pub use pattern::{Captures, MatchResult, Pattern, PatternSet, Placeholder};
pub use segment::{BlockFormat, RejectedBlock, Segments, segment};
pub use tree::{LinkTarget, decompose_link_target, resolve_single_link};
