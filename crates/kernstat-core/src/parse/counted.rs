//! Decoding of keyword lines carrying a vector of counters.
//!
//! Many `/proc` statistics lines look like `proc3 22 0 1 2 ...`: a keyword,
//! then integers. Some are self-describing (the first integer says how many
//! follow), others have a fixed width, and a few mix integers with other
//! data so only a prefix may be decoded. The [`Layout`] of a [`Schema`]
//! says which, and is resolved before any token is decoded.
//!
//! Named fields bind to positions through a schema table kept separate from
//! the raw vector. Kernels append counters over time, so values beyond the
//! table are kept as unmapped, and table fields beyond what an older kernel
//! printed read as zero.

use serde::Serialize;

use super::error::ParseError;
use super::numeric::{parse_u64, parse_u64s};

/// How the tokens after the keyword are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// The first value declares how many values follow; at least `min`.
    Counted { min: usize },
    /// At least `width` values, all integers.
    Fixed { width: usize },
    /// Exactly the first `width` tokens are integers; the rest is not
    /// decoded.
    Prefix { width: usize },
}

/// Positional field table for one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub keyword: &'static str,
    pub layout: Layout,
    pub fields: &'static [&'static str],
}

/// Raw values of one decoded line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountedRecord {
    /// Element count declared by the line itself, for counted layouts.
    pub declared: Option<usize>,
    pub values: Vec<u64>,
}

impl Schema {
    /// Decodes the tokens following the keyword.
    pub fn decode(&self, tokens: &[&str]) -> Result<CountedRecord, ParseError> {
        let line = || format!("{} {}", self.keyword, tokens.join(" "));

        match self.layout {
            Layout::Prefix { width } => {
                if tokens.len() < width {
                    return Err(ParseError::structural(
                        format!("{} line (need {} values)", self.keyword, width),
                        line(),
                    ));
                }
                Ok(CountedRecord {
                    declared: None,
                    values: parse_u64s(&tokens[..width])?,
                })
            }
            Layout::Fixed { width } => {
                let values = parse_u64s(tokens)?;
                if values.len() < width {
                    return Err(ParseError::structural(
                        format!("{} line (need {} values)", self.keyword, width),
                        line(),
                    ));
                }
                Ok(CountedRecord {
                    declared: None,
                    values,
                })
            }
            Layout::Counted { min } => {
                let Some((count, rest)) = tokens.split_first() else {
                    return Err(ParseError::structural(
                        format!("{} line (missing element count)", self.keyword),
                        line(),
                    ));
                };
                let declared = usize::try_from(parse_u64(count)?).unwrap_or(usize::MAX);
                let values = parse_u64s(rest)?;
                if values.len() != declared {
                    return Err(ParseError::structural(
                        format!(
                            "{} line (declares {} values, found {})",
                            self.keyword,
                            declared,
                            values.len()
                        ),
                        line(),
                    ));
                }
                if declared < min {
                    return Err(ParseError::structural(
                        format!(
                            "{} line (declares {} values, at least {} required)",
                            self.keyword, declared, min
                        ),
                        line(),
                    ));
                }
                Ok(CountedRecord {
                    declared: Some(declared),
                    values,
                })
            }
        }
    }
}

impl CountedRecord {
    /// Value at `index`, zero when the line was shorter.
    pub fn at(&self, index: usize) -> u64 {
        self.values.get(index).copied().unwrap_or(0)
    }

    /// Value bound to a named field of `schema`.
    pub fn field(&self, schema: &Schema, name: &str) -> Option<u64> {
        schema
            .fields
            .iter()
            .position(|f| *f == name)
            .map(|i| self.at(i))
    }

    /// Values present in the input past the last field of `schema`.
    pub fn unmapped(&self, schema: &Schema) -> &[u64] {
        self.values.get(schema.fields.len()..).unwrap_or(&[])
    }
}

/// Declares a typed counter record together with its schema table.
///
/// Field order is position order; adding a counter a newer kernel reports
/// is a one-line change to the field list.
macro_rules! counter_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident = $keyword:literal, $layout:expr;
        { $($field:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
        $vis struct $name {
            $(pub $field: u64,)+
            /// Values past the last named field.
            #[serde(skip_serializing_if = "Vec::is_empty")]
            pub unmapped: Vec<u64>,
        }

        impl $name {
            pub const SCHEMA: $crate::parse::counted::Schema = $crate::parse::counted::Schema {
                keyword: $keyword,
                layout: $layout,
                fields: &[$(stringify!($field)),+],
            };

            pub fn from_record(record: &$crate::parse::counted::CountedRecord) -> Self {
                let mut values = record.values.iter().copied();
                Self {
                    $($field: values.next().unwrap_or(0),)+
                    unmapped: values.collect(),
                }
            }

            /// Decodes the tokens following the keyword.
            pub fn decode(tokens: &[&str]) -> Result<Self, $crate::parse::ParseError> {
                Self::SCHEMA.decode(tokens).map(|r| Self::from_record(&r))
            }
        }
    };
}

pub(crate) use counter_record;
