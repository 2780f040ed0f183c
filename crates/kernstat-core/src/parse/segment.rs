//! Stateful segmentation of files made of a header followed by repeated
//! blocks.
//!
//! The segmenter owns the line loop and the Unattached → InBlock state;
//! a [`BlockFormat`] supplies the patterns and knows how to build and fill
//! one block. Header patterns are tried on every line, because nothing in
//! the stream marks where the header ends.

use std::io::BufRead;

use serde::Serialize;
use tracing::{trace, warn};

use super::error::ParseError;
use super::fields::FieldSet;
use super::pattern::{Captures, MatchResult, PatternSet};

/// Describes one block-structured file format.
pub trait BlockFormat {
    type Block;

    /// File-scoped patterns; matches are merged into the header.
    fn header_patterns(&self) -> &PatternSet;

    /// Patterns recognising the first line of a block.
    fn start_patterns(&self) -> &PatternSet;

    /// Builds an empty block from a matched start line.
    fn open_block(&self, pattern: usize, captures: &Captures<'_>)
    -> Result<Self::Block, ParseError>;

    /// Offers a line to the current block. Returns `Ok(false)` when the
    /// line is not recognised, which is not an error.
    fn absorb(&self, block: &mut Self::Block, line: &str) -> Result<bool, ParseError>;
}

/// A block dropped because one of its lines failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedBlock {
    pub start_line: String,
    pub reason: String,
}

/// Result of segmenting a whole file.
#[derive(Debug, Clone, PartialEq)]
pub struct Segments<B> {
    pub header: FieldSet,
    pub blocks: Vec<B>,
    pub rejected: Vec<RejectedBlock>,
}

enum State<B> {
    Unattached,
    InBlock { block: B, start_line: String },
    Rejected,
}

struct Segmenter<B> {
    header: FieldSet,
    blocks: Vec<B>,
    rejected: Vec<RejectedBlock>,
    state: State<B>,
}

impl<B> Segmenter<B> {
    fn close_current(&mut self) {
        if let State::InBlock { block, .. } = std::mem::replace(&mut self.state, State::Unattached)
        {
            self.blocks.push(block);
        }
    }

    fn reject(&mut self, start_line: String, error: &ParseError) {
        warn!(line = %start_line, error = %error, "dropping block");
        self.rejected.push(RejectedBlock {
            start_line,
            reason: error.to_string(),
        });
        self.state = State::Rejected;
    }
}

/// Runs the segmenter over `reader`.
///
/// Fails if the stream cannot be read, if a header line does not decode,
/// or if no header field was recognised at all. Failures inside a block
/// drop only that block.
pub fn segment<F: BlockFormat>(
    format: &F,
    reader: impl BufRead,
) -> Result<Segments<F::Block>, ParseError> {
    let mut seg = Segmenter {
        header: FieldSet::new(),
        blocks: Vec::new(),
        rejected: Vec::new(),
        state: State::Unattached,
    };

    for line in reader.lines() {
        let line = line?;

        if let MatchResult::Matched { captures, .. } = format.header_patterns().dispatch(&line) {
            captures.decode_into(&mut seg.header)?;
            continue;
        }

        if let MatchResult::Matched { index, captures } = format.start_patterns().dispatch(&line) {
            seg.close_current();
            match format.open_block(index, &captures) {
                Ok(block) => {
                    seg.state = State::InBlock {
                        block,
                        start_line: line.trim().to_string(),
                    }
                }
                Err(e) => seg.reject(line.trim().to_string(), &e),
            }
            continue;
        }

        let outcome = match &mut seg.state {
            State::InBlock { block, .. } => format.absorb(block, &line),
            State::Unattached | State::Rejected => Ok(false),
        };
        match outcome {
            Ok(true) => {}
            Ok(false) => trace!(line = %line, "unclassified line ignored"),
            Err(e) => {
                if let State::InBlock { start_line, .. } =
                    std::mem::replace(&mut seg.state, State::Unattached)
                {
                    seg.reject(start_line, &e);
                }
            }
        }
    }
    seg.close_current();

    if seg.header.is_empty() {
        return Err(ParseError::structural(
            "header",
            "no header field found before end of input",
        ));
    }

    Ok(Segments {
        header: seg.header,
        blocks: seg.blocks,
        rejected: seg.rejected,
    })
}
