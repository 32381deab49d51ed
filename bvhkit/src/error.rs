use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write motion: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected end of file while reading {context}")]
    UnexpectedEof { context: String },

    #[error("line {line}: expected '{expected}', found '{found}'")]
    MissingKeyword {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}: closing brace without a matching opening brace")]
    UnbalancedBrace { line: usize },

    #[error("line {line}: hierarchy has {depth} unclosed brace(s) at MOTION")]
    UnclosedHierarchy { line: usize, depth: usize },

    #[error("hierarchy does not declare a ROOT joint")]
    MissingRoot,

    #[error("line {line}: second root joint '{name}'")]
    MultipleRoots { line: usize, name: String },

    #[error("line {line}: unknown channel type '{token}'")]
    UnknownChannel { line: usize, token: String },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("motion frame {frame} has {found} value(s), expected {expected}")]
    ShortMotionRow {
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown joint: {name}")]
    UnknownJoint { name: String },

    #[error("invalid joint index: {index}")]
    InvalidJointIndex { index: usize },

    #[error("frame {frame} is out of range (document has {frames} frame(s))")]
    FrameOutOfRange { frame: usize, frames: usize },

    #[error("pose was evaluated for a different skeleton ({pose} joints, document has {document})")]
    PoseMismatch { pose: usize, document: usize },

    #[error("no motion is loaded")]
    NotLoaded,

    #[error("invalid value: {message}")]
    InvalidValue { message: String },
}

/// A numeric token that could not be parsed and was read as zero.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseWarning {
    /// 1-based line number in the source text.
    pub line: usize,
    pub token: String,
    pub context: &'static str,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: unparsable {} '{}', using 0",
            self.line, self.context, self.token
        )
    }
}
