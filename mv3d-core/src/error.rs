/// Error types shared across the viewer core
use thiserror::Error;

/// Failure to parse an asset file
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("face references vertex {index} but only {count} are defined")]
    IndexOutOfRange { index: i64, count: usize },

    #[error("asset contains no geometry")]
    Empty,

    #[error("unexpected end of data at byte {0}")]
    Truncated(usize),

    #[error("not a binary FBX file")]
    NotBinaryFbx,

    #[error("unknown FBX property type '{0}'")]
    UnknownProperty(char),

    #[error("failed to inflate array: {0}")]
    Inflate(String),

    #[error("asset is not valid UTF-8")]
    Encoding,
}

/// Failure reported by an asset source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("{url} not found")]
    NotFound { url: String },

    #[error("request for {url} failed: {reason}")]
    Failed { url: String, reason: String },
}

/// Terminal failure of an asset load
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("ERROR loading {format} file: {source}")]
    Fetch {
        format: &'static str,
        #[source]
        source: FetchError,
    },

    #[error("ERROR loading {format} file: {source}")]
    Parse {
        format: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),
}

/// Violation of scene graph invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("a primary object is already attached")]
    PrimaryAlreadyAttached,

    #[error("node {0} is not in the scene")]
    UnknownNode(u64),
}

/// Unparseable colour string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid colour '{0}'")]
pub struct ColorError(pub String);
