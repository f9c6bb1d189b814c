use std::{fmt, io, path::PathBuf};

use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// The three ways a run can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Io,
    Parse,
}

/// Which file operation an I/O error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    OpenSource,
    ReadSource,
    CreateDestination,
    WriteDestination,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoOp::OpenSource => "open source",
            IoOp::ReadSource => "read source",
            IoOp::CreateDestination => "create destination",
            IoOp::WriteDestination => "write destination",
        };
        f.write_str(s)
    }
}

#[derive(Debug, ThisError)]
pub enum Error {
    /// Bad command-line input, raised before any file is touched.
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("failed to {op} '{}': {source}", .path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in '{}' at line {line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Argument(_) => ErrorKind::Argument,
            Error::Io { .. } => ErrorKind::Io,
            Error::Parse { .. } => ErrorKind::Parse,
        }
    }

    pub fn io(op: IoOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Sorts a `csv::Error` into the I/O or parse kind.
    ///
    /// Anything that is not an underlying I/O failure (invalid UTF-8, a
    /// record the writer refuses) is treated as malformed content.
    pub fn from_csv(op: IoOp, path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let path = path.into();
        let line = err.position().map_or(0, csv::Position::line);
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Error::Io { op, path, source },
            _ => Error::Parse { path, line, reason },
        }
    }
}
