use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open counter source {path}: {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("remote command failed: {reason}")]
    RemoteCommandFailed { reason: String },

    #[error("malformed counter line: {line:?}")]
    MalformedLine { line: String },

    #[error("counter {0:?} missing from source")]
    MissingCounter(String),
}
