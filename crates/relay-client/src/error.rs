use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no {dir} directory found (walked up from {})", .start.display())]
    NoRelayDir { dir: &'static str, start: PathBuf },

    #[error("read {what} file: {source}")]
    ReadMarker {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("parse {what}: {source}")]
    ParseMarker {
        what: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("read stream: server closed the connection")]
    StreamClosed,

    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
