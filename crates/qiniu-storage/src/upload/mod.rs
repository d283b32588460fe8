//! Upload sessions.
//!
//! Two transfer modes share one source type:
//! - [`FormUploader`]: a single multipart/form-data request
//! - [`ResumeUploader`]: fixed-size blocks (`mkblk`) committed with `mkfile`

mod form;
mod record;
mod resumable;

use std::path::PathBuf;

use tokio::io::AsyncRead;

pub use form::FormUploader;
pub use record::{BlockContext, ResumeRecord};
pub use resumable::{ResumableSession, ResumeState, ResumeUploader};

/// Payload of an upload.
pub enum UploadSource {
    /// Local file, read lazily
    File(PathBuf),
    /// Any async reader, consumed until EOF
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    /// In-memory payload
    Bytes(Vec<u8>),
}

impl UploadSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            UploadSource::File(_) => "file",
            UploadSource::Stream(_) => "stream",
            UploadSource::Bytes(_) => "bytes",
        }
    }
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadSource::File(path) => f.debug_tuple("File").field(path).finish(),
            UploadSource::Stream(_) => f.write_str("Stream(..)"),
            UploadSource::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
        }
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}
