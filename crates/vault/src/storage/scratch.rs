//! [`ScratchFile`]: a decrypted copy that deletes itself when dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Guard over a scratch file on disk.
///
/// The file is removed when the guard is dropped, whether the download it
/// served completed, failed, or was abandoned by the client.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Take ownership of `path`. The file need not exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location of the scratch file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the scratch file as a byte stream that keeps the guard alive until
    /// the stream itself is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn into_stream(self) -> io::Result<ScratchStream> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(ScratchStream {
            inner: ReaderStream::new(file),
            _guard: self,
        })
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // Blocking unlink of a single file; runs when a response body is
        // dropped and must have finished before the guard is gone.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove scratch file"),
        }
    }
}

/// Streaming body over a [`ScratchFile`].
pub struct ScratchStream {
    inner: ReaderStream<tokio::fs::File>,
    _guard: ScratchFile,
}

impl Stream for ScratchStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
