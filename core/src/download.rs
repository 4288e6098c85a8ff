//! Streamed download to a file.
//!
//! # Design
//! The source is opened through the same `HttpRequest::prepare` path as a
//! normal request, so headers, cookies, proxy and TLS settings apply
//! unchanged. The body is copied in fixed-size chunks with a progress
//! callback after every chunk. Both ends are owned values and close on
//! every exit path; a failed copy removes the partial destination file.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::client::{Client, RequestBuilder};
use crate::error::{ClientError, IoOp};
use crate::headers::parse_header_lines;
use crate::http::HttpMethod;
use crate::response::content_length;

/// Called after every chunk with `(bytes_so_far, total)`; `total` comes from
/// `Content-Length` when the server sent one.
pub type Progress<'p> = &'p mut dyn FnMut(u64, Option<u64>);

/// Outcome of a finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub content_length: Option<u64>,
    pub status: Option<u16>,
}

impl Client {
    /// GET `url` into `dest`. See `RequestBuilder::download`.
    pub fn download(
        &self,
        url: &str,
        dest: impl AsRef<Path>,
        progress: Option<Progress<'_>>,
    ) -> Result<Download, ClientError> {
        self.request(HttpMethod::Get, url).download(dest, progress)
    }
}

impl RequestBuilder<'_> {
    /// Send the request and stream the body into `dest`.
    ///
    /// Every step has its own `IoOp`: the source failing to open (including
    /// transport failures), the destination failing to open, and read or
    /// write errors mid-copy.
    pub fn download(self, dest: impl AsRef<Path>, progress: Option<Progress<'_>>) -> Result<Download, ClientError> {
        let (client, request) = self.into_parts();
        let request = request?;
        let dest = dest.as_ref();

        let prepared = request.prepare(&client.config().default_headers)?;
        let raw = client
            .send_prepared(&prepared, &request.transport_options())
            .map_err(|e| match e {
                ClientError::Transport { url, message } => {
                    ClientError::io(IoOp::OpenSource, url, io::Error::other(message))
                }
                other => other,
            })?;

        let parsed = parse_header_lines(&raw.header_lines);
        request.check_status(parsed.status)?;
        let total = content_length(&parsed.headers);
        debug!(url = %prepared.url, status = ?parsed.status, total = ?total, "download source opened");

        let mut file = File::create(dest).map_err(|e| ClientError::io(IoOp::OpenDestination, dest.display().to_string(), e))?;
        let mut source = raw.body;

        let copied = copy_chunks(
            &mut source,
            &mut file,
            client.config().chunk_size,
            total,
            progress,
            &prepared.url,
            dest,
        );
        drop(file);

        match copied {
            Ok(bytes_written) => {
                info!(url = %prepared.url, path = %dest.display(), bytes = bytes_written, "download complete");
                Ok(Download {
                    path: dest.to_path_buf(),
                    bytes_written,
                    content_length: total,
                    status: parsed.status,
                })
            }
            Err(e) => {
                warn!(path = %dest.display(), error = %e, "download failed");
                discard_partial(dest);
                Err(e)
            }
        }
    }
}

/// Remove a partially written file. Returns whether it is gone.
fn discard_partial(dest: &Path) -> bool {
    match fs::remove_file(dest) {
        Ok(()) => {
            debug!(path = %dest.display(), "removed partial download");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %dest.display(), error = %e, "partial download left behind");
            false
        }
    }
}

/// Copy `source` into `sink` in `chunk_size` pieces, reporting progress.
pub fn copy_chunks(
    source: &mut dyn Read,
    sink: &mut dyn Write,
    chunk_size: usize,
    total: Option<u64>,
    mut progress: Option<Progress<'_>>,
    source_name: &str,
    dest: &Path,
) -> Result<u64, ClientError> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ClientError::io(IoOp::Read, source_name, e)),
        };
        sink.write_all(&buffer[..read])
            .map_err(|e| ClientError::io(IoOp::Write, dest.display().to_string(), e))?;
        written += read as u64;
        if let Some(callback) = progress.as_deref_mut() {
            callback(written, total);
        }
    }
    sink.flush()
        .map_err(|e| ClientError::io(IoOp::Write, dest.display().to_string(), e))?;
    Ok(written)
}
