//! Ranged chunked download with local resume.

use std::path::PathBuf;

use guangyuyun_protocol::constants::{
    HEADER_AUTH_TOKEN, HEADER_CONTENT_LENGTH, HEADER_CONTENT_RANGE, HEADER_RANGE,
};
use guangyuyun_protocol::{ByteRange, ContentRange};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info, warn};

use crate::chunked::ChunkWriter;
use crate::planner::DOWNLOAD_CHUNK_BOUNDS;
use crate::progress::{Direction, ProgressCallback, SpeedCalculator, TransferProgress};
use crate::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::{DownloadState, TransferFailure, TransferOutcome};
use crate::validation::{require_non_blank, validate_chunk_size};
use crate::{DEFAULT_DOWNLOAD_CHUNK_SIZE, TransferError};

/// Range asked for when only the size is wanted.
const PROBE_RANGE: &str = "bytes=0-0";

/// Parameters of one download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub file_id: String,
    pub auth_token: String,
    pub output_path: PathBuf,
    /// Bytes per ranged request; defaults to 1 MiB.
    pub chunk_size: Option<u64>,
    /// Continue from the size of an existing output file.
    pub resume: bool,
    /// Skips the size probe when the caller already knows the total.
    pub known_total_size: Option<u64>,
}

impl DownloadRequest {
    pub fn new(
        file_id: impl Into<String>,
        auth_token: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            auth_token: auth_token.into(),
            output_path: output_path.into(),
            chunk_size: None,
            resume: true,
            known_total_size: None,
        }
    }
}

/// Total object size from a probe response.
///
/// Prefers the total of `Content-Range`. `Content-Length` is only trusted on
/// a non-partial response, where it covers the whole object.
pub fn parse_total_size(response: &TransportResponse) -> Option<u64> {
    if let Some(value) = response.header(HEADER_CONTENT_RANGE) {
        match ContentRange::parse(value) {
            Ok(ContentRange {
                total: Some(total), ..
            }) if total > 0 => return Some(total),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "ignoring unparsable Content-Range"),
        }
    }

    if response.status == 206 {
        return None;
    }
    response
        .header(HEADER_CONTENT_LENGTH)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&len| len > 0)
}

/// Runs downloads against one endpoint.
pub struct DownloadSession<'a> {
    transport: &'a dyn Transport,
    url: String,
    progress: Option<ProgressCallback>,
}

impl<'a> DownloadSession<'a> {
    /// `url` is the full download endpoint; the file id goes in its query.
    pub fn new(transport: &'a dyn Transport, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            progress: None,
        }
    }

    /// Registers a callback invoked after every written chunk.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn file_url(&self, file_id: &str) -> String {
        format!(
            "{}?id={}",
            self.url,
            utf8_percent_encode(file_id, NON_ALPHANUMERIC)
        )
    }

    /// Asks for the first byte only and reads the total size from the headers.
    pub async fn probe_size(&self, file_id: &str, auth_token: &str) -> Result<u64, TransferError> {
        require_non_blank(file_id, "file id")?;
        require_non_blank(auth_token, "auth token")?;

        let req = TransportRequest::get(self.file_url(file_id))
            .header(HEADER_AUTH_TOKEN, auth_token)
            .header(HEADER_RANGE, PROBE_RANGE);
        let response = self.transport.send(req).await?;
        if !response.is_success() {
            return Err(TransferError::HttpStatus(response.status));
        }
        parse_total_size(&response).ok_or(TransferError::UnknownSize)
    }

    /// Downloads `request.file_id` into `request.output_path`.
    pub async fn run(&self, request: &DownloadRequest) -> Result<TransferOutcome, TransferFailure> {
        let chunk_size = validate(request).map_err(TransferFailure::early)?;

        let mut state = DownloadState::default();
        match self.download(request, chunk_size, &mut state).await {
            Ok(message) => Ok(TransferOutcome::succeeded(message, state.total_size)
                .with_remote_id(&request.file_id)
                .with_file_path(&request.output_path)),
            Err(e) => {
                let mut failure = TransferFailure::new(e, state.total_size, state.downloaded);
                failure.outcome.remote_id = Some(request.file_id.clone());
                Err(failure)
            }
        }
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        chunk_size: u64,
        state: &mut DownloadState,
    ) -> Result<&'static str, TransferError> {
        let output = &request.output_path;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let start = if request.resume {
            existing_size(output).await?
        } else {
            0
        };
        if start > 0 {
            info!(file_id = %request.file_id, offset = start, "resuming download");
        }
        // The partial output is the last known state until the size is known.
        state.downloaded = start;

        let total = match request.known_total_size.filter(|&t| t > 0) {
            Some(total) => total,
            None => {
                self.probe_size(&request.file_id, &request.auth_token)
                    .await?
            }
        };
        *state = DownloadState::new(start, total);

        if state.is_complete() {
            info!(file_id = %request.file_id, size = total, "file already downloaded");
            return Ok("file already downloaded");
        }

        info!(
            file_id = %request.file_id,
            output = %output.display(),
            size = total,
            chunk_size,
            "starting download"
        );

        let mut writer = ChunkWriter::new(output, state.downloaded);
        let mut speed = SpeedCalculator::default();

        while let Some(range) = ByteRange::clipped(state.downloaded, chunk_size, total) {
            debug!(
                chunk = state.chunk_number + 1,
                start = range.start,
                end = range.end,
                "fetching chunk"
            );
            let data = self.fetch_range(request, range, total).await?;
            writer.write_chunk(range.start, &data).await?;

            let received = data.len() as u64;
            state.advance(received);
            speed.add_sample(received);
            self.report(&speed, state);
        }

        info!(file_id = %request.file_id, size = total, "download complete");
        Ok("download completed")
    }

    async fn fetch_range(
        &self,
        request: &DownloadRequest,
        range: ByteRange,
        total: u64,
    ) -> Result<Vec<u8>, TransferError> {
        let req = TransportRequest::get(self.file_url(&request.file_id))
            .header(HEADER_AUTH_TOKEN, &request.auth_token)
            .header(HEADER_RANGE, range.header_value());
        let response = self.transport.send(req).await?;

        if response.status != 200 && response.status != 206 {
            return Err(TransferError::HttpStatus(response.status));
        }
        let mut body = response.body;
        if body.is_empty() {
            return Err(TransferError::EmptyChunk);
        }

        let wanted = range.len();
        if response.status == 200 && body.len() as u64 == total && wanted < total {
            // Range ignored; the whole object came back.
            warn!(start = range.start, end = range.end, "server ignored Range, slicing full body");
            let start = range.start as usize;
            let end = range.end as usize + 1;
            return Ok(body[start..end].to_vec());
        }
        if body.len() as u64 > wanted {
            body.truncate(wanted as usize);
        }
        Ok(body)
    }

    fn report(&self, speed: &SpeedCalculator, state: &DownloadState) {
        if let Some(cb) = &self.progress {
            cb(TransferProgress {
                direction: Direction::Download,
                chunk_number: state.chunk_number,
                transferred: state.downloaded,
                total: state.total_size,
                bytes_per_second: speed.bytes_per_second(),
                eta_secs: speed.eta(state.remaining()).map(|eta| eta.as_secs()),
            });
        }
    }
}

fn validate(request: &DownloadRequest) -> Result<u64, TransferError> {
    require_non_blank(&request.file_id, "file id")?;
    require_non_blank(&request.auth_token, "auth token")?;
    if request.output_path.as_os_str().is_empty() {
        return Err(TransferError::Validation("output path must not be empty".into()));
    }
    let chunk_size = request.chunk_size.unwrap_or(DEFAULT_DOWNLOAD_CHUNK_SIZE);
    validate_chunk_size(chunk_size, DOWNLOAD_CHUNK_BOUNDS)?;
    Ok(chunk_size)
}

/// Size of a partial output file, 0 if there is none.
async fn existing_size(path: &std::path::Path) -> Result<u64, TransferError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Err(TransferError::Validation(format!(
            "output path is a directory: {}",
            path.display()
        ))),
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}
