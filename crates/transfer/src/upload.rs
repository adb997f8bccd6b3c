//! Chunked large-file upload driven by server-reported offsets.

use std::path::PathBuf;

use guangyuyun_protocol::LargeFileUploadResponse;
use guangyuyun_protocol::constants::HEADER_CONTENT_TYPE;
use guangyuyun_protocol::messages::ChunkHeaders;
use tracing::{debug, info, warn};

use crate::chunked::{ChunkReader, calculate_file_md5};
use crate::planner::{ChunkSizeAdjustment, SEARCH_STEP, UPLOAD_CHUNK_BOUNDS, adjust_chunk_size};
use crate::progress::{Direction, ProgressCallback, SpeedCalculator, TransferProgress};
use crate::transport::{Transport, TransportRequest};
use crate::types::{
    ChunkDescriptor, Reconciliation, TransferFailure, TransferOutcome, TransferPlan, UploadState,
};
use crate::validation::{require_non_blank, validate_chunk_size, validate_source_file};
use crate::{DEFAULT_UPLOAD_CHUNK_SIZE, TransferError};

/// Chunk replies in a row that fail to move the upload forward (index
/// mismatches, or accepted chunks whose offset does not advance) before the
/// upload is abandoned.
pub const MAX_CONSECUTIVE_RECONCILES: u32 = 8;

/// Parameters of one large-file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub auth_token: String,
    /// Requested chunk size; defaults to 1 MiB.
    pub chunk_size: Option<u64>,
    pub notification_link: Option<String>,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, auth_token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            auth_token: auth_token.into(),
            chunk_size: None,
            notification_link: None,
        }
    }
}

/// What the server said about one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkVerdict {
    /// Accepted; more chunks expected.
    Continue { server_offset: Option<u64> },
    /// Accepted and the file is assembled.
    Complete { remote_id: String },
    /// Index mismatch; resume from the server's offset.
    Reconcile { server_offset: u64 },
    /// Hard failure.
    Failed { code: i64, message: String },
}

/// Classifies a chunk response.
pub fn classify_response(response: &LargeFileUploadResponse) -> ChunkVerdict {
    if response.is_success() {
        return match response.remote_id() {
            Some(id) => ChunkVerdict::Complete {
                remote_id: id.to_string(),
            },
            None => ChunkVerdict::Continue {
                server_offset: response.server_offset(),
            },
        };
    }

    match response.server_offset() {
        Some(server_offset) if response.is_index_mismatch() => {
            ChunkVerdict::Reconcile { server_offset }
        }
        _ => ChunkVerdict::Failed {
            code: response.code,
            message: response.message.clone(),
        },
    }
}

/// Runs large-file uploads against one endpoint.
pub struct UploadSession<'a> {
    transport: &'a dyn Transport,
    url: String,
    progress: Option<ProgressCallback>,
}

impl<'a> UploadSession<'a> {
    /// `url` is the full large-file upload endpoint.
    pub fn new(transport: &'a dyn Transport, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            progress: None,
        }
    }

    /// Registers a callback invoked after every accepted chunk.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Uploads `request.path` chunk by chunk until the server returns a file id.
    pub async fn run(&self, request: &UploadRequest) -> Result<TransferOutcome, TransferFailure> {
        let plan = self.prepare(request).await.map_err(TransferFailure::early)?;

        info!(
            file = %plan.file_name,
            size = plan.total_size,
            chunk_size = plan.chunk_size,
            chunks = plan.chunk_count(),
            md5 = %plan.content_digest,
            "starting upload"
        );

        let mut state = UploadState::new();
        if let Err(e) = self.upload_loop(request, &plan, &mut state).await {
            return Err(TransferFailure::new(e, plan.total_size, state.offset));
        }

        let Some(remote_id) = state.remote_file_id.clone() else {
            return Err(TransferFailure::new(
                TransferError::MissingFileId,
                plan.total_size,
                state.offset,
            ));
        };

        info!(file = %plan.file_name, id = %remote_id, "upload complete");
        let transferred = state.offset.min(plan.total_size);
        Ok(TransferOutcome {
            transferred_size: transferred,
            ..TransferOutcome::succeeded("upload complete", plan.total_size)
        }
        .with_remote_id(remote_id)
        .with_file_path(&request.path))
    }

    /// Validates the request and fixes the plan. No network activity.
    async fn prepare(&self, request: &UploadRequest) -> Result<TransferPlan, TransferError> {
        require_non_blank(&request.auth_token, "auth token")?;
        let total_size = validate_source_file(&request.path)?;

        let requested = request.chunk_size.unwrap_or(DEFAULT_UPLOAD_CHUNK_SIZE);
        validate_chunk_size(requested, UPLOAD_CHUNK_BOUNDS)?;

        let chunk_size =
            match adjust_chunk_size(total_size, requested, UPLOAD_CHUNK_BOUNDS, SEARCH_STEP) {
                ChunkSizeAdjustment::Valid(size) => size,
                ChunkSizeAdjustment::Adjusted { original, adjusted } => {
                    info!(original, adjusted, "adjusted chunk size to avoid a short last chunk");
                    adjusted
                }
                ChunkSizeAdjustment::NotFound { original } => {
                    warn!(
                        chunk_size = original,
                        size = total_size,
                        "no chunk size in range avoids a short last chunk; the server may reject it"
                    );
                    original
                }
            };

        let file_name = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                TransferError::Validation(format!("no file name in {}", request.path.display()))
            })?;
        let content_digest = tokio::task::spawn_blocking({
            let path = request.path.clone();
            move || calculate_file_md5(&path)
        })
        .await
        .map_err(join_error)??;

        Ok(TransferPlan::new(file_name, content_digest, total_size, chunk_size))
    }

    async fn upload_loop(
        &self,
        request: &UploadRequest,
        plan: &TransferPlan,
        state: &mut UploadState,
    ) -> Result<(), TransferError> {
        let mut reader = tokio::task::spawn_blocking({
            let path = request.path.clone();
            let chunk_size = plan.chunk_size;
            move || ChunkReader::new(&path, chunk_size)
        })
        .await
        .map_err(join_error)??;
        let mut speed = SpeedCalculator::default();
        let mut stalled = 0u32;

        while state.offset < plan.total_size && !state.done {
            // Always read at the current offset; it may have been moved by the server.
            let offset = state.offset;
            let (returned, chunk) = tokio::task::spawn_blocking(move || {
                let mut reader = reader;
                let chunk = reader.seek_to(offset).and_then(|()| reader.next_chunk());
                (reader, chunk)
            })
            .await
            .map_err(join_error)?;
            reader = returned;
            let Some(chunk) = chunk? else {
                break;
            };
            let sent = u64::from(chunk.length);
            let chunk_number = state.chunk_number;
            debug!(chunk = chunk_number, offset = chunk.offset, len = sent, "sending chunk");

            let response = self.send_chunk(request, plan, chunk).await?;
            match classify_response(&response) {
                ChunkVerdict::Continue { server_offset } => {
                    let next = server_offset.unwrap_or(state.offset + sent);
                    if next > state.offset {
                        stalled = 0;
                    } else {
                        stalled += 1;
                        if stalled > MAX_CONSECUTIVE_RECONCILES {
                            return Err(TransferError::ReconcileLimit { attempts: stalled });
                        }
                        warn!(
                            offset = state.offset,
                            server = next,
                            "chunk accepted but the server offset did not advance"
                        );
                    }
                    state.advance(next);
                    speed.add_sample(sent);
                    self.report(&speed, chunk_number, state.offset, plan.total_size);
                }
                ChunkVerdict::Complete { remote_id } => {
                    let next = response.server_offset().unwrap_or(state.offset + sent);
                    state.advance(next);
                    state.complete(remote_id);
                    speed.add_sample(sent);
                    self.report(&speed, chunk_number, state.offset, plan.total_size);
                }
                ChunkVerdict::Reconcile { server_offset } => {
                    stalled += 1;
                    if stalled > MAX_CONSECUTIVE_RECONCILES {
                        return Err(TransferError::ReconcileLimit { attempts: stalled });
                    }
                    let local = state.offset;
                    let direction = state.reconcile(server_offset, plan.chunk_size);
                    match direction {
                        Reconciliation::SkipForward => warn!(
                            local,
                            server = server_offset,
                            skipped = server_offset - local,
                            "server is ahead, skipping forward"
                        ),
                        Reconciliation::Rewind => warn!(
                            local,
                            server = server_offset,
                            "server is behind, rewinding"
                        ),
                        Reconciliation::InPlace => {
                            warn!(offset = local, "index mismatch at the same offset, resending")
                        }
                    }
                }
                ChunkVerdict::Failed { code, message } => {
                    return Err(TransferError::Server { code, message });
                }
            }
        }
        Ok(())
    }

    async fn send_chunk(
        &self,
        request: &UploadRequest,
        plan: &TransferPlan,
        chunk: ChunkDescriptor,
    ) -> Result<LargeFileUploadResponse, TransferError> {
        let headers = ChunkHeaders {
            file_start_index: chunk.offset,
            file_size: plan.total_size,
            file_name: plan.file_name.clone(),
            file_md5: plan.content_digest.clone(),
            auth_token: request.auth_token.clone(),
            notification_link: request.notification_link.clone(),
        };
        let req = TransportRequest::post(&self.url, chunk.payload)
            .headers(headers.to_pairs())
            .header(HEADER_CONTENT_TYPE, "application/octet-stream");

        self.transport.send(req).await?.json()
    }

    fn report(&self, speed: &SpeedCalculator, chunk_number: u64, transferred: u64, total: u64) {
        if let Some(cb) = &self.progress {
            let transferred = transferred.min(total);
            cb(TransferProgress {
                direction: Direction::Upload,
                chunk_number,
                transferred,
                total,
                bytes_per_second: speed.bytes_per_second(),
                eta_secs: speed.eta(total - transferred).map(|eta| eta.as_secs()),
            });
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> TransferError {
    TransferError::Task(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::chunked::md5_bytes;
    use crate::transport::TransportResponse;
    use crate::transport::mock::{MockTransport, chunk_json};

    const MIB: u64 = 1024 * 1024;
    const URL: &str = "https://gw.test/v1/addLargeFile";

    fn write_file(dir: &Path, name: &str, size: u64) -> (PathBuf, Vec<u8>) {
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let path = dir.join(name);
        std::fs::write(&path, &data).unwrap();
        (path, data)
    }

    fn start_offsets(mock: &MockTransport) -> Vec<u64> {
        mock.requests()
            .iter()
            .map(|r| r.header_value("FileStartIndex").unwrap().parse().unwrap())
            .collect()
    }

    fn body_lens(mock: &MockTransport) -> Vec<u64> {
        mock.requests()
            .iter()
            .map(|r| r.body.as_ref().map_or(0, |b| b.len() as u64))
            .collect()
    }

    #[test]
    fn classify_success_without_id_continues() {
        let resp: LargeFileUploadResponse =
            serde_json::from_str(r#"{"code":200,"message":"ok","fileIndex":"1048576","id":""}"#)
                .unwrap();
        assert_eq!(
            classify_response(&resp),
            ChunkVerdict::Continue {
                server_offset: Some(MIB)
            }
        );
    }

    #[test]
    fn classify_success_with_id_completes() {
        let resp: LargeFileUploadResponse =
            serde_json::from_str(r#"{"code":200,"message":"ok","fileIndex":"5","id":"QmX"}"#)
                .unwrap();
        assert_eq!(
            classify_response(&resp),
            ChunkVerdict::Complete {
                remote_id: "QmX".into()
            }
        );
    }

    #[test]
    fn classify_index_mismatch() {
        let resp: LargeFileUploadResponse =
            serde_json::from_str(r#"{"code":7,"message":"index","fileIndex":"5242880"}"#).unwrap();
        assert_eq!(
            classify_response(&resp),
            ChunkVerdict::Reconcile {
                server_offset: 5 * MIB
            }
        );

        let no_offset: LargeFileUploadResponse =
            serde_json::from_str(r#"{"code":7,"message":"index"}"#).unwrap();
        assert_eq!(
            classify_response(&no_offset),
            ChunkVerdict::Failed {
                code: 7,
                message: "index".into()
            }
        );
    }

    #[test]
    fn classify_other_codes_fail_verbatim() {
        let resp: LargeFileUploadResponse =
            serde_json::from_str(r#"{"code":5,"message":"chunk too small"}"#).unwrap();
        assert_eq!(
            classify_response(&resp),
            ChunkVerdict::Failed {
                code: 5,
                message: "chunk too small".into()
            }
        );
    }

    #[tokio::test]
    async fn uploads_three_chunks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = write_file(dir.path(), "three.bin", 3 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(200, Some(MIB), None),
            chunk_json(200, Some(2 * MIB), None),
            chunk_json(200, Some(3 * MIB), Some("QmThree")),
        ]);

        let outcome = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.remote_id.as_deref(), Some("QmThree"));
        assert_eq!(outcome.total_size, 3 * MIB);
        assert_eq!(outcome.transferred_size, 3 * MIB);
        assert_eq!(start_offsets(&mock), vec![0, MIB, 2 * MIB]);
        assert_eq!(body_lens(&mock), vec![MIB, MIB, MIB]);

        let digest = md5_bytes(&data);
        for req in mock.requests() {
            assert_eq!(req.url, URL);
            assert_eq!(req.header_value("FileMd5"), Some(digest.as_str()));
            assert_eq!(req.header_value("FileSize"), Some("3145728"));
            assert_eq!(req.header_value("FileName"), Some("three.bin"));
            assert_eq!(req.header_value("AuthToken"), Some("tok"));
            assert_eq!(req.header_value("NotificationLink"), None);
        }

        // Chunks concatenate back to the file.
        let sent: Vec<u8> = mock
            .requests()
            .into_iter()
            .flat_map(|r| r.body.unwrap())
            .collect();
        assert_eq!(sent, data);
    }

    #[tokio::test]
    async fn rewinds_to_server_offset_on_index_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (path, data) = write_file(dir.path(), "big.bin", 25 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(200, Some(10 * MIB), None),
            chunk_json(7, Some(5 * MIB), None),
            chunk_json(200, Some(15 * MIB), None),
            chunk_json(200, Some(25 * MIB), Some("QmBig")),
        ]);
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&chunks);

        let mut request = UploadRequest::new(&path, "tok");
        request.chunk_size = Some(10 * MIB);
        let outcome = UploadSession::new(&mock, URL)
            .on_progress(Box::new(move |p| seen.lock().unwrap().push(p.chunk_number)))
            .run(&request)
            .await
            .unwrap();

        assert_eq!(outcome.remote_id.as_deref(), Some("QmBig"));
        assert_eq!(start_offsets(&mock), vec![0, 10 * MIB, 5 * MIB, 15 * MIB]);
        assert_eq!(body_lens(&mock), vec![10 * MIB, 10 * MIB, 10 * MIB, 10 * MIB]);

        // The rewound chunk is read from the file at the server offset.
        let rewound = mock.requests()[2].body.clone().unwrap();
        assert_eq!(rewound, &data[5 * MIB as usize..15 * MIB as usize]);

        // Counter recomputed as 5 MiB / 10 MiB + 1 after the rewind.
        assert_eq!(*chunks.lock().unwrap(), vec![1, 1, 2]);
    }

    #[tokio::test]
    async fn skips_forward_when_server_is_ahead() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "skip.bin", 3 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(7, Some(2 * MIB), None),
            chunk_json(200, Some(3 * MIB), Some("QmSkip")),
        ]);

        let outcome = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert_eq!(outcome.remote_id.as_deref(), Some("QmSkip"));
        assert_eq!(start_offsets(&mock), vec![0, 2 * MIB]);
    }

    #[tokio::test]
    async fn resends_in_place_when_offsets_agree() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "same.bin", 2 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(7, Some(0), None),
            chunk_json(200, Some(MIB), None),
            chunk_json(200, Some(2 * MIB), Some("QmSame")),
        ]);

        UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert_eq!(start_offsets(&mock), vec![0, 0, MIB]);
    }

    #[tokio::test]
    async fn completes_early_when_server_returns_id() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "early.bin", 3 * MIB);
        let mock = MockTransport::ok(vec![chunk_json(200, None, Some("QmEarly"))]);

        let outcome = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.remote_id.as_deref(), Some("QmEarly"));
        assert_eq!(outcome.transferred_size, MIB);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn continue_without_offset_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "local.bin", 2 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(200, None, None),
            chunk_json(200, None, Some("QmLocal")),
        ]);

        UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert_eq!(start_offsets(&mock), vec![0, MIB]);
    }

    #[tokio::test]
    async fn server_error_aborts_with_code_and_message() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "fail.bin", 2 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(200, Some(MIB), None),
            TransportResponse::new(200, r#"{"code":5,"message":"chunk rejected"}"#),
        ]);

        let failure = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap_err();

        assert_eq!(failure.code(), Some(5));
        assert!(matches!(
            &failure.error,
            TransferError::Server { message, .. } if message == "chunk rejected"
        ));
        assert!(!failure.outcome.success);
        assert_eq!(failure.outcome.transferred_size, MIB);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_file_id_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "noid.bin", MIB);
        let mock = MockTransport::ok(vec![chunk_json(200, Some(MIB), None)]);

        let failure = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, TransferError::MissingFileId));
        assert_eq!(failure.outcome.transferred_size, MIB);
    }

    #[tokio::test]
    async fn endless_mismatches_hit_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "loop.bin", MIB);
        let responses = (0..=MAX_CONSECUTIVE_RECONCILES)
            .map(|_| chunk_json(7, Some(0), None))
            .collect();
        let mock = MockTransport::ok(responses);

        let failure = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            TransferError::ReconcileLimit { attempts } if attempts == MAX_CONSECUTIVE_RECONCILES + 1
        ));
        assert_eq!(mock.call_count(), MAX_CONSECUTIVE_RECONCILES as usize + 1);
    }

    #[tokio::test]
    async fn accepted_chunks_that_never_advance_hit_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "stuck.bin", 2 * MIB);
        let responses = (0..=MAX_CONSECUTIVE_RECONCILES)
            .map(|_| chunk_json(200, Some(0), None))
            .collect();
        let mock = MockTransport::ok(responses);

        let failure = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            TransferError::ReconcileLimit { attempts } if attempts == MAX_CONSECUTIVE_RECONCILES + 1
        ));
        assert_eq!(mock.call_count(), MAX_CONSECUTIVE_RECONCILES as usize + 1);
        assert!(start_offsets(&mock).iter().all(|&offset| offset == 0));
    }

    #[tokio::test]
    async fn progress_after_a_stall_resets_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "recover.bin", 2 * MIB);
        let mut responses: Vec<_> = (0..MAX_CONSECUTIVE_RECONCILES)
            .map(|_| chunk_json(200, Some(0), None))
            .collect();
        responses.push(chunk_json(200, Some(MIB), None));
        responses.extend((0..MAX_CONSECUTIVE_RECONCILES).map(|_| chunk_json(7, Some(MIB), None)));
        responses.push(chunk_json(200, Some(2 * MIB), Some("QmRecovered")));
        let mock = MockTransport::ok(responses);

        let outcome = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert_eq!(outcome.remote_id.as_deref(), Some("QmRecovered"));
        assert_eq!(
            mock.call_count(),
            2 * MAX_CONSECUTIVE_RECONCILES as usize + 2
        );
    }

    #[tokio::test]
    async fn progress_reports_carry_an_estimate_once_speed_is_known() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "eta.bin", 3 * MIB);
        let mock = MockTransport::ok(vec![
            chunk_json(200, Some(MIB), None),
            chunk_json(200, Some(2 * MIB), None),
            chunk_json(200, Some(3 * MIB), Some("QmEta")),
        ]);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&reports);

        UploadSession::new(&mock, URL)
            .on_progress(Box::new(move |p| seen.lock().unwrap().push(p)))
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 3);
        // A single sample gives no speed, hence no estimate.
        assert_eq!(reports[0].eta_secs, None);
        assert!(reports.iter().all(|p| p.direction == Direction::Upload));
        if let Some(last) = reports.last().filter(|p| p.bytes_per_second > 0.0) {
            assert_eq!(last.eta_secs, Some(0));
        }
    }

    #[tokio::test]
    async fn adjusts_chunk_size_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        // 2.5 MiB with 1 MiB chunks would leave a 0.5 MiB tail.
        let (path, _) = write_file(dir.path(), "odd.bin", 5 * MIB / 2);
        let mock = MockTransport::ok(vec![
            chunk_json(200, Some(5 * MIB / 4), None),
            chunk_json(200, Some(5 * MIB / 2), Some("QmOdd")),
        ]);

        UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap();

        assert_eq!(body_lens(&mock), vec![5 * MIB / 4, 5 * MIB / 4]);
    }

    #[tokio::test]
    async fn sends_notification_link_when_set() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "notify.bin", MIB);
        let mock = MockTransport::ok(vec![chunk_json(200, Some(MIB), Some("QmN"))]);

        let mut request = UploadRequest::new(&path, "tok");
        request.notification_link = Some("https://hook.test/done".into());
        UploadSession::new(&mock, URL).run(&request).await.unwrap();

        let req = &mock.requests()[0];
        assert_eq!(
            req.header_value("NotificationLink"),
            Some("https://hook.test/done")
        );
        assert_eq!(
            req.header_value("Content-Type"),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn validation_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "v.bin", MIB);
        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").unwrap();
        let mock = MockTransport::ok(vec![]);
        let session = UploadSession::new(&mock, URL);

        let blank_token = session.run(&UploadRequest::new(&path, " ")).await;
        assert!(matches!(
            blank_token.unwrap_err().error,
            TransferError::Validation(_)
        ));

        let mut too_small = UploadRequest::new(&path, "tok");
        too_small.chunk_size = Some(MIB - 1);
        assert!(matches!(
            session.run(&too_small).await.unwrap_err().error,
            TransferError::Validation(_)
        ));

        let mut too_big = UploadRequest::new(&path, "tok");
        too_big.chunk_size = Some(10 * MIB + 1);
        assert!(session.run(&too_big).await.is_err());

        let empty_file = session.run(&UploadRequest::new(&empty, "tok")).await;
        assert!(matches!(
            empty_file.unwrap_err().error,
            TransferError::EmptyFile
        ));

        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_file(dir.path(), "t.bin", MIB);
        let mock = MockTransport::new(vec![Err(TransferError::Transport(
            "connection refused".into(),
        ))]);

        let failure = UploadSession::new(&mock, URL)
            .run(&UploadRequest::new(&path, "tok"))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, TransferError::Transport(_)));
        assert_eq!(mock.call_count(), 1);
    }
}
