use std::path::Path;

use guangyuyun_protocol::constants::{
    CREATE_TOKEN_ENDPOINT, FILE_DOWNLOAD_ENDPOINT, HEADER_AUTH_TOKEN, HEADER_CONTENT_TYPE,
    LARGE_FILE_UPLOAD_ENDPOINT, SMALL_FILE_MAX_SIZE, SMALL_FILE_UPLOAD_ENDPOINT,
    describe_small_upload_code,
};
use guangyuyun_protocol::{SmallFileUploadResponse, TokenRequest, TokenResponse};
use guangyuyun_transfer::{
    DownloadRequest, DownloadSession, ProgressCallback, TransferError, TransferOutcome,
    Transport, TransportRequest, TransportResponse, UploadRequest, UploadSession,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::HttpTransport;

/// Per-call overrides for [`Client::upload_large_file`].
#[derive(Default)]
pub struct UploadOptions {
    /// Defaults to the configured upload chunk size.
    pub chunk_size: Option<u64>,
    /// Defaults to the configured notification link.
    pub notification_link: Option<String>,
    pub progress: Option<ProgressCallback>,
}

/// Per-call overrides for [`Client::download_file`].
#[derive(Default)]
pub struct DownloadOptions {
    /// Defaults to the configured download chunk size.
    pub chunk_size: Option<u64>,
    /// Defaults to the configured resume setting.
    pub resume: Option<bool>,
    /// Skips the size probe.
    pub known_total_size: Option<u64>,
    pub progress: Option<ProgressCallback>,
}

/// GuangYuYun gateway client.
///
/// Operations take an optional token; `None` falls back to the token stored
/// with [`set_auth_token`](Self::set_auth_token) or read from the config.
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
    transport: Box<dyn Transport>,
    auth_token: Option<String>,
}

impl Client {
    /// Creates a client that sends everything over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = HttpTransport::new(&config)?;
        let client = http.client().clone();
        Ok(Self::assemble(config, client, Box::new(http)))
    }

    /// Creates a client whose chunked transfers and token requests go through
    /// `transport`. Multipart uploads still use HTTP directly.
    pub fn with_transport(
        config: ClientConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let http = HttpTransport::new(&config)?.client().clone();
        Ok(Self::assemble(config, http, transport))
    }

    fn assemble(config: ClientConfig, http: reqwest::Client, transport: Box<dyn Transport>) -> Self {
        let auth_token = config.auth_token.clone();
        Self {
            config,
            http,
            transport,
            auth_token,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
        info!("auth token set");
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// True when a non-blank token is stored.
    pub fn has_auth_token(&self) -> bool {
        self.auth_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn clear_auth_token(&mut self) {
        self.auth_token = None;
        info!("auth token cleared");
    }

    fn resolve_token<'t>(&'t self, token: Option<&'t str>) -> Result<&'t str, ClientError> {
        token
            .or(self.auth_token.as_deref())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::Validation("auth token not set".into()))
    }

    /// Requests a new auth token. The token is returned, not stored.
    pub async fn create_token(&self, request: &TokenRequest) -> Result<TokenResponse, ClientError> {
        require(&request.account, "account")?;
        require(&request.api_key, "api key")?;
        if request.expire_time <= 0 {
            return Err(ClientError::Validation(
                "expire time must be a positive unix timestamp".into(),
            ));
        }

        let url = self.config.endpoint(CREATE_TOKEN_ENDPOINT);
        debug!(url = %url, account = %request.account, "requesting token");
        let req = TransportRequest::post(url, serde_json::to_vec(request)?)
            .header(HEADER_CONTENT_TYPE, "application/json; charset=UTF-8");
        let resp = self.transport.send(req).await?;

        let parsed: TokenResponse = decode(&resp)?;
        if !parsed.is_success() {
            return Err(ClientError::Api {
                code: parsed.code,
                message: parsed.message,
            });
        }
        info!(account = %request.account, expire_time = ?parsed.expire_time(), "token issued");
        Ok(parsed)
    }

    /// Uploads a file of at most 100 MiB in one multipart request.
    pub async fn upload_small_file(
        &self,
        path: &Path,
        token: Option<&str>,
    ) -> Result<SmallFileUploadResponse, ClientError> {
        let token = self.resolve_token(token)?;
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::Validation(format!(
                    "file does not exist: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            return Err(ClientError::Validation(format!(
                "path is a directory: {}",
                path.display()
            )));
        }
        if meta.len() > SMALL_FILE_MAX_SIZE {
            return Err(ClientError::Validation(format!(
                "file is {} bytes; files over 100 MiB need the large file upload",
                meta.len()
            )));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Validation(format!("no file name in {}", path.display())))?;

        let data = tokio::fs::read(path).await?;
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.config.endpoint(SMALL_FILE_UPLOAD_ENDPOINT);
        debug!(url = %url, file = %file_name, size = meta.len(), "uploading small file");
        let resp = self
            .http
            .post(&url)
            .header(HEADER_AUTH_TOKEN, token)
            .multipart(form)
            .send()
            .await?;
        let resp = TransportResponse {
            status: resp.status().as_u16(),
            headers: Vec::new(),
            body: resp.bytes().await?.to_vec(),
        };

        let parsed: SmallFileUploadResponse = decode(&resp)?;
        if !parsed.is_success() {
            return Err(ClientError::Api {
                code: parsed.code,
                message: describe_small_upload_code(parsed.code, &parsed.message),
            });
        }
        info!(file = %file_name, id = ?parsed.file_id(), "small file uploaded");
        Ok(parsed)
    }

    /// Uploads a file in chunks, following the server's offsets.
    pub async fn upload_large_file(
        &self,
        path: &Path,
        options: UploadOptions,
        token: Option<&str>,
    ) -> Result<TransferOutcome, ClientError> {
        let token = self.resolve_token(token)?;
        let request = UploadRequest {
            path: path.to_path_buf(),
            auth_token: token.to_string(),
            chunk_size: Some(options.chunk_size.unwrap_or(self.config.upload_chunk_size)),
            notification_link: options
                .notification_link
                .or_else(|| self.config.notification_link.clone()),
        };

        let mut session = UploadSession::new(
            &*self.transport,
            self.config.endpoint(LARGE_FILE_UPLOAD_ENDPOINT),
        );
        if let Some(callback) = options.progress {
            session = session.on_progress(callback);
        }
        Ok(session.run(&request).await?)
    }

    /// Downloads a file in ranged chunks, resuming a partial output if allowed.
    pub async fn download_file(
        &self,
        file_id: &str,
        output: &Path,
        options: DownloadOptions,
        token: Option<&str>,
    ) -> Result<TransferOutcome, ClientError> {
        let token = self.resolve_token(token)?;
        let request = DownloadRequest {
            file_id: file_id.to_string(),
            auth_token: token.to_string(),
            output_path: output.to_path_buf(),
            chunk_size: Some(options.chunk_size.unwrap_or(self.config.download_chunk_size)),
            resume: options.resume.unwrap_or(self.config.resume_downloads),
            known_total_size: options.known_total_size,
        };

        let mut session =
            DownloadSession::new(&*self.transport, self.config.endpoint(FILE_DOWNLOAD_ENDPOINT));
        if let Some(callback) = options.progress {
            session = session.on_progress(callback);
        }
        Ok(session.run(&request).await?)
    }

    /// Size of a stored file, from a one-byte ranged request.
    pub async fn get_file_size(&self, file_id: &str, token: Option<&str>) -> Result<u64, ClientError> {
        let token = self.resolve_token(token)?;
        let session =
            DownloadSession::new(&*self.transport, self.config.endpoint(FILE_DOWNLOAD_ENDPOINT));
        Ok(session.probe_size(file_id, token).await?)
    }
}

fn require(value: &str, what: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Decodes a JSON reply. Non-JSON error pages become [`ClientError::Status`].
fn decode<T: DeserializeOwned>(resp: &TransportResponse) -> Result<T, ClientError> {
    resp.json().map_err(|e| match e {
        TransferError::HttpStatus(status) => ClientError::Status {
            status,
            body: String::from_utf8_lossy(&resp.body).into_owned(),
        },
        TransferError::EmptyResponse => ClientError::EmptyResponse,
        TransferError::Json(e) => ClientError::Json(e),
        other => other.into(),
    })
}
