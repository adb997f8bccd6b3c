//! `reqwest` implementation of the transfer [`Transport`].

use guangyuyun_transfer::{
    Method, TransferError, Transport, TransportFuture, TransportRequest, TransportResponse,
};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Sends transport requests over a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client with the timeouts from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http })
    }

    /// The underlying client, for requests outside the transport contract.
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransferError> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(network_error)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await.map_err(network_error)?.to_vec();

        tracing::trace!(status, len = body.len(), "response received");
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn network_error(e: reqwest::Error) -> TransferError {
    TransferError::Transport(e.to_string())
}

impl Transport for HttpTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
        Box::pin(self.execute(request))
    }
}
