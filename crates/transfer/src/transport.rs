//! The single seam between transfer sessions and the network.
//!
//! `Transport` is implemented by the client crate on top of `reqwest`.
//! Keeping it a trait lets the sessions run against in-memory mocks.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;

use crate::TransferError;

/// HTTP method of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(pairs);
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// One response as seen by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the JSON body.
    ///
    /// A blank body or a non-JSON body on a non-2xx status is reported as
    /// [`TransferError::HttpStatus`]; a blank 2xx body as
    /// [`TransferError::EmptyResponse`].
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransferError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            if !self.is_success() {
                return Err(TransferError::HttpStatus(self.status));
            }
            return Err(TransferError::EmptyResponse);
        }
        match serde_json::from_slice(&self.body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !self.is_success() => Err(TransferError::HttpStatus(self.status)),
            Err(e) => Err(e.into()),
        }
    }
}

fn find_header<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse, TransferError>> + Send + 'a>>;

/// Performs one request/response exchange.
///
/// Connection and I/O failures must be reported as
/// [`TransferError::Transport`]. Non-2xx statuses are not errors at this
/// level; sessions interpret them.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}
