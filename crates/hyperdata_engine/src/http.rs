//! HTTP transport implementation.
//!
//! This module adapts a raw HTTP client to [`LinkTransport`]. The actual
//! HTTP client is abstracted via a trait to allow different implementations
//! (reqwest, hyper, an in-memory server for tests, etc.).

use crate::error::{SyncError, SyncResult};
use crate::transport::LinkTransport;
use async_trait::async_trait;
use hyperdata_protocol::{media_type, Body, Link, Representation, WriteResponse};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP methods used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// `Accept` header.
    pub accept: &'static str,
    /// `Content-Type` of `body`, when there is one.
    pub content_type: Option<&'static str>,
    /// Request body.
    pub body: Vec<u8>,
}

/// An HTTP response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// `Location` header.
    pub location: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a status and no body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Creates a `200 OK` response with a body.
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_owned()),
            location: None,
            body,
        }
    }

    /// Creates a `201 Created` response.
    pub fn created(location: impl Into<String>) -> Self {
        Self {
            status: 201,
            location: Some(location.into()),
            ..Self::default()
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Errors are
/// connection-level failures; HTTP error statuses come back as responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        (**self).send(request).await
    }
}

/// HTTP-based link transport.
///
/// JSON representations travel as `application/json`, identifier lists as
/// `text/uri-list`. Status mapping: 404/410 are `NotFound`, 5xx and 429 are
/// retryable transport errors, other non-2xx statuses are fatal.
pub struct HttpTransport<C: HttpClient> {
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(client: C) -> Self {
        Self {
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    async fn send(
        &self,
        method: Method,
        link: &Link,
        accept: &'static str,
        body: Option<Body>,
    ) -> SyncResult<HttpResponse> {
        let (content_type, bytes) = match body {
            Some(body) => (Some(body.media_type()), body.encode()?),
            None => (None, Vec::new()),
        };
        let request = HttpRequest {
            method,
            url: link.href.clone(),
            accept,
            content_type,
            body: bytes,
        };
        debug!(%method, url = %link.href, "http request");

        let response = self.client.send(request).await.map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            SyncError::transport_retryable(e)
        })?;

        match response.status {
            200..=299 => {
                *self.last_error.write() = None;
                Ok(response)
            }
            404 | 410 => Err(SyncError::not_found(&link.href)),
            status => {
                let message = format!("{method} {} returned {status}", link.href);
                warn!(%message, "http error status");
                *self.last_error.write() = Some(message.clone());
                if status >= 500 || status == 429 {
                    Err(SyncError::transport_retryable(message))
                } else {
                    Err(SyncError::transport_fatal(message))
                }
            }
        }
    }

    fn decode(response: &HttpResponse, expected: &str) -> SyncResult<Body> {
        let content_type = response.content_type.as_deref().unwrap_or(expected);
        Ok(Body::decode(content_type, &response.body)?)
    }

    fn write_response(response: HttpResponse) -> WriteResponse {
        WriteResponse {
            status: response.status,
            location: response.location,
        }
    }
}

#[async_trait]
impl<C: HttpClient> LinkTransport for HttpTransport<C> {
    async fn get(&self, link: &Link) -> SyncResult<Representation> {
        let response = self.send(Method::Get, link, media_type::JSON, None).await?;
        match Self::decode(&response, media_type::JSON)? {
            Body::Representation(repr) => Ok(repr),
            Body::UriList(_) => Err(SyncError::Protocol(
                hyperdata_protocol::ProtocolError::unsupported_media_type(media_type::URI_LIST),
            )),
        }
    }

    async fn get_uri_list(&self, link: &Link) -> SyncResult<Vec<String>> {
        let response = self
            .send(Method::Get, link, media_type::URI_LIST, None)
            .await?;
        match Self::decode(&response, media_type::URI_LIST)? {
            Body::UriList(uris) => Ok(uris),
            Body::Representation(_) => Err(SyncError::Protocol(
                hyperdata_protocol::ProtocolError::unsupported_media_type(media_type::JSON),
            )),
        }
    }

    async fn post(&self, link: &Link, body: Body) -> SyncResult<WriteResponse> {
        let response = self
            .send(Method::Post, link, media_type::JSON, Some(body))
            .await?;
        Ok(Self::write_response(response))
    }

    async fn put(&self, link: &Link, body: Body) -> SyncResult<WriteResponse> {
        let response = self
            .send(Method::Put, link, media_type::JSON, Some(body))
            .await?;
        Ok(Self::write_response(response))
    }

    async fn delete(&self, link: &Link, body: Option<Body>) -> SyncResult<WriteResponse> {
        let response = self
            .send(Method::Delete, link, media_type::JSON, body)
            .await?;
        Ok(Self::write_response(response))
    }
}
