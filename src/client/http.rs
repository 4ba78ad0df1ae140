use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};
use url::Url;

use crate::client::error::BoxError;
use crate::domain::{HttpMethod, RequestSnapshot, ResponseSnapshot, find_header};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method,
            url: self.url.to_string(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response body delivered piecewise.
pub(crate) trait ChunkStream: Send {
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, BoxError>>;
}

/// Status line and headers of a response whose body has not been read yet.
pub(crate) struct StreamingResponse {
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn ChunkStream>,
}

impl StreamingResponse {
    /// Read the remaining body into memory.
    pub async fn into_snapshot(mut self) -> Result<ResponseSnapshot, BoxError> {
        let mut body = BytesMut::new();
        while let Some(chunk) = self.body.next_chunk().await? {
            body.extend_from_slice(&chunk);
        }
        Ok(ResponseSnapshot {
            status: self.status,
            url: self.url,
            headers: self.headers,
            body: body.freeze(),
        })
    }
}

pub(crate) trait HttpTransport: Send + Sync {
    /// Send `request` and read the whole response.
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<ResponseSnapshot, BoxError>>;

    /// Send `request` and hand back the body as a chunk stream.
    fn open<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<StreamingResponse, BoxError>>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TransportOptions {
    pub timeout: Option<Duration>,
    pub pool_maxsize: NonZeroUsize,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct ReqwestTransport {
    client: reqwest::Client,
    max_retries: u32,
}

impl ReqwestTransport {
    pub fn new(options: TransportOptions) -> Result<Self, reqwest::Error> {
        let mut builder =
            reqwest::Client::builder().pool_max_idle_per_host(options.pool_maxsize.get());
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            max_retries: options.max_retries,
        })
    }

    pub fn with_client(client: reqwest::Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    fn build(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        builder
    }

    /// Run `attempt` until it succeeds, fails for good, or retries run out.
    async fn with_retries<T, F, Fut>(&self, request: &HttpRequest, attempt: F) -> Result<T, BoxError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, reqwest::Error>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if retries < self.max_retries && is_retryable(&err, request.method) => {
                    retries += 1;
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt = retries,
                        error = %err,
                        "retrying request after transport failure"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<ResponseSnapshot, BoxError>> {
        Box::pin(async move {
            self.with_retries(request, || async {
                let response = self.build(request).send().await?;
                let status = response.status().as_u16();
                let url = response.url().to_string();
                let headers = collect_headers(response.headers());
                let body = response.bytes().await?;
                debug!(status, url = %url, bytes = body.len(), "received response");
                Ok::<_, reqwest::Error>(ResponseSnapshot {
                    status,
                    url,
                    headers,
                    body,
                })
            })
            .await
        })
    }

    fn open<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<StreamingResponse, BoxError>> {
        Box::pin(async move {
            let response = self
                .with_retries(request, || self.build(request).send())
                .await?;
            Ok(StreamingResponse {
                status: response.status().as_u16(),
                url: response.url().to_string(),
                headers: collect_headers(response.headers()),
                body: Box::new(ReqwestChunks(response)),
            })
        })
    }
}

struct ReqwestChunks(reqwest::Response);

impl ChunkStream for ReqwestChunks {
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, BoxError>> {
        Box::pin(async move { Ok(self.0.chunk().await?) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Timeout,
    Connect,
    /// The request may have reached the server.
    InFlight,
    Other,
}

impl Failure {
    fn of(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else if err.is_request() || err.is_body() {
            Self::InFlight
        } else {
            Self::Other
        }
    }

    /// Connect failures are always safe to retry; in-flight failures only
    /// for idempotent methods. Timeouts end the request.
    fn is_retryable(self, method: HttpMethod) -> bool {
        match self {
            Self::Connect => true,
            Self::InFlight => method.is_idempotent(),
            Self::Timeout | Self::Other => false,
        }
    }
}

fn is_retryable(err: &reqwest::Error, method: HttpMethod) -> bool {
    Failure::of(err).is_retryable(method)
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
