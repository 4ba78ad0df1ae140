//! In-memory stand-in for the HTTP seam.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::error::BoxError;
use super::http::{BoxFuture, ChunkStream, HttpRequest, HttpTransport, StreamingResponse};
use super::{
    DEFAULT_API_HOST, DEFAULT_POOL_SIZE, DEFAULT_REST_HOST, DEFAULT_VIDEO_HOST, VonageClient,
};
use crate::auth::Auth;
use crate::domain::ResponseSnapshot;
use crate::transport;

#[derive(Debug, Clone)]
enum Canned {
    Response {
        status: u16,
        content_type: Option<&'static str>,
        body: Bytes,
        /// Error returned by the body stream after the first chunk.
        broken_after_first_chunk: bool,
    },
    Failure(&'static str),
}

#[derive(Debug, Clone)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeTransportState>>,
}

#[derive(Debug)]
struct FakeTransportState {
    requests: Vec<HttpRequest>,
    canned: Canned,
}

impl FakeTransport {
    fn with(canned: Canned) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeTransportState {
                requests: Vec::new(),
                canned,
            })),
        }
    }

    fn response(status: u16, content_type: Option<&'static str>, body: impl Into<Bytes>) -> Self {
        Self::with(Canned::Response {
            status,
            content_type,
            body: body.into(),
            broken_after_first_chunk: false,
        })
    }

    pub fn json(status: u16, body: &'static str) -> Self {
        Self::response(status, Some("application/json; charset=utf-8"), body)
    }

    pub fn text(status: u16, body: &'static str) -> Self {
        Self::response(status, Some("text/plain"), body)
    }

    pub fn binary(status: u16, body: impl Into<Bytes>) -> Self {
        Self::response(status, Some("audio/mpeg"), body)
    }

    pub fn empty(status: u16) -> Self {
        Self::response(status, None, Bytes::new())
    }

    /// A response whose body stream fails after delivering its first chunk.
    pub fn broken_stream(status: u16, body: impl Into<Bytes>) -> Self {
        Self::with(Canned::Response {
            status,
            content_type: Some("audio/mpeg"),
            body: body.into(),
            broken_after_first_chunk: true,
        })
    }

    /// Every request fails before a response arrives.
    pub fn failing(message: &'static str) -> Self {
        Self::with(Canned::Failure(message))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    fn respond(&self, request: &HttpRequest) -> Canned {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        state.canned.clone()
    }
}

fn headers(content_type: Option<&'static str>) -> Vec<(String, String)> {
    content_type
        .map(|value| vec![("content-type".to_owned(), value.to_owned())])
        .unwrap_or_default()
}

struct FakeChunks(VecDeque<Result<Bytes, &'static str>>);

impl ChunkStream for FakeChunks {
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, BoxError>> {
        Box::pin(async move {
            match self.0.pop_front() {
                Some(Ok(chunk)) => Ok(Some(chunk)),
                Some(Err(message)) => Err(message.into()),
                None => Ok(None),
            }
        })
    }
}

impl HttpTransport for FakeTransport {
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<ResponseSnapshot, BoxError>> {
        Box::pin(async move {
            match self.respond(request) {
                Canned::Response {
                    status,
                    content_type,
                    body,
                    ..
                } => Ok(ResponseSnapshot {
                    status,
                    url: request.url.to_string(),
                    headers: headers(content_type),
                    body,
                }),
                Canned::Failure(message) => Err(message.into()),
            }
        })
    }

    fn open<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<StreamingResponse, BoxError>> {
        Box::pin(async move {
            match self.respond(request) {
                Canned::Response {
                    status,
                    content_type,
                    body,
                    broken_after_first_chunk,
                } => {
                    let mut chunks = body
                        .chunks(4)
                        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                        .collect::<VecDeque<_>>();
                    if broken_after_first_chunk {
                        chunks.truncate(1);
                        chunks.push_back(Err("connection reset by peer"));
                    }
                    Ok(StreamingResponse {
                        status,
                        url: request.url.to_string(),
                        headers: headers(content_type),
                        body: Box::new(FakeChunks(chunks)),
                    })
                }
                Canned::Failure(message) => Err(message.into()),
            }
        })
    }
}

pub(crate) fn make_client(auth: Auth, transport: FakeTransport) -> VonageClient {
    VonageClient {
        auth: Arc::new(auth),
        api_host: DEFAULT_API_HOST.to_owned(),
        rest_host: DEFAULT_REST_HOST.to_owned(),
        video_host: DEFAULT_VIDEO_HOST.to_owned(),
        pool_connections: DEFAULT_POOL_SIZE,
        pool_maxsize: DEFAULT_POOL_SIZE,
        user_agent: transport::default_user_agent(None),
        http: Arc::new(transport),
        snapshots: Arc::default(),
        diagnostics: None,
    }
}
