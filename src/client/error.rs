use std::error::Error as StdError;
use std::fmt;

use crate::domain::{CredentialsError, ResponseSnapshot};

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
/// Errors returned by this crate.
///
/// Every failure that originates from an HTTP exchange is a
/// [`VonageError::Http`]; match on [`HttpError::kind`] to narrow it down.
pub enum VonageError {
    /// The credential combination is illegal or a private key is unusable.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(#[from] CredentialsError),

    /// No application key pair is configured, or signing the token failed.
    #[error("JWT generation failed: {reason}")]
    JwtGenerationFailed {
        reason: String,
        #[source]
        source: Option<jsonwebtoken::errors::Error>,
    },

    /// A webhook token is malformed or uses an unexpected algorithm.
    #[error("invalid webhook token: {0}")]
    WebhookSignatureInvalid(#[source] jsonwebtoken::errors::Error),

    /// Non-2xx response, transport failure or undecodable response.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl VonageError {
    pub(crate) fn jwt(
        reason: impl Into<String>,
        source: Option<jsonwebtoken::errors::Error>,
    ) -> Self {
        Self::JwtGenerationFailed {
            reason: reason.into(),
            source,
        }
    }

    /// The HTTP error kind, if this error came from an HTTP exchange.
    pub fn http_kind(&self) -> Option<HttpErrorKind> {
        match self {
            Self::Http(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// The response that caused this error, when one was received.
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            Self::Http(err) => err.response(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// Any HTTP failure without a narrower kind, including transport errors.
    RequestFailed,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 429
    RateLimited,
    /// 5xx
    ServerError,
}

impl HttpErrorKind {
    /// Kind for a non-2xx status.
    pub fn for_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::RequestFailed,
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequestFailed => "HTTP request failed",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::RateLimited => "rate limited",
            Self::ServerError => "server error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
/// Common type of every HTTP-originated failure.
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
    response: Option<ResponseSnapshot>,
    #[source]
    source: Option<BoxError>,
}

impl HttpError {
    /// Classify a non-2xx response, keeping it as the error's snapshot.
    pub(crate) fn from_response(response: ResponseSnapshot) -> Self {
        Self {
            kind: HttpErrorKind::for_status(response.status),
            message: crate::transport::format_error_message(&response),
            response: Some(response),
            source: None,
        }
    }

    /// A request that never produced a response (DNS, connect, TLS, timeout).
    pub(crate) fn transport(url: &str, source: BoxError) -> Self {
        Self {
            kind: HttpErrorKind::RequestFailed,
            message: format!("request to {url} failed: {source}"),
            response: None,
            source: Some(source),
        }
    }

    pub(crate) fn request_failed(
        message: impl Into<String>,
        response: Option<ResponseSnapshot>,
        source: Option<BoxError>,
    ) -> Self {
        Self {
            kind: HttpErrorKind::RequestFailed,
            message: message.into(),
            response,
            source,
        }
    }

    pub fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }

    pub fn response(&self) -> Option<&ResponseSnapshot> {
        self.response.as_ref()
    }
}
