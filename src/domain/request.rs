use std::collections::BTreeMap;
use std::fmt;

/// Request parameters keyed by name. Keys are unique and iterate in byte order.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Textual wire form of a parameter value, shared by signing and encoding.
///
/// `null` values are omitted; nested arrays and objects are sent as JSON text.
pub(crate) fn param_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        nested => Some(nested.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether a request with this method may be replayed after a read failure.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Self::Get | Self::Put | Self::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single request is authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthKind {
    /// `Authorization: Bearer` with a freshly minted application JWT.
    Jwt,
    /// `Authorization: Basic base64(api_key:api_secret)`.
    Basic,
    /// `api_key` and `api_secret` injected into the parameters.
    Body,
    /// Same injection as [`AuthKind::Body`]; placement follows the body encoding.
    Query,
    /// `api_key`, `timestamp` and `sig` injected into the parameters.
    Signature,
    /// `Authorization: Bearer` with a caller-supplied OAuth2 token.
    OAuth2Bearer(String),
    None,
}

/// On-wire placement of the parameter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
    QueryString,
}

/// Everything the client needs to send one API call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub host: String,
    pub path: String,
    pub params: Params,
    pub auth: AuthKind,
    pub encoding: BodyEncoding,
}

impl RequestDescriptor {
    /// Start a descriptor with no parameters, JWT auth and a JSON body.
    pub fn new(method: HttpMethod, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            host: host.into(),
            path: path.into(),
            params: Params::new(),
            auth: AuthKind::Jwt,
            encoding: BodyEncoding::Json,
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Insert a single parameter, replacing any previous value under `key`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn auth(mut self, auth: AuthKind) -> Self {
        self.auth = auth;
        self
    }

    pub fn encoding(mut self, encoding: BodyEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}
