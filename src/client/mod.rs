//! Client layer: attaches authorization, dispatches through the HTTP seam,
//! classifies responses and keeps the last exchange for diagnostics.

mod download;
mod error;
mod http;
#[cfg(test)]
mod testing;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::{Auth, signature};
use crate::domain::{
    ApiKey, ApiSecret, AuthKind, BodyEncoding, CredentialsError, HttpMethod, Params,
    RequestDescriptor, RequestSnapshot, ResponseBody, ResponseSnapshot, SignatureSecret,
};
use crate::transport;

pub use error::{HttpError, HttpErrorKind, VonageError};
use http::{HttpRequest, HttpTransport, ReqwestTransport, TransportOptions};

/// Host serving the newer (JWT-authenticated) APIs.
pub const DEFAULT_API_HOST: &str = "api.nexmo.com";
/// Host serving the legacy REST APIs (SMS, account, numbers).
pub const DEFAULT_REST_HOST: &str = "rest.nexmo.com";
/// Host serving the video APIs.
pub const DEFAULT_VIDEO_HOST: &str = "video.api.vonage.com";

const DEFAULT_POOL_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_MAX_RETRIES: u32 = 3;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Receives every request/response pair the client exchanges.
///
/// `response` is `None` when the request failed before a response arrived.
pub trait DiagnosticsSink: fmt::Debug + Send + Sync {
    fn record(&self, request: &RequestSnapshot, response: Option<&ResponseSnapshot>);
}

#[derive(Debug, Default)]
struct Snapshots {
    last_request: Option<RequestSnapshot>,
    last_response: Option<ResponseSnapshot>,
}

#[derive(Debug, Clone)]
/// Builder for [`VonageClient`].
///
/// Use this when you need to customize hosts, timeout, pooling, retries or
/// the user agent.
pub struct VonageClientBuilder {
    auth: Auth,
    api_host: String,
    rest_host: String,
    video_host: String,
    timeout: Option<Duration>,
    pool_connections: NonZeroUsize,
    pool_maxsize: NonZeroUsize,
    max_retries: u32,
    app_info: Option<(String, String)>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl VonageClientBuilder {
    /// Create a builder with the default hosts, no timeout, pools of 10 and
    /// 3 retries.
    pub fn new(auth: Auth) -> Self {
        Self {
            auth,
            api_host: DEFAULT_API_HOST.to_owned(),
            rest_host: DEFAULT_REST_HOST.to_owned(),
            video_host: DEFAULT_VIDEO_HOST.to_owned(),
            timeout: None,
            pool_connections: DEFAULT_POOL_SIZE,
            pool_maxsize: DEFAULT_POOL_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            app_info: None,
            diagnostics: None,
        }
    }

    /// Override the host serving the JWT-authenticated APIs (default `api.nexmo.com`).
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into();
        self
    }

    /// Override the host serving the legacy REST APIs (default `rest.nexmo.com`).
    pub fn rest_host(mut self, host: impl Into<String>) -> Self {
        self.rest_host = host.into();
        self
    }

    /// Override the host serving the video APIs (default `video.api.vonage.com`).
    pub fn video_host(mut self, host: impl Into<String>) -> Self {
        self.video_host = host.into();
        self
    }

    /// Wall-clock deadline for each request, including reading the body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Number of hosts to keep pooled connections for.
    ///
    /// reqwest pools per host without a global cap, so this is informational.
    pub fn pool_connections(mut self, pool_connections: NonZeroUsize) -> Self {
        self.pool_connections = pool_connections;
        self
    }

    /// Idle connections kept per host.
    pub fn pool_maxsize(mut self, pool_maxsize: NonZeroUsize) -> Self {
        self.pool_maxsize = pool_maxsize;
        self
    }

    /// How often a transport-level failure is retried. HTTP error statuses
    /// are never retried.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Append `name/version` to the `User-Agent` header.
    pub fn app_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.app_info = Some((name.into(), version.into()));
        self
    }

    /// Report every request/response pair to `sink`, in addition to the
    /// last-exchange snapshots.
    pub fn diagnostics_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Build a [`VonageClient`].
    pub fn build(self) -> Result<VonageClient, VonageError> {
        let http = ReqwestTransport::new(self.transport_options()).map_err(|err| {
            HttpError::request_failed("failed to build HTTP client", None, Some(err.into()))
        })?;
        Ok(self.finish(http))
    }

    fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: self.timeout,
            pool_maxsize: self.pool_maxsize,
            max_retries: self.max_retries,
        }
    }

    fn finish(self, http: ReqwestTransport) -> VonageClient {
        debug!(
            pool_connections = self.pool_connections.get(),
            pool_maxsize = self.pool_maxsize.get(),
            max_retries = self.max_retries,
            "built Vonage HTTP client"
        );
        let user_agent = transport::default_user_agent(
            self.app_info
                .as_ref()
                .map(|(name, version)| (name.as_str(), version.as_str())),
        );
        VonageClient {
            auth: Arc::new(self.auth),
            api_host: self.api_host,
            rest_host: self.rest_host,
            video_host: self.video_host,
            pool_connections: self.pool_connections,
            pool_maxsize: self.pool_maxsize,
            user_agent,
            http: Arc::new(http),
            snapshots: Arc::default(),
            diagnostics: self.diagnostics,
        }
    }
}

#[derive(Clone)]
/// Authenticated HTTP client shared by every product API.
///
/// The client is cheap to clone and safe to use from many tasks at once.
/// Clones share the connection pool and the last-exchange snapshots.
pub struct VonageClient {
    auth: Arc<Auth>,
    api_host: String,
    rest_host: String,
    video_host: String,
    pool_connections: NonZeroUsize,
    pool_maxsize: NonZeroUsize,
    user_agent: String,
    http: Arc<dyn HttpTransport>,
    snapshots: Arc<Mutex<Snapshots>>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl VonageClient {
    /// Create a client with the default options.
    ///
    /// For more customization, use [`VonageClient::builder`].
    ///
    /// # Panics
    ///
    /// Under the same conditions as `reqwest::Client::new`, i.e. when the
    /// TLS backend cannot be initialized.
    pub fn new(auth: Auth) -> Self {
        let builder = VonageClientBuilder::new(auth);
        let http = ReqwestTransport::new(builder.transport_options()).unwrap_or_else(|err| {
            warn!(error = %err, "falling back to reqwest's default HTTP client");
            ReqwestTransport::with_client(reqwest::Client::new(), builder.max_retries)
        });
        builder.finish(http)
    }

    /// Start building a client with custom settings.
    pub fn builder(auth: Auth) -> VonageClientBuilder {
        VonageClientBuilder::new(auth)
    }

    /// Host used for JWT-authenticated APIs.
    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Host used for the legacy REST APIs.
    pub fn rest_host(&self) -> &str {
        &self.rest_host
    }

    /// Host used for the video APIs.
    pub fn video_host(&self) -> &str {
        &self.video_host
    }

    /// Number of hosts connections are pooled for, as configured.
    pub fn pool_connections(&self) -> NonZeroUsize {
        self.pool_connections
    }

    /// Idle connections kept per host.
    pub fn pool_maxsize(&self) -> NonZeroUsize {
        self.pool_maxsize
    }

    /// Credentials this client authenticates with.
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// `User-Agent` header sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Append `token` to the `User-Agent` sent by this client (not its clones).
    pub fn append_to_user_agent(&mut self, token: &str) {
        transport::append_user_agent(&mut self.user_agent, token);
    }

    /// The request of the most recent exchange.
    ///
    /// With concurrent calls the "most recent" one is whichever finished
    /// last; serialize calls when you rely on this value.
    pub fn last_request(&self) -> Option<RequestSnapshot> {
        self.lock_snapshots().last_request.clone()
    }

    /// The response of the most recent exchange; `None` when it failed
    /// without a response. Same caveats as [`VonageClient::last_request`].
    pub fn last_response(&self) -> Option<ResponseSnapshot> {
        self.lock_snapshots().last_response.clone()
    }

    /// Mint an application JWT; see [`Auth::generate_application_jwt`].
    pub fn generate_application_jwt(
        &self,
        extra_claims: Option<&Map<String, Value>>,
    ) -> Result<String, VonageError> {
        self.auth.generate_application_jwt(extra_claims)
    }

    /// `Authorization` value for Basic auth; see [`Auth::basic_auth_header`].
    pub fn basic_auth_header(&self) -> Result<String, VonageError> {
        Ok(self.auth.basic_auth_header()?)
    }

    /// Sign `params` in place; see [`Auth::sign_params`].
    pub fn sign_params(&self, params: &mut Params) -> Result<String, VonageError> {
        Ok(self.auth.sign_params(params)?)
    }

    /// Verify a signed parameter map; see [`Auth::verify_signature`].
    pub fn verify_signature(&self, params: &Params) -> bool {
        self.auth.verify_signature(params)
    }

    /// Verify an HS256 webhook token; see [`crate::auth::verify_webhook_jwt`].
    pub fn verify_webhook_jwt(&self, token: &str, secret: &str) -> Result<bool, VonageError> {
        crate::auth::verify_webhook_jwt(token, secret)
    }

    /// `GET` with parameters in the query string.
    pub async fn get(
        &self,
        host: &str,
        path: &str,
        params: Params,
        auth: AuthKind,
    ) -> Result<Option<ResponseBody>, VonageError> {
        self.request(
            RequestDescriptor::new(HttpMethod::Get, host, path)
                .params(params)
                .auth(auth)
                .encoding(BodyEncoding::QueryString),
        )
        .await
    }

    /// `POST` with a JSON body.
    pub async fn post(
        &self,
        host: &str,
        path: &str,
        params: Params,
        auth: AuthKind,
    ) -> Result<Option<ResponseBody>, VonageError> {
        self.request(
            RequestDescriptor::new(HttpMethod::Post, host, path)
                .params(params)
                .auth(auth),
        )
        .await
    }

    /// `PUT` with a JSON body.
    pub async fn put(
        &self,
        host: &str,
        path: &str,
        params: Params,
        auth: AuthKind,
    ) -> Result<Option<ResponseBody>, VonageError> {
        self.request(
            RequestDescriptor::new(HttpMethod::Put, host, path)
                .params(params)
                .auth(auth),
        )
        .await
    }

    /// `PATCH` with a JSON body.
    pub async fn patch(
        &self,
        host: &str,
        path: &str,
        params: Params,
        auth: AuthKind,
    ) -> Result<Option<ResponseBody>, VonageError> {
        self.request(
            RequestDescriptor::new(HttpMethod::Patch, host, path)
                .params(params)
                .auth(auth),
        )
        .await
    }

    /// `DELETE` with parameters in the query string.
    pub async fn delete(
        &self,
        host: &str,
        path: &str,
        params: Params,
        auth: AuthKind,
    ) -> Result<Option<ResponseBody>, VonageError> {
        self.request(
            RequestDescriptor::new(HttpMethod::Delete, host, path)
                .params(params)
                .auth(auth)
                .encoding(BodyEncoding::QueryString),
        )
        .await
    }

    /// Send one API call.
    ///
    /// Steps: attach authorization, place the parameters per the encoding,
    /// dispatch (retrying transport failures), classify the response, record
    /// the exchange.
    ///
    /// Errors:
    /// - [`VonageError::InvalidCredentials`] / [`VonageError::JwtGenerationFailed`]
    ///   when the credentials cannot authenticate the requested kind,
    /// - [`VonageError::Http`] for non-2xx responses and transport failures.
    pub async fn request(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<Option<ResponseBody>, VonageError> {
        let RequestDescriptor {
            method,
            host,
            path,
            mut params,
            auth,
            encoding,
        } = descriptor;

        let mut headers = self.base_headers();
        self.attach_auth(&auth, &mut params, &mut headers)?;

        let (url, body) = match encoding {
            BodyEncoding::Json => {
                let body = if params.is_empty() {
                    Bytes::new()
                } else {
                    headers.push(("Content-Type".to_owned(), CONTENT_TYPE_JSON.to_owned()));
                    let encoded = transport::encode_json(&params).map_err(|err| {
                        HttpError::request_failed(
                            "failed to encode JSON body",
                            None,
                            Some(err.into()),
                        )
                    })?;
                    Bytes::from(encoded)
                };
                (build_url(&host, &path, None)?, body)
            }
            BodyEncoding::Form => {
                headers.push(("Content-Type".to_owned(), CONTENT_TYPE_FORM.to_owned()));
                let body = Bytes::from(transport::encode_form(&params));
                (build_url(&host, &path, None)?, body)
            }
            BodyEncoding::QueryString => (build_url(&host, &path, Some(&params))?, Bytes::new()),
        };

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let response = match self.http.execute(&request).await {
            Ok(response) => response,
            Err(source) => {
                let err = HttpError::transport(request.url.as_str(), source);
                self.record(request.snapshot(), None);
                return Err(err.into());
            }
        };

        debug!(status = response.status, url = %response.url, "classifying response");
        let outcome = transport::classify_response(response.clone());
        self.record(request.snapshot(), Some(response));
        Ok(outcome?)
    }

    fn base_headers(&self) -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_owned(), self.user_agent.clone()),
            ("Accept".to_owned(), CONTENT_TYPE_JSON.to_owned()),
        ]
    }

    fn attach_auth(
        &self,
        kind: &AuthKind,
        params: &mut Params,
        headers: &mut Vec<(String, String)>,
    ) -> Result<(), VonageError> {
        match kind {
            AuthKind::Jwt => {
                let token = self.auth.generate_application_jwt(None)?;
                headers.push(bearer(&token));
            }
            AuthKind::Basic => {
                headers.push(("Authorization".to_owned(), self.auth.basic_auth_header()?));
            }
            AuthKind::Body | AuthKind::Query => {
                let (api_key, api_secret) = self.auth.key_and_secret()?;
                params.insert(ApiKey::FIELD.to_owned(), Value::from(api_key.as_str()));
                params.insert(ApiSecret::FIELD.to_owned(), Value::from(api_secret.as_str()));
            }
            AuthKind::Signature => {
                let api_key = self
                    .auth
                    .api_key()
                    .ok_or(CredentialsError::MissingApiKey {
                        requested_by: SignatureSecret::FIELD,
                    })?;
                params.insert(ApiKey::FIELD.to_owned(), Value::from(api_key.as_str()));
                let sig = self.auth.sign_params(params)?;
                params.insert(signature::SIGNATURE_FIELD.to_owned(), Value::from(sig));
            }
            AuthKind::OAuth2Bearer(token) => headers.push(bearer(token)),
            AuthKind::None => {}
        }
        Ok(())
    }

    fn record(&self, request: RequestSnapshot, response: Option<ResponseSnapshot>) {
        if let Some(sink) = &self.diagnostics {
            sink.record(&request, response.as_ref());
        }
        let mut snapshots = self.lock_snapshots();
        snapshots.last_request = Some(request);
        snapshots.last_response = response;
    }

    fn lock_snapshots(&self) -> std::sync::MutexGuard<'_, Snapshots> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_configured_host(&self, host: &str) -> bool {
        [&self.api_host, &self.rest_host, &self.video_host]
            .into_iter()
            .any(|configured| {
                let configured = configured.split(':').next().unwrap_or_default();
                configured.eq_ignore_ascii_case(host)
            })
    }
}

fn bearer(token: &str) -> (String, String) {
    ("Authorization".to_owned(), format!("Bearer {token}"))
}

fn build_url(host: &str, path: &str, query: Option<&Params>) -> Result<url::Url, HttpError> {
    transport::build_url(host, path, query).map_err(|err| {
        HttpError::request_failed(
            format!("invalid request URL https://{host}{path}"),
            None,
            Some(err.into()),
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::{FakeTransport, make_client};
    use super::*;
    use crate::auth::{JwtIssuer, SignatureMethod, Signer};

    const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/private.key");
    const PUBLIC_KEY: &[u8] = include_bytes!("../../tests/fixtures/public.key");

    fn basic_auth() -> Auth {
        Auth::builder()
            .api_key("akey")
            .api_secret("asec")
            .build()
            .unwrap()
    }

    fn form_params(body: &[u8]) -> Params {
        url::form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), Value::from(value.into_owned())))
            .collect()
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, Option<u16>)>>,
    }

    impl DiagnosticsSink for RecordingSink {
        fn record(&self, request: &RequestSnapshot, response: Option<&ResponseSnapshot>) {
            self.calls
                .lock()
                .unwrap()
                .push((request.url.clone(), response.map(|it| it.status)));
        }
    }

    #[tokio::test]
    async fn basic_get_sends_basic_header_and_decodes_json() {
        let transport = FakeTransport::json(200, r#"{"value":29.18,"autoReload":false}"#);
        let client = make_client(basic_auth(), transport.clone());

        let body = client
            .get(
                DEFAULT_REST_HOST,
                "/account/get-balance",
                Params::new(),
                AuthKind::Basic,
            )
            .await
            .unwrap();
        assert_eq!(
            body,
            Some(ResponseBody::Json(json!({"value": 29.18, "autoReload": false})))
        );

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.url.as_str(),
            "https://rest.nexmo.com/account/get-balance"
        );
        assert_eq!(
            request.header("Authorization"),
            Some("Basic YWtleTphc2Vj")
        );
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn signature_post_form_is_verifiable_by_receiver() {
        let auth = Auth::builder()
            .api_key("k")
            .signature_secret("s")
            .signature_method(SignatureMethod::Sha256Hmac)
            .build()
            .unwrap();
        let transport = FakeTransport::json(200, r#"{"message-count":"1"}"#);
        let client = make_client(auth, transport.clone());

        let descriptor = RequestDescriptor::new(HttpMethod::Post, DEFAULT_REST_HOST, "/sms/json")
            .param("to", "1")
            .param("from", "x")
            .param("text", "hi")
            .auth(AuthKind::Signature)
            .encoding(BodyEncoding::Form);
        client.request(descriptor).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        let sent = form_params(&request.body);
        assert_eq!(sent["api_key"], "k");
        assert!(sent.contains_key("timestamp"));
        assert!(sent.contains_key("sig"));

        let secret = SignatureSecret::new("s").unwrap();
        let receiver = Signer::new(&secret, SignatureMethod::Sha256Hmac);
        assert!(receiver.verify(&sent));
    }

    #[tokio::test]
    async fn jwt_post_json_carries_fresh_application_token() {
        let auth = Auth::builder()
            .application("app1", PRIVATE_KEY.to_vec())
            .build()
            .unwrap();
        let transport = FakeTransport::json(201, r#"{"uuid":"call-1"}"#);
        let client = make_client(auth, transport.clone());

        let mut params = Params::new();
        params.insert("to".to_owned(), json!([{"type": "phone", "number": "447700900000"}]));
        params.insert("ncco".to_owned(), json!([{"action": "talk", "text": "hi"}]));
        let body = client
            .post(DEFAULT_API_HOST, "/v1/calls", params.clone(), AuthKind::Jwt)
            .await
            .unwrap();
        assert_eq!(body.unwrap().as_json().unwrap()["uuid"], "call-1");

        let request = transport.last_request().unwrap();
        assert_eq!(request.header("content-type"), Some("application/json"));
        let sent: Params = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(sent, params);

        let token = request
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap();
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = false;
        let claims = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &jsonwebtoken::DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap(),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(claims["application_id"], "app1");
        let iat = claims["iat"].as_u64().unwrap();
        let exp = claims["exp"].as_u64().unwrap();
        assert!(exp > iat && exp - iat <= 900);
    }

    #[tokio::test]
    async fn jwt_is_minted_per_request() {
        let auth = Auth::builder()
            .application("app1", PRIVATE_KEY.to_vec())
            .build()
            .unwrap();
        let transport = FakeTransport::empty(204);
        let client = make_client(auth, transport.clone());

        for _ in 0..2 {
            client
                .delete(DEFAULT_API_HOST, "/v1/calls/abc", Params::new(), AuthKind::Jwt)
                .await
                .unwrap();
        }
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_ne!(
            requests[0].header("authorization"),
            requests[1].header("authorization")
        );
    }

    #[tokio::test]
    async fn jwt_without_application_fails_before_sending() {
        let transport = FakeTransport::empty(204);
        let client = make_client(basic_auth(), transport.clone());

        let err = client
            .post(DEFAULT_API_HOST, "/v1/calls", Params::new(), AuthKind::Jwt)
            .await
            .unwrap_err();
        assert!(matches!(err, VonageError::JwtGenerationFailed { .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn body_auth_injects_key_and_secret_into_json() {
        let transport = FakeTransport::json(200, "{}");
        let client = make_client(basic_auth(), transport.clone());

        let descriptor =
            RequestDescriptor::new(HttpMethod::Post, DEFAULT_API_HOST, "/verify/json")
                .param("number", "447700900000")
                .auth(AuthKind::Body);
        client.request(descriptor).await.unwrap();

        let sent: Params = serde_json::from_slice(&transport.last_request().unwrap().body).unwrap();
        assert_eq!(sent["api_key"], "akey");
        assert_eq!(sent["api_secret"], "asec");
        assert_eq!(sent["number"], "447700900000");
    }

    #[tokio::test]
    async fn query_auth_with_query_encoding_puts_credentials_in_url() {
        let transport = FakeTransport::json(200, "{}");
        let client = make_client(basic_auth(), transport.clone());

        let descriptor = RequestDescriptor::new(HttpMethod::Get, DEFAULT_REST_HOST, "/ni/basic/json")
            .param("number", "447700900000")
            .auth(AuthKind::Query)
            .encoding(BodyEncoding::QueryString);
        client.request(descriptor).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://rest.nexmo.com/ni/basic/json?api_key=akey&api_secret=asec&number=447700900000"
        );
        assert!(request.body.is_empty());
        assert!(request.header("authorization").is_none());
    }

    #[tokio::test]
    async fn oauth2_bearer_uses_caller_token() {
        let transport = FakeTransport::json(200, "{}");
        let client = make_client(Auth::builder().build().unwrap(), transport.clone());

        client
            .get(
                DEFAULT_API_HOST,
                "/v1/oauth",
                Params::new(),
                AuthKind::OAuth2Bearer("tok-123".to_owned()),
            )
            .await
            .unwrap();
        assert_eq!(
            transport.last_request().unwrap().header("authorization"),
            Some("Bearer tok-123")
        );
    }

    #[tokio::test]
    async fn none_auth_adds_nothing() {
        let transport = FakeTransport::json(200, "{}");
        let client = make_client(basic_auth(), transport.clone());

        client
            .get(DEFAULT_API_HOST, "/ping", Params::new(), AuthKind::None)
            .await
            .unwrap();
        let request = transport.last_request().unwrap();
        assert!(request.header("authorization").is_none());
        assert_eq!(request.url.as_str(), "https://api.nexmo.com/ping");
    }

    #[tokio::test]
    async fn missing_credentials_for_basic_are_reported() {
        let transport = FakeTransport::json(200, "{}");
        let client = make_client(Auth::builder().build().unwrap(), transport.clone());

        let err = client
            .get(DEFAULT_REST_HOST, "/account/get-balance", Params::new(), AuthKind::Basic)
            .await
            .unwrap_err();
        assert!(matches!(err, VonageError::InvalidCredentials(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn responses_are_classified() {
        let cases = [
            (401, HttpErrorKind::Unauthorized),
            (403, HttpErrorKind::Forbidden),
            (404, HttpErrorKind::NotFound),
            (429, HttpErrorKind::RateLimited),
            (500, HttpErrorKind::ServerError),
            (418, HttpErrorKind::RequestFailed),
        ];
        for (status, kind) in cases {
            let client = make_client(basic_auth(), FakeTransport::text(status, "nope"));
            let err = client
                .get(DEFAULT_REST_HOST, "/x", Params::new(), AuthKind::Basic)
                .await
                .unwrap_err();
            assert_eq!(err.http_kind(), Some(kind), "{status}");
            assert_eq!(err.response().unwrap().status, status);
        }
    }

    #[tokio::test]
    async fn no_content_and_plain_text_bodies() {
        let client = make_client(basic_auth(), FakeTransport::json(204, r#"{"ignored":1}"#));
        let body = client
            .delete(DEFAULT_API_HOST, "/v1/x", Params::new(), AuthKind::Basic)
            .await
            .unwrap();
        assert_eq!(body, None);

        let client = make_client(basic_auth(), FakeTransport::text(200, "plain"));
        let body = client
            .get(DEFAULT_API_HOST, "/v1/x", Params::new(), AuthKind::Basic)
            .await
            .unwrap();
        assert_eq!(body, Some(ResponseBody::Bytes(Bytes::from_static(b"plain"))));
    }

    #[tokio::test]
    async fn rate_limit_problem_document_is_summarised() {
        let transport = FakeTransport::json(
            429,
            r#"{"title":"Rate Limit Hit","detail":"Slow down","type":"about:blank"}"#,
        );
        let client = make_client(basic_auth(), transport);

        let err = client
            .get(DEFAULT_API_HOST, "/v2/users", Params::new(), AuthKind::Basic)
            .await
            .unwrap_err();
        let VonageError::Http(http) = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(http.kind(), HttpErrorKind::RateLimited);
        assert_eq!(http.status(), Some(429));
        assert!(err.to_string().contains("Rate Limit Hit: Slow down (about:blank)"));
    }

    #[tokio::test]
    async fn snapshots_track_last_exchange() {
        let transport = FakeTransport::json(200, r#"{"ok":true}"#);
        let client = make_client(basic_auth(), transport);
        assert!(client.last_request().is_none());
        assert!(client.last_response().is_none());

        client
            .get(DEFAULT_REST_HOST, "/account/get-balance", Params::new(), AuthKind::Basic)
            .await
            .unwrap();

        let request = client.last_request().unwrap();
        assert_eq!(request.url, "https://rest.nexmo.com/account/get-balance");
        let response = client.last_response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from_static(br#"{"ok":true}"#));
    }

    #[tokio::test]
    async fn snapshots_are_kept_for_error_responses() {
        let client = make_client(basic_auth(), FakeTransport::text(500, "boom"));
        let _ = client
            .get(DEFAULT_REST_HOST, "/x", Params::new(), AuthKind::Basic)
            .await;
        assert_eq!(client.last_response().unwrap().status, 500);
    }

    #[tokio::test]
    async fn transport_failure_has_no_response_snapshot() {
        let client = make_client(basic_auth(), FakeTransport::failing("operation timed out"));

        let err = client
            .get(DEFAULT_REST_HOST, "/x", Params::new(), AuthKind::Basic)
            .await
            .unwrap_err();
        assert_eq!(err.http_kind(), Some(HttpErrorKind::RequestFailed));
        assert!(err.response().is_none());
        assert!(err.to_string().contains("operation timed out"));
        assert!(client.last_request().is_some());
        assert!(client.last_response().is_none());
    }

    #[tokio::test]
    async fn diagnostics_sink_sees_every_exchange() {
        let sink = Arc::new(RecordingSink::default());
        let mut client = make_client(basic_auth(), FakeTransport::text(404, ""));
        client.diagnostics = Some(sink.clone());

        let _ = client
            .get(DEFAULT_REST_HOST, "/missing", Params::new(), AuthKind::Basic)
            .await;
        let calls = sink.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("https://rest.nexmo.com/missing".to_owned(), Some(404))]
        );
    }

    #[tokio::test]
    async fn user_agent_is_sent_and_extendable() {
        let transport = FakeTransport::json(200, "{}");
        let mut client = make_client(basic_auth(), transport.clone());
        client.append_to_user_agent("my-integration/2.0");

        client
            .get(DEFAULT_API_HOST, "/x", Params::new(), AuthKind::None)
            .await
            .unwrap();
        let user_agent = transport
            .last_request()
            .unwrap()
            .header("user-agent")
            .map(str::to_owned)
            .unwrap();
        assert!(user_agent.starts_with("vonage-rust-sdk/"));
        assert!(user_agent.ends_with(" my-integration/2.0"));
    }

    #[test]
    fn builder_overrides_are_applied() {
        let client = VonageClient::builder(basic_auth())
            .api_host("api-eu.vonage.com")
            .rest_host("rest-eu.vonage.com")
            .video_host("video.eu.vonage.com")
            .timeout(Duration::from_secs(5))
            .pool_connections(NonZeroUsize::new(2).unwrap())
            .pool_maxsize(NonZeroUsize::new(4).unwrap())
            .max_retries(0)
            .app_info("my-app", "1.0.0")
            .build()
            .unwrap();
        assert_eq!(client.api_host(), "api-eu.vonage.com");
        assert_eq!(client.rest_host(), "rest-eu.vonage.com");
        assert_eq!(client.video_host(), "video.eu.vonage.com");
        assert!(client.user_agent().ends_with(" my-app/1.0.0"));
        assert_eq!(client.pool_connections().get(), 2);
        assert_eq!(client.pool_maxsize().get(), 4);
    }

    #[test]
    fn new_and_default_builder_agree() {
        let client = VonageClient::new(basic_auth());
        let built = VonageClient::builder(basic_auth()).build().unwrap();
        assert_eq!(client.pool_maxsize(), DEFAULT_POOL_SIZE);
        assert_eq!(client.pool_connections(), DEFAULT_POOL_SIZE);
        assert_eq!(client.pool_maxsize(), built.pool_maxsize());
        assert_eq!(client.user_agent(), built.user_agent());
    }

    #[test]
    fn defaults_use_vendor_hosts() {
        let client = VonageClient::new(basic_auth());
        assert_eq!(client.api_host(), "api.nexmo.com");
        assert_eq!(client.rest_host(), "rest.nexmo.com");
        assert_eq!(client.video_host(), "video.api.vonage.com");
        assert!(client.last_request().is_none());
    }

    #[test]
    fn helper_methods_delegate_to_credentials() {
        let auth = Auth::builder()
            .api_key("akey")
            .api_secret("asec")
            .signature_secret("s")
            .application("app1", PRIVATE_KEY.to_vec())
            .build()
            .unwrap();
        let client = VonageClient::new(auth);

        assert_eq!(client.basic_auth_header().unwrap(), "Basic YWtleTphc2Vj");
        assert!(client.generate_application_jwt(None).is_ok());
        assert!(JwtIssuer::from_auth(client.auth()).is_ok());

        let mut params = Params::new();
        params.insert("text".to_owned(), json!("hi"));
        let sig = client.sign_params(&mut params).unwrap();
        params.insert("sig".to_owned(), json!(sig));
        assert!(client.verify_signature(&params));
    }
}
