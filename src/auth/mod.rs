//! Credential store and the authorization material derived from it.

pub mod jwt;
pub mod signature;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

use crate::client::VonageError;
use crate::domain::{
    ApiKey, ApiSecret, ApplicationId, AuthKind, CredentialsError, Params, PrivateKey,
    SignatureSecret,
};

pub use jwt::{JwtIssuer, validate_token_expiry, verify_webhook_jwt};
pub use signature::{SignatureMethod, Signer};

/// Environment variable holding the account API key.
pub const ENV_API_KEY: &str = "VONAGE_API_KEY";
/// Environment variable holding the account API secret.
pub const ENV_API_SECRET: &str = "VONAGE_API_SECRET";
/// Environment variable holding the signature secret.
pub const ENV_SIGNATURE_SECRET: &str = "VONAGE_SIGNATURE_SECRET";
/// Environment variable naming the signature method.
pub const ENV_SIGNATURE_METHOD: &str = "VONAGE_SIGNATURE_METHOD";

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
/// Validated, immutable set of Vonage credentials.
///
/// Construct it with [`Auth::builder`] or [`Auth::from_env`]. Legal
/// combinations:
/// - `api_key` together with `api_secret` and/or `signature_secret`,
/// - `application_id` together with `private_key`,
/// - both of the above, or nothing at all.
///
/// The `VONAGE_*` environment variables are never read implicitly:
/// [`AuthBuilder::build`] uses only the values set on the builder. Opt in
/// with [`Auth::from_env`] or [`AuthBuilder::with_env_defaults`], where
/// explicitly set values still win.
///
/// ```rust,no_run
/// use vonage_core::Auth;
///
/// let auth = Auth::builder()
///     .signature_secret("from-config")
///     .with_env_defaults()?
///     .build()?;
/// # Ok::<(), vonage_core::CredentialsError>(())
/// ```
pub struct Auth {
    api_key: Option<ApiKey>,
    api_secret: Option<ApiSecret>,
    signature_secret: Option<SignatureSecret>,
    signature_method: SignatureMethod,
    application_id: Option<ApplicationId>,
    private_key: Option<PrivateKey>,
}

impl Auth {
    /// Start building a credential set.
    pub fn builder() -> AuthBuilder {
        AuthBuilder::default()
    }

    /// Build credentials from `VONAGE_API_KEY`, `VONAGE_API_SECRET`,
    /// `VONAGE_SIGNATURE_SECRET` and `VONAGE_SIGNATURE_METHOD`.
    pub fn from_env() -> Result<Self, CredentialsError> {
        AuthBuilder::default().with_env_defaults()?.build()
    }

    /// Account API key, if configured.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// Account API secret, if configured.
    pub fn api_secret(&self) -> Option<&ApiSecret> {
        self.api_secret.as_ref()
    }

    /// Secret used for signed requests and webhooks, if configured.
    pub fn signature_secret(&self) -> Option<&SignatureSecret> {
        self.signature_secret.as_ref()
    }

    /// Digest used with the signature secret (default `md5_hmac`).
    pub fn signature_method(&self) -> SignatureMethod {
        self.signature_method
    }

    /// Application id for JWT auth, if configured.
    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    /// Application private key for JWT auth, if configured.
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// Whether these credentials can authenticate a request of `kind`.
    pub fn supports(&self, kind: &AuthKind) -> bool {
        match kind {
            AuthKind::Jwt => self.application_id.is_some() && self.private_key.is_some(),
            AuthKind::Basic | AuthKind::Body | AuthKind::Query => {
                self.api_key.is_some() && self.api_secret.is_some()
            }
            AuthKind::Signature => self.api_key.is_some() && self.signature_secret.is_some(),
            AuthKind::OAuth2Bearer(_) | AuthKind::None => true,
        }
    }

    /// `Basic base64(api_key:api_secret)`, ready for an `Authorization` header.
    pub fn basic_auth_header(&self) -> Result<String, CredentialsError> {
        let (api_key, api_secret) = self.key_and_secret()?;
        let encoded = BASE64.encode(format!("{}:{}", api_key.as_str(), api_secret.as_str()));
        Ok(format!("Basic {encoded}"))
    }

    /// Mint an application JWT; see [`JwtIssuer::generate`].
    pub fn generate_application_jwt(
        &self,
        extra_claims: Option<&Map<String, Value>>,
    ) -> Result<String, VonageError> {
        JwtIssuer::from_auth(self)?.generate(extra_claims)
    }

    /// Sign `params` with the configured signature secret and method.
    ///
    /// Inserts `timestamp` into `params` when it is absent.
    pub fn sign_params(&self, params: &mut Params) -> Result<String, CredentialsError> {
        let secret = signature::require_secret(self.signature_secret.as_ref())?;
        Ok(Signer::new(secret, self.signature_method).sign(params))
    }

    /// Verify the `sig` entry of signed parameters (e.g. an inbound SMS webhook).
    ///
    /// Without a configured signature secret nothing verifies.
    pub fn verify_signature(&self, params: &Params) -> bool {
        self.signature_secret
            .as_ref()
            .is_some_and(|secret| Signer::new(secret, self.signature_method).verify(params))
    }

    pub(crate) fn key_and_secret(&self) -> Result<(&ApiKey, &ApiSecret), CredentialsError> {
        let api_key = self.api_key.as_ref().ok_or(CredentialsError::MissingApiKey {
            requested_by: ApiSecret::FIELD,
        })?;
        let api_secret = self
            .api_secret
            .as_ref()
            .ok_or(CredentialsError::MissingApiSecret)?;
        Ok((api_key, api_secret))
    }
}

#[derive(Debug, Clone)]
enum PrivateKeySource {
    Pem(Vec<u8>),
    Path(PathBuf),
}

#[derive(Debug, Clone, Default)]
/// Builder for [`Auth`]. Validation happens in [`AuthBuilder::build`].
pub struct AuthBuilder {
    api_key: Option<String>,
    api_secret: Option<String>,
    signature_secret: Option<String>,
    signature_method: Option<SignatureMethod>,
    application_id: Option<String>,
    private_key: Option<PrivateKeySource>,
}

impl AuthBuilder {
    /// Set the account API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the account API secret.
    pub fn api_secret(mut self, api_secret: impl Into<String>) -> Self {
        self.api_secret = Some(api_secret.into());
        self
    }

    /// Set the secret used to sign requests and verify signed webhooks.
    pub fn signature_secret(mut self, signature_secret: impl Into<String>) -> Self {
        self.signature_secret = Some(signature_secret.into());
        self
    }

    /// Set the signature digest (default `md5_hmac`).
    pub fn signature_method(mut self, method: SignatureMethod) -> Self {
        self.signature_method = Some(method);
        self
    }

    /// Set the application id used as the JWT `application_id` claim.
    pub fn application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// Use in-memory PEM bytes as the application private key.
    pub fn private_key_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.private_key = Some(PrivateKeySource::Pem(pem.into()));
        self
    }

    /// Read the application private key from `path` during [`AuthBuilder::build`].
    pub fn private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key = Some(PrivateKeySource::Path(path.into()));
        self
    }

    /// Set the application id and in-memory private key together.
    pub fn application(self, application_id: impl Into<String>, pem: impl Into<Vec<u8>>) -> Self {
        self.application_id(application_id).private_key_pem(pem)
    }

    /// Fill every field that was not set explicitly from `VONAGE_*` variables.
    pub fn with_env_defaults(self) -> Result<Self, CredentialsError> {
        self.with_defaults_from(|name| std::env::var(name).ok())
    }

    fn with_defaults_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialsError> {
        if self.api_key.is_none() {
            self.api_key = lookup(ENV_API_KEY);
        }
        if self.api_secret.is_none() {
            self.api_secret = lookup(ENV_API_SECRET);
        }
        if self.signature_secret.is_none() {
            self.signature_secret = lookup(ENV_SIGNATURE_SECRET);
        }
        if self.signature_method.is_none() {
            if let Some(name) = lookup(ENV_SIGNATURE_METHOD) {
                self.signature_method = Some(name.parse()?);
            }
        }
        Ok(self)
    }

    /// Validate the combination and load the private key.
    pub fn build(self) -> Result<Auth, CredentialsError> {
        let api_key = self.api_key.map(ApiKey::new).transpose()?;
        let api_secret = self.api_secret.map(ApiSecret::new).transpose()?;
        let signature_secret = self.signature_secret.map(SignatureSecret::new).transpose()?;

        if api_key.is_none() {
            if api_secret.is_some() {
                return Err(CredentialsError::MissingApiKey {
                    requested_by: ApiSecret::FIELD,
                });
            }
            if signature_secret.is_some() {
                return Err(CredentialsError::MissingApiKey {
                    requested_by: SignatureSecret::FIELD,
                });
            }
        } else if api_secret.is_none() && signature_secret.is_none() {
            return Err(CredentialsError::MissingApiSecret);
        }

        let (application_id, private_key) = match (self.application_id, self.private_key) {
            (None, None) => (None, None),
            (Some(_), None) => {
                return Err(CredentialsError::UnpairedApplication {
                    missing: PrivateKey::FIELD,
                });
            }
            (None, Some(_)) => {
                return Err(CredentialsError::UnpairedApplication {
                    missing: ApplicationId::FIELD,
                });
            }
            (Some(application_id), Some(source)) => {
                let private_key = match source {
                    PrivateKeySource::Pem(pem) => PrivateKey::from_pem(pem)?,
                    PrivateKeySource::Path(path) => PrivateKey::from_file(path)?,
                };
                (Some(ApplicationId::new(application_id)?), Some(private_key))
            }
        };

        Ok(Auth {
            api_key,
            api_secret,
            signature_secret,
            signature_method: self.signature_method.unwrap_or_default(),
            application_id,
            private_key,
        })
    }
}
