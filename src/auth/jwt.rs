//! Application JWTs (RS256) and webhook token verification (HS256).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::{Auth, unix_now};
use crate::client::VonageError;
use crate::domain::{ApplicationId, PrivateKey};

/// Lifetime of a minted token when the caller does not set `exp`.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 900;
/// Furthest in the future a caller-chosen expiry may lie.
pub const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Mints RS256 tokens for one application key pair.
#[derive(Debug, Clone, Copy)]
pub struct JwtIssuer<'a> {
    application_id: &'a ApplicationId,
    private_key: &'a PrivateKey,
}

impl<'a> JwtIssuer<'a> {
    pub fn new(application_id: &'a ApplicationId, private_key: &'a PrivateKey) -> Self {
        Self {
            application_id,
            private_key,
        }
    }

    /// Borrow the application key pair of `auth`.
    ///
    /// Fails with [`VonageError::JwtGenerationFailed`] when `auth` has none.
    pub fn from_auth(auth: &'a Auth) -> Result<Self, VonageError> {
        match (auth.application_id(), auth.private_key()) {
            (Some(application_id), Some(private_key)) => {
                Ok(Self::new(application_id, private_key))
            }
            _ => Err(VonageError::jwt(
                "application_id and private_key are required to generate a JWT",
                None,
            )),
        }
    }

    /// Mint a token in compact serialization.
    ///
    /// `extra_claims` override the generated `iat`, `jti` and `exp`;
    /// `application_id` is always the configured one.
    pub fn generate(&self, extra_claims: Option<&Map<String, Value>>) -> Result<String, VonageError> {
        let claims = self.claims(extra_claims)?;
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|err| VonageError::jwt("invalid RSA private key", Some(err)))?;

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|err| VonageError::jwt("failed to sign JWT", Some(err)))?;
        debug!(application_id = %self.application_id.as_str(), "minted application JWT");
        Ok(token)
    }

    fn claims(
        &self,
        extra_claims: Option<&Map<String, Value>>,
    ) -> Result<Map<String, Value>, VonageError> {
        let mut claims = extra_claims.cloned().unwrap_or_default();

        let iat = claims
            .entry("iat")
            .or_insert_with(|| Value::from(unix_now()))
            .clone();
        if !claims.contains_key("exp") {
            claims.insert("exp".to_owned(), expiry_after(&iat)?);
        }
        claims
            .entry("jti")
            .or_insert_with(|| Value::from(uuid::Uuid::new_v4().to_string()));
        claims.insert(
            ApplicationId::FIELD.to_owned(),
            Value::from(self.application_id.as_str()),
        );
        Ok(claims)
    }
}

/// Default `exp` for a token issued at `iat`.
fn expiry_after(iat: &Value) -> Result<Value, VonageError> {
    let exp = if let Some(iat) = iat.as_u64() {
        iat.checked_add(DEFAULT_TOKEN_TTL_SECS).map(Value::from)
    } else if let Some(iat) = iat.as_i64() {
        iat.checked_add(DEFAULT_TOKEN_TTL_SECS as i64).map(Value::from)
    } else {
        iat.as_f64()
            .map(|iat| iat + DEFAULT_TOKEN_TTL_SECS as f64)
            .filter(|exp| exp.is_finite())
            .map(Value::from)
    };
    exp.ok_or_else(|| VonageError::jwt(format!("cannot derive exp from iat {iat}"), None))
}

/// Check a caller-chosen `exp` against `now`: it must be in the future and
/// at most thirty days away.
pub fn validate_token_expiry(exp: u64, now: u64) -> Result<(), VonageError> {
    if exp <= now {
        return Err(VonageError::jwt(
            format!("token expiry {exp} is in the past"),
            None,
        ));
    }
    if exp > now.saturating_add(MAX_TOKEN_TTL_SECS) {
        return Err(VonageError::jwt(
            format!("token expiry {exp} is too far in the future (max 30 days)"),
            None,
        ));
    }
    Ok(())
}

/// Verify an HS256 webhook token against a shared `secret`.
///
/// Returns `Ok(false)` when only the signature is wrong; any other problem
/// with the token is a [`VonageError::WebhookSignatureInvalid`].
pub fn verify_webhook_jwt(token: &str, secret: &str) -> Result<bool, VonageError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let key = DecodingKey::from_secret(secret.as_bytes());
    match jsonwebtoken::decode::<Value>(token, &key, &validation) {
        Ok(_) => Ok(true),
        Err(err) if matches!(err.kind(), ErrorKind::InvalidSignature) => {
            debug!("webhook token signature mismatch");
            Ok(false)
        }
        Err(err) => Err(VonageError::WebhookSignatureInvalid(err)),
    }
}
