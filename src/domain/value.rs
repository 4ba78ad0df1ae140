use std::fmt;
use std::path::Path;

use crate::domain::validation::CredentialsError;

const PEM_HEADER: &[u8] = b"-----BEGIN";

fn non_empty(value: String, field: &'static str) -> Result<String, CredentialsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialsError::Empty { field });
    }
    Ok(trimmed.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Vonage account API key.
///
/// Invariant: non-empty after trimming.
pub struct ApiKey(String);

impl ApiKey {
    /// Parameter name used on the wire (`api_key`).
    pub const FIELD: &'static str = "api_key";

    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialsError> {
        Ok(Self(non_empty(value.into(), Self::FIELD)?))
    }

    /// Borrow the validated key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Vonage account API secret.
///
/// Invariant: non-empty after trimming. `Debug` output is redacted.
pub struct ApiSecret(String);

impl ApiSecret {
    /// Parameter name used on the wire (`api_secret`).
    pub const FIELD: &'static str = "api_secret";

    /// Create a validated [`ApiSecret`].
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialsError> {
        Ok(Self(non_empty(value.into(), Self::FIELD)?))
    }

    /// Borrow the secret.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiSecret(***)")
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Shared secret used to sign requests and verify signed webhooks.
///
/// Invariant: must not be empty (whitespace is preserved, it is key material).
pub struct SignatureSecret(String);

impl SignatureSecret {
    /// Name of the credential field (`signature_secret`).
    pub const FIELD: &'static str = "signature_secret";

    /// Create a validated [`SignatureSecret`].
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialsError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CredentialsError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the secret as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SignatureSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignatureSecret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Vonage application id, the subject of application JWTs.
///
/// Invariant: non-empty after trimming.
pub struct ApplicationId(String);

impl ApplicationId {
    /// Claim name used in application JWTs (`application_id`).
    pub const FIELD: &'static str = "application_id";

    /// Create a validated [`ApplicationId`].
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialsError> {
        Ok(Self(non_empty(value.into(), Self::FIELD)?))
    }

    /// Borrow the validated id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq)]
/// PEM-encoded RSA private key of a Vonage application.
///
/// Invariant: the bytes contain a PEM `-----BEGIN` header. The key itself is
/// only parsed when a token is minted.
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    /// Name of the credential field (`private_key`).
    pub const FIELD: &'static str = "private_key";

    /// Accept in-memory PEM bytes.
    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Result<Self, CredentialsError> {
        let pem = pem.into();
        if !contains_pem_header(&pem) {
            return Err(CredentialsError::InvalidPrivateKey);
        }
        Ok(Self(pem))
    }

    /// Read a PEM file once; only the in-memory bytes are used afterwards.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|err| CredentialsError::PrivateKeyUnreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_pem(pem)
    }

    /// Borrow the PEM bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({} bytes)", self.0.len())
    }
}

fn contains_pem_header(pem: &[u8]) -> bool {
    pem.windows(PEM_HEADER.len()).any(|window| window == PEM_HEADER)
}
