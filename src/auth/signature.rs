//! Request signing and signed-webhook verification.
//!
//! The canonical form of a parameter map is the concatenation of
//! `&key=value` fragments in key byte order, with `&` and `=` inside string
//! values replaced by `_`:
//!
//! ```text
//! {to: "1", text: "a=b", timestamp: 1700000000}
//!   -> "&text=a_b&timestamp=1700000000&to=1"
//! ```
//!
//! `md5_hash` appends the secret to that string and takes a plain MD5; every
//! other method is an HMAC keyed with the secret. Digests are lowercase hex.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::auth::unix_now;
use crate::domain::{CredentialsError, Params, SignatureSecret, param_text};

/// Parameter carrying the signature.
pub const SIGNATURE_FIELD: &str = "sig";
/// Parameter carrying the Unix time the signature was made at.
pub const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// Digest family used for `sig` values.
pub enum SignatureMethod {
    /// MD5 over the canonical string followed by the secret (no HMAC).
    Md5Hash,
    #[default]
    Md5Hmac,
    Sha1Hmac,
    Sha256Hmac,
    Sha512Hmac,
}

impl SignatureMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5Hash => "md5_hash",
            Self::Md5Hmac => "md5_hmac",
            Self::Sha1Hmac => "sha1_hmac",
            Self::Sha256Hmac => "sha256_hmac",
            Self::Sha512Hmac => "sha512_hmac",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = CredentialsError;

    /// Accepts `md5_hash`-style names and the short dashboard names
    /// (`md5hash`, `md5`, `sha1`, `sha256`, `sha512`), case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "md5_hash" | "md5hash" => Ok(Self::Md5Hash),
            "md5_hmac" | "md5" => Ok(Self::Md5Hmac),
            "sha1_hmac" | "sha1" => Ok(Self::Sha1Hmac),
            "sha256_hmac" | "sha256" => Ok(Self::Sha256Hmac),
            "sha512_hmac" | "sha512" => Ok(Self::Sha512Hmac),
            _ => Err(CredentialsError::UnknownSignatureMethod {
                input: value.to_owned(),
            }),
        }
    }
}

/// Signs and verifies parameter maps with one secret and method.
#[derive(Debug, Clone, Copy)]
pub struct Signer<'a> {
    secret: &'a SignatureSecret,
    method: SignatureMethod,
}

impl<'a> Signer<'a> {
    pub fn new(secret: &'a SignatureSecret, method: SignatureMethod) -> Self {
        Self { secret, method }
    }

    /// Sign `params`, inserting the current `timestamp` first when it is absent.
    ///
    /// The inserted timestamp stays in the map so the receiver sees the same
    /// value that was signed.
    pub fn sign(&self, params: &mut Params) -> String {
        params
            .entry(TIMESTAMP_FIELD.to_owned())
            .or_insert_with(|| serde_json::Value::from(unix_now()));
        let canonical = canonical_string(params);
        let secret = self.secret.as_bytes();

        match self.method {
            SignatureMethod::Md5Hash => {
                let mut hasher = Md5::new();
                hasher.update(canonical.as_bytes());
                hasher.update(secret);
                hex::encode(hasher.finalize())
            }
            SignatureMethod::Md5Hmac => hmac_hex::<Hmac<Md5>>(secret, canonical.as_bytes()),
            SignatureMethod::Sha1Hmac => hmac_hex::<Hmac<Sha1>>(secret, canonical.as_bytes()),
            SignatureMethod::Sha256Hmac => hmac_hex::<Hmac<Sha256>>(secret, canonical.as_bytes()),
            SignatureMethod::Sha512Hmac => hmac_hex::<Hmac<Sha512>>(secret, canonical.as_bytes()),
        }
    }

    /// Check the `sig` entry of `params` against a signature of the rest.
    ///
    /// Returns `false` for a missing, non-string or mismatching `sig`; the
    /// caller's map is left untouched.
    pub fn verify(&self, params: &Params) -> bool {
        let mut remainder = params.clone();
        let claimed = match remainder.remove(SIGNATURE_FIELD) {
            Some(serde_json::Value::String(sig)) => sig.to_ascii_lowercase(),
            _ => {
                debug!("signed parameters carry no usable sig");
                return false;
            }
        };

        let expected = self.sign(&mut remainder);
        let matches: bool = claimed.as_bytes().ct_eq(expected.as_bytes()).into();
        if !matches {
            debug!(method = %self.method, "signature mismatch");
        }
        matches
    }
}

/// Build the `&key=value` string that is fed to the digest.
pub fn canonical_string(params: &Params) -> String {
    let mut canonical = String::new();
    for (key, value) in params {
        let Some(text) = param_text(value) else {
            continue;
        };
        let text = if value.is_string() {
            text.replace(['&', '='], "_")
        } else {
            text
        };
        canonical.push('&');
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(&text);
    }
    canonical
}

fn hmac_hex<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> String {
    let mut mac = <M as KeyInit>::new_from_slice(key).expect("HMAC can accept any key length");
    Mac::update(&mut mac, message);
    hex::encode(mac.finalize().into_bytes())
}

pub(crate) fn require_secret(
    secret: Option<&SignatureSecret>,
) -> Result<&SignatureSecret, CredentialsError> {
    secret.ok_or(CredentialsError::MissingSignatureSecret)
}
