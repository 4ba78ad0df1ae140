//! Core of a Vonage API client: credentials, request signing, JWT issuing,
//! and an authenticated HTTP client shared by the product APIs.
//!
//! The crate is split into a domain layer of strong types, an auth layer
//! (signatures and JWTs), a transport layer for wire-format details, and a
//! client layer orchestrating requests.
//!
//! ```rust,no_run
//! use vonage_core::{Auth, AuthKind, Params, VonageClient, DEFAULT_REST_HOST};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vonage_core::VonageError> {
//!     let auth = Auth::builder().api_key("key").api_secret("secret").build()?;
//!     let client = VonageClient::new(auth);
//!
//!     let balance = client
//!         .get(DEFAULT_REST_HOST, "/account/get-balance", Params::new(), AuthKind::Query)
//!         .await?;
//!     println!("{balance:?}");
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod domain;
mod transport;

pub use auth::{Auth, AuthBuilder, JwtIssuer, SignatureMethod, Signer, verify_webhook_jwt};
pub use client::{
    DEFAULT_API_HOST, DEFAULT_REST_HOST, DEFAULT_VIDEO_HOST, DiagnosticsSink, HttpError,
    HttpErrorKind, VonageClient, VonageClientBuilder, VonageError,
};
pub use domain::{
    ApiKey, ApiSecret, ApplicationId, AuthKind, BodyEncoding, CredentialsError, HttpMethod, Params,
    PrivateKey, RequestDescriptor, RequestSnapshot, ResponseBody, ResponseSnapshot,
    SignatureSecret,
};
