//! Domain layer: credential values and request/response shapes (no I/O besides
//! reading a private key file).

mod request;
mod response;
mod validation;
mod value;

pub(crate) use request::param_text;
pub(crate) use response::find_header;
pub use request::{AuthKind, BodyEncoding, HttpMethod, Params, RequestDescriptor};
pub use response::{RequestSnapshot, ResponseBody, ResponseSnapshot};
pub use validation::CredentialsError;
pub use value::{ApiKey, ApiSecret, ApplicationId, PrivateKey, SignatureSecret};
