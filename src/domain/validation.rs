use std::fmt;

/// Reasons a credential set is rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    Empty { field: &'static str },
    MissingApiKey { requested_by: &'static str },
    MissingApiSecret,
    MissingSignatureSecret,
    UnpairedApplication { missing: &'static str },
    InvalidPrivateKey,
    PrivateKeyUnreadable { path: String, reason: String },
    UnknownSignatureMethod { input: String },
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::MissingApiKey { requested_by } => {
                write!(f, "api_key is required when {requested_by} is set")
            }
            Self::MissingApiSecret => {
                write!(f, "api_key requires api_secret or signature_secret")
            }
            Self::MissingSignatureSecret => write!(f, "no signature_secret is configured"),
            Self::UnpairedApplication { missing } => write!(
                f,
                "application_id and private_key must be set together ({missing} is missing)"
            ),
            Self::InvalidPrivateKey => write!(f, "private_key is not a PEM-encoded key"),
            Self::PrivateKeyUnreadable { path, reason } => {
                write!(f, "cannot read private key from {path}: {reason}")
            }
            Self::UnknownSignatureMethod { input } => {
                write!(f, "unknown signature method: {input}")
            }
        }
    }
}

impl std::error::Error for CredentialsError {}

#[cfg(test)]
mod tests {
    use super::CredentialsError;

    #[test]
    fn display_messages_are_human_readable() {
        let err = CredentialsError::Empty { field: "api_key" };
        assert_eq!(err.to_string(), "api_key must not be empty");

        let err = CredentialsError::MissingApiKey {
            requested_by: "api_secret",
        };
        assert_eq!(
            err.to_string(),
            "api_key is required when api_secret is set"
        );

        let err = CredentialsError::UnpairedApplication {
            missing: "private_key",
        };
        assert_eq!(
            err.to_string(),
            "application_id and private_key must be set together (private_key is missing)"
        );

        let err = CredentialsError::UnknownSignatureMethod {
            input: "crc32".to_owned(),
        };
        assert_eq!(err.to_string(), "unknown signature method: crc32");
    }
}
