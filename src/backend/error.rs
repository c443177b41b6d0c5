use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("unrecognised option '{option}', possible options are {valid}")]
    UnknownOption { option: String, valid: String },

    #[error("invalid type for option '{option}', expected {expected}")]
    InvalidOptionType {
        option: String,
        expected: &'static str,
    },

    #[error("no value for '{key}'{}", .hint.map(|h| format!(", {h}")).unwrap_or_default())]
    MissingValue {
        key: String,
        hint: Option<&'static str>,
    },

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("value for '{key}' is not valid UTF-8")]
    InvalidUtf8 {
        key: String,
        source: std::string::FromUtf8Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for '{key}' failed: {source}")]
    Request {
        key: String,
        source: reqwest::Error,
    },

    #[error("request for '{key}' returned status {status}")]
    Status {
        key: String,
        status: reqwest::StatusCode,
    },
}

impl BackendError {
    pub(crate) fn unknown_option(option: &str, valid: &[&str]) -> Self {
        Self::UnknownOption {
            option: option.to_string(),
            valid: valid.join(", "),
        }
    }

    pub(crate) fn invalid_type(option: &str, expected: &'static str) -> Self {
        Self::InvalidOptionType {
            option: option.to_string(),
            expected,
        }
    }

    pub(crate) fn missing(key: &str) -> Self {
        Self::MissingValue {
            key: key.to_string(),
            hint: None,
        }
    }
}
