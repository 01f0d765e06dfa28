use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShieldError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Upstream fetch failed: {message}")]
    UpstreamFetch {
        status: Option<u16>,
        message: String,
    },

    #[error("Payload decode error: {0}")]
    PayloadDecode(#[source] serde_json::Error),

    #[error("Callback delivery failed: {0}")]
    CallbackDelivery(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ShieldError {
    /// Short name used as the `error_kind` field in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ShieldError::MalformedEvent(_) => "MalformedEventError",
            ShieldError::UpstreamFetch { .. } => "UpstreamFetchError",
            ShieldError::PayloadDecode(_) => "PayloadDecodeError",
            ShieldError::CallbackDelivery(_) => "CallbackDeliveryError",
            ShieldError::Config(_) => "ConfigError",
        }
    }
}

impl From<reqwest::Error> for ShieldError {
    fn from(error: reqwest::Error) -> Self {
        ShieldError::UpstreamFetch {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}
