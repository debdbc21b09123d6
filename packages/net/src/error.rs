#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl FetchError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }
}
