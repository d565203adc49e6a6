use thiserror::Error;

/// Feature store failures
///
/// "Key absent" is not an error: lookups return `Ok(None)` for that.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("feature store unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("feature store connection error: {0}")]
    Connection(String),

    #[error("feature store operation `{op}` timed out after {after_ms} ms")]
    Timeout { op: &'static str, after_ms: u64 },

    #[error("feature store command failed: {0}")]
    Command(String),

    #[error("invalid entity id `{0}`")]
    InvalidEntityId(String),

    #[error("feature `{feature}` of entity {entity} is not a finite number")]
    NonFinite { entity: String, feature: String },

    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("unsupported store url `{0}`")]
    UnsupportedUrl(String),
}

impl StoreError {
    /// Worth retrying: the backend may answer on the next attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout { .. })
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_io_error()
            || err.is_timeout()
        {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}
