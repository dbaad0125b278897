/// Errors from schema lookups.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A channel key or id string could not be parsed.
    #[error("invalid channel key '{0}' (expected hex like 0x640 or decimal)")]
    InvalidChannelKey(String),

    /// No schema is registered under this name.
    #[error("no channel named '{0}'")]
    UnknownChannelName(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
