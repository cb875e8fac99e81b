use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// No candidate schema matched the log's first topic.
    #[error("no schema candidate matched topic")]
    UnknownTopic,

    /// The log carried no topics at all.
    #[error("log has no topics")]
    NoTopics,

    #[error("payload truncated: wanted {wanted} bytes, have {have}")]
    Truncated { wanted: usize, have: usize },

    #[error("malformed payload: {0}")]
    Malformed(&'static str),
}
