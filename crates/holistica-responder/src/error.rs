use thiserror::Error;

/// Failures talking to the upstream AI service.
#[derive(Debug, Error)]
pub enum ResponderError {
    /// The request exceeded the configured deadline.
    #[error("AI service request timed out")]
    Timeout,

    /// The service could not be reached or the connection failed mid-flight.
    #[error("AI service unreachable: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered 200 but the payload did not contain a reply in
    /// the expected JSON shape.
    #[error("AI reply could not be parsed: {0}")]
    InvalidReply(String),
}

impl From<reqwest::Error> for ResponderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ResponderError::Timeout
        } else {
            ResponderError::Transport(e.to_string())
        }
    }
}
