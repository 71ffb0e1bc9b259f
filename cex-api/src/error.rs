use cex_core::time::TimeError;
use thiserror::Error;

/// Errors raised by backend queries.
///
/// The first three variants are the network taxonomy: a response arrived
/// with a non-2xx status, no response arrived at all, or the request
/// failed some other way. The rest are response-validation failures: a
/// 2xx response whose payload is unusable.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("the data server returned status {0}")]
    Status(u16),
    #[error("no response was received from the data server")]
    NoResponse,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("the data server returned an empty result")]
    EmptyPayload,
    #[error("the data server returned a malformed result: {0}")]
    Malformed(String),
    #[error(transparent)]
    Time(#[from] TimeError),
}

impl ApiError {
    /// The fixed user-facing message for this error. Network failures
    /// map onto exactly three templates; everything else shares the
    /// "other" template.
    pub fn display_message(&self) -> String {
        match self {
            ApiError::Status(code) => format!(
                "Error fetching data: the server returned an error ({}).",
                code
            ),
            ApiError::NoResponse => {
                "Error fetching data: no response was received from the server.".to_string()
            }
            _ => "Error fetching data: an error occurred while making the request.".to_string(),
        }
    }
}
