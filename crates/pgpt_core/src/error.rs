use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a backend call, already normalized into the message shown to the user.
///
/// `Display` is the user-facing text; callers surface it as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No response at all: connection refused, DNS failure, timeout.
    #[error(
        "Unable to connect to the server. \
         Please check if the server is running and accessible."
    )]
    Unreachable,

    /// 422 from the backend.
    #[error("Invalid file or parameters provided.")]
    InvalidInput,

    /// 400 from the backend, carrying the server `detail` or the generic text.
    #[error("{0}")]
    BadRequest(String),

    /// Structured `{"error": "..."}` envelope, surfaced verbatim.
    #[error("{0}")]
    Backend(String),

    /// The request could not be built or the response body could not be read.
    #[error("Client-side error: {0}")]
    Client(String),

    #[error("Server error: {status}. {detail}")]
    Server { status: u16, detail: String },
}

pub const BAD_REQUEST_FALLBACK: &str = "Bad request. Please check your input.";

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
