use thiserror::Error;

/// Error types for Resona client operations.
///
/// This enum covers everything that can go wrong when talking to the Resona
/// backend or the Spotify preview lookup: network failures, rejected requests,
/// malformed payloads, and missing required inputs.
#[derive(Error, Debug)]
pub enum ResonaError {
    /// HTTP/network related errors.
    ///
    /// This includes connection failures, timeouts, DNS errors, and other
    /// low-level networking issues.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend answered with a non-success status code.
    ///
    /// The body (truncated) is carried along for logging; the backend reports
    /// problems like an unknown user or track this way.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// Response body, truncated for display
        message: String,
    },

    /// Failed to parse a response payload.
    ///
    /// This happens when the backend returns JSON that does not match the
    /// documented shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The page URL did not carry a `user_id` query parameter.
    ///
    /// Every API call is scoped to a user, so this is fatal during
    /// initialization; nothing is attempted without it.
    #[error("Missing user_id in page URL")]
    MissingUserId,

    /// A required credential environment variable is absent or empty.
    ///
    /// Checked before any network call is made.
    #[error("Missing required environment variable: {0}")]
    MissingCredentials(String),

    /// A required input file or value is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The operation was cancelled before it completed.
    ///
    /// Returned from cancellable sleeps and in-flight requests when the
    /// owning poller is stopped.
    #[error("Operation cancelled")]
    Cancelled,

    /// File system I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
