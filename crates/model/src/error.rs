/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The service could not be reached or the connection broke.
    Unavailable,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The service answered with something that could not be decoded.
    MalformedResponse,
    /// Any other errors.
    Other,
}
