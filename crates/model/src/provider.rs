use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
///
/// Any error surfaced through this trait is a service failure: the
/// request could not be answered and the current turn is abandoned.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A chat completion service.
///
/// The provider is treated as a black box: one request eventually yields
/// one response or an error. Timeouts and retries against the service
/// are the provider's own business.
///
/// Once the provider is created, it should behave like a stateless object.
/// Callers should not rely on internal state, and the provider should be
/// prepared for being dropped anytime.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends the full transcript and tool definitions to the model.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
