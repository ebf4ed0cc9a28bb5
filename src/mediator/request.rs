use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// A command or query. `Response` is the value its handler produces.
pub trait Request: Send + 'static {
    type Response: Send + 'static;
}

/// Handles exactly one request type
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R, ct: CancellationToken) -> Result<R::Response, ApiError>;
}

/// Drive `fut` to completion unless `ct` fires first, in which case the
/// future is dropped (aborting whatever I/O it had in flight) and
/// `ApiError::Cancelled` is returned. Writes that already committed stay
/// committed.
pub async fn until_cancelled<T, F>(ct: &CancellationToken, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        _ = ct.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}
