use std::any::{type_name, TypeId};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::mediator::registry::HandlerRegistry;
use crate::mediator::request::Request;

/// Single entry point for dispatching requests to their handlers
pub struct RequestSender {
    registry: HandlerRegistry,
}

impl RequestSender {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Resolve the handler for `R` and run it, passing `ct` through.
    ///
    /// An unregistered request type is a wiring defect and fails with
    /// `ApiError::HandlerNotFound`. No retries happen here.
    pub async fn send<R: Request>(&self, request: R, ct: CancellationToken) -> Result<R::Response, ApiError> {
        let request_type = type_name::<R>();
        let registration = self.registry.handlers.get(&TypeId::of::<R>()).ok_or_else(|| {
            error!("No handler registered for {}", request_type);
            ApiError::HandlerNotFound { request_type }
        })?;

        if ct.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        debug!("Dispatching {}", request_type);
        let response = registration.handler.handle_any(Box::new(request), ct).await?;

        response
            .downcast::<R::Response>()
            .map(|boxed| *boxed)
            .map_err(|_| ApiError::InternalError(format!("handler for {} returned the wrong type", request_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediator::{until_cancelled, HandlerRegistry, RegistryError, RequestHandler};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Ping(u32);
    impl Request for Ping {
        type Response = u32;
    }

    struct Echo(String);
    impl Request for Echo {
        type Response = String;
    }

    struct Unregistered;
    impl Request for Unregistered {
        type Response = ();
    }

    struct Slow;
    impl Request for Slow {
        type Response = ();
    }

    struct PingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestHandler<Ping> for PingHandler {
        async fn handle(&self, request: Ping, _ct: CancellationToken) -> Result<u32, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(request.0 + 1)
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler<Echo> for EchoHandler {
        async fn handle(&self, request: Echo, _ct: CancellationToken) -> Result<String, ApiError> {
            Ok(request.0.to_uppercase())
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl RequestHandler<Slow> for SlowHandler {
        async fn handle(&self, _request: Slow, ct: CancellationToken) -> Result<(), ApiError> {
            until_cancelled(&ct, async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await
        }
    }

    fn sender(calls: Arc<AtomicUsize>) -> RequestSender {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Ping, _>(PingHandler { calls })
            .unwrap()
            .register::<Echo, _>(EchoHandler)
            .unwrap()
            .register::<Slow, _>(SlowHandler)
            .unwrap();
        RequestSender::new(registry)
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_request_type() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sender = sender(calls.clone());

        assert_eq!(sender.send(Ping(41), CancellationToken::new()).await.unwrap(), 42);
        assert_eq!(
            sender.send(Echo("hi".to_string()), CancellationToken::new()).await.unwrap(),
            "HI"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_request_is_handler_not_found() {
        let sender = sender(Arc::new(AtomicUsize::new(0)));
        let err = sender.send(Unregistered, CancellationToken::new()).await.unwrap_err();

        match err {
            ApiError::HandlerNotFound { request_type } => assert!(request_type.ends_with("Unregistered")),
            other => panic!("expected HandlerNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_registry_never_resolves() {
        let sender = RequestSender::new(HandlerRegistry::new());
        assert!(matches!(
            sender.send(Ping(1), CancellationToken::new()).await,
            Err(ApiError::HandlerNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_is_refused() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Echo, _>(EchoHandler).unwrap();
        let err = registry.register::<Echo, _>(EchoHandler).err().unwrap();

        assert!(matches!(err, RegistryError::DuplicateHandler { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sender = sender(calls.clone());
        let ct = CancellationToken::new();
        ct.cancel();

        assert!(matches!(sender.send(Ping(1), ct).await, Err(ApiError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_reaches_running_handler() {
        let sender = Arc::new(sender(Arc::new(AtomicUsize::new(0))));
        let ct = CancellationToken::new();

        let task = {
            let sender = sender.clone();
            let ct = ct.clone();
            tokio::spawn(async move { sender.send(Slow, ct).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        ct.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }
}
