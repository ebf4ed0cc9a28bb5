use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::mediator::request::{Request, RequestHandler};

pub(crate) type AnyRequest = Box<dyn Any + Send>;
pub(crate) type AnyResponse = Box<dyn Any + Send>;

/// Object-safe view of a `RequestHandler<R>` with `R` erased
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn handle_any(&self, request: AnyRequest, ct: CancellationToken) -> Result<AnyResponse, ApiError>;
}

struct TypedHandler<R, H> {
    handler: H,
    _request: PhantomData<fn(R)>,
}

#[async_trait]
impl<R, H> ErasedHandler for TypedHandler<R, H>
where
    R: Request,
    H: RequestHandler<R>,
{
    async fn handle_any(&self, request: AnyRequest, ct: CancellationToken) -> Result<AnyResponse, ApiError> {
        let request = request.downcast::<R>().map_err(|_| {
            ApiError::InternalError(format!("request is not a {}", type_name::<R>()))
        })?;
        let response = self.handler.handle(*request, ct).await?;
        Ok(Box::new(response))
    }
}

pub(crate) struct Registration {
    pub(crate) request_type: &'static str,
    pub(crate) handler: Arc<dyn ErasedHandler>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for {request_type} registered more than once")]
    DuplicateHandler { request_type: &'static str },
}

/// Startup-time map from request type to its one handler
#[derive(Default)]
pub struct HandlerRegistry {
    pub(crate) handlers: HashMap<TypeId, Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for request type `R`. A second registration for
    /// the same type is refused.
    pub fn register<R, H>(&mut self, handler: H) -> Result<&mut Self, RegistryError>
    where
        R: Request,
        H: RequestHandler<R>,
    {
        let request_type = type_name::<R>();
        if self.handlers.contains_key(&TypeId::of::<R>()) {
            return Err(RegistryError::DuplicateHandler { request_type });
        }

        tracing::debug!("Registered handler for {}", request_type);
        self.handlers.insert(
            TypeId::of::<R>(),
            Registration {
                request_type,
                handler: Arc::new(TypedHandler {
                    handler,
                    _request: PhantomData,
                }),
            },
        );
        Ok(self)
    }

    pub fn contains<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Names of every registered request type, sorted
    pub fn request_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.values().map(|r| r.request_type).collect();
        names.sort_unstable();
        names
    }
}
