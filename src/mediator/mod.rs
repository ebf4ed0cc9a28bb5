//! Request dispatch
//!
//! Callers hand a typed [`Request`] to the [`RequestSender`], which routes it
//! to the single [`RequestHandler`] registered for that request type and
//! returns the handler's typed response. Handlers are registered once at
//! startup into a [`HandlerRegistry`].

mod registry;
mod request;
mod sender;

pub use registry::{HandlerRegistry, RegistryError};
pub use request::{until_cancelled, Request, RequestHandler};
pub use sender::RequestSender;
