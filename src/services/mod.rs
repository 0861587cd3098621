pub mod handler_invoker;
pub mod http_executor;

pub use handler_invoker::HandlerInvoker;
pub use http_executor::{HttpExecutor, InvocationTransport, TransportResponse};
