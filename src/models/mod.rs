pub mod capability;
pub mod handler;

#[cfg(test)]
mod capability_test;

pub use capability::{CapabilityConfig, PromptArgumentSpec, PromptSpec, ResourceSpec, ToolSpec};
pub use handler::{Endpoint, HandlerRef, JsonObject, LocalFn, LocalHandler, RawResult};
