//! Dynamic MCP capability serving
//!
//! Tools, resources and prompts are data, not code: they come from a
//! [`CapabilityConfig`](crate::models::CapabilityConfig) held by the
//! [`CapabilityRegistry`] and are replaced while the server keeps running.
//!
//! # Architecture
//!
//! - [`CapabilityRegistry`] - Owner of the active config, atomic swap on change
//! - [`adapter`] - Stateless `(config, request) -> response` translation
//! - [`DynamicMcpService`] - rmcp `ServerHandler` reading the registry per request
//! - [`RefreshLoop`] - Background re-fetch with single-flight ticks
//!
//! # Example
//!
//! ```rust,no_run
//! use dynamcp::config::{config_source_from_location, ConfigSource};
//! use dynamcp::mcp::{CapabilityRegistry, DynamicMcpService, RefreshLoop};
//! use dynamcp::services::{HandlerInvoker, HttpExecutor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = config_source_from_location("https://control-plane.example.com/mcp.json");
//! let registry = Arc::new(CapabilityRegistry::new());
//! registry.load(source.fetch().await?).await;
//!
//! let refresh = RefreshLoop::new(registry.clone(), source, Duration::from_secs(60)).spawn();
//! let service = DynamicMcpService::new(
//!     registry,
//!     HandlerInvoker::new(Arc::new(HttpExecutor::new())),
//! );
//! # let _ = service;
//! refresh.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod refresh;
pub mod registry;
pub mod service;

pub use refresh::{RefreshHandle, RefreshLoop, RefreshOutcome};
pub use registry::{CapabilityRegistry, RegistryError, SharedRegistry};
pub use service::DynamicMcpService;
