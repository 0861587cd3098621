//! MCP ServerHandler implementation
//!
//! [`DynamicMcpService`] answers the MCP list/invoke requests for tools,
//! resources and prompts. It holds no capability state of its own: each request
//! reads the registry's current config and hands it to the stateless
//! functions in [`adapter`](crate::mcp::adapter).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  DynamicMcpService           │
//! │  - ServerHandler             │
//! └──────────────┬───────────────┘
//!                │ current() per request
//!                ├─> CapabilityRegistry ──> Arc<CapabilityConfig>
//!                │
//!                ├─> adapter::{list_*, call_tool, read_resource, get_prompt}
//!                │   └─> HandlerInvoker ──> remote endpoint / local fn
//!                │
//!                └─> change notifier (registry generation watch)
//!                    └─> notifications/*/list_changed to connected peers
//! ```
//!
//! A request racing a refresh sees either the old or the new config, never a
//! mix of both.

use crate::error::CapabilityError;
use crate::mcp::adapter;
use crate::mcp::registry::SharedRegistry;
use crate::models::{CapabilityConfig, JsonObject};
use crate::services::HandlerInvoker;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult, Implementation,
    ListPromptsResult, ListResourcesResult, ListToolsResult, PaginatedRequestParam, Prompt,
    ProtocolVersion, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::{NotificationContext, Peer, RequestContext, ServiceError};
use rmcp::{ErrorData, RoleServer};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct DynamicMcpService {
    registry: SharedRegistry,
    invoker: HandlerInvoker,
    server_name: String,
    peers: Arc<Mutex<Vec<Peer<RoleServer>>>>,
}

impl DynamicMcpService {
    pub fn new(registry: SharedRegistry, invoker: HandlerInvoker) -> Self {
        Self {
            registry,
            invoker,
            server_name: crate::config::settings::DEFAULT_SERVER_NAME.to_string(),
            peers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    async fn active_config(&self) -> Result<Arc<CapabilityConfig>, CapabilityError> {
        self.registry
            .current()
            .await
            .map_err(|_| CapabilityError::NotLoaded)
    }

    pub async fn tools(&self) -> Result<Vec<Tool>, CapabilityError> {
        let config = self.active_config().await?;
        Ok(adapter::list_tools(&config))
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, CapabilityError> {
        let config = self.active_config().await?;
        adapter::call_tool(&config, &self.invoker, name, arguments).await
    }

    pub async fn resources(&self) -> Result<Vec<Resource>, CapabilityError> {
        let config = self.active_config().await?;
        Ok(adapter::list_resources(&config))
    }

    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, CapabilityError> {
        let config = self.active_config().await?;
        adapter::read_resource(&config, &self.invoker, uri).await
    }

    pub async fn prompts(&self) -> Result<Vec<Prompt>, CapabilityError> {
        let config = self.active_config().await?;
        adapter::list_prompts(&config)
    }

    pub async fn prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<GetPromptResult, CapabilityError> {
        let config = self.active_config().await?;
        adapter::get_prompt(&config, &self.invoker, name, arguments).await
    }

    /// Forwards registry replacements to connected clients as
    /// `list_changed` notifications until `ct` is cancelled
    pub fn spawn_change_notifier(&self, ct: CancellationToken) -> JoinHandle<()> {
        let mut changes = self.registry.subscribe();
        let peers = Arc::clone(&self.peers);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ct.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        notify_peers(&peers).await;
                    }
                }
            }
        })
    }
}

async fn announce_list_changes(peer: &Peer<RoleServer>) -> Result<(), ServiceError> {
    peer.notify_tool_list_changed().await?;
    peer.notify_resource_list_changed().await?;
    peer.notify_prompt_list_changed().await
}

async fn notify_peers(peers: &Mutex<Vec<Peer<RoleServer>>>) {
    notify_all(peers, |peer| async move { announce_list_changes(&peer).await }).await;
}

/// Sends to a snapshot of `peers` with the list unlocked, then drops the
/// peers whose delivery failed
///
/// Only this function removes entries; registration appends. The snapshot
/// therefore stays a prefix of the list while deliveries are in flight.
async fn notify_all<P, E, F, Fut>(peers: &Mutex<Vec<P>>, send: F)
where
    P: Clone,
    E: fmt::Display,
    F: Fn(P) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let snapshot = peers.lock().await.clone();
    let mut failed = Vec::new();

    for (index, peer) in snapshot.into_iter().enumerate() {
        if let Err(e) = send(peer).await {
            tracing::debug!(error = %e, "Dropping disconnected peer");
            failed.push(index);
        }
    }

    let mut peers = peers.lock().await;
    if !failed.is_empty() {
        let mut index = 0;
        peers.retain(|_| {
            let keep = !failed.contains(&index);
            index += 1;
            keep
        });
    }
    tracing::debug!(peers = peers.len(), "Announced capability list changes");
}

impl ServerHandler for DynamicMcpService {
    fn get_info(&self) -> ServerInfo {
        let mut capabilities = ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .enable_prompts()
            .build();
        if let Some(tools) = capabilities.tools.as_mut() {
            tools.list_changed = Some(true);
        }
        if let Some(resources) = capabilities.resources.as_mut() {
            resources.list_changed = Some(true);
        }
        if let Some(prompts) = capabilities.prompts.as_mut() {
            prompts.list_changed = Some(true);
        }

        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities,
            server_info: Implementation {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Tools, resources and prompts are loaded from a remote configuration and may \
                 change while connected."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools().await?))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!(tool = %request.name, "Calling tool");
        self.call(&request.name, request.arguments)
            .await
            .map_err(|e| {
                tracing::warn!(tool = %request.name, error = %e, "Tool call failed");
                e.into()
            })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(self.resources().await?))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        tracing::debug!(uri = %request.uri, "Reading resource");
        self.read(&request.uri).await.map_err(|e| {
            tracing::warn!(uri = %request.uri, error = %e, "Resource read failed");
            e.into()
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(ListPromptsResult::with_all_items(self.prompts().await?))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        tracing::debug!(prompt = %request.name, "Getting prompt");
        self.prompt(&request.name, request.arguments)
            .await
            .map_err(|e| {
                tracing::warn!(prompt = %request.name, error = %e, "Prompt failed");
                e.into()
            })
    }

    async fn on_initialized(&self, context: NotificationContext<RoleServer>) {
        tracing::info!("Client initialized");
        let mut peers = self.peers.lock().await;
        peers.retain(|peer| !peer.is_transport_closed());
        peers.push(context.peer);
    }
}
