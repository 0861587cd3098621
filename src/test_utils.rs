pub mod test_helpers {
    use crate::config::ConfigSource;
    use crate::error::{ConfigError, TransportError};
    use crate::models::{CapabilityConfig, Endpoint, HandlerRef, RawResult, ToolSpec};
    use crate::services::{InvocationTransport, TransportResponse};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};

    /// Tool whose local handler returns `reply` verbatim
    pub fn fixed_tool(name: &str, reply: &str) -> ToolSpec {
        let reply = reply.to_string();
        ToolSpec::new(
            name,
            HandlerRef::local(move |_| {
                let reply = reply.clone();
                async move { Ok(RawResult::Text(reply)) }
            }),
        )
        .with_description(format!("{} tool", name))
    }

    /// Config with one remote tool per name, pointing at `base_url/<name>`
    pub fn remote_tools_config(base_url: &str, names: &[&str]) -> CapabilityConfig {
        CapabilityConfig {
            tools: names
                .iter()
                .map(|name| {
                    ToolSpec::new(*name, HandlerRef::remote(format!("{}/{}", base_url, name)))
                        .with_description(format!("{} tool", name))
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Config source that replays a script of fetch results
    ///
    /// The last entry repeats once the script is exhausted. Every completed
    /// fetch is reported on the channel returned by [`Self::fetches`].
    pub struct ScriptedConfigSource {
        script: Mutex<VecDeque<Result<CapabilityConfig, String>>>,
        last: Mutex<Option<Result<CapabilityConfig, String>>>,
        delay: Option<Duration>,
        started: AtomicUsize,
        notify: mpsc::UnboundedSender<usize>,
        receiver: Mutex<Option<mpsc::UnboundedReceiver<usize>>>,
    }

    impl ScriptedConfigSource {
        pub fn new(script: Vec<Result<CapabilityConfig, String>>) -> Self {
            let (notify, receiver) = mpsc::unbounded_channel();
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                delay: None,
                started: AtomicUsize::new(0),
                notify,
                receiver: Mutex::new(Some(receiver)),
            }
        }

        /// Makes every fetch take `delay` before answering
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Number of fetches started so far
        pub fn fetch_count(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        /// Receiver of completed fetch sequence numbers; can be taken once
        pub async fn fetches(&self) -> mpsc::UnboundedReceiver<usize> {
            match self.receiver.lock().await.take() {
                Some(receiver) => receiver,
                None => panic!("fetch receiver already taken"),
            }
        }
    }

    #[async_trait]
    impl ConfigSource for ScriptedConfigSource {
        async fn fetch(&self) -> Result<CapabilityConfig, ConfigError> {
            let sequence = self.started.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self.script.lock().await.pop_front();
            let result = {
                let mut last = self.last.lock().await;
                if let Some(next) = next {
                    *last = Some(next);
                }
                last.clone()
                    .unwrap_or_else(|| Err("script is empty".to_string()))
            };

            let _ = self.notify.send(sequence);
            result.map_err(ConfigError::Unreachable)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    /// Invocation transport that answers every call with the same response
    /// and records what it was asked
    pub struct RecordingTransport {
        response: TransportResponse,
        calls: Mutex<Vec<(Endpoint, Value)>>,
        count: AtomicUsize,
    }

    impl RecordingTransport {
        pub fn new(response: TransportResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: Mutex::new(Vec::new()),
                count: AtomicUsize::new(0),
            })
        }

        /// Transport answering `200 OK` with a JSON body
        pub fn json(body: &str) -> Arc<Self> {
            Self::new(TransportResponse {
                status: 200,
                status_text: "OK".to_string(),
                content_type: Some("application/json".to_string()),
                body: body.as_bytes().to_vec(),
            })
        }

        pub fn call_count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }

        pub async fn calls(&self) -> Vec<(Endpoint, Value)> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl InvocationTransport for RecordingTransport {
        async fn call(
            &self,
            endpoint: &Endpoint,
            body: &Value,
        ) -> Result<TransportResponse, TransportError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .await
                .push((endpoint.clone(), body.clone()));
            Ok(self.response.clone())
        }
    }
}
