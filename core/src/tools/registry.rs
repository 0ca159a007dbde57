use super::error::{ToolError, ToolResult};
use super::traits::Tool;
use dashmap::DashMap;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A registry for the tools the language model is allowed to request.
///
/// Populated once at startup; read-only afterwards. The registry's names
/// are exactly the set the model may call: an unknown name is a local
/// error, never forwarded as a model-side fault.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<dyn Tool>>>,
    // Declaration order, kept separately because map iteration order is not
    // deterministic and providers see the descriptor list positionally
    order: Arc<RwLock<Vec<String>>>,

    // OpenTelemetry metrics
    invocations_counter: Counter<u64>,
    errors_counter: Counter<u64>,
    timeouts_counter: Counter<u64>,
    invoke_latency: Histogram<f64>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let meter = global::meter("skycast.tool_registry");

        let invocations_counter = meter
            .u64_counter("skycast.tool_registry.invocations_total")
            .with_description("Total number of tool invocations")
            .init();

        let errors_counter = meter
            .u64_counter("skycast.tool_registry.errors_total")
            .with_description("Total number of tool errors")
            .init();

        let timeouts_counter = meter
            .u64_counter("skycast.tool_registry.timeouts_total")
            .with_description("Total number of tool timeouts")
            .init();

        let invoke_latency = meter
            .f64_histogram("skycast.tool_registry.invoke_latency_ms")
            .with_description("Tool invocation latency in milliseconds")
            .init();

        Self {
            tools: Arc::new(DashMap::new()),
            order: Arc::new(RwLock::new(Vec::new())),
            invocations_counter,
            errors_counter,
            timeouts_counter,
            invoke_latency,
        }
    }

    /// Register a new tool; names must be unique
    pub fn register(&self, tool: Arc<dyn Tool>) -> ToolResult<()> {
        let name = tool.name();
        info!(target: "tool_registry", tool = %name, "Registering tool");

        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.tools.insert(name.clone(), tool);
        self.order
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(name);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| t.clone())
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors in the chat-completion function-calling wire shape, in
    /// declaration order
    pub fn describe_all(&self) -> Vec<Value> {
        let order = self
            .order
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    }
                })
            })
            .collect()
    }

    /// Invoke a tool by name with a JSON-encoded argument string.
    ///
    /// Malformed argument JSON, an unknown name, a handler fault and a
    /// timeout all come back as `ToolError`; nothing propagates raw.
    #[tracing::instrument(skip(self, arguments_json), fields(tool.name = %name))]
    pub async fn invoke(&self, name: &str, arguments_json: &str) -> ToolResult<Value> {
        let start_time = std::time::Instant::now();

        let arguments: Value = serde_json::from_str(arguments_json)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(target: "tool_registry", tool = %name, "Invoking tool");

        let timeout_duration = Duration::from_secs(30);
        let result = match timeout(timeout_duration, tool.call(arguments)).await {
            Ok(res) => res,
            Err(_) => {
                warn!(target: "tool_registry", tool = %name, "Tool execution timed out");
                self.timeouts_counter
                    .add(1, &[KeyValue::new("tool", name.to_string())]);
                Err(ToolError::Timeout)
            }
        };

        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        self.invoke_latency
            .record(elapsed_ms, &[KeyValue::new("tool", name.to_string())]);

        match &result {
            Ok(_) => {
                self.invocations_counter.add(
                    1,
                    &[
                        KeyValue::new("tool", name.to_string()),
                        KeyValue::new("status", "success"),
                    ],
                );
            }
            Err(e) => {
                warn!(target: "tool_registry", tool = %name, error = %e, "Tool execution failed");
                self.errors_counter.add(
                    1,
                    &[
                        KeyValue::new("tool", name.to_string()),
                        KeyValue::new("error", e.to_string()),
                    ],
                );
            }
        }

        result
    }
}
