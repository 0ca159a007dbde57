// Two-pass tool-calling chat orchestration
//
// One pass per user message: ask the model with tools on offer, run any
// tools it requests through the registry, then ask again with the results
// spliced in (and no tools, so a pass can never recurse). The orchestrator
// always produces answer text; provider faults degrade to an apology.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::{ChatCompletion, ChatMessage, CompletionRequest, ToolCall};
use crate::tools::ToolRegistry;
use crate::Result;

const LOOKUP_PERSONA: &str = "You are Skycast, a weather data assistant. You answer \
    questions about recorded daily weather (max/min temperature and precipitation) \
    and their locations. Use the available tools to look up data whenever the \
    question needs it; otherwise answer directly.";

const ANSWER_PERSONA: &str = "You are Skycast, a weather data assistant. Use the tool \
    results in this conversation to answer the user's question in clear, concise \
    natural language. If a tool reported an error, say what went wrong instead of \
    guessing.";

/// The outcome paired with one tool invocation request: the originating
/// call id plus either the serialized payload or an error message
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

/// Runs the two-pass tool-calling protocol for one user message
pub struct ChatOrchestrator {
    llm: Arc<dyn ChatCompletion>,
    registry: Arc<ToolRegistry>,

    // OpenTelemetry metrics
    passes_counter: Counter<u64>,
    tool_calls_counter: Counter<u64>,
    tool_errors_counter: Counter<u64>,
    llm_latency: Histogram<f64>,
}

impl ChatOrchestrator {
    pub fn new(llm: Arc<dyn ChatCompletion>, registry: Arc<ToolRegistry>) -> Self {
        let meter = global::meter("skycast.chat_orchestrator");

        let passes_counter = meter
            .u64_counter("skycast.chat_orch.passes_total")
            .with_description("Total number of orchestration passes")
            .init();

        let tool_calls_counter = meter
            .u64_counter("skycast.chat_orch.tool_calls_total")
            .with_description("Total number of tool calls requested by the model")
            .init();

        let tool_errors_counter = meter
            .u64_counter("skycast.chat_orch.tool_errors_total")
            .with_description("Total number of failed tool invocations")
            .init();

        let llm_latency = meter
            .f64_histogram("skycast.chat_orch.llm_latency_ms")
            .with_description("Provider call latency in milliseconds")
            .init();

        Self {
            llm,
            registry,
            passes_counter,
            tool_calls_counter,
            tool_errors_counter,
            llm_latency,
        }
    }

    /// Answer one user message. Never fails: any fault inside the pass is
    /// converted to an apologetic reply here.
    pub async fn respond(&self, message: &str) -> String {
        self.passes_counter.add(1, &[]);
        match self.run(message).await {
            Ok(text) => text,
            Err(e) => {
                warn!(target: "chat_orch", error = %e, "Pass failed; degrading to apology");
                format!(
                    "Sorry, I ran into a problem answering that ({}). Please try again.",
                    e
                )
            }
        }
    }

    #[tracing::instrument(name = "chat_orch.run", skip(self, message))]
    async fn run(&self, message: &str) -> Result<String> {
        let tools = self.registry.describe_all();
        let first_messages = vec![
            ChatMessage::system(LOOKUP_PERSONA),
            ChatMessage::user(message),
        ];

        let first = self
            .timed_complete(CompletionRequest::with_tools(first_messages, tools), "first")
            .await?;

        if first.tool_calls.is_empty() {
            debug!(target: "chat_orch", "No tools requested; first reply is final");
            return Ok(first.text);
        }

        info!(
            target: "chat_orch",
            requested = first.tool_calls.len(),
            "Model requested tools"
        );

        // Invoke in the order received; one failure never aborts the batch
        let mut outcomes = Vec::with_capacity(first.tool_calls.len());
        for call in &first.tool_calls {
            outcomes.push(self.invoke_one(call).await);
        }

        let mut followup = vec![
            ChatMessage::system(ANSWER_PERSONA),
            ChatMessage::user(message),
            ChatMessage::assistant(
                (!first.text.is_empty()).then(|| first.text.clone()),
                first.tool_calls.clone(),
            ),
        ];
        for outcome in outcomes {
            followup.push(ChatMessage::tool(outcome.call_id, outcome.content));
        }

        // No tools offered on the second call, so the pass cannot recurse
        let final_completion = self
            .timed_complete(CompletionRequest::without_tools(followup), "final")
            .await?;

        Ok(final_completion.text)
    }

    async fn invoke_one(&self, call: &ToolCall) -> ToolOutcome {
        let started = Instant::now();
        let name = call.function.name.as_str();
        self.tool_calls_counter
            .add(1, &[KeyValue::new("tool", name.to_string())]);

        let (content, is_error) = match self
            .registry
            .invoke(name, &call.function.arguments)
            .await
        {
            Ok(value) => (serialize_payload(&value), false),
            Err(e) => {
                self.tool_errors_counter
                    .add(1, &[KeyValue::new("tool", name.to_string())]);
                (e.to_string(), true)
            }
        };

        info!(
            target: "chat_orch",
            tool = %name,
            error = is_error,
            latency_ms = %(started.elapsed().as_secs_f64() * 1000.0),
            "Tool invocation finished"
        );

        ToolOutcome {
            call_id: call.id.clone(),
            content,
            is_error,
        }
    }

    async fn timed_complete(
        &self,
        request: CompletionRequest,
        stage: &'static str,
    ) -> Result<crate::llm::Completion> {
        let started = Instant::now();
        let result = self.llm.complete(request).await;
        self.llm_latency.record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("stage", stage)],
        );
        Ok(result?)
    }
}

// Tool payloads are sent back to the model as JSON strings; a payload that
// refuses to serialize falls back to its display form
fn serialize_payload(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
