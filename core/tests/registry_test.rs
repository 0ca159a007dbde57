use async_trait::async_trait;
use serde_json::{json, Value};
use skycast_core::tools::{Tool, ToolError, ToolRegistry, ToolResult};
use std::sync::Arc;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> String {
        "unit_echo".to_string()
    }

    fn description(&self) -> String {
        "Echo the arguments back".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "msg": {"type": "string", "description": "Text to echo"}
            },
            "required": ["msg"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        Ok(json!({"echo": arguments["msg"]}))
    }
}

struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> String {
        "unit_fail".to_string()
    }

    fn description(&self) -> String {
        "Always fails".to_string()
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _arguments: Value) -> ToolResult<Value> {
        Err(ToolError::ExecutionFailed("boom".to_string()))
    }
}

#[test]
fn register_rejects_duplicate_names() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let err = registry.register(Arc::new(EchoTool)).unwrap_err();
    assert!(matches!(err, ToolError::Duplicate(name) if name == "unit_echo"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn describe_all_preserves_declaration_order_and_wire_shape() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(FailingTool)).unwrap();
    registry.register(Arc::new(EchoTool)).unwrap();

    let descriptors = registry.describe_all();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0]["function"]["name"], "unit_fail");
    assert_eq!(descriptors[1]["function"]["name"], "unit_echo");
    assert_eq!(descriptors[0]["type"], "function");
    assert!(descriptors[1]["function"]["parameters"]["properties"]["msg"].is_object());
    assert_eq!(descriptors[1]["function"]["description"], "Echo the arguments back");
}

#[tokio::test]
async fn invoke_runs_the_handler() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let result = registry
        .invoke("unit_echo", r#"{"msg": "hello"}"#)
        .await
        .unwrap();
    assert_eq!(result["echo"], "hello");
}

#[tokio::test]
async fn invoke_unknown_name_is_not_found() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let err = registry.invoke("nope", "{}").await.unwrap_err();
    assert!(matches!(err, ToolError::NotFound(name) if name == "nope"));
}

#[tokio::test]
async fn invoke_malformed_arguments_is_invalid_arguments() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();

    let err = registry.invoke("unit_echo", "not valid json").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
}

#[tokio::test]
async fn handler_faults_surface_as_tool_errors() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(FailingTool)).unwrap();

    let err = registry.invoke("unit_fail", "{}").await.unwrap_err();
    assert!(matches!(err, ToolError::ExecutionFailed(msg) if msg == "boom"));
}
