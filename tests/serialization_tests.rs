use rt_tool_bridge::{
    Envelope, InboundMessage, OutboundEnvelope, ParamType, ParameterSchema, ToolDescriptor,
    ToolDescriptorDict, ToolRegistry, ToolResult,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

#[allow(dead_code)]
#[derive(Deserialize, JsonSchema)]
struct SearchArgs {
    /// Text to search for.
    query: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    exact: bool,
    #[serde(default)]
    score: f64,
}

fn registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.tool("search", "Search the index", |args: SearchArgs| async move {
        Ok(ToolResult::success(args.query))
    });
    registry.register(ToolDescriptor::new(
        "convert",
        "Convert a value",
        ParameterSchema::new()
            .required("value", ParamType::Number, "Value to convert")
            .optional("to", ParamType::String, "Target unit")
            .required("options", ParamType::Object, "Conversion options"),
        |_| async { Ok(ToolResult::success(Value::Null)) },
    ));
    registry
}

#[test]
fn descriptor_dict_has_the_announced_shape() {
    let defs = registry().definitions();
    let value = serde_json::to_value(&defs[1]).unwrap();
    assert_eq!(
        value,
        json!({
            "name": "convert",
            "description": "Convert a value",
            "parameters": {
                "type": "object",
                "properties": {
                    "value": { "type": "number", "description": "Value to convert", "required": true },
                    "to": { "type": "string", "description": "Target unit", "required": false },
                    "options": { "type": "object", "description": "Conversion options", "required": true }
                },
                "required": ["value", "options"]
            }
        })
    );
}

#[test]
fn derived_schema_uses_defaults_for_requiredness() {
    let defs = registry().definitions();
    let value = serde_json::to_value(&defs[0]).unwrap();
    let properties = &value["parameters"]["properties"];

    assert_eq!(value["parameters"]["required"], json!(["query"]));
    assert_eq!(properties["query"]["description"], "Text to search for.");
    assert_eq!(properties["limit"]["type"], "integer");
    assert_eq!(properties["limit"]["description"], "Parameter limit");
    assert_eq!(properties["exact"]["type"], "boolean");
    assert_eq!(properties["score"]["type"], "number");
}

#[test]
fn required_flags_survive_a_round_trip() {
    for def in registry().definitions() {
        let text = serde_json::to_string(&def).unwrap();
        let parsed: ToolDescriptorDict = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, def);
        assert_eq!(parsed.parameters.required_names(), def.parameters.required_names());
    }
}

#[test]
fn tool_results_serialize_to_their_wire_form() {
    assert_eq!(
        serde_json::to_value(ToolResult::success(json!({ "n": 1 }))).unwrap(),
        json!({ "success": true, "result": { "n": 1 } })
    );
    assert_eq!(
        serde_json::to_value(ToolResult::success_with_message(4, "2+2 = 4")).unwrap(),
        json!({ "success": true, "result": 4, "message": "2+2 = 4" })
    );
    assert_eq!(
        serde_json::to_value(ToolResult::failure("nope")).unwrap(),
        json!({ "success": false, "error": "nope" })
    );
}

#[test]
fn outbound_envelopes_are_flat_objects() {
    let reply = OutboundEnvelope::tool_result(Some("calc".to_string()), ToolResult::failure("bad"));
    let value: Value = serde_json::from_str(&reply.encode().unwrap()).unwrap();
    let object = value.as_object().unwrap();
    let keys: Vec<_> = object.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["type", "tool_name", "result", "timestamp"]);
    assert_eq!(value["type"], "tool_result");

    let error = serde_json::to_value(OutboundEnvelope::error("unknown message type: ping")).unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["error"], "unknown message type: ping");
    assert!(error["timestamp"].as_f64().unwrap() >= 0.0);
}

#[test]
fn inbound_call_tool_is_classified() {
    let envelope = Envelope::decode(
        r#"{"type": "call_tool", "tool_name": "calc", "parameters": {"expression": "1+1"}, "timestamp": 12.5}"#,
    )
    .unwrap();
    assert_eq!(envelope.timestamp, Some(12.5));
    assert_eq!(
        envelope.message(),
        InboundMessage::CallTool {
            tool_name: Some("calc".to_string()),
            parameters: json!({ "expression": "1+1" }),
        }
    );

    let list = Envelope::decode(r#"{"type": "list_tools"}"#).unwrap();
    assert_eq!(list.message(), InboundMessage::ListTools);
}
