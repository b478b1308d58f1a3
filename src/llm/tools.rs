use serde_json::{Map, Value, json};

/// JSON schema primitive types supported for tool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolParamType {
    Integer,
    Number,
    String,
    Boolean,
    Object,
    Array,
}

impl ToolParamType {
    fn as_str(self) -> &'static str {
        match self {
            ToolParamType::Integer => "integer",
            ToolParamType::Number => "number",
            ToolParamType::String => "string",
            ToolParamType::Boolean => "boolean",
            ToolParamType::Object => "object",
            ToolParamType::Array => "array",
        }
    }
}

/// One function parameter definition.
#[derive(Debug, Clone)]
pub struct ToolParam {
    /// Parameter name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// JSON schema type.
    pub kind: ToolParamType,
    /// Whether the parameter is required.
    pub required: bool,
    /// Element type for array parameters.
    pub items: Option<ToolParamType>,
    /// Closed set of accepted string values.
    pub allowed: Vec<String>,
}

impl ToolParam {
    /// Builds a parameter definition.
    pub fn new(
        name: impl Into<String>,
        kind: ToolParamType,
        required: bool,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            kind,
            required,
            items: None,
            allowed: Vec::new(),
        }
    }

    /// Required parameter with a description.
    pub fn required(name: impl Into<String>, kind: ToolParamType, description: &str) -> Self {
        Self::new(name, kind, true, Some(description.to_string()))
    }

    /// Optional parameter with a description.
    pub fn optional(name: impl Into<String>, kind: ToolParamType, description: &str) -> Self {
        Self::new(name, kind, false, Some(description.to_string()))
    }

    /// Declares the element type of an array parameter.
    pub fn of(mut self, items: ToolParamType) -> Self {
        self.items = Some(items);
        self
    }

    /// Restricts a string parameter to the given values.
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = values.iter().map(|value| value.to_string()).collect();
        self
    }

    fn to_schema(&self) -> Value {
        let mut def = Map::new();
        def.insert(
            "type".to_string(),
            Value::String(self.kind.as_str().to_string()),
        );
        if let Some(description) = &self.description {
            def.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        if self.kind == ToolParamType::Array {
            let items = self.items.unwrap_or(ToolParamType::String);
            def.insert("items".to_string(), json!({ "type": items.as_str() }));
        }
        if !self.allowed.is_empty() {
            def.insert("enum".to_string(), json!(self.allowed));
        }
        Value::Object(def)
    }
}

/// Callable tool function definition.
#[derive(Debug, Clone)]
pub struct ToolFunction {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameter definitions.
    pub params: Vec<ToolParam>,
}

impl ToolFunction {
    /// Creates a function definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Appends one parameter definition.
    pub fn with_param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    /// JSON schema object describing the function arguments.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            properties.insert(param.name.clone(), param.to_schema());
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

/// Tool wrapper matching chat-completions function-calling schema.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Function declaration.
    pub function: ToolFunction,
}

impl ToolDefinition {
    /// Wraps a function definition as a tool.
    pub fn from_function(function: ToolFunction) -> Self {
        Self { function }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Serializes the tool declaration to chat-completions JSON.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.function.name,
                "description": self.function.description,
                "parameters": self.function.parameters_schema(),
            }
        })
    }

    /// Serializes the tool declaration to Anthropic Messages JSON.
    pub fn to_anthropic_json(&self) -> Value {
        json!({
            "name": self.function.name,
            "description": self.function.description,
            "input_schema": self.function.parameters_schema(),
        })
    }
}

/// Tool call emitted by a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Provider-generated call id.
    pub id: String,
    /// Tool/function name.
    pub name: String,
    /// Arguments payload.
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    fn args_as_string(&self) -> String {
        match &self.args {
            Value::String(value) => value.clone(),
            other => serde_json::to_string(other).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    /// Arguments as a JSON object, treating missing arguments as `{}`.
    pub fn args_object(&self) -> Value {
        match &self.args {
            Value::Null => Value::Object(Map::new()),
            Value::String(raw) if raw.trim().is_empty() => Value::Object(Map::new()),
            other => other.clone(),
        }
    }

    /// Serializes a tool call payload to chat-completions JSON.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": self.args_as_string(),
            }
        })
    }

    /// Serializes a tool call as an Anthropic `tool_use` block.
    pub fn to_anthropic_block(&self) -> Value {
        json!({
            "type": "tool_use",
            "id": self.id,
            "name": self.name,
            "input": self.args_object(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> ToolDefinition {
        ToolDefinition::from_function(
            ToolFunction::new("lookup", "Look something up")
                .with_param(ToolParam::required("q", ToolParamType::String, "Query"))
                .with_param(
                    ToolParam::optional("terms", ToolParamType::Array, "Terms")
                        .of(ToolParamType::String),
                )
                .with_param(
                    ToolParam::optional("kind", ToolParamType::String, "Kind")
                        .one_of(&["a", "b"]),
                ),
        )
    }

    #[test]
    fn schema_lists_required_params_only() {
        let schema = lookup().function.parameters_schema();
        assert_eq!(schema["required"], json!(["q"]));
        assert_eq!(schema["properties"]["terms"]["items"]["type"], "string");
        assert_eq!(schema["properties"]["kind"]["enum"], json!(["a", "b"]));
    }

    #[test]
    fn provider_shapes_differ_in_envelope() {
        let tool = lookup();
        assert_eq!(tool.to_json()["function"]["name"], "lookup");
        assert_eq!(tool.to_anthropic_json()["name"], "lookup");
        assert!(tool.to_anthropic_json()["input_schema"].is_object());
    }

    #[test]
    fn call_arguments_are_stringified_for_chat_completions() {
        let call = ToolCall::new("call_1", "lookup", json!({"q": "malaria"}));
        assert_eq!(call.to_json()["function"]["arguments"], r#"{"q":"malaria"}"#);
        assert_eq!(call.to_anthropic_block()["input"]["q"], "malaria");
    }

    #[test]
    fn empty_arguments_become_an_empty_object() {
        let call = ToolCall::new("call_1", "list_servers", Value::Null);
        assert_eq!(call.args_object(), json!({}));
    }
}
