//! Service catalog parsing, validation and argument shaping
//!
//! The catalog maps each MCP tool onto a remote Coin Railz service and
//! describes how tool arguments become the service payload. It is embedded in
//! the binary and validated when loaded.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::x402::outcome::{is_free_tier, HttpMethod, ServiceCall};

/// Catalog compiled into the binary
const BUILTIN_CATALOG: &str = include_str!("services.json");

/// Appended to the description of free-tier services
pub const FREE_TIER_NOTE: &str = "FIRST CALL FREE for new users!";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse service catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid tool definition {tool}: {reason}")]
    InvalidTool { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Arguments for {tool} must be a JSON object")]
    ArgumentsNotObject { tool: String },

    #[error("Missing required argument '{argument}' for {tool}")]
    MissingArgument { tool: String, argument: String },

    #[error("Argument '{argument}' for {tool} must be {expected}")]
    InvalidArgument {
        tool: String,
        argument: String,
        expected: &'static str,
    },
}

// ============================================================================
// Parameter Definition
// ============================================================================

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ParamKind::String => "a string",
            ParamKind::Integer => "an integer",
            ParamKind::Number => "a number",
            ParamKind::Boolean => "a boolean",
            ParamKind::Array => "an array",
            ParamKind::Object => "an object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
        }
    }
}

/// One tool argument and where it lands in the payload
#[derive(Debug, Clone, Deserialize)]
pub struct ParamSpec {
    /// Argument name exposed to the agent
    pub name: String,

    /// Payload key (defaults to `name`)
    #[serde(default)]
    pub key: Option<String>,

    #[serde(rename = "type")]
    pub kind: ParamKind,

    /// Element type for arrays
    #[serde(default)]
    pub items: Option<ParamKind>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<Value>,

    /// Integer values above this are clamped
    #[serde(default)]
    pub maximum: Option<i64>,

    /// Upper-case string values before dispatch
    #[serde(default)]
    pub uppercase: bool,

    /// The argument object is sent as the whole payload
    #[serde(default)]
    pub passthrough: bool,
}

impl ParamSpec {
    pub fn payload_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("parameter name cannot be empty".into());
        }
        if self.passthrough && self.kind != ParamKind::Object {
            return Err(format!("pass-through parameter {} must be an object", self.name));
        }
        if self.maximum.is_some() && self.kind != ParamKind::Integer {
            return Err(format!("maximum on non-integer parameter {}", self.name));
        }
        if self.uppercase && self.kind != ParamKind::String {
            return Err(format!("uppercase on non-string parameter {}", self.name));
        }
        if self.items.is_some() && self.kind != ParamKind::Array {
            return Err(format!("items on non-array parameter {}", self.name));
        }
        if let Some(default) = &self.default {
            if self.required {
                return Err(format!("required parameter {} has a default", self.name));
            }
            if !self.kind.matches(default) {
                return Err(format!("default for {} is not {}", self.name, self.kind.expected()));
            }
        }
        Ok(())
    }

    /// Null and empty optional lists fall back to the default. Empty strings
    /// only count as absent when there is no default to fall back to.
    fn is_blank(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => !self.required && self.default.is_none() && s.is_empty(),
            Value::Array(items) => !self.required && items.is_empty(),
            _ => false,
        }
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.kind.as_str()));
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(items) = self.items {
            schema.insert("items".into(), json!({ "type": items.as_str() }));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if let Some(maximum) = self.maximum {
            schema.insert("maximum".into(), json!(maximum));
        }
        Value::Object(schema)
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// A tool backed by one remote service
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSpec {
    /// Tool name (used in tools/call)
    pub name: String,

    /// Service identifier appended to `/x402/`
    pub service: String,

    #[serde(default)]
    pub category: Option<String>,

    /// Advertised price, display only
    pub price: String,

    pub description: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("tool name cannot be empty".into());
        }
        if self.service.is_empty() || self.service.starts_with('/') {
            return Err(format!("invalid service path '{}'", self.service));
        }
        if self.description.is_empty() {
            return Err("tool description cannot be empty".into());
        }

        let mut seen = HashSet::new();
        for param in &self.params {
            param.validate()?;
            if !seen.insert(param.name.as_str()) {
                return Err(format!("duplicate parameter {}", param.name));
            }
            if param.passthrough && self.params.len() != 1 {
                return Err("a pass-through parameter must be the only parameter".into());
            }
        }
        Ok(())
    }

    /// Whether the platform advertises this service as free tier
    pub fn is_free_tier(&self) -> bool {
        is_free_tier(&self.service)
    }

    /// Description shown in tools/list
    pub fn full_description(&self) -> String {
        if self.is_free_tier() {
            format!("{}\n\nPrice: {} ({})", self.description, self.price, FREE_TIER_NOTE)
        } else {
            format!("{}\n\nPrice: {}", self.description, self.price)
        }
    }

    /// JSON Schema for the tool input
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Turn tool arguments into a service call
    pub fn shape(&self, arguments: Option<&Value>) -> Result<ServiceCall, CatalogError> {
        let empty = Map::new();
        let args = match arguments {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(CatalogError::ArgumentsNotObject {
                    tool: self.name.clone(),
                })
            }
        };

        if let Some(param) = self.params.iter().find(|p| p.passthrough) {
            let payload = match args.get(&param.name) {
                Some(Value::Object(inner)) => inner.clone(),
                Some(v) if !v.is_null() => return Err(self.invalid(param)),
                _ => return Err(self.missing(param)),
            };
            return Ok(self.call(payload));
        }

        let mut payload = Map::new();
        for param in &self.params {
            let value = match args.get(&param.name) {
                Some(v) if !param.is_blank(v) => self.coerce(param, v)?,
                _ => match (&param.default, param.required) {
                    (Some(default), _) => default.clone(),
                    (None, true) => return Err(self.missing(param)),
                    (None, false) => continue,
                },
            };
            payload.insert(param.payload_key().to_string(), value);
        }

        for name in args.keys() {
            if !self.params.iter().any(|p| &p.name == name) {
                tracing::debug!(tool = %self.name, argument = %name, "Ignoring unknown argument");
            }
        }

        Ok(self.call(payload))
    }

    fn coerce(&self, param: &ParamSpec, value: &Value) -> Result<Value, CatalogError> {
        if !param.kind.matches(value) {
            return Err(self.invalid(param));
        }

        if let (Some(items), Value::Array(elements)) = (param.items, value) {
            if !elements.iter().all(|e| items.matches(e)) {
                return Err(self.invalid(param));
            }
        }

        match (value, param.maximum) {
            (Value::String(s), _) if param.uppercase => Ok(Value::String(s.to_uppercase())),
            // u64 beyond i64::MAX clamps too
            (Value::Number(n), Some(maximum)) => {
                Ok(json!(n.as_i64().map_or(maximum, |v| v.min(maximum))))
            }
            _ => Ok(value.clone()),
        }
    }

    fn call(&self, payload: Map<String, Value>) -> ServiceCall {
        match self.method {
            HttpMethod::Post => ServiceCall::post(&self.service, payload),
            HttpMethod::Get => ServiceCall::get(&self.service),
        }
    }

    fn missing(&self, param: &ParamSpec) -> CatalogError {
        CatalogError::MissingArgument {
            tool: self.name.clone(),
            argument: param.name.clone(),
        }
    }

    fn invalid(&self, param: &ParamSpec) -> CatalogError {
        CatalogError::InvalidArgument {
            tool: self.name.clone(),
            argument: param.name.clone(),
            expected: param.kind.expected(),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The full set of tools served over MCP
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCatalog {
    /// Server name reported on initialize
    pub name: String,

    pub tools: Vec<ToolSpec>,
}

impl ServiceCatalog {
    /// Load the catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_str(BUILTIN_CATALOG)
    }

    /// Load a catalog from a JSON string
    pub fn from_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(CatalogError::DuplicateTool(tool.name.clone()));
            }
        }

        for tool in &self.tools {
            tool.validate().map_err(|reason| CatalogError::InvalidTool {
                tool: tool.name.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Resolve a tool and shape its arguments in one step
    pub fn prepare(&self, name: &str, arguments: Option<&Value>) -> Result<ServiceCall, CatalogError> {
        self.get_tool(name)
            .ok_or_else(|| CatalogError::UnknownTool(name.to_string()))?
            .shape(arguments)
    }
}
