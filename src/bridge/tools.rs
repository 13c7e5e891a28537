use crate::protocol::{ParameterSchema, ToolDescriptorDict, ToolResult};
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Future returned by a tool handler.
pub type ToolFuture = BoxFuture<Result<ToolResult>>;

/// Parameter name to value mapping handed to a tool.
pub type Params = Map<String, Value>;

type ToolHandler = dyn Fn(Params) -> ToolFuture + Send + Sync;

/// A tool plugin with typed arguments.
///
/// The parameter schema is derived from `Args` once, when the tool is
/// registered. Fields with a serde default or of type `Option<T>` are optional.
#[async_trait]
pub trait ToolSpec: Send + Sync + 'static {
    type Args: DeserializeOwned + JsonSchema + Send + 'static;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn call(&self, args: Self::Args) -> Result<ToolResult>;
}

/// The registry's record for one tool: its schema and how to run it.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: ParameterSchema,
    accepts_any: bool,
    handler: Arc<ToolHandler>,
}

impl ToolDescriptor {
    /// Build a descriptor from an explicitly declared schema.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            accepts_any: false,
            handler: Arc::new(move |params: Params| -> ToolFuture { Box::pin(handler(params)) }),
        }
    }

    /// Build a descriptor whose schema is derived from `TArgs`.
    pub fn typed<TArgs, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        TArgs: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(TArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        let root = schemars::schema_for!(TArgs);
        let parameters = ParameterSchema::from_json_schema(&root);
        let accepts_any = root.schema.object.is_none();

        let user_handler = Arc::new(handler);
        let handler = move |params: Params| -> ToolFuture {
            let user_handler = Arc::clone(&user_handler);
            Box::pin(async move {
                let args: TArgs = match serde_json::from_value(Value::Object(params)) {
                    Ok(args) => args,
                    Err(e) => return Ok(ToolResult::failure(format!("invalid parameters: {e}"))),
                };
                user_handler(args).await
            })
        };

        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            accepts_any,
            handler: Arc::new(handler),
        }
    }

    pub fn from_spec<T: ToolSpec>(tool: T) -> Self {
        let name = tool.name().to_string();
        let description = tool.description().to_string();
        let tool = Arc::new(tool);
        Self::typed(name, description, move |args: T::Args| {
            let tool = Arc::clone(&tool);
            async move { tool.call(args).await }
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    #[must_use]
    pub fn to_protocol_dict(&self) -> ToolDescriptorDict {
        ToolDescriptorDict {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Run the tool. Always yields exactly one result: bad parameters and
    /// handler errors come back as [`ToolResult::Failure`].
    pub async fn execute(&self, params: Params) -> ToolResult {
        if let Some(failure) = self.check_params(&params) {
            return failure;
        }
        match (self.handler)(params).await {
            Ok(result) => result,
            Err(err) => ToolResult::failure(format!("tool execution failed: {err}")),
        }
    }

    fn check_params(&self, params: &Params) -> Option<ToolResult> {
        if !self.accepts_any {
            if let Some(key) = params.keys().find(|k| self.parameters.get(k).is_none()) {
                return Some(ToolResult::failure(format!("unexpected parameter: {key}")));
            }
        }
        self.parameters
            .iter()
            .find(|p| p.required && !params.contains_key(&p.name))
            .map(|p| ToolResult::failure(format!("missing required parameter: {}", p.name)))
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Tools by name, enumerated in registration order.
///
/// Safe to share behind an `Arc` and mutate while a session is dispatching;
/// [`ToolRegistry::list`] always returns a consistent snapshot.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<Vec<ToolDescriptor>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, replacing any previous one with the same name in
    /// its original position.
    pub fn register(&self, descriptor: ToolDescriptor) {
        if descriptor.name.is_empty() {
            tracing::warn!("Ignoring tool registration with an empty name");
            return;
        }
        let name = descriptor.name.clone();
        {
            let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = tools.iter_mut().find(|t| t.name == name) {
                *slot = descriptor;
            } else {
                tools.push(descriptor);
            }
        }
        tracing::info!("tool registered: {name}");
    }

    pub fn register_tool<T: ToolSpec>(&self, tool: T) {
        self.register(ToolDescriptor::from_spec(tool));
    }

    /// Register a closure with a typed argument struct.
    pub fn tool<TArgs, F, Fut>(&self, name: &str, description: impl Into<String>, handler: F)
    where
        TArgs: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(TArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        self.register(ToolDescriptor::typed(name, description, handler));
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ToolDescriptor> {
        if name.is_empty() {
            return None;
        }
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    /// Snapshot of every descriptor in enumeration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Protocol form of every registered tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDescriptorDict> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(ToolDescriptor::to_protocol_dict)
            .collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}
