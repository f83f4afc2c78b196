//! Function contracts and the caller-supplied dispatch table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Backend-independent schema describing a callable function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FunctionContract {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ContractParameter>,
}

impl FunctionContract {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ContractParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// One parameter of a function contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractParameter {
    pub name: String,
    pub description: String,
    pub param_type: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ContractParameter {
    pub fn required(
        name: impl Into<String>,
        description: impl Into<String>,
        param_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type: param_type.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        description: impl Into<String>,
        param_type: impl Into<String>,
        default: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type: param_type.into(),
            required: false,
            default: Some(default),
        }
    }
}

/// Executor invoked with a call's serialized arguments.
pub type FunctionExecutor = Arc<dyn Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Dispatch table mapping function name to executor.
///
/// Supplied by the caller; never derived from contracts automatically.
#[derive(Clone, Default)]
pub struct FunctionMap {
    executors: HashMap<String, FunctionExecutor>,
}

impl FunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under a function name.
    pub fn register<F, Fut>(mut self, name: impl Into<String>, executor: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.executors
            .insert(name.into(), Arc::new(move |args| Box::pin(executor(args))));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FunctionExecutor> {
        self.executors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionMap")
            .field("functions", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_executor_is_invocable() {
        let map = FunctionMap::new().register("echo", |args: String| async move {
            Ok(format!("[ECHO] {args}"))
        });

        let executor = map.get("echo").unwrap();
        let result = executor("hi".into()).await.unwrap();
        assert_eq!(result, "[ECHO] hi");
        assert!(!map.contains("other"));
    }
}
