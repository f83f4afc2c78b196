//! Reply generation options.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::tools::FunctionContract;

/// Options passed through the middleware pipeline to the backend.
///
/// Middlewares hand these through untouched unless they explicitly
/// rewrite them (the function-call middleware appends its contracts).
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    /// Function contracts advertised to the backend.
    #[builder(default)]
    #[serde(default)]
    pub functions: Vec<FunctionContract>,
}
