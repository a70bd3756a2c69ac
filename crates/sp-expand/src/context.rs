//! Weave-site context: everything a generator needs from the place where a
//! template is applied.
//!
//! The intrinsics of the `meta` API read from this context instead of
//! ambient state, so one generator can be expanded for many sites, in any
//! order or in parallel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sp_core::ast::print::Formatting;
use sp_core::ast::{Block, Expr};
use sp_core::Result;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TargetParameter {
    pub name: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub index: usize,
}

/// Compile-time view of the declaration being woven.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TargetDeclaration {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<TargetParameter>,
}

fn default_kind() -> String {
    "method".to_string()
}

impl TargetDeclaration {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_kind(),
            return_type: None,
            parameters: Vec::new(),
        }
    }

    pub fn returning(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let index = self.parameters.len();
        self.parameters.push(TargetParameter {
            name: name.into(),
            type_name: type_name.into(),
            index,
        });
        self
    }

    /// Members exposed through `meta.target`.
    pub fn member(&self, name: &str) -> Option<Value> {
        let value = match name {
            "name" => Value::Str(self.name.clone()),
            "kind" => Value::Str(self.kind.clone()),
            "parameter_count" => Value::Int(self.parameters.len() as i64),
            "return_type" => self
                .return_type
                .clone()
                .map(Value::Str)
                .unwrap_or(Value::Null),
            "parameters" => Value::List(
                self.parameters
                    .iter()
                    .cloned()
                    .map(Value::Parameter)
                    .collect(),
            ),
            _ => return None,
        };
        Some(value)
    }
}

impl TargetParameter {
    pub fn member(&self, name: &str) -> Option<Value> {
        let value = match name {
            "name" => Value::Str(self.name.clone()),
            "type_name" => Value::Str(self.type_name.clone()),
            "index" => Value::Int(self.index as i64),
            _ => return None,
        };
        Some(value)
    }
}

/// Body of the next layer, spliced by `meta.proceed()`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ProceedBody {
    Block(Block),
    /// Expression-bodied member.
    Expr(Expr),
}

/// Compile-time function callable from template code, keyed by the
/// qualified name of its declaration.
pub type MetaFunction = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub struct WeaveSiteContext {
    pub target: Arc<TargetDeclaration>,
    pub tags: BTreeMap<String, Value>,
    /// Values of compile-time template parameters, by parameter name.
    pub arguments: BTreeMap<String, Value>,
    pub proceed: Option<ProceedBody>,
    pub formatting: Formatting,
    /// Compile-time values of meta-only fields and properties.
    pub globals: BTreeMap<String, Value>,
    pub functions: HashMap<String, MetaFunction>,
    /// Aspect that applied the template, recorded as provenance.
    pub aspect: Option<String>,
}

impl std::fmt::Debug for WeaveSiteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaveSiteContext")
            .field("target", &self.target.name)
            .field("tags", &self.tags)
            .field("arguments", &self.arguments)
            .field("proceed", &self.proceed.is_some())
            .field("formatting", &self.formatting)
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("aspect", &self.aspect)
            .finish()
    }
}

impl WeaveSiteContext {
    pub fn new(target: TargetDeclaration) -> Self {
        Self {
            target: Arc::new(target),
            tags: BTreeMap::new(),
            arguments: BTreeMap::new(),
            proceed: None,
            formatting: Formatting::default(),
            globals: BTreeMap::new(),
            functions: HashMap::new(),
            aspect: None,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_proceed(mut self, body: ProceedBody) -> Self {
        self.proceed = Some(body);
        self
    }

    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    pub fn with_global(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(path.into(), value.into());
        self
    }

    pub fn with_function<F>(mut self, path: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(path.into(), Arc::new(function));
        self
    }

    pub fn with_aspect(mut self, aspect: impl Into<String>) -> Self {
        self.aspect = Some(aspect.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_members() {
        let target = TargetDeclaration::method("add")
            .returning("int")
            .with_parameter("a", "int")
            .with_parameter("b", "int");
        assert_eq!(target.member("parameter_count"), Some(Value::Int(2)));
        assert_eq!(target.member("return_type"), Some(Value::str("int")));
        let Some(Value::List(params)) = target.member("parameters") else {
            panic!("expected parameter list");
        };
        let Value::Parameter(second) = &params[1] else {
            panic!("expected parameter");
        };
        assert_eq!(second.member("index"), Some(Value::Int(1)));
        assert_eq!(target.member("missing"), None);
    }
}
