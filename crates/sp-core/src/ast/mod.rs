//! Template AST.
//!
//! AST are trees, so Box<T> is fine. Every node carries a [`NodeId`] that is
//! unique within one template; the semantic model and the analyzer key their
//! side tables by it.

use crate::span::Span;

mod expr;
mod kind;
mod ops;
pub mod print;
mod stmt;

pub use expr::*;
pub use kind::*;
pub use ops::*;
pub use stmt::*;

pub type NodeId = u32;

/// Identity of a local variable: the id of the node that declares it
/// (a local statement, a template parameter, a foreach statement or a catch
/// clause).
pub type LocalId = NodeId;

common_enum! {
    #[derive(Copy, Eq, Hash)]
    pub enum TemplateKind {
        Method,
        Getter,
        Setter,
    }
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Method => "method",
            TemplateKind::Getter => "getter",
            TemplateKind::Setter => "setter",
        }
    }
}

common_enum! {
    /// Stage at which a template parameter receives its value.
    #[derive(Copy, Eq, Hash)]
    pub enum ParamStage {
        /// Supplied by the weave site while generating.
        CompileTime,
        /// A parameter of the generated code.
        RunTime,
    }
}

common_struct! {
    pub struct TemplateParam {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        pub name: String,
        pub stage: ParamStage,
    }
}

common_struct! {
    /// Unit of work for the classifier: a method/property/accessor body.
    pub struct Template {
        pub name: String,
        pub kind: TemplateKind,
        #[serde(default)]
        pub params: Vec<TemplateParam>,
        pub body: Block,
    }
}

impl Template {
    pub fn new(name: impl Into<String>, kind: TemplateKind, body: Block) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            body,
        }
    }

    pub fn with_param(mut self, param: TemplateParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn param(&self, id: NodeId) -> Option<&TemplateParam> {
        self.params.iter().find(|param| param.id == id)
    }
}
