use sp_core::ast::NodeId;
use sp_core::span::Span;
use sp_core::{BindingTime, Stage};

/// What went wrong while classifying a template.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ConflictKind {
    /// Compile-time and run-time parts of one expression cannot be reconciled.
    StageConflict { meta: String, object: String },
    /// `meta.compile_time`/`meta.run_time` applied to a value of the wrong stage.
    ForcedStageMismatch { found: BindingTime, stage: Stage },
    /// A compile-time side effect inside a construct emitted into the
    /// generated code.
    MetaStatementInResidualContext { construct: String },
    LocalVariableAmbiguousCoercion {
        local: String,
        fixed: BindingTime,
        attempted: BindingTime,
    },
    IntrinsicMisuse { intrinsic: String, reason: String },
    /// Compile-time code inside `try`/`catch`/`finally`.
    MetaExceptionHandling { construct: String },
    /// `break`/`continue` with no enclosing loop.
    InvalidJump { keyword: String },
    /// Compile-time assignment whose target is not a local variable.
    UnsupportedMetaAssignment { target: String },
    UnresolvedSymbolDefaulted { name: String, default: BindingTime },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub node: NodeId,
    pub span: Span,
    /// Secondary locations, e.g. where a local received its binding time.
    #[serde(default)]
    pub related: Vec<(Span, String)>,
}

impl Conflict {
    pub fn new(kind: ConflictKind, node: NodeId, span: Span) -> Self {
        Self {
            kind,
            node,
            span,
            related: Vec::new(),
        }
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push((span, message.into()));
        self
    }

    /// Conflicts that are informational only never block generation.
    pub fn is_error(&self) -> bool {
        !matches!(self.kind, ConflictKind::UnresolvedSymbolDefaulted { .. })
    }
}
