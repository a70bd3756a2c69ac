//! Classification side tables produced by the analyzer.

use std::collections::{HashMap, HashSet};

use sp_core::ast::{LocalId, NodeId, Template};
use sp_core::intrinsics::IntrinsicKind;
use sp_core::model::{DeclId, DeclKind};
use sp_core::{BindingTime, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAnnotation {
    pub binding: BindingTime,
    /// Stage imposed by `meta.compile_time`/`meta.run_time`
    pub forced: Option<Stage>,
    /// Compile-time value spliced into run-time code as a literal
    pub coerced: bool,
}

/// Whether a statement is executed by the generator or emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtStage {
    Meta,
    Residual,
}

/// Name resolution as the rewriter needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Local(LocalId),
    Declaration {
        id: DeclId,
        path: String,
        kind: DeclKind,
    },
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct AnnotatedTemplate<'t> {
    pub template: &'t Template,
    pub(crate) exprs: HashMap<NodeId, NodeAnnotation>,
    pub(crate) stmts: HashMap<NodeId, StmtStage>,
    pub(crate) locals: HashMap<LocalId, BindingTime>,
    pub(crate) scopes: HashMap<NodeId, Vec<LocalId>>,
    pub(crate) references: HashMap<NodeId, Reference>,
    pub(crate) intrinsics: HashMap<NodeId, IntrinsicKind>,
    pub(crate) static_bases: HashSet<NodeId>,
}

impl<'t> AnnotatedTemplate<'t> {
    pub(crate) fn new(template: &'t Template) -> Self {
        Self {
            template,
            exprs: HashMap::new(),
            stmts: HashMap::new(),
            locals: HashMap::new(),
            scopes: HashMap::new(),
            references: HashMap::new(),
            intrinsics: HashMap::new(),
            static_bases: HashSet::new(),
        }
    }

    pub fn expr(&self, id: NodeId) -> Option<&NodeAnnotation> {
        self.exprs.get(&id)
    }

    /// Classification of an expression node; unannotated nodes are `Both`.
    pub fn binding(&self, id: NodeId) -> BindingTime {
        self.exprs
            .get(&id)
            .map(|annotation| annotation.binding)
            .unwrap_or(BindingTime::Both)
    }

    pub fn stmt_stage(&self, id: NodeId) -> StmtStage {
        self.stmts.get(&id).copied().unwrap_or(StmtStage::Residual)
    }

    pub fn local(&self, id: LocalId) -> Option<BindingTime> {
        self.locals.get(&id).copied()
    }

    /// Locals declared directly in a block, in declaration order.
    pub fn scope(&self, block: NodeId) -> &[LocalId] {
        self.scopes.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reference(&self, id: NodeId) -> Option<&Reference> {
        self.references.get(&id)
    }

    /// Intrinsic invoked by a call node, or read by a reference node.
    pub fn intrinsic(&self, id: NodeId) -> Option<&IntrinsicKind> {
        self.intrinsics.get(&id)
    }

    /// Whether the node names a namespace or type rather than a value.
    pub fn is_static(&self, id: NodeId) -> bool {
        self.static_bases.contains(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeAnnotation)> {
        self.exprs.iter()
    }
}
