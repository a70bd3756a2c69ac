//! Scope propagation analyzer.
//!
//! Walks a template once per pass, classifying every expression bottom-up
//! and every statement as compile-time or emitted. Locals receive their
//! binding time from their first determining use; because a use may precede
//! that determination in source order, passes repeat until no local changes.
//! Locals that are still undetermined then default to run-time and one final
//! pass produces the reported annotations and conflicts.

use std::collections::HashSet;

use sp_core::ast::print;
use sp_core::ast::{Expr, ExprKind, NodeId, ParamStage, Template};
use sp_core::intrinsics::IntrinsicKind;
use sp_core::model::{DeclId, SemanticModel, SymbolRef, TypeShape};
use sp_core::span::Span;
use sp_core::{BindingTime, Stage, SymbolTable};

use crate::annotate::{AnnotatedTemplate, NodeAnnotation, Reference, StmtStage};
use crate::conflict::{Conflict, ConflictKind};
use crate::report;

use scope::ScopeRecord;

mod expr;
mod scope;
mod stmt;

/// Classifies `template` and collects every conflict found.
///
/// The template is valid for rewriting only when no returned conflict is an
/// error.
pub fn annotate<'t, M>(
    template: &'t Template,
    model: &M,
    table: &SymbolTable,
) -> (AnnotatedTemplate<'t>, Vec<Conflict>)
where
    M: SemanticModel + ?Sized,
{
    let mut analyzer = Analyzer::new(template, model, table);
    analyzer.run();
    analyzer.finish()
}

#[derive(Debug, Clone, Copy)]
struct LoopFrame {
    stage: Stage,
    residual_depth: usize,
    in_try: bool,
}

#[derive(Debug, Default)]
struct Context {
    /// Number of enclosing run-time controlled constructs
    residual_depth: usize,
    in_try: bool,
    loops: Vec<LoopFrame>,
}

pub(crate) struct Analyzer<'a, 't, M: ?Sized> {
    template: &'t Template,
    model: &'a M,
    table: &'a SymbolTable,
    scopes: ScopeRecord,
    out: AnnotatedTemplate<'t>,
    conflicts: Vec<Conflict>,
    reported: HashSet<(NodeId, &'static str)>,
    ctx: Context,
}

impl<'a, 't, M> Analyzer<'a, 't, M>
where
    M: SemanticModel + ?Sized,
{
    fn new(template: &'t Template, model: &'a M, table: &'a SymbolTable) -> Self {
        Self {
            template,
            model,
            table,
            scopes: ScopeRecord::default(),
            out: AnnotatedTemplate::new(template),
            conflicts: Vec::new(),
            reported: HashSet::new(),
            ctx: Context::default(),
        }
    }

    fn run(&mut self) {
        let mut pass = 0usize;
        loop {
            pass += 1;
            self.out = AnnotatedTemplate::new(self.template);
            self.conflicts.clear();
            self.reported.clear();
            self.ctx = Context::default();

            let params: Vec<_> = self
                .template
                .params
                .iter()
                .map(|param| {
                    let stage = match param.stage {
                        ParamStage::CompileTime => Stage::Meta,
                        ParamStage::RunTime => Stage::Object,
                    };
                    (param.id, param.name.clone(), TypeShape::Unknown, stage)
                })
                .collect();
            let template = self.template;
            self.block_with(&template.body, &params);

            if pass > 2 * self.scopes.len() + 4 {
                tracing::warn!(
                    "binding times of `{}` did not settle after {} passes",
                    self.template.name,
                    pass
                );
                break;
            }
            if self.scopes.take_changed() {
                continue;
            }
            let defaulted = self.scopes.default_undetermined();
            if defaulted > 0 {
                tracing::trace!("defaulted {} locals to run-time", defaulted);
                continue;
            }
            break;
        }
        tracing::debug!(
            "classified template `{}` in {} passes: {} nodes, {} conflicts",
            self.template.name,
            pass,
            self.out.exprs.len(),
            self.conflicts.len()
        );
    }

    fn finish(mut self) -> (AnnotatedTemplate<'t>, Vec<Conflict>) {
        self.out.locals = self.scopes.bindings();
        (self.out, self.conflicts)
    }

    fn record(&mut self, id: NodeId, binding: BindingTime) {
        tracing::trace!("node {} is {}", id, binding);
        self.out
            .exprs
            .entry(id)
            .and_modify(|annotation| annotation.binding = binding)
            .or_insert(NodeAnnotation {
                binding,
                forced: None,
                coerced: false,
            });
    }

    fn record_forced(&mut self, id: NodeId, binding: BindingTime, stage: Stage) {
        self.out.exprs.insert(
            id,
            NodeAnnotation {
                binding,
                forced: Some(stage),
                coerced: false,
            },
        );
    }

    /// Turns a compile-time child of run-time code into a spliced value.
    fn coerce(&mut self, expr: &Expr) {
        self.compile_time_operand(expr);
        if let Some(annotation) = self.out.exprs.get_mut(&expr.id) {
            annotation.binding = BindingTime::MetaOnlyProducingBoth;
            annotation.coerced = true;
        }
    }

    /// Reports every `proceed` call inside `expr`, an expression the generator
    /// evaluates. Layer bodies only exist in the generated code.
    fn compile_time_operand(&mut self, expr: &Expr) {
        let proceeds = matches!(expr.kind, ExprKind::Call(_))
            && self.out.intrinsic(expr.id) == Some(&IntrinsicKind::Proceed);
        if !proceeds {
            expr.for_each_child(|child| self.compile_time_operand(child));
            return;
        }
        let intrinsic = self
            .intrinsic_name(expr)
            .unwrap_or_else(|| "proceed".to_string());
        self.conflict_at(
            ConflictKind::IntrinsicMisuse {
                intrinsic,
                reason: "produces run-time code and cannot be evaluated at compile time"
                    .to_string(),
            },
            expr.id,
            expr.span,
        );
    }

    fn record_stmt(&mut self, id: NodeId, stage: StmtStage) {
        self.out.stmts.insert(id, stage);
    }

    fn conflict(&mut self, conflict: Conflict) {
        let code = report::code(&conflict.kind);
        if self.reported.insert((conflict.node, code)) {
            self.conflicts.push(conflict);
        }
    }

    fn conflict_at(&mut self, kind: ConflictKind, node: NodeId, span: Span) {
        self.conflict(Conflict::new(kind, node, span));
    }

    /// Rejects a compile-time side effect where the generator cannot run it.
    fn meta_side_effect(&mut self, node: NodeId, span: Span, construct: String) {
        if self.ctx.in_try {
            self.conflict_at(ConflictKind::MetaExceptionHandling { construct }, node, span);
        } else if self.ctx.residual_depth > 0 {
            self.conflict_at(
                ConflictKind::MetaStatementInResidualContext { construct },
                node,
                span,
            );
        }
    }

    /// Compile-time controlled constructs are allowed anywhere except inside
    /// exception handling.
    fn meta_construct(&mut self, node: NodeId, span: Span, construct: String) {
        if self.ctx.in_try {
            self.conflict_at(ConflictKind::MetaExceptionHandling { construct }, node, span);
        }
    }

    fn residual<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.ctx.residual_depth += 1;
        let result = f(self);
        self.ctx.residual_depth -= 1;
        result
    }

    fn reference_of(&self, symbol: SymbolRef) -> Reference {
        match symbol {
            SymbolRef::Local(id) => Reference::Local(id),
            SymbolRef::Declaration(id) => match self.model.declaration(id) {
                Some(decl) => Reference::Declaration {
                    id,
                    path: self.path(id).unwrap_or_else(|| decl.name.clone()),
                    kind: decl.kind,
                },
                None => Reference::Unresolved,
            },
            SymbolRef::Unresolved => Reference::Unresolved,
        }
    }

    fn path(&self, id: DeclId) -> Option<String> {
        self.table.qualified_name(id).or_else(|| {
            sp_core::model::qualified_name(id, |id| self.model.declaration(id))
        })
    }

    fn describe(expr: &Expr) -> String {
        let text = print::expr(expr);
        if text.chars().count() > 48 {
            let head: String = text.chars().take(45).collect();
            format!("`{}...`", head)
        } else {
            format!("`{}`", text)
        }
    }
}
