use sp_core::ast::{
    Expr, ExprAssign, ExprCall, ExprKind, InterpolatedPartKind, LocalId, NodeId,
};
use sp_core::intrinsics::{IntrinsicKind, IntrinsicSpec, IntrinsicUsage};
use sp_core::model::{shape_of, SemanticModel, SymbolRef, TypeShape};
use sp_core::span::Span;
use sp_core::{BindingTime, Stage};

use crate::analyzer::scope::Determination;
use crate::analyzer::Analyzer;
use crate::annotate::Reference;
use crate::conflict::{Conflict, ConflictKind};

impl<'a, 't, M> Analyzer<'a, 't, M>
where
    M: SemanticModel + ?Sized,
{
    pub(super) fn analyze_expr(&mut self, expr: &Expr) -> BindingTime {
        self.analyze_expr_at(expr, false)
    }

    /// `statement` is set for the root expression of an expression statement.
    pub(super) fn analyze_expr_at(&mut self, expr: &Expr, statement: bool) -> BindingTime {
        let binding = match &expr.kind {
            ExprKind::Literal(_) => BindingTime::Both,
            ExprKind::Ident(_) | ExprKind::Member(_) => self.reference(expr, false),
            ExprKind::Call(call) => self.call(expr, call, statement),
            ExprKind::Index(index) => {
                self.analyze_expr(&index.base);
                self.analyze_expr(&index.index);
                self.combine(expr, &[&index.base, &index.index], None)
            }
            ExprKind::Binary(binary) => {
                self.analyze_expr(&binary.lhs);
                self.analyze_expr(&binary.rhs);
                self.combine(expr, &[&binary.lhs, &binary.rhs], None)
            }
            ExprKind::Unary(unary) => {
                self.analyze_expr(&unary.operand);
                self.combine(expr, &[&unary.operand], None)
            }
            ExprKind::Assign(assign) => self.assign(expr, assign),
            ExprKind::Conditional(cond) => {
                self.analyze_expr(&cond.cond);
                self.analyze_expr(&cond.then);
                self.analyze_expr(&cond.elze);
                self.combine(expr, &[&cond.cond, &cond.then, &cond.elze], None)
            }
            ExprKind::Paren(paren) => {
                self.analyze_expr(&paren.inner);
                self.combine(expr, &[&paren.inner], None)
            }
            ExprKind::Array(array) => {
                let values: Vec<&Expr> = array.elements.iter().map(|el| &el.value).collect();
                for value in &values {
                    self.analyze_expr(value);
                }
                self.combine(expr, &values, None)
            }
            ExprKind::Interpolated(interp) => {
                let holes: Vec<&Expr> = interp
                    .parts
                    .iter()
                    .filter_map(|part| match &part.kind {
                        InterpolatedPartKind::Hole(hole) => Some(hole),
                        InterpolatedPartKind::Text(_) => None,
                    })
                    .collect();
                for hole in &holes {
                    self.analyze_expr(hole);
                }
                self.combine(expr, &holes, None)
            }
        };
        self.record(expr.id, binding);
        binding
    }

    /// Static value shape, looking through the stage casts.
    pub(super) fn shape(&self, expr: &Expr) -> TypeShape {
        let expr = expr.peel_parens();
        if let ExprKind::Call(call) = &expr.kind {
            if matches!(
                self.out.intrinsics.get(&expr.id),
                Some(IntrinsicKind::CompileTime | IntrinsicKind::RunTime)
            ) {
                if let Some(arg) = call.args.first() {
                    return self.shape(arg);
                }
            }
        }
        shape_of(expr, self.model, &|id| self.scopes.shape(id))
    }

    /// Combines child classifications with `join`.
    ///
    /// When run-time code is involved, liftable compile-time children become
    /// spliced values; any other compile-time child is a conflict. `pinned`
    /// is a classification the node must also agree with, such as the
    /// invoked declaration, and is never coerced.
    pub(super) fn combine(
        &mut self,
        node: &Expr,
        children: &[&Expr],
        pinned: Option<BindingTime>,
    ) -> BindingTime {
        let mut bindings: Vec<BindingTime> =
            children.iter().map(|child| self.out.binding(child.id)).collect();
        if bindings.iter().any(|binding| binding.is_ambiguous())
            || pinned.is_some_and(BindingTime::is_ambiguous)
        {
            return BindingTime::Ambiguous;
        }

        let object = children
            .iter()
            .zip(&bindings)
            .find(|(_, binding)| **binding == BindingTime::ObjectOnly)
            .map(|(child, _)| Self::describe(child));
        let object = match (object, pinned) {
            (Some(object), _) => Some(object),
            (None, Some(BindingTime::ObjectOnly)) => Some(Self::describe(node)),
            _ => None,
        };

        if let Some(object) = &object {
            let mut failed = false;
            for (child, binding) in children.iter().zip(bindings.iter_mut()) {
                if *binding != BindingTime::MetaOnly {
                    continue;
                }
                if self.shape(child).is_liftable() {
                    self.coerce(child);
                    *binding = BindingTime::MetaOnlyProducingBoth;
                    continue;
                }
                failed = true;
                let kind = match self.intrinsic_name(child) {
                    Some(intrinsic) => ConflictKind::IntrinsicMisuse {
                        intrinsic,
                        reason: "is a compile-time handle and cannot be used in run-time code"
                            .to_string(),
                    },
                    None => ConflictKind::StageConflict {
                        meta: Self::describe(child),
                        object: object.clone(),
                    },
                };
                self.conflict_at(kind, child.id, child.span);
            }
            if failed {
                return BindingTime::Ambiguous;
            }
        }

        let result = BindingTime::join_all(bindings.iter().copied())
            .join(pinned.unwrap_or(BindingTime::Both));
        if result.is_ambiguous() {
            self.conflict_at(
                ConflictKind::StageConflict {
                    meta: Self::describe(node),
                    object: object.unwrap_or_else(|| "code".to_string()),
                },
                node.id,
                node.span,
            );
        }
        result
    }

    /// Coerces a compile-time operand of a run-time statement.
    pub(super) fn residual_operand(&mut self, expr: &Expr) {
        if self.out.binding(expr.id) != BindingTime::MetaOnly {
            return;
        }
        if self.shape(expr).is_liftable() {
            self.coerce(expr);
            return;
        }
        let kind = match self.intrinsic_name(expr) {
            Some(intrinsic) => ConflictKind::IntrinsicMisuse {
                intrinsic,
                reason: "is a compile-time handle and cannot be used in run-time code".to_string(),
            },
            None => ConflictKind::StageConflict {
                meta: Self::describe(expr),
                object: "statement".to_string(),
            },
        };
        self.conflict_at(kind, expr.id, expr.span);
    }

    pub(super) fn intrinsic_name(&self, expr: &Expr) -> Option<String> {
        let expr = expr.peel_parens();
        self.out.intrinsics.get(&expr.id)?;
        let target = match &expr.kind {
            ExprKind::Call(call) => call.callee.peel_parens(),
            _ => expr,
        };
        match self.model.resolve(target.id) {
            SymbolRef::Declaration(id) => self.table.intrinsic(id).map(|spec| spec.symbol.clone()),
            _ => None,
        }
    }

    fn intrinsic_spec(&self, expr: &Expr) -> Option<IntrinsicSpec> {
        match self.model.resolve(expr.peel_parens().id) {
            SymbolRef::Declaration(id) => self.table.intrinsic(id).cloned(),
            _ => None,
        }
    }

    /// Whether `expr` names a namespace or type.
    fn is_static(&self, expr: &Expr) -> bool {
        let expr = expr.peel_parens();
        if !matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Member(_)) {
            return false;
        }
        match self.model.resolve(expr.id) {
            SymbolRef::Declaration(id) => self
                .model
                .declaration(id)
                .is_some_and(|decl| decl.kind.is_container()),
            _ => false,
        }
    }

    /// Records a static access path such as `meta` in `meta.target`.
    fn mark_static(&mut self, expr: &Expr, binding: BindingTime) {
        let symbol = self.model.resolve(expr.id);
        let reference = self.reference_of(symbol);
        self.out.references.insert(expr.id, reference);
        self.out.static_bases.insert(expr.id);
        self.record(expr.id, binding);
        match &expr.kind {
            ExprKind::Paren(paren) => self.mark_static(&paren.inner, binding),
            ExprKind::Member(member) if self.is_static(&member.base) => {
                self.mark_static(&member.base, binding)
            }
            _ => {}
        }
    }

    /// Identifier or member access; `callee` is set when it is being invoked.
    fn reference(&mut self, expr: &Expr, callee: bool) -> BindingTime {
        let symbol = self.model.resolve(expr.id);
        let reference = self.reference_of(symbol);
        self.out.references.insert(expr.id, reference);

        let static_base = match &expr.kind {
            ExprKind::Member(member) if self.is_static(&member.base) => Some(&*member.base),
            ExprKind::Member(member) => {
                self.analyze_expr(&member.base);
                None
            }
            _ => None,
        };

        let declared = match symbol {
            SymbolRef::Local(id) => self.scopes.binding(id),
            SymbolRef::Declaration(id) => {
                if let Some(spec) = self.table.intrinsic(id) {
                    self.out.intrinsics.insert(expr.id, spec.kind.clone());
                    if !callee && spec.usage != IntrinsicUsage::Value {
                        let intrinsic = spec.symbol.clone();
                        self.conflict_at(
                            ConflictKind::IntrinsicMisuse {
                                intrinsic,
                                reason: "must be invoked".to_string(),
                            },
                            expr.id,
                            expr.span,
                        );
                        return BindingTime::Ambiguous;
                    }
                }
                self.table.classify(id)
            }
            SymbolRef::Unresolved => {
                let default = self.table.external_default();
                let name = match &expr.kind {
                    ExprKind::Member(member) => member.member.clone(),
                    _ => expr.as_ident().unwrap_or_default().to_string(),
                };
                self.conflict_at(
                    ConflictKind::UnresolvedSymbolDefaulted { name, default },
                    expr.id,
                    expr.span,
                );
                default
            }
        };

        match (&expr.kind, static_base) {
            (_, Some(base)) => {
                self.mark_static(base, declared);
                declared
            }
            (ExprKind::Member(member), None) => self.combine(expr, &[&member.base], Some(declared)),
            _ => declared,
        }
    }

    fn analyze_callee(&mut self, callee: &Expr) -> BindingTime {
        match &callee.kind {
            ExprKind::Ident(_) | ExprKind::Member(_) => {
                let binding = self.reference(callee, true);
                self.record(callee.id, binding);
                binding
            }
            _ => self.analyze_expr(callee),
        }
    }

    fn call(&mut self, expr: &Expr, call: &ExprCall, statement: bool) -> BindingTime {
        let callee = self.analyze_callee(&call.callee);
        if let Some(spec) = self.intrinsic_spec(&call.callee) {
            return self.intrinsic_call(expr, call, spec, statement);
        }
        for arg in &call.args {
            self.analyze_expr(arg);
        }
        let args: Vec<&Expr> = call.args.iter().collect();
        self.combine(expr, &args, Some(callee))
    }

    fn misuse(&mut self, expr: &Expr, spec: &IntrinsicSpec, reason: impl Into<String>) {
        self.conflict_at(
            ConflictKind::IntrinsicMisuse {
                intrinsic: spec.symbol.clone(),
                reason: reason.into(),
            },
            expr.id,
            expr.span,
        );
    }

    fn intrinsic_call(
        &mut self,
        expr: &Expr,
        call: &ExprCall,
        spec: IntrinsicSpec,
        statement: bool,
    ) -> BindingTime {
        self.out.intrinsics.insert(expr.id, spec.kind.clone());
        for arg in &call.args {
            self.analyze_expr(arg);
        }
        if spec.usage == IntrinsicUsage::Value {
            self.misuse(expr, &spec, "is a value and cannot be invoked");
            return BindingTime::Ambiguous;
        }
        if let Some(arity) = spec.arity {
            if arity != call.args.len() {
                self.misuse(
                    expr,
                    &spec,
                    format!("expects {} argument(s), found {}", arity, call.args.len()),
                );
                return BindingTime::Ambiguous;
            }
        }
        if spec.usage == IntrinsicUsage::Statement && !statement {
            self.misuse(expr, &spec, "can only be used as a statement");
            return BindingTime::Ambiguous;
        }

        match &spec.kind {
            IntrinsicKind::Proceed => BindingTime::MetaOnlyProducingBoth,
            IntrinsicKind::CompileTime => {
                let arg = &call.args[0];
                let value = self.out.binding(arg.id);
                match value.meet(Stage::Meta) {
                    Ok(binding) => {
                        self.compile_time_operand(arg);
                        self.record_forced(expr.id, binding, Stage::Meta);
                        binding
                    }
                    Err(_) if value.is_ambiguous() => BindingTime::Ambiguous,
                    Err(mismatch) => {
                        self.conflict_at(
                            ConflictKind::ForcedStageMismatch {
                                found: mismatch.value,
                                stage: mismatch.stage,
                            },
                            expr.id,
                            expr.span,
                        );
                        BindingTime::Ambiguous
                    }
                }
            }
            IntrinsicKind::RunTime => {
                let arg = &call.args[0];
                if self.out.binding(arg.id).is_ambiguous() {
                    return BindingTime::Ambiguous;
                }
                self.residual_operand(arg);
                if self.out.binding(arg.id) == BindingTime::MetaOnly {
                    // not liftable, already reported
                    return BindingTime::Ambiguous;
                }
                self.record_forced(expr.id, BindingTime::ObjectOnly, Stage::Object);
                BindingTime::ObjectOnly
            }
            IntrinsicKind::InsertComment => {
                let arg = &call.args[0];
                if self.out.binding(arg.id) == BindingTime::ObjectOnly {
                    self.misuse(expr, &spec, "requires a compile-time argument");
                    return BindingTime::Ambiguous;
                }
                BindingTime::MetaOnly
            }
            IntrinsicKind::Target | IntrinsicKind::Tags => spec.binding,
            IntrinsicKind::Extension(_) => {
                let args: Vec<&Expr> = call.args.iter().collect();
                self.combine(expr, &args, Some(spec.binding))
            }
        }
    }

    fn assign(&mut self, expr: &Expr, assign: &ExprAssign) -> BindingTime {
        let value = self.analyze_expr(&assign.value);
        let target = assign.target.peel_parens();
        let local = match (&target.kind, self.model.resolve(target.id)) {
            (ExprKind::Ident(_), SymbolRef::Local(local)) => Some(local),
            _ => None,
        };
        let Some(local) = local else {
            let target_binding = self.analyze_expr(&assign.target);
            let binding = self.combine(expr, &[&assign.value], Some(target_binding));
            if binding == BindingTime::MetaOnly {
                self.conflict_at(
                    ConflictKind::UnsupportedMetaAssignment {
                        target: Self::describe(&assign.target),
                    },
                    expr.id,
                    expr.span,
                );
                return BindingTime::Ambiguous;
            }
            return binding;
        };

        self.out.references.insert(target.id, Reference::Local(local));
        let Some(binding) = self.determine_local(local, expr.id, expr.span, &assign.value, value)
        else {
            self.record(target.id, BindingTime::Ambiguous);
            self.record(assign.target.id, BindingTime::Ambiguous);
            return BindingTime::Ambiguous;
        };
        self.record(target.id, binding);
        self.record(assign.target.id, binding);
        self.combine(expr, &[&assign.value], Some(binding))
    }

    /// Applies a determining use of `local` with `source`, classified `value`.
    ///
    /// Returns the local's classification as seen by this use, or `None` after
    /// reporting a conflict.
    pub(super) fn determine_local(
        &mut self,
        local: LocalId,
        node: NodeId,
        span: Span,
        source: &Expr,
        value: BindingTime,
    ) -> Option<BindingTime> {
        let residual = self.ctx.residual_depth > 0;
        let attempted = match value {
            BindingTime::Ambiguous => return None,
            _ if residual => Some(Stage::Object),
            BindingTime::MetaOnly => Some(Stage::Meta),
            BindingTime::ObjectOnly | BindingTime::MetaOnlyProducingBoth => Some(Stage::Object),
            BindingTime::Both => None,
        };
        let forced = self
            .out
            .expr(source.peel_parens().id)
            .and_then(|annotation| annotation.forced);
        let determination = match (attempted, forced) {
            (Some(Stage::Meta), Some(Stage::Meta)) => {
                self.scopes.determine_forced(local, node, span, Stage::Meta)
            }
            _ => self.scopes.determine(local, node, span, attempted),
        };
        match determination {
            Determination::Open => Some(BindingTime::Both),
            Determination::Bound(stage) => Some(stage.into()),
            Determination::Conflict { fixed, at } => {
                let name = self.scopes.name(local);
                let kind = if residual {
                    ConflictKind::MetaStatementInResidualContext {
                        construct: format!("assignment to compile-time local `{}`", name),
                    }
                } else {
                    ConflictKind::LocalVariableAmbiguousCoercion {
                        local: name.clone(),
                        fixed: fixed.into(),
                        attempted: attempted.map(BindingTime::from).unwrap_or(value),
                    }
                };
                let mut conflict = Conflict::new(kind, node, span);
                if let Some(at) = at {
                    conflict = conflict
                        .with_related(at, format!("`{}` received its binding time here", name));
                }
                self.conflict(conflict);
                None
            }
        }
    }
}
