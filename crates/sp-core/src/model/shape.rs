use crate::ast::{Expr, ExprKind, LocalId};
use crate::model::{DeclKind, SemanticModel, SymbolRef, TypeShape};

/// Static value shape of `expr`.
///
/// `local` supplies the shape of local variables, which only the caller
/// tracks.
pub fn shape_of<M>(expr: &Expr, model: &M, local: &dyn Fn(LocalId) -> TypeShape) -> TypeShape
where
    M: SemanticModel + ?Sized,
{
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Binary(_)
        | ExprKind::Unary(_)
        | ExprKind::Interpolated(_) => TypeShape::Scalar,
        ExprKind::Ident(_) | ExprKind::Member(_) => match model.resolve(expr.id) {
            SymbolRef::Local(id) => local(id),
            SymbolRef::Declaration(id) => match model.declaration(id) {
                Some(decl) if matches!(decl.kind, DeclKind::Property | DeclKind::Field) => {
                    decl.returns.clone()
                }
                Some(decl) if decl.kind.is_container() => TypeShape::Declared(id),
                _ => TypeShape::Unknown,
            },
            SymbolRef::Unresolved => TypeShape::Unknown,
        },
        ExprKind::Call(call) => match model.resolve(call.callee.peel_parens().id) {
            SymbolRef::Declaration(id) => model
                .declaration(id)
                .filter(|decl| decl.kind == DeclKind::Method)
                .map(|decl| decl.returns.clone())
                .unwrap_or_default(),
            _ => TypeShape::Unknown,
        },
        ExprKind::Index(index) => shape_of(&index.base, model, local).element(),
        ExprKind::Assign(assign) => shape_of(&assign.value, model, local),
        ExprKind::Conditional(cond) => shape_of(&cond.then, model, local),
        ExprKind::Paren(paren) => shape_of(&paren.inner, model, local),
        ExprKind::Array(array) => {
            let element = array
                .elements
                .iter()
                .map(|element| {
                    let shape = shape_of(&element.value, model, local);
                    if element.spread {
                        shape.element()
                    } else {
                        shape
                    }
                })
                .next()
                .unwrap_or(TypeShape::Unknown);
            TypeShape::sequence(element)
        }
    }
}
